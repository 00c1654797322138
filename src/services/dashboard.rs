//! Admin dashboard figures: all-time totals with a 30-day trend.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sqlx::PgPool;

use crate::database::models::{LowStockProduct, RecentOrder};
use crate::database::{orders, products, users, DatabaseError, DatabaseManager};

/// One dashboard card
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatCard {
    pub amount: String,
    pub change: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_revenue: StatCard,
    pub orders: StatCard,
    pub new_customers: StatCard,
    pub articles: StatCard,
}

/// The trailing 30 days and the 30 days before them
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Windows {
    pub recent_start: DateTime<Utc>,
    pub previous_start: DateTime<Utc>,
}

impl Windows {
    pub fn ending_at(now: DateTime<Utc>) -> Self {
        Self {
            recent_start: now - Duration::days(30),
            previous_start: now - Duration::days(60),
        }
    }
}

/// Percent change between two periods, e.g. "+12.5%", "-40.0%", "+0.0%"
pub fn format_change(recent: f64, previous: f64) -> String {
    let change = if previous > 0.0 {
        (recent - previous) / previous * 100.0
    } else if recent > 0.0 {
        100.0
    } else {
        0.0
    };
    let formatted = format!("{:.1}", change);
    if formatted.starts_with('-') {
        format!("{}%", formatted)
    } else {
        format!("+{}%", formatted)
    }
}

/// Vietnamese dong as a storefront shows it: "1.234.567\u{a0}₫"
pub fn format_vnd(amount: f64) -> String {
    let rounded = amount.round() as i64;
    let digits = rounded.unsigned_abs().to_string();

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }

    let sign = if rounded < 0 { "-" } else { "" };
    format!("{}{}\u{a0}₫", sign, grouped)
}

pub struct DashboardService {
    pool: PgPool,
}

impl DashboardService {
    pub async fn new() -> Result<Self, DatabaseError> {
        let pool = DatabaseManager::pool().await?;
        Ok(Self { pool })
    }

    pub async fn stats(&self, now: DateTime<Utc>) -> Result<DashboardStats, DatabaseError> {
        let w = Windows::ending_at(now);
        let pool = &self.pool;

        let (order_count, revenue) = orders::totals(pool, None, None).await?;
        let (recent_orders, recent_revenue) = orders::totals(pool, Some(w.recent_start), None).await?;
        let (previous_orders, previous_revenue) =
            orders::totals(pool, Some(w.previous_start), Some(w.recent_start)).await?;

        let customers = users::count_customers(pool, None, None).await?;
        let recent_customers = users::count_customers(pool, Some(w.recent_start), None).await?;
        let previous_customers = users::count_customers(pool, Some(w.previous_start), Some(w.recent_start)).await?;

        let product_count = products::count_created(pool, None, None).await?;
        let recent_products = products::count_created(pool, Some(w.recent_start), None).await?;
        let previous_products = products::count_created(pool, Some(w.previous_start), Some(w.recent_start)).await?;

        Ok(DashboardStats {
            total_revenue: StatCard {
                amount: format_vnd(revenue),
                change: format_change(recent_revenue, previous_revenue),
            },
            orders: StatCard {
                amount: order_count.to_string(),
                change: format_change(recent_orders as f64, previous_orders as f64),
            },
            new_customers: StatCard {
                amount: customers.to_string(),
                change: format_change(recent_customers as f64, previous_customers as f64),
            },
            articles: StatCard {
                amount: product_count.to_string(),
                change: format_change(recent_products as f64, previous_products as f64),
            },
        })
    }

    pub async fn recent_orders(&self, limit: i64) -> Result<Vec<RecentOrder>, DatabaseError> {
        orders::recent(&self.pool, limit).await
    }

    pub async fn low_stock(&self, threshold: i32, limit: i64) -> Result<Vec<LowStockProduct>, DatabaseError> {
        products::low_stock(&self.pool, threshold, limit).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn change_against_previous_period() {
        assert_eq!(format_change(150.0, 100.0), "+50.0%");
        assert_eq!(format_change(60.0, 100.0), "-40.0%");
        assert_eq!(format_change(100.0, 100.0), "+0.0%");
        assert_eq!(format_change(1.0, 3.0), "-66.7%");
    }

    #[test]
    fn change_without_previous_period() {
        assert_eq!(format_change(5.0, 0.0), "+100.0%");
        assert_eq!(format_change(0.0, 0.0), "+0.0%");
    }

    #[test]
    fn vnd_grouping() {
        assert_eq!(format_vnd(0.0), "0\u{a0}₫");
        assert_eq!(format_vnd(999.0), "999\u{a0}₫");
        assert_eq!(format_vnd(1000.0), "1.000\u{a0}₫");
        assert_eq!(format_vnd(1234567.4), "1.234.567\u{a0}₫");
        assert_eq!(format_vnd(-30000.0), "-30.000\u{a0}₫");
    }

    #[test]
    fn windows_are_thirty_days_apart() {
        let now = Utc::now();
        let w = Windows::ending_at(now);
        assert_eq!(now - w.recent_start, Duration::days(30));
        assert_eq!(w.recent_start - w.previous_start, Duration::days(30));
    }

    #[test]
    fn stats_serialize_with_card_names() {
        let card = || StatCard { amount: "1".into(), change: "+0.0%".into() };
        let stats = DashboardStats {
            total_revenue: card(),
            orders: card(),
            new_customers: card(),
            articles: card(),
        };
        let value = serde_json::to_value(stats).unwrap();
        assert_eq!(value["totalRevenue"]["change"], "+0.0%");
        assert!(value.get("newCustomers").is_some());
    }
}
