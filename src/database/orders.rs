use chrono::{DateTime, Utc};
use sqlx::{types::Json, PgConnection, PgPool};
use std::collections::HashMap;
use uuid::Uuid;

use super::filter::{self, Condition, Filter, SortDirection};
use super::models::{
    Order, OrderItem, OrderStatus, OtherShippingInfo, PaymentResult, ProductLink, ProductRef,
    RecentOrder, ShippingInfo,
};
use super::DatabaseError;

/// Order row with its user populated as `{_id, fullName, email}`
const ORDER_SELECT: &str = "SELECT o.*, \
     CASE WHEN u.id IS NULL THEN NULL \
     ELSE jsonb_build_object('_id', u.id, 'fullName', u.full_name, 'email', u.email) END AS \"user\" \
     FROM orders o LEFT JOIN users u ON u.id = o.user_id";

const RECENT_SELECT: &str = "SELECT o.id, o.shipping_info, o.total_price, o.status, o.created_at, \
     CASE WHEN u.id IS NULL THEN NULL \
     ELSE jsonb_build_object('_id', u.id, 'fullName', u.full_name, 'email', u.email) END AS \"user\" \
     FROM orders o LEFT JOIN users u ON u.id = o.user_id";

pub const ORDER_FROM: &str = "orders o";

pub struct NewOrder {
    pub user_id: Option<Uuid>,
    pub order_items: Vec<OrderItem>,
    pub shipping_info: ShippingInfo,
    pub other_shipping_info: OtherShippingInfo,
    pub has_other_address: bool,
    pub payment_method: String,
    pub items_price: f64,
    pub tax_price: f64,
    pub shipping_price: f64,
    pub total_price: f64,
    pub note: Option<String>,
    pub status: OrderStatus,
    pub is_paid: bool,
    pub is_delivered: bool,
}

/// Status columns after a transition
#[derive(Debug, Clone, PartialEq)]
pub struct StatusUpdate {
    pub status: OrderStatus,
    pub is_delivered: bool,
    pub delivered_at: Option<DateTime<Utc>>,
}

/// Orders whose shipping details look like generated test data
pub fn mock_orders() -> Filter {
    Filter::new().when(Condition::Or(vec![
        Condition::ILike("o.shipping_info->>'email'", "%@example.com%".to_string()),
        Condition::Regex("o.shipping_info->>'fullName'", "John Doe|Jane Doe".to_string()),
    ]))
}

/// Keyword match over the order id and the shipping contact
pub fn keyword_search(keyword: &str) -> Filter {
    Filter::new().contains(
        &[
            "o.id::text",
            "o.shipping_info->>'fullName'",
            "o.shipping_info->>'email'",
            "o.shipping_info->>'phone'",
        ],
        keyword,
    )
}

pub async fn insert(conn: &mut PgConnection, new: &NewOrder) -> Result<Uuid, DatabaseError> {
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO orders (id, user_id, order_items, shipping_info, other_shipping_info,
             has_other_address, payment_method, items_price, tax_price, shipping_price,
             total_price, note, status, is_paid, is_delivered)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)",
    )
    .bind(id)
    .bind(new.user_id)
    .bind(Json(&new.order_items))
    .bind(Json(&new.shipping_info))
    .bind(Json(&new.other_shipping_info))
    .bind(new.has_other_address)
    .bind(&new.payment_method)
    .bind(new.items_price)
    .bind(new.tax_price)
    .bind(new.shipping_price)
    .bind(new.total_price)
    .bind(&new.note)
    .bind(new.status.as_str())
    .bind(new.is_paid)
    .bind(new.is_delivered)
    .execute(conn)
    .await?;
    Ok(id)
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Order>, DatabaseError> {
    let sql = format!("{} WHERE o.id = $1", ORDER_SELECT);
    let order = sqlx::query_as::<_, Order>(&sql).bind(id).fetch_optional(pool).await?;
    Ok(order)
}

pub async fn get(pool: &PgPool, id: Uuid) -> Result<Order, DatabaseError> {
    find_by_id(pool, id)
        .await?
        .ok_or_else(|| DatabaseError::NotFound("Order not found".to_string()))
}

/// Lock an order row for a status transition or deletion
pub async fn lock(conn: &mut PgConnection, id: Uuid) -> Result<Option<Order>, DatabaseError> {
    let sql = format!("{} WHERE o.id = $1 FOR UPDATE OF o", ORDER_SELECT);
    let order = sqlx::query_as::<_, Order>(&sql).bind(id).fetch_optional(conn).await?;
    Ok(order)
}

/// Orders matching `filter`, newest first, with item products populated
pub async fn list(pool: &PgPool, filter: &Filter) -> Result<Vec<Order>, DatabaseError> {
    let mut qb = newest_first(filter).build(ORDER_SELECT);
    let mut orders = qb.build_query_as::<Order>().fetch_all(pool).await?;
    populate_products(pool, &mut orders).await?;
    Ok(orders)
}

/// The ordering every order listing uses
pub fn newest_first(filter: &Filter) -> Filter {
    filter.clone().order_by("o.created_at", SortDirection::Desc)
}

pub async fn count(pool: &PgPool, filter: &Filter) -> Result<i64, DatabaseError> {
    filter::count(pool, ORDER_FROM, filter).await
}

/// Replace each item's product id with `{_id, code, name, nameZh}` when the product exists
pub async fn populate_products(pool: &PgPool, orders: &mut [Order]) -> Result<(), DatabaseError> {
    let mut ids: Vec<Uuid> = orders
        .iter()
        .flat_map(|o| o.order_items.iter().map(|item| item.product.id()))
        .collect();
    ids.sort();
    ids.dedup();
    if ids.is_empty() {
        return Ok(());
    }

    let rows = sqlx::query_as::<_, (Uuid, String, String, String)>(
        "SELECT id, code, name, name_zh FROM products WHERE id = ANY($1)",
    )
    .bind(&ids)
    .fetch_all(pool)
    .await?;

    let products: HashMap<Uuid, ProductRef> = rows
        .into_iter()
        .map(|(id, code, name, name_zh)| (id, ProductRef { id, code, name, name_zh }))
        .collect();

    for order in orders.iter_mut() {
        for item in order.order_items.0.iter_mut() {
            if let Some(product) = products.get(&item.product.id()) {
                item.product = ProductLink::Populated(product.clone());
            }
        }
    }
    Ok(())
}

pub async fn mark_paid(pool: &PgPool, id: Uuid, result: &PaymentResult) -> Result<(), DatabaseError> {
    let updated = sqlx::query(
        "UPDATE orders SET is_paid = TRUE, paid_at = NOW(), payment_result = $2, updated_at = NOW()
         WHERE id = $1",
    )
    .bind(id)
    .bind(Json(result))
    .execute(pool)
    .await?;
    if updated.rows_affected() == 0 {
        return Err(DatabaseError::NotFound("Order not found".to_string()));
    }
    Ok(())
}

pub async fn save_status(conn: &mut PgConnection, id: Uuid, update: &StatusUpdate) -> Result<(), DatabaseError> {
    sqlx::query(
        "UPDATE orders SET status = $2, is_delivered = $3, delivered_at = $4, updated_at = NOW()
         WHERE id = $1",
    )
    .bind(id)
    .bind(update.status.as_str())
    .bind(update.is_delivered)
    .bind(update.delivered_at)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn delete(conn: &mut PgConnection, id: Uuid) -> Result<bool, DatabaseError> {
    let result = sqlx::query("DELETE FROM orders WHERE id = $1")
        .bind(id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Delete every order matching `filter`, returning how many went away
pub async fn delete_matching(pool: &PgPool, filter: &Filter) -> Result<u64, DatabaseError> {
    let mut qb = sqlx::QueryBuilder::new("DELETE FROM orders o");
    filter.push_where(&mut qb);
    let result = qb.build().execute(pool).await?;
    Ok(result.rows_affected())
}

pub async fn recent(pool: &PgPool, limit: i64) -> Result<Vec<RecentOrder>, DatabaseError> {
    let filter = Filter::new().order_by("o.created_at", SortDirection::Desc).limit(limit);
    let mut qb = filter.build(RECENT_SELECT);
    let orders = qb.build_query_as::<RecentOrder>().fetch_all(pool).await?;
    Ok(orders)
}

/// Count and revenue of non-cancelled orders inside an optional window
pub async fn totals(
    pool: &PgPool,
    since: Option<DateTime<Utc>>,
    until: Option<DateTime<Utc>>,
) -> Result<(i64, f64), DatabaseError> {
    let mut f = Filter::new().ne("o.status", OrderStatus::Cancelled.as_str());
    if let Some(since) = since {
        f = f.gte("o.created_at", since);
    }
    if let Some(until) = until {
        f = f.lt("o.created_at", until);
    }
    let mut qb = sqlx::QueryBuilder::new("SELECT COUNT(*), COALESCE(SUM(o.total_price), 0)::float8 FROM orders o");
    f.push_where(&mut qb);
    let row = qb.build_query_as::<(i64, f64)>().fetch_one(pool).await?;
    Ok(row)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_filter_matches_email_or_name() {
        let qb = mock_orders().build("SELECT * FROM orders o");
        assert_eq!(
            qb.sql(),
            "SELECT * FROM orders o WHERE (o.shipping_info->>'email' ILIKE $1 OR o.shipping_info->>'fullName' ~* $2)"
        );
    }

    #[test]
    fn keyword_search_covers_id_and_contact() {
        let qb = keyword_search("0901").build("SELECT * FROM orders o");
        let sql = qb.sql();
        assert!(sql.contains("o.id::text ILIKE $1"));
        assert!(sql.contains("o.shipping_info->>'phone' ILIKE $4"));
    }
}
