use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use thiserror::Error;
use uuid::Uuid;

use crate::database::models::{Order, OrderItem, OrderStatus};
use crate::database::orders::{self, NewOrder, StatusUpdate};
use crate::database::{products, DatabaseError, DatabaseManager};
use crate::services::inventory::{self, StockMovement};

#[derive(Debug, Error)]
pub enum OrderError {
    #[error("No order items")]
    NoItems,

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<sqlx::Error> for OrderError {
    fn from(err: sqlx::Error) -> Self {
        OrderError::Database(DatabaseError::from(err))
    }
}

/// Status columns after moving an order to `next`
pub fn status_effects(current: &Order, next: OrderStatus, now: DateTime<Utc>) -> StatusUpdate {
    if next == OrderStatus::Delivered {
        StatusUpdate {
            status: next,
            is_delivered: true,
            delivered_at: Some(now),
        }
    } else {
        StatusUpdate {
            status: next,
            is_delivered: current.is_delivered,
            delivered_at: current.delivered_at,
        }
    }
}

/// Stock comes back only on the transition into Cancelled
pub fn restores_on_transition(current: OrderStatus, next: OrderStatus) -> bool {
    next == OrderStatus::Cancelled && current != OrderStatus::Cancelled
}

/// Deleting an order gives its stock back unless it was delivered or already cancelled
pub fn restores_on_delete(status: OrderStatus) -> bool {
    !matches!(status, OrderStatus::Delivered | OrderStatus::Cancelled)
}

/// Order lifecycle with the stock bookkeeping each step needs
pub struct OrderService {
    pool: PgPool,
}

impl OrderService {
    pub async fn new() -> Result<Self, DatabaseError> {
        let pool = DatabaseManager::pool().await?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert the order and take its items out of stock in one transaction
    pub async fn place_order(&self, new: NewOrder) -> Result<Order, OrderError> {
        if new.order_items.is_empty() {
            return Err(OrderError::NoItems);
        }

        let mut tx = self.pool.begin().await?;
        let id = orders::insert(&mut tx, &new).await?;
        move_stock(&mut tx, &new.order_items, StockMovement::Decrement).await?;
        tx.commit().await?;

        tracing::info!("Order {} placed with {} items", id, new.order_items.len());
        Ok(orders::get(&self.pool, id).await?)
    }

    pub async fn set_status(&self, id: Uuid, next: OrderStatus) -> Result<Order, OrderError> {
        let mut tx = self.pool.begin().await?;
        let current = orders::lock(&mut tx, id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound("Order not found".to_string()))?;

        let update = status_effects(&current, next, Utc::now());
        orders::save_status(&mut tx, id, &update).await?;
        if restores_on_transition(current.status, next) {
            move_stock(&mut tx, &current.order_items, StockMovement::Restore).await?;
            tracing::info!("Order {} cancelled; stock restored", id);
        }
        tx.commit().await?;

        Ok(orders::get(&self.pool, id).await?)
    }

    pub async fn mark_delivered(&self, id: Uuid) -> Result<Order, OrderError> {
        self.set_status(id, OrderStatus::Delivered).await
    }

    pub async fn delete_order(&self, id: Uuid) -> Result<(), OrderError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::lock(&mut tx, id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound("Order not found".to_string()))?;

        if restores_on_delete(order.status) {
            move_stock(&mut tx, &order.order_items, StockMovement::Restore).await?;
        }
        orders::delete(&mut tx, id).await?;
        tx.commit().await?;

        tracing::info!("Order {} deleted", id);
        Ok(())
    }
}

/// Distinct product ids of `items` in ascending order, the order rows are locked in
pub fn lock_order(items: &[OrderItem]) -> Vec<Uuid> {
    let mut ids: Vec<Uuid> = items.iter().map(|item| item.product.id()).collect();
    ids.sort();
    ids.dedup();
    ids
}

/// Items whose product no longer exists are skipped
async fn move_stock(conn: &mut PgConnection, items: &[OrderItem], movement: StockMovement) -> Result<(), DatabaseError> {
    // Lock every row before touching any so concurrent orders queue instead of deadlocking
    let mut stock = BTreeMap::new();
    for product_id in lock_order(items) {
        match products::lock_stock(&mut *conn, product_id).await? {
            Some(levels) => {
                stock.insert(product_id, levels);
            }
            None => tracing::warn!("Product {} on an order no longer exists", product_id),
        }
    }

    for item in items {
        if let Some(levels) = stock.get_mut(&item.product.id()) {
            inventory::apply(levels, &item.unit_type, item.qty, movement);
        }
    }

    for (product_id, levels) in &stock {
        products::save_stock(&mut *conn, *product_id, levels).await?;
    }
    Ok(())
}
