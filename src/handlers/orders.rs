// handlers/orders.rs - /api/orders

use axum::extract::{Extension, Path, Query};
use serde::{Deserialize, Serialize};

use super::{parse_id, Message};
use crate::config::config;
use crate::database::filter::query_number;
use crate::database::models::{Order, OrderItem, OrderStatus, OtherShippingInfo, PaymentResult, ShippingInfo};
use crate::database::orders::{self, NewOrder};
use crate::database::{DatabaseManager, Filter, Page};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser, JsonBody};
use crate::services::OrderService;

fn default_payment_method() -> String {
    "card".to_string()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    #[serde(default)]
    pub order_items: Vec<OrderItem>,
    pub shipping_info: ShippingInfo,
    #[serde(default)]
    pub other_shipping_info: OtherShippingInfo,
    #[serde(default)]
    pub has_other_address: bool,
    #[serde(default = "default_payment_method")]
    pub payment_method: String,
    #[serde(default)]
    pub items_price: f64,
    #[serde(default)]
    pub tax_price: f64,
    #[serde(default)]
    pub shipping_price: f64,
    #[serde(default)]
    pub total_price: f64,
    pub note: Option<String>,
}

impl CreateOrderRequest {
    /// The order to store for `user`; the alternate address is kept only when it is in use
    pub fn into_new_order(self, user: &AuthUser) -> NewOrder {
        NewOrder {
            user_id: Some(user.id),
            order_items: self.order_items,
            shipping_info: self.shipping_info,
            other_shipping_info: if self.has_other_address {
                self.other_shipping_info
            } else {
                OtherShippingInfo::default()
            },
            has_other_address: self.has_other_address,
            payment_method: self.payment_method,
            items_price: self.items_price,
            tax_price: self.tax_price,
            shipping_price: self.shipping_price,
            total_price: self.total_price,
            note: self.note,
            status: OrderStatus::default(),
            is_paid: false,
            is_delivered: false,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct Payer {
    pub email_address: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PaymentRequest {
    pub id: Option<String>,
    pub status: Option<String>,
    pub update_time: Option<String>,
    #[serde(default)]
    pub payer: Payer,
}

impl From<PaymentRequest> for PaymentResult {
    fn from(req: PaymentRequest) -> Self {
        PaymentResult {
            id: req.id,
            status: req.status,
            update_time: req.update_time,
            email_address: req.payer.email_address,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrdersQuery {
    pub page: Option<String>,
    pub page_size: Option<String>,
    pub keyword: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPage {
    pub orders: Vec<Order>,
    pub page: i64,
    pub pages: i64,
    pub total_orders: i64,
}

/// Only the customer who placed an order, or an admin, may see or pay it
pub fn ensure_visible(order: &Order, user: &AuthUser) -> Result<(), ApiError> {
    if user.is_admin || order.user_id == Some(user.id) {
        Ok(())
    } else {
        Err(ApiError::forbidden("Not authorized to access this order"))
    }
}

async fn order_page(conditions: Filter, page: Page) -> ApiResult<OrderPage> {
    let pool = DatabaseManager::pool().await?;
    let total = orders::count(&pool, &conditions).await?;
    let rows = orders::list(&pool, &conditions.page(&page)).await?;
    Ok(ApiResponse::success(OrderPage {
        orders: rows,
        page: page.page,
        pages: page.pages(total),
        total_orders: total,
    }))
}

/// POST /api/orders
pub async fn create(
    Extension(auth_user): Extension<AuthUser>,
    JsonBody(req): JsonBody<CreateOrderRequest>,
) -> ApiResult<Order> {
    let service = OrderService::new().await?;
    let order = service.place_order(req.into_new_order(&auth_user)).await?;
    Ok(ApiResponse::created(order))
}

/// GET /api/orders/myorders
pub async fn my_orders(Extension(auth_user): Extension<AuthUser>) -> ApiResult<Vec<Order>> {
    let pool = DatabaseManager::pool().await?;
    let rows = orders::list(&pool, &Filter::new().eq("o.user_id", auth_user.id)).await?;
    Ok(ApiResponse::success(rows))
}

/// GET /api/orders/:id
pub async fn get(Extension(auth_user): Extension<AuthUser>, Path(id): Path<String>) -> ApiResult<Order> {
    let id = parse_id(&id, "order")?;
    let pool = DatabaseManager::pool().await?;
    let order = orders::get(&pool, id).await?;
    ensure_visible(&order, &auth_user)?;
    Ok(ApiResponse::success(order))
}

/// PUT /api/orders/:id/pay
pub async fn pay(
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<PaymentRequest>,
) -> ApiResult<Order> {
    let id = parse_id(&id, "order")?;
    let pool = DatabaseManager::pool().await?;
    let order = orders::get(&pool, id).await?;
    ensure_visible(&order, &auth_user)?;

    orders::mark_paid(&pool, id, &PaymentResult::from(req)).await?;
    tracing::info!("Order {} paid", id);
    Ok(ApiResponse::success(orders::get(&pool, id).await?))
}

/// GET /api/orders?page= (admin)
pub async fn list(Query(query): Query<OrdersQuery>) -> ApiResult<OrderPage> {
    let page = Page::new(query_number(query.page.as_deref()), config().catalog.order_page_size);
    order_page(Filter::new(), page).await
}

/// GET /api/orders/search?keyword= (admin)
pub async fn search(Query(query): Query<OrdersQuery>) -> ApiResult<OrderPage> {
    let keyword = query
        .keyword
        .as_deref()
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .ok_or_else(|| ApiError::bad_request("Please enter a search keyword"))?;

    let size = query_number(query.page_size.as_deref()).unwrap_or(config().catalog.order_page_size);
    let page = Page::new(query_number(query.page.as_deref()), size);
    order_page(orders::keyword_search(keyword), page).await
}

/// PUT /api/orders/:id/deliver (admin)
pub async fn deliver(Path(id): Path<String>) -> ApiResult<Order> {
    let id = parse_id(&id, "order")?;
    let order = OrderService::new().await?.mark_delivered(id).await?;
    Ok(ApiResponse::success(order))
}

/// PUT /api/orders/:id/status (admin)
pub async fn update_status(Path(id): Path<String>, JsonBody(req): JsonBody<StatusRequest>) -> ApiResult<Order> {
    let id = parse_id(&id, "order")?;
    let status = OrderStatus::try_from(req.status).map_err(|e| ApiError::bad_request(format!("Invalid order status: {}", e.value)))?;
    let order = OrderService::new().await?.set_status(id, status).await?;
    Ok(ApiResponse::success(order))
}

/// DELETE /api/orders/:id (admin)
pub async fn delete(Path(id): Path<String>) -> ApiResult<Message> {
    let id = parse_id(&id, "order")?;
    OrderService::new().await?.delete_order(id).await?;
    Ok(ApiResponse::success(Message::new("Order deleted")))
}
