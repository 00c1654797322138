use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use uuid::Uuid;

use super::UnknownVariant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum OrderStatus {
    #[default]
    #[serde(rename = "Đang xử lý")]
    Processing,
    #[serde(rename = "Đã xác nhận")]
    Confirmed,
    #[serde(rename = "Đang giao hàng")]
    Shipping,
    #[serde(rename = "Đã giao hàng")]
    Delivered,
    #[serde(rename = "Đã hủy")]
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Processing => "Đang xử lý",
            OrderStatus::Confirmed => "Đã xác nhận",
            OrderStatus::Shipping => "Đang giao hàng",
            OrderStatus::Delivered => "Đã giao hàng",
            OrderStatus::Cancelled => "Đã hủy",
        }
    }
}

impl TryFrom<String> for OrderStatus {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "Đang xử lý" => Ok(OrderStatus::Processing),
            "Đã xác nhận" => Ok(OrderStatus::Confirmed),
            "Đang giao hàng" => Ok(OrderStatus::Shipping),
            "Đã giao hàng" => Ok(OrderStatus::Delivered),
            "Đã hủy" => Ok(OrderStatus::Cancelled),
            _ => Err(UnknownVariant { kind: "order status", value }),
        }
    }
}

/// Product summary embedded in order items when they are read back
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRef {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub name_zh: String,
}

/// An order item's product: stored as an id, returned populated when the product still exists
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProductLink {
    Populated(ProductRef),
    Id(Uuid),
}

impl ProductLink {
    pub fn id(&self) -> Uuid {
        match self {
            ProductLink::Populated(p) => p.id,
            ProductLink::Id(id) => *id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub name: String,
    pub qty: i32,
    pub image: String,
    pub price: f64,
    pub unit_type: String,
    pub product: ProductLink,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingInfo {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub province: String,
    pub district: String,
    pub ward: String,
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OtherShippingInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub province: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ward: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaymentResult {
    pub id: Option<String>,
    pub status: Option<String>,
    pub update_time: Option<String>,
    pub email_address: Option<String>,
}

/// The populated `user` of an order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRef {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(rename = "_id")]
    pub id: Uuid,
    #[serde(skip_serializing)]
    pub user_id: Option<Uuid>,
    pub user: Option<Json<UserRef>>,
    pub order_items: Json<Vec<OrderItem>>,
    pub shipping_info: Json<ShippingInfo>,
    pub other_shipping_info: Json<OtherShippingInfo>,
    pub has_other_address: bool,
    pub payment_method: String,
    pub payment_result: Option<Json<PaymentResult>>,
    pub items_price: f64,
    pub tax_price: f64,
    pub shipping_price: f64,
    pub total_price: f64,
    pub is_paid: bool,
    pub paid_at: Option<DateTime<Utc>>,
    pub is_delivered: bool,
    pub delivered_at: Option<DateTime<Utc>>,
    #[sqlx(try_from = "String")]
    pub status: OrderStatus,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Dashboard projection of the latest orders
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RecentOrder {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub shipping_info: Json<ShippingInfo>,
    pub total_price: f64,
    #[sqlx(try_from = "String")]
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub user: Option<Json<UserRef>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_its_label() {
        for status in [
            OrderStatus::Processing,
            OrderStatus::Confirmed,
            OrderStatus::Shipping,
            OrderStatus::Delivered,
            OrderStatus::Cancelled,
        ] {
            assert_eq!(OrderStatus::try_from(status.as_str().to_string()).unwrap(), status);
            assert_eq!(serde_json::to_value(status).unwrap(), status.as_str());
        }
        assert!(OrderStatus::try_from("Shipped".to_string()).is_err());
    }

    #[test]
    fn product_link_accepts_id_or_populated_object() {
        let id = Uuid::new_v4();
        let plain: ProductLink = serde_json::from_value(serde_json::json!(id)).unwrap();
        assert_eq!(plain, ProductLink::Id(id));

        let populated: ProductLink = serde_json::from_value(serde_json::json!({
            "_id": id, "code": "BQ01", "name": "Bánh quy bơ", "nameZh": "黄油饼干"
        }))
        .unwrap();
        assert_eq!(populated.id(), id);
        assert_eq!(serde_json::to_value(&plain).unwrap(), serde_json::json!(id));
    }

    #[test]
    fn other_shipping_info_serializes_empty_as_object() {
        let value = serde_json::to_value(OtherShippingInfo::default()).unwrap();
        assert_eq!(value, serde_json::json!({}));
    }
}
