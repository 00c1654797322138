use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

/// Store-wide settings; exactly one row exists
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(skip_serializing)]
    pub id: i16,
    pub store_name: String,
    pub store_description: String,
    pub store_address: String,
    pub store_phone: String,
    pub store_email: String,
    pub business_name: String,
    pub tax_code: String,
    pub maintenance_mode: bool,
    pub maintenance_message: String,
    pub seo_title: String,
    pub seo_description: String,
    pub seo_keywords: String,
    pub facebook_url: String,
    pub instagram_url: String,
    pub free_shipping_threshold: f64,
    pub delivery_fee: f64,
    pub currency: String,
    pub timezone: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
