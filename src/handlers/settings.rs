// handlers/settings.rs - /api/admin/settings (admin)
//
// Each PUT only looks at the fields of its own section; anything else in the
// body is ignored.

use serde::{Deserialize, Serialize};

use crate::database::models::Settings;
use crate::database::settings::{self, SettingsUpdate};
use crate::database::DatabaseManager;
use crate::middleware::{ApiResponse, ApiResult, JsonBody};

#[derive(Debug, Serialize)]
pub struct SettingsSaved {
    pub message: String,
    pub settings: Settings,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreSection {
    pub store_name: Option<String>,
    pub store_description: Option<String>,
    pub store_address: Option<String>,
    pub store_phone: Option<String>,
    pub store_email: Option<String>,
    pub business_name: Option<String>,
    pub tax_code: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceSection {
    pub maintenance_mode: Option<bool>,
    pub maintenance_message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeoSection {
    pub seo_title: Option<String>,
    pub seo_description: Option<String>,
    pub seo_keywords: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliverySection {
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    pub free_shipping_threshold: Option<f64>,
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    pub delivery_fee: Option<f64>,
}

fn lenient_opt_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Number(n)) => Some(n),
        Some(Raw::Text(s)) => s.trim().parse().ok(),
        None => None,
    })
}

impl From<StoreSection> for SettingsUpdate {
    fn from(s: StoreSection) -> Self {
        SettingsUpdate {
            store_name: s.store_name,
            store_description: s.store_description,
            store_address: s.store_address,
            store_phone: s.store_phone,
            store_email: s.store_email,
            business_name: s.business_name,
            tax_code: s.tax_code,
            ..Default::default()
        }
    }
}

impl From<MaintenanceSection> for SettingsUpdate {
    fn from(s: MaintenanceSection) -> Self {
        SettingsUpdate {
            maintenance_mode: s.maintenance_mode,
            maintenance_message: s.maintenance_message,
            ..Default::default()
        }
    }
}

impl From<SeoSection> for SettingsUpdate {
    fn from(s: SeoSection) -> Self {
        SettingsUpdate {
            seo_title: s.seo_title,
            seo_description: s.seo_description,
            seo_keywords: s.seo_keywords,
            ..Default::default()
        }
    }
}

impl From<DeliverySection> for SettingsUpdate {
    fn from(s: DeliverySection) -> Self {
        SettingsUpdate {
            free_shipping_threshold: s.free_shipping_threshold,
            delivery_fee: s.delivery_fee,
            ..Default::default()
        }
    }
}

async fn save(update: SettingsUpdate, message: &str) -> ApiResult<SettingsSaved> {
    let pool = DatabaseManager::pool().await?;
    let settings = settings::update(&pool, &update).await?;
    tracing::info!("{}", message);
    Ok(ApiResponse::success(SettingsSaved {
        message: message.to_string(),
        settings,
    }))
}

pub async fn get() -> ApiResult<Settings> {
    let pool = DatabaseManager::pool().await?;
    Ok(ApiResponse::success(settings::get(&pool).await?))
}

pub async fn update_store(JsonBody(section): JsonBody<StoreSection>) -> ApiResult<SettingsSaved> {
    save(section.into(), "Store information updated").await
}

pub async fn update_maintenance(JsonBody(section): JsonBody<MaintenanceSection>) -> ApiResult<SettingsSaved> {
    save(section.into(), "Maintenance settings updated").await
}

pub async fn update_seo(JsonBody(section): JsonBody<SeoSection>) -> ApiResult<SettingsSaved> {
    save(section.into(), "SEO settings updated").await
}

pub async fn update_delivery(JsonBody(section): JsonBody<DeliverySection>) -> ApiResult<SettingsSaved> {
    save(section.into(), "Delivery settings updated").await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sections_only_touch_their_fields() {
        let store: StoreSection = serde_json::from_value(serde_json::json!({
            "storeName": "Daliyuan",
            "seoTitle": "ignored"
        }))
        .unwrap();
        let update = SettingsUpdate::from(store);
        assert_eq!(update.store_name.as_deref(), Some("Daliyuan"));
        assert_eq!(update.seo_title, None);
        assert_eq!(update.maintenance_mode, None);
    }

    #[test]
    fn delivery_amounts_accept_strings() {
        let delivery: DeliverySection = serde_json::from_value(serde_json::json!({
            "freeShippingThreshold": "600000",
            "deliveryFee": 25000
        }))
        .unwrap();
        let update = SettingsUpdate::from(delivery);
        assert_eq!(update.free_shipping_threshold, Some(600000.0));
        assert_eq!(update.delivery_fee, Some(25000.0));

        let empty: DeliverySection = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(SettingsUpdate::from(empty).delivery_fee, None);
    }
}
