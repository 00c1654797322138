use serde::Deserialize;
use sqlx::PgPool;

use super::models::Settings;
use super::DatabaseError;

/// Partial settings update; `None` keeps the stored value
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsUpdate {
    pub store_name: Option<String>,
    pub store_description: Option<String>,
    pub store_address: Option<String>,
    pub store_phone: Option<String>,
    pub store_email: Option<String>,
    pub business_name: Option<String>,
    pub tax_code: Option<String>,
    pub maintenance_mode: Option<bool>,
    pub maintenance_message: Option<String>,
    pub seo_title: Option<String>,
    pub seo_description: Option<String>,
    pub seo_keywords: Option<String>,
    pub free_shipping_threshold: Option<f64>,
    pub delivery_fee: Option<f64>,
}

async fn ensure(pool: &PgPool) -> Result<(), DatabaseError> {
    sqlx::query("INSERT INTO settings (id) VALUES (1) ON CONFLICT (id) DO NOTHING")
        .execute(pool)
        .await?;
    Ok(())
}

/// The settings row, created with defaults on first access
pub async fn get(pool: &PgPool) -> Result<Settings, DatabaseError> {
    ensure(pool).await?;
    let settings = sqlx::query_as::<_, Settings>("SELECT * FROM settings WHERE id = 1")
        .fetch_one(pool)
        .await?;
    Ok(settings)
}

pub async fn update(pool: &PgPool, changes: &SettingsUpdate) -> Result<Settings, DatabaseError> {
    ensure(pool).await?;
    let settings = sqlx::query_as::<_, Settings>(
        "UPDATE settings SET
             store_name = COALESCE($1, store_name),
             store_description = COALESCE($2, store_description),
             store_address = COALESCE($3, store_address),
             store_phone = COALESCE($4, store_phone),
             store_email = COALESCE($5, store_email),
             business_name = COALESCE($6, business_name),
             tax_code = COALESCE($7, tax_code),
             maintenance_mode = COALESCE($8, maintenance_mode),
             maintenance_message = COALESCE($9, maintenance_message),
             seo_title = COALESCE($10, seo_title),
             seo_description = COALESCE($11, seo_description),
             seo_keywords = COALESCE($12, seo_keywords),
             free_shipping_threshold = COALESCE($13, free_shipping_threshold),
             delivery_fee = COALESCE($14, delivery_fee),
             updated_at = NOW()
         WHERE id = 1
         RETURNING *",
    )
    .bind(&changes.store_name)
    .bind(&changes.store_description)
    .bind(&changes.store_address)
    .bind(&changes.store_phone)
    .bind(&changes.store_email)
    .bind(&changes.business_name)
    .bind(&changes.tax_code)
    .bind(changes.maintenance_mode)
    .bind(&changes.maintenance_message)
    .bind(&changes.seo_title)
    .bind(&changes.seo_description)
    .bind(&changes.seo_keywords)
    .bind(changes.free_shipping_threshold)
    .bind(changes.delivery_fee)
    .fetch_one(pool)
    .await?;
    Ok(settings)
}
