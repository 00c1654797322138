use serde_json::json;

use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::database::{schema, DatabaseManager};

pub async fn handle(output_format: OutputFormat) -> anyhow::Result<()> {
    let pool = DatabaseManager::pool().await?;
    schema::migrate(&pool).await?;
    DatabaseManager::close().await;

    output_success(
        &output_format,
        "Database schema is up to date",
        Some(json!({ "tables": schema::TABLES })),
    )
}
