// handlers/dashboard.rs - /api/admin/dashboard (admin)

use chrono::Utc;

use crate::config::config;
use crate::database::models::{LowStockProduct, RecentOrder};
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::dashboard::DashboardStats;
use crate::services::DashboardService;

pub async fn stats() -> ApiResult<DashboardStats> {
    let service = DashboardService::new().await?;
    Ok(ApiResponse::success(service.stats(Utc::now()).await?))
}

pub async fn recent_orders() -> ApiResult<Vec<RecentOrder>> {
    let service = DashboardService::new().await?;
    let orders = service.recent_orders(config().catalog.recent_orders_limit).await?;
    Ok(ApiResponse::success(orders))
}

pub async fn low_stock() -> ApiResult<Vec<LowStockProduct>> {
    let catalog = &config().catalog;
    let service = DashboardService::new().await?;
    let products = service.low_stock(catalog.low_stock_threshold, catalog.low_stock_limit).await?;
    Ok(ApiResponse::success(products))
}
