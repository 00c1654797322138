use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderName, HeaderValue, Method, StatusCode, Uri},
    response::{IntoResponse, Json},
    routing::{delete, get, post, put},
    Router,
};
use serde_json::json;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing_subscriber::EnvFilter;

use daliyuan_api::config::{config, AppConfig};
use daliyuan_api::database::{schema, DatabaseManager};
use daliyuan_api::error::ApiError;
use daliyuan_api::handlers::{categories, dashboard, orders, products, settings, users};
use daliyuan_api::middleware::{admin_only, protected};
use daliyuan_api::uploads::ImageProcessor;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Initialize configuration (this loads the config singleton)
    let config = config();
    tracing::info!("Starting Daliyuan API in {:?} mode", config.environment);

    if let Err(e) = ImageProcessor::from_config(&config.uploads).ensure_directories() {
        tracing::warn!("Could not create upload directories under {:?}: {}", config.uploads.root_dir, e);
    }

    if config.database.migrate_on_startup {
        tokio::spawn(async {
            match DatabaseManager::pool().await {
                Ok(pool) => match schema::migrate(&pool).await {
                    Ok(()) => tracing::info!("Database schema is up to date"),
                    Err(e) => tracing::error!("Schema migration failed: {}", e),
                },
                Err(e) => tracing::warn!("Database unavailable, skipping migration: {}", e),
            }
        });
    }

    let bind_addr = format!("0.0.0.0:{}", config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Daliyuan API listening on http://{}", bind_addr);

    axum::serve(listener, app(config))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    DatabaseManager::close().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutting down");
}

fn app(config: &AppConfig) -> Router {
    Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        .nest_service("/uploads", ServeDir::new(&config.uploads.root_dir))
        .merge(user_routes())
        .merge(category_routes())
        .merge(product_routes(config))
        .merge(order_routes())
        .merge(admin_routes())
        .fallback(not_found)
        // Global middleware
        .layer(DefaultBodyLimit::max(config.server.max_json_body_bytes))
        .layer(cors(config))
        .layer(TraceLayer::new_for_http())
}

fn cors(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .security
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
            Method::PATCH,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-requested-with"),
        ])
}

fn user_routes() -> Router {
    Router::new()
        .route("/api/users", post(users::register).merge(admin_only(get(users::list_users))))
        .route("/api/users/login", post(users::login))
        .route("/api/users/google-login", post(users::google_login))
        .route(
            "/api/users/profile",
            protected(get(users::get_profile).put(users::update_profile)),
        )
        .route(
            "/api/users/wishlist",
            protected(get(users::get_wishlist).post(users::add_to_wishlist)),
        )
        .route("/api/users/wishlist/:id", protected(delete(users::remove_from_wishlist)))
        .route(
            "/api/users/:id",
            admin_only(get(users::get_user).put(users::update_user).delete(users::delete_user)),
        )
}

fn category_routes() -> Router {
    Router::new()
        .route(
            "/api/categories",
            get(categories::list).merge(admin_only(post(categories::create))),
        )
        .route(
            "/api/categories/:id",
            get(categories::get).merge(admin_only(put(categories::update).delete(categories::delete))),
        )
}

fn product_routes(config: &AppConfig) -> Router {
    // Multipart product writes carry up to max_files images
    let upload_bytes = config.uploads.max_body_bytes();

    Router::new()
        .route(
            "/api/products",
            get(products::list).merge(admin_only(post(products::create).layer(DefaultBodyLimit::max(upload_bytes)))),
        )
        .route("/api/products/search", get(products::search))
        .route("/api/products/categories", get(products::used_categories))
        .route("/api/products/featured", get(products::featured))
        .route("/api/products/check-code/:code", get(products::check_code))
        .route("/api/products/slug/:slug", get(products::get_by_slug))
        .route("/api/products/category/:category_id", get(products::by_category))
        .route("/api/products/main-category/:main_category", get(products::by_main_category))
        .route(
            "/api/products/:id",
            get(products::get).merge(admin_only(
                put(products::update).layer(DefaultBodyLimit::max(upload_bytes)).delete(products::delete),
            )),
        )
        .route("/api/products/:id/reviews", protected(post(products::create_review)))
}

fn order_routes() -> Router {
    Router::new()
        .route(
            "/api/orders",
            protected(post(orders::create)).merge(admin_only(get(orders::list))),
        )
        .route("/api/orders/myorders", protected(get(orders::my_orders)))
        .route("/api/orders/search", admin_only(get(orders::search)))
        .route(
            "/api/orders/:id",
            protected(get(orders::get)).merge(admin_only(delete(orders::delete))),
        )
        .route("/api/orders/:id/pay", protected(put(orders::pay)))
        .route("/api/orders/:id/deliver", admin_only(put(orders::deliver)))
        .route("/api/orders/:id/status", admin_only(put(orders::update_status)))
}

fn admin_routes() -> Router {
    Router::new()
        .route("/api/admin/dashboard", admin_only(get(dashboard::stats)))
        .route("/api/admin/dashboard/recent-orders", admin_only(get(dashboard::recent_orders)))
        .route("/api/admin/dashboard/low-stock", admin_only(get(dashboard::low_stock)))
        .route("/api/admin/settings", admin_only(get(settings::get)))
        .route("/api/admin/settings/store", admin_only(put(settings::update_store)))
        .route("/api/admin/settings/maintenance", admin_only(put(settings::update_maintenance)))
        .route("/api/admin/settings/seo", admin_only(put(settings::update_seo)))
        .route("/api/admin/settings/delivery", admin_only(put(settings::update_delivery)))
}

async fn root() -> &'static str {
    "API is running..."
}

async fn health() -> impl IntoResponse {
    let now = chrono::Utc::now();

    match DatabaseManager::health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "timestamp": now,
                "database": "connected"
            })),
        ),
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "degraded",
                    "timestamp": now,
                    "database": "disconnected"
                })),
            )
        }
    }
}

async fn not_found(uri: Uri) -> ApiError {
    ApiError::not_found(format!("Not Found - {}", uri.path()))
}
