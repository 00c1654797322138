// handlers/products.rs - /api/products: public catalog, reviews and admin product writes

use axum::extract::{Extension, Multipart, Path, Query};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{parse_id, Message};
use crate::config::{config, CatalogConfig};
use crate::database::filter::query_number;
use crate::database::models::{Product, ProductSummary};
use crate::database::products;
use crate::database::{DatabaseManager, Filter, Page, SortDirection};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser, JsonBody};
use crate::services::catalog;
use crate::uploads::{read_product_form, ImageProcessor, ProcessedImage, ProductForm};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub page: Option<String>,
    pub page_size: Option<String>,
    pub keyword: Option<String>,
    pub category: Option<String>,
    pub main_category: Option<String>,
    pub status: Option<String>,
    pub is_best_seller: Option<String>,
    pub is_new_arrival: Option<String>,
    pub is_featured: Option<String>,
    pub is_must_try: Option<String>,
    pub is_trending: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    pub page: Option<String>,
    pub page_size: Option<String>,
    pub keyword: Option<String>,
    pub category: Option<String>,
    pub main_category: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
    pub page: Option<String>,
    pub page_size: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct FeaturedQuery {
    pub limit: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckCodeQuery {
    pub exclude_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    #[serde(deserialize_with = "crate::database::models::lenient_f64")]
    pub rating: f64,
    #[serde(default)]
    pub comment: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPage<T: Serialize> {
    pub products: Vec<T>,
    pub page: i64,
    pub pages: i64,
    pub total_products: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeCheck {
    pub is_duplicate: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ProductSaved {
    pub success: bool,
    pub product: Product,
}

fn has_text(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn optional_id(raw: Option<&str>, what: &str) -> Result<Option<Uuid>, ApiError> {
    raw.map(|id| parse_id(id, what)).transpose()
}

/// Page for the main listing: the size is clamped to the configured bounds
pub fn listing_page(query: &ListQuery, catalog: &CatalogConfig) -> Page {
    let size = query_number(query.page_size.as_deref())
        .unwrap_or(catalog.default_page_size)
        .clamp(catalog.min_page_size, catalog.max_page_size);
    Page::new(query_number(query.page.as_deref()), size)
}

/// Page for secondary listings, which take the requested size as-is
fn plain_page(page: &Option<String>, page_size: &Option<String>, catalog: &CatalogConfig) -> Page {
    let size = query_number(page_size.as_deref()).unwrap_or(catalog.default_page_size);
    Page::new(query_number(page.as_deref()), size)
}

/// Conditions of the main listing
pub fn listing_filter(query: &ListQuery) -> Result<Filter, ApiError> {
    let mut f = Filter::new();
    if let Some(keyword) = has_text(&query.keyword) {
        f = f.contains(&["p.name"], keyword);
    }
    if let Some(category) = optional_id(has_text(&query.category), "category")? {
        f = f.eq("p.category_id", category);
    }
    if let Some(main_category) = has_text(&query.main_category) {
        f = f.eq("p.main_category", main_category);
    }
    if let Some(status) = has_text(&query.status) {
        f = f.eq("p.status", status);
    }

    for (flag, column) in [
        (&query.is_best_seller, "p.is_best_seller"),
        (&query.is_new_arrival, "p.is_new_arrival"),
        (&query.is_featured, "p.is_featured"),
        (&query.is_must_try, "p.is_must_try"),
        (&query.is_trending, "p.is_trending"),
    ] {
        if flag.as_deref() == Some("true") {
            f = f.eq(column, true);
        }
    }
    Ok(f)
}

/// Keyword search over names, descriptions and code
pub fn search_filter(query: &SearchQuery) -> Result<Filter, ApiError> {
    let mut f = Filter::new();
    if let Some(keyword) = has_text(&query.keyword) {
        f = f.contains(
            &["p.name", "p.name_zh", "p.description", "p.description_zh", "p.code"],
            keyword,
        );
    }
    if let Some(category) = optional_id(has_text(&query.category), "category")? {
        f = f.eq("p.category_id", category);
    }
    if let Some(main_category) = has_text(&query.main_category) {
        f = f.eq("p.main_category", main_category);
    }
    Ok(f)
}

async fn full_page(conditions: Filter, page: Page) -> ApiResult<ProductPage<Product>> {
    let pool = DatabaseManager::pool().await?;
    let total = products::count(&pool, &conditions).await?;
    let rows = products::list(
        &pool,
        &conditions.order_by("p.created_at", SortDirection::Desc).page(&page),
    )
    .await?;

    Ok(ApiResponse::success(ProductPage {
        products: rows,
        page: page.page,
        pages: page.pages(total),
        total_products: total,
    }))
}

/// GET /api/products
pub async fn list(Query(query): Query<ListQuery>) -> ApiResult<ProductPage<ProductSummary>> {
    let page = listing_page(&query, &config().catalog);
    let conditions = listing_filter(&query)?;

    let pool = DatabaseManager::pool().await?;
    let total = products::count(&pool, &conditions).await?;
    let rows = products::list_summaries(
        &pool,
        &conditions.order_by("p.created_at", SortDirection::Desc).page(&page),
    )
    .await?;

    Ok(ApiResponse::success(ProductPage {
        products: rows,
        page: page.page,
        pages: page.pages(total),
        total_products: total,
    }))
}

/// GET /api/products/search
pub async fn search(Query(query): Query<SearchQuery>) -> ApiResult<ProductPage<Product>> {
    let page = plain_page(&query.page, &query.page_size, &config().catalog);
    full_page(search_filter(&query)?, page).await
}

/// GET /api/products/category/:categoryId
pub async fn by_category(Path(category_id): Path<String>, Query(query): Query<PageQuery>) -> ApiResult<ProductPage<Product>> {
    let category_id = parse_id(&category_id, "category")?;
    let page = plain_page(&query.page, &query.page_size, &config().catalog);
    full_page(Filter::new().eq("p.category_id", category_id), page).await
}

/// GET /api/products/main-category/:mainCategory
pub async fn by_main_category(
    Path(main_category): Path<String>,
    Query(query): Query<PageQuery>,
) -> ApiResult<ProductPage<Product>> {
    let page = plain_page(&query.page, &query.page_size, &config().catalog);
    full_page(Filter::new().eq("p.main_category", main_category), page).await
}

/// GET /api/products/categories - category ids that at least one product uses
pub async fn used_categories() -> ApiResult<Vec<Uuid>> {
    let pool = DatabaseManager::pool().await?;
    Ok(ApiResponse::success(products::used_category_ids(&pool).await?))
}

/// GET /api/products/featured?limit=
pub async fn featured(Query(query): Query<FeaturedQuery>) -> ApiResult<Vec<Product>> {
    let limit = query_number(query.limit.as_deref()).unwrap_or(config().catalog.featured_limit);
    let conditions = Filter::new()
        .eq("p.is_featured", true)
        .order_by("p.created_at", SortDirection::Desc)
        .limit(limit.max(1));

    let pool = DatabaseManager::pool().await?;
    Ok(ApiResponse::success(products::list(&pool, &conditions).await?))
}

/// GET /api/products/check-code/:code?excludeId=
pub async fn check_code(Path(code): Path<String>, Query(query): Query<CheckCodeQuery>) -> ApiResult<CodeCheck> {
    let exclude = optional_id(has_text(&query.exclude_id), "product")?;
    let normalized = code.trim().to_uppercase();

    let pool = DatabaseManager::pool().await?;
    let owner = products::code_owner(&pool, &normalized, exclude).await?;
    Ok(ApiResponse::success(code_check(&code, owner)))
}

pub fn code_check(code: &str, owner: Option<String>) -> CodeCheck {
    match owner {
        Some(name) => CodeCheck {
            is_duplicate: true,
            message: format!("Product code {} is already used by \"{}\"", code, name),
        },
        None => CodeCheck {
            is_duplicate: false,
            message: format!("Product code {} is available", code),
        },
    }
}

pub async fn get_by_slug(Path(slug): Path<String>) -> ApiResult<Product> {
    let pool = DatabaseManager::pool().await?;
    Ok(ApiResponse::success(products::get_by_slug(&pool, &slug).await?))
}

pub async fn get(Path(id): Path<String>) -> ApiResult<Product> {
    let id = parse_id(&id, "product")?;
    let pool = DatabaseManager::pool().await?;
    Ok(ApiResponse::success(products::get(&pool, id).await?))
}

/// POST /api/products/:id/reviews - one review per user
pub async fn create_review(
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<ReviewRequest>,
) -> ApiResult<Message> {
    let id = parse_id(&id, "product")?;
    let pool = DatabaseManager::pool().await?;
    catalog::record_review(&pool, id, auth_user.id, req.rating, req.comment).await?;

    Ok(ApiResponse::created(Message::new("Review added")))
}

/// Read the multipart form and turn its files into stored image variants
async fn read_form(multipart: Multipart) -> Result<(ProductForm, Vec<ProcessedImage>), ApiError> {
    let uploads = &config().uploads;
    let mut form = read_product_form(multipart, uploads).await?;
    let files = std::mem::take(&mut form.files);
    let processed = ImageProcessor::from_config(uploads).process_all(files).await?;
    Ok((form, processed))
}

/// Run a product write; when it fails, the images stored for it are removed again
pub async fn discard_on_error<T, F>(processor: &ImageProcessor, processed: &[ProcessedImage], write: F) -> Result<T, ApiError>
where
    F: std::future::Future<Output = Result<T, ApiError>>,
{
    let result = write.await;
    if result.is_err() {
        processor.discard(processed);
    }
    result
}

/// POST /api/products (admin, multipart)
pub async fn create(multipart: Multipart) -> ApiResult<ProductSaved> {
    let (form, processed) = read_form(multipart).await?;
    let processor = ImageProcessor::from_config(&config().uploads);
    let product = discard_on_error(&processor, &processed, insert_product(&form, &processed)).await?;
    tracing::info!("Created product {} ({}) with {} images", product.id, product.code, processed.len());
    Ok(ApiResponse::created(ProductSaved { success: true, product }))
}

async fn insert_product(form: &ProductForm, processed: &[ProcessedImage]) -> Result<Product, ApiError> {
    let record = catalog::new_product(form, processed)?;

    let pool = DatabaseManager::pool().await?;
    if let Some(owner) = products::code_owner(&pool, &record.code, None).await? {
        return Err(code_taken(&record.code, &owner));
    }
    Ok(products::insert(&pool, &record).await?)
}

/// PUT /api/products/:id (admin, multipart)
pub async fn update(Path(id): Path<String>, multipart: Multipart) -> ApiResult<ProductSaved> {
    let id = parse_id(&id, "product")?;
    let pool = DatabaseManager::pool().await?;
    let existing = products::get(&pool, id).await?;

    let (form, processed) = read_form(multipart).await?;
    let processor = ImageProcessor::from_config(&config().uploads);
    let product = discard_on_error(&processor, &processed, update_product(&existing, &form, &processed)).await?;
    tracing::info!("Updated product {} ({} new images)", product.id, processed.len());
    Ok(ApiResponse::success(ProductSaved { success: true, product }))
}

async fn update_product(existing: &Product, form: &ProductForm, processed: &[ProcessedImage]) -> Result<Product, ApiError> {
    let record = catalog::updated_product(existing, form, processed)?;

    let pool = DatabaseManager::pool().await?;
    if record.code != existing.code {
        if let Some(owner) = products::code_owner(&pool, &record.code, Some(existing.id)).await? {
            return Err(code_taken(&record.code, &owner));
        }
    }
    Ok(products::update(&pool, existing.id, &record).await?)
}

fn code_taken(code: &str, owner: &str) -> ApiError {
    ApiError::conflict(format!("Product code {} is already used by \"{}\"", code, owner))
}

/// DELETE /api/products/:id (admin)
pub async fn delete(Path(id): Path<String>) -> ApiResult<Message> {
    let id = parse_id(&id, "product")?;
    let pool = DatabaseManager::pool().await?;
    if !products::delete(&pool, id).await? {
        return Err(ApiError::not_found("Product not found"));
    }
    tracing::info!("Deleted product {}", id);
    Ok(ApiResponse::success(Message::new("Product removed")))
}
