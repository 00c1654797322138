use chrono::{DateTime, Utc};
use sqlx::postgres::PgArguments;
use sqlx::query::QueryAs;
use sqlx::{types::Json, PgConnection, PgPool, Postgres};
use uuid::Uuid;

use super::filter::{self, Filter};
use super::models::{
    ImageVariant, LowStockProduct, MainCategory, Product, ProductStatus, ProductSummary,
    ProductTypeImage, Rating, StockLevels, UnitOption,
};
use super::DatabaseError;

/// Full product row with its category populated as `{_id, name, slug}`
pub const PRODUCT_SELECT: &str = "SELECT p.*, \
     CASE WHEN c.id IS NULL THEN NULL \
     ELSE jsonb_build_object('_id', c.id, 'name', c.name, 'slug', c.slug) END AS category \
     FROM products p LEFT JOIN categories c ON c.id = p.category_id";

const SUMMARY_SELECT: &str = "SELECT p.id, p.name, p.name_zh, p.code, p.price, p.main_image, \
     p.status, p.stock, p.created_at, p.main_category, p.is_featured, \
     CASE WHEN c.id IS NULL THEN NULL \
     ELSE jsonb_build_object('_id', c.id, 'name', c.name, 'slug', c.slug) END AS category \
     FROM products p LEFT JOIN categories c ON c.id = p.category_id";

/// `FROM` clause for counting with the same aliases the selects use
pub const PRODUCT_FROM: &str = "products p";

/// Every column a product write sets, in bind order
const WRITABLE: &[&str] = &[
    "name",
    "name_zh",
    "slug",
    "code",
    "description",
    "description_zh",
    "short_description",
    "short_description_zh",
    "price",
    "discount_price",
    "main_image",
    "images",
    "image_variants",
    "product_type_images",
    "category_id",
    "main_category",
    "unit_options",
    "stock",
    "is_featured",
    "is_best_seller",
    "is_must_try",
    "is_new_arrival",
    "is_trending",
    "status",
    "gia_goi",
    "gia_thung",
    "gia_loc",
];

/// The writable state of a product
#[derive(Debug, Clone, PartialEq)]
pub struct ProductRecord {
    pub name: String,
    pub name_zh: String,
    pub slug: String,
    pub code: String,
    pub description: String,
    pub description_zh: String,
    pub short_description: String,
    pub short_description_zh: String,
    pub price: f64,
    pub discount_price: f64,
    pub main_image: String,
    pub images: Vec<String>,
    pub image_variants: Vec<ImageVariant>,
    pub product_type_images: Vec<ProductTypeImage>,
    pub category_id: Option<Uuid>,
    pub main_category: MainCategory,
    pub unit_options: Vec<UnitOption>,
    pub stock: i32,
    pub is_featured: bool,
    pub is_best_seller: bool,
    pub is_must_try: bool,
    pub is_new_arrival: bool,
    pub is_trending: bool,
    pub status: ProductStatus,
    pub gia_goi: f64,
    pub gia_thung: f64,
    pub gia_loc: f64,
}

impl From<&Product> for ProductRecord {
    fn from(p: &Product) -> Self {
        Self {
            name: p.name.clone(),
            name_zh: p.name_zh.clone(),
            slug: p.slug.clone(),
            code: p.code.clone(),
            description: p.description.clone(),
            description_zh: p.description_zh.clone(),
            short_description: p.short_description.clone(),
            short_description_zh: p.short_description_zh.clone(),
            price: p.price,
            discount_price: p.discount_price,
            main_image: p.main_image.clone(),
            images: p.images.clone(),
            image_variants: p.image_variants.0.clone(),
            product_type_images: p.product_type_images.0.clone(),
            category_id: p.category_id,
            main_category: p.main_category,
            unit_options: p.unit_options.0.clone(),
            stock: p.stock,
            is_featured: p.is_featured,
            is_best_seller: p.is_best_seller,
            is_must_try: p.is_must_try,
            is_new_arrival: p.is_new_arrival,
            is_trending: p.is_trending,
            status: p.status,
            gia_goi: p.gia_goi,
            gia_thung: p.gia_thung,
            gia_loc: p.gia_loc,
        }
    }
}

fn bind_record<'q, O>(
    query: QueryAs<'q, Postgres, O, PgArguments>,
    r: &'q ProductRecord,
) -> QueryAs<'q, Postgres, O, PgArguments> {
    query
        .bind(&r.name)
        .bind(&r.name_zh)
        .bind(&r.slug)
        .bind(&r.code)
        .bind(&r.description)
        .bind(&r.description_zh)
        .bind(&r.short_description)
        .bind(&r.short_description_zh)
        .bind(r.price)
        .bind(r.discount_price)
        .bind(&r.main_image)
        .bind(&r.images)
        .bind(Json(&r.image_variants))
        .bind(Json(&r.product_type_images))
        .bind(r.category_id)
        .bind(r.main_category.as_str())
        .bind(Json(&r.unit_options))
        .bind(r.stock)
        .bind(r.is_featured)
        .bind(r.is_best_seller)
        .bind(r.is_must_try)
        .bind(r.is_new_arrival)
        .bind(r.is_trending)
        .bind(r.status.as_str())
        .bind(r.gia_goi)
        .bind(r.gia_thung)
        .bind(r.gia_loc)
}

fn insert_sql() -> String {
    let placeholders = (2..=WRITABLE.len() + 1)
        .map(|i| format!("${}", i))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "INSERT INTO products (id, {}) VALUES ($1, {}) RETURNING id",
        WRITABLE.join(", "),
        placeholders
    )
}

fn update_sql() -> String {
    let assignments = WRITABLE
        .iter()
        .enumerate()
        .map(|(i, col)| format!("{} = ${}", col, i + 2))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "UPDATE products SET {}, updated_at = NOW() WHERE id = $1 RETURNING id",
        assignments
    )
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Product>, DatabaseError> {
    let sql = format!("{} WHERE p.id = $1", PRODUCT_SELECT);
    let product = sqlx::query_as::<_, Product>(&sql).bind(id).fetch_optional(pool).await?;
    Ok(product)
}

pub async fn get(pool: &PgPool, id: Uuid) -> Result<Product, DatabaseError> {
    find_by_id(pool, id)
        .await?
        .ok_or_else(|| DatabaseError::NotFound("Product not found".to_string()))
}

pub async fn get_by_slug(pool: &PgPool, slug: &str) -> Result<Product, DatabaseError> {
    let sql = format!("{} WHERE p.slug = $1", PRODUCT_SELECT);
    sqlx::query_as::<_, Product>(&sql)
        .bind(slug)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| DatabaseError::NotFound("Product not found".to_string()))
}

pub async fn list(pool: &PgPool, filter: &Filter) -> Result<Vec<Product>, DatabaseError> {
    let mut qb = filter.build(PRODUCT_SELECT);
    let products = qb.build_query_as::<Product>().fetch_all(pool).await?;
    Ok(products)
}

pub async fn list_summaries(pool: &PgPool, filter: &Filter) -> Result<Vec<ProductSummary>, DatabaseError> {
    let mut qb = filter.build(SUMMARY_SELECT);
    let products = qb.build_query_as::<ProductSummary>().fetch_all(pool).await?;
    Ok(products)
}

pub async fn count(pool: &PgPool, filter: &Filter) -> Result<i64, DatabaseError> {
    filter::count(pool, PRODUCT_FROM, filter).await
}

/// Distinct category ids referenced by at least one product
pub async fn used_category_ids(pool: &PgPool) -> Result<Vec<Uuid>, DatabaseError> {
    let ids = sqlx::query_scalar::<_, Uuid>(
        "SELECT DISTINCT category_id FROM products WHERE category_id IS NOT NULL ORDER BY category_id",
    )
    .fetch_all(pool)
    .await?;
    Ok(ids)
}

/// Name of the product already using `code`, ignoring `exclude`
pub async fn code_owner(pool: &PgPool, code: &str, exclude: Option<Uuid>) -> Result<Option<String>, DatabaseError> {
    let name = sqlx::query_scalar::<_, String>(
        "SELECT name FROM products WHERE code = $1 AND ($2::uuid IS NULL OR id <> $2) LIMIT 1",
    )
    .bind(code)
    .bind(exclude)
    .fetch_optional(pool)
    .await?;
    Ok(name)
}

pub async fn insert(pool: &PgPool, record: &ProductRecord) -> Result<Product, DatabaseError> {
    let sql = insert_sql();
    let (id,): (Uuid,) = bind_record(sqlx::query_as(&sql).bind(Uuid::new_v4()), record)
        .fetch_one(pool)
        .await?;
    get(pool, id).await
}

pub async fn update(pool: &PgPool, id: Uuid, record: &ProductRecord) -> Result<Product, DatabaseError> {
    let sql = update_sql();
    let updated: Option<(Uuid,)> = bind_record(sqlx::query_as(&sql).bind(id), record)
        .fetch_optional(pool)
        .await?;
    match updated {
        Some(_) => get(pool, id).await,
        None => Err(DatabaseError::NotFound("Product not found".to_string())),
    }
}

pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, DatabaseError> {
    let result = sqlx::query("DELETE FROM products WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Read a product's reviews and hold its row lock until the transaction ends
pub async fn lock_ratings(conn: &mut PgConnection, id: Uuid) -> Result<Option<Vec<Rating>>, DatabaseError> {
    let ratings = sqlx::query_scalar::<_, Json<Vec<Rating>>>("SELECT ratings FROM products WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(ratings.map(|r| r.0))
}

pub async fn save_reviews(
    conn: &mut PgConnection,
    id: Uuid,
    ratings: &[Rating],
    average_rating: f64,
) -> Result<(), DatabaseError> {
    sqlx::query(
        "UPDATE products SET ratings = $2, num_reviews = $3, average_rating = $4, updated_at = NOW()
         WHERE id = $1",
    )
    .bind(id)
    .bind(Json(ratings))
    .bind(ratings.len() as i32)
    .bind(average_rating)
    .execute(conn)
    .await?;
    Ok(())
}

/// Read a product's stock and hold its row lock until the transaction ends
pub async fn lock_stock(conn: &mut PgConnection, id: Uuid) -> Result<Option<StockLevels>, DatabaseError> {
    let levels = sqlx::query_as::<_, StockLevels>(
        "SELECT stock, unit_options FROM products WHERE id = $1 FOR UPDATE",
    )
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(levels)
}

pub async fn save_stock(conn: &mut PgConnection, id: Uuid, levels: &StockLevels) -> Result<(), DatabaseError> {
    sqlx::query("UPDATE products SET stock = $2, unit_options = $3, updated_at = NOW() WHERE id = $1")
        .bind(id)
        .bind(levels.stock)
        .bind(&levels.unit_options)
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn low_stock(pool: &PgPool, threshold: i32, limit: i64) -> Result<Vec<LowStockProduct>, DatabaseError> {
    let products = sqlx::query_as::<_, LowStockProduct>(
        "SELECT id, name, code, stock, main_image FROM products
         WHERE stock <= $1
         ORDER BY stock ASC, created_at DESC
         LIMIT $2",
    )
    .bind(threshold)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(products)
}

/// Products created inside an optional window
pub async fn count_created(
    pool: &PgPool,
    since: Option<DateTime<Utc>>,
    until: Option<DateTime<Utc>>,
) -> Result<i64, DatabaseError> {
    let mut f = Filter::new();
    if let Some(since) = since {
        f = f.gte("p.created_at", since);
    }
    if let Some(until) = until {
        f = f.lt("p.created_at", until);
    }
    count(pool, &f).await
}
