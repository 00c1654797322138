//! Product form interpretation: pricing fallback, flags, images, and reviews.

use chrono::Utc;
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::database::models::{
    ImageVariant, MainCategory, Product, ProductStatus, Rating, UnitOption,
};
use crate::database::products::{self, ProductRecord};
use crate::database::DatabaseError;
use crate::services::slug::create_slug;
use crate::uploads::{ProcessedImage, ProductForm};

#[derive(Debug, Error, PartialEq)]
pub enum CatalogError {
    #[error("Missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),

    #[error("Invalid unitOptions format: {0}")]
    InvalidUnitOptions(String),

    #[error("Product code {0} must be 1-6 uppercase letters or digits")]
    InvalidCode(String),

    #[error("Invalid mainCategory: {0}")]
    InvalidMainCategory(String),

    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    #[error("Invalid category id: {0}")]
    InvalidCategory(String),

    #[error("Please upload at least one image for the product")]
    NoImages,

    #[error("Product needs a main image; send updateMainImage=true with the first image")]
    MissingMainImage,

    #[error("You have already reviewed this product")]
    AlreadyReviewed,

    #[error("Rating must be a number from 1 to 5")]
    InvalidRating,
}

/// Unit types whose price stands in for the product price
const SMALLEST_UNITS: [&str; 2] = ["Gói", "Lốc"];

/// The product price: the given one, or the smallest unit's price when the given one is absent or zero
pub fn resolve_price(price: Option<&str>, unit_options: &[UnitOption]) -> f64 {
    let given = parse_number(price);
    if given != 0.0 {
        return given;
    }

    // Only the first Gói/Lốc counts; a free one falls through to the first unit
    match unit_options.iter().find(|o| SMALLEST_UNITS.contains(&o.unit_type.as_str())) {
        Some(smallest) if smallest.price != 0.0 => smallest.price,
        _ => unit_options.first().map(|o| o.price).unwrap_or(0.0),
    }
}

/// Lenient number: blank or unparsable input reads as 0
pub fn parse_number(raw: Option<&str>) -> f64 {
    raw.and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|n| n.is_finite())
        .unwrap_or(0.0)
}

pub fn parse_unit_options(raw: Option<&str>) -> Result<Vec<UnitOption>, CatalogError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(Vec::new()),
        Some(json) => serde_json::from_str(json).map_err(|e| CatalogError::InvalidUnitOptions(e.to_string())),
    }
}

/// Upper-case and check a product code against `^[A-Z0-9]{1,6}$`
pub fn normalize_code(raw: &str) -> Result<String, CatalogError> {
    let code = raw.trim().to_uppercase();
    let valid = (1..=6).contains(&code.len()) && code.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit());
    if valid {
        Ok(code)
    } else {
        Err(CatalogError::InvalidCode(raw.to_string()))
    }
}

fn parse_main_category(raw: &str) -> Result<MainCategory, CatalogError> {
    MainCategory::try_from(raw.trim().to_string()).map_err(|_| CatalogError::InvalidMainCategory(raw.to_string()))
}

fn parse_category(raw: &str) -> Result<Option<Uuid>, CatalogError> {
    match raw.trim() {
        "" | "null" | "undefined" => Ok(None),
        id => Uuid::parse_str(id)
            .map(Some)
            .map_err(|_| CatalogError::InvalidCategory(raw.to_string())),
    }
}

/// Where newly uploaded images go on the product
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImagePlacement {
    pub main_image: Option<String>,
    pub detail_images: Vec<String>,
    pub variants: Vec<ImageVariant>,
}

/// `updateMainImage` makes the first upload the main image (and, with
/// `addDetailImages`, the rest detail images); `addDetailImages` alone makes
/// every upload a detail image. Every upload is recorded as a variant.
pub fn place_images(processed: &[ProcessedImage], update_main: bool, add_detail: bool) -> ImagePlacement {
    let mut placement = ImagePlacement {
        variants: processed.iter().map(|img| img.paths.clone()).collect(),
        ..Default::default()
    };

    if update_main {
        if let Some((first, rest)) = processed.split_first() {
            placement.main_image = Some(first.display_path());
            if add_detail {
                placement.detail_images = rest.iter().map(ProcessedImage::display_path).collect();
            }
        }
    } else if add_detail {
        placement.detail_images = processed.iter().map(ProcessedImage::display_path).collect();
    }
    placement
}

fn required<'a>(form: &'a ProductForm, key: &'static str, missing: &mut Vec<&'static str>) -> &'a str {
    match form.text(key).map(str::trim) {
        Some(v) if !v.is_empty() => v,
        _ => {
            missing.push(key);
            ""
        }
    }
}

fn text(form: &ProductForm, key: &str) -> String {
    form.text(key).unwrap_or_default().to_string()
}

/// Build a new product from a create form and its processed uploads
pub fn new_product(form: &ProductForm, processed: &[ProcessedImage]) -> Result<ProductRecord, CatalogError> {
    let mut missing = Vec::new();
    let name = required(form, "name", &mut missing);
    let name_zh = required(form, "nameZh", &mut missing);
    let code = required(form, "code", &mut missing);
    let main_category = required(form, "mainCategory", &mut missing);
    if !missing.is_empty() {
        return Err(CatalogError::MissingFields(missing));
    }

    if processed.is_empty() {
        return Err(CatalogError::NoImages);
    }

    let unit_options = parse_unit_options(form.text("unitOptions"))?;
    let placement = place_images(processed, form.flag("updateMainImage"), form.flag("addDetailImages"));
    let main_image = placement.main_image.ok_or(CatalogError::MissingMainImage)?;

    Ok(ProductRecord {
        name: name.to_string(),
        name_zh: name_zh.to_string(),
        slug: create_slug(name),
        code: normalize_code(code)?,
        description: text(form, "description"),
        description_zh: text(form, "descriptionZh"),
        short_description: text(form, "shortDescription"),
        short_description_zh: text(form, "shortDescriptionZh"),
        price: resolve_price(form.text("price"), &unit_options),
        discount_price: parse_number(form.text("discountPrice")),
        main_image,
        images: placement.detail_images,
        image_variants: placement.variants,
        product_type_images: Vec::new(),
        category_id: parse_category(form.text("category").unwrap_or_default())?,
        main_category: parse_main_category(main_category)?,
        stock: parse_number(form.text("stock")) as i32,
        unit_options,
        is_featured: form.flag("isFeatured"),
        is_best_seller: form.flag("isBestSeller"),
        is_must_try: form.flag("isMustTry"),
        is_new_arrival: form.flag("isNewArrival"),
        is_trending: form.flag("isTrending"),
        status: ProductStatus::default(),
        gia_goi: parse_number(form.text("giaGoi")),
        gia_thung: parse_number(form.text("giaThung")),
        gia_loc: parse_number(form.text("giaLoc")),
    })
}

/// Apply an update form to an existing product; fields the form leaves out keep their value
pub fn updated_product(
    existing: &Product,
    form: &ProductForm,
    processed: &[ProcessedImage],
) -> Result<ProductRecord, CatalogError> {
    let main_category = match form.text("mainCategory").map(str::trim) {
        Some(v) if !v.is_empty() => parse_main_category(v)?,
        _ => return Err(CatalogError::MissingFields(vec!["mainCategory"])),
    };

    let mut record = ProductRecord::from(existing);
    record.main_category = main_category;
    record.product_type_images = Vec::new();

    if let Some(name) = form.text("name").map(str::trim).filter(|n| !n.is_empty()) {
        if name != existing.name {
            record.slug = create_slug(name);
        }
        record.name = name.to_string();
    }
    if let Some(name_zh) = form.text("nameZh").map(str::trim).filter(|n| !n.is_empty()) {
        record.name_zh = name_zh.to_string();
    }
    if let Some(code) = form.text("code").filter(|c| !c.trim().is_empty()) {
        record.code = normalize_code(code)?;
    }

    for (key, field) in [
        ("description", &mut record.description),
        ("descriptionZh", &mut record.description_zh),
        ("shortDescription", &mut record.short_description),
        ("shortDescriptionZh", &mut record.short_description_zh),
    ] {
        if let Some(value) = form.text(key) {
            *field = value.to_string();
        }
    }

    if form.text("unitOptions").is_some() {
        record.unit_options = parse_unit_options(form.text("unitOptions"))?;
    }
    if form.text("price").is_some() || form.text("unitOptions").is_some() {
        record.price = resolve_price(form.text("price"), &record.unit_options);
    }
    if form.text("discountPrice").is_some() {
        record.discount_price = parse_number(form.text("discountPrice"));
    }
    if form.text("stock").is_some() {
        record.stock = parse_number(form.text("stock")) as i32;
    }
    if let Some(category) = form.text("category") {
        record.category_id = parse_category(category)?;
    }
    if let Some(status) = form.text("status").map(str::trim).filter(|s| !s.is_empty()) {
        record.status =
            ProductStatus::try_from(status.to_string()).map_err(|_| CatalogError::InvalidStatus(status.to_string()))?;
    }

    for (key, flag) in [
        ("isFeatured", &mut record.is_featured),
        ("isBestSeller", &mut record.is_best_seller),
        ("isMustTry", &mut record.is_must_try),
        ("isNewArrival", &mut record.is_new_arrival),
        ("isTrending", &mut record.is_trending),
    ] {
        if form.text(key).is_some() {
            *flag = form.flag(key);
        }
    }

    for (key, price) in [
        ("giaGoi", &mut record.gia_goi),
        ("giaThung", &mut record.gia_thung),
        ("giaLoc", &mut record.gia_loc),
    ] {
        if form.text(key).is_some() {
            *price = parse_number(form.text(key));
        }
    }

    // Unparsable deletedImages is ignored rather than rejected
    let deleted: Vec<String> = form
        .text("deletedImages")
        .and_then(|raw| serde_json::from_str(raw).ok())
        .unwrap_or_default();
    record.images.retain(|img| !deleted.contains(img));

    let placement = place_images(processed, form.flag("updateMainImage"), form.flag("addDetailImages"));
    if let Some(main_image) = placement.main_image {
        record.main_image = main_image;
    }
    record.images.extend(placement.detail_images);
    record.image_variants.extend(placement.variants);

    Ok(record)
}

/// Add a user's review and return the new average rating
pub fn add_review(ratings: &mut Vec<Rating>, user: Uuid, rating: f64, comment: String) -> Result<f64, CatalogError> {
    if !(1.0..=5.0).contains(&rating) {
        return Err(CatalogError::InvalidRating);
    }
    if ratings.iter().any(|r| r.user == user) {
        return Err(CatalogError::AlreadyReviewed);
    }

    ratings.push(Rating {
        user,
        rating,
        comment,
        date: Utc::now(),
    });
    Ok(ratings.iter().map(|r| r.rating).sum::<f64>() / ratings.len() as f64)
}

#[derive(Debug, Error)]
pub enum ReviewError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<sqlx::Error> for ReviewError {
    fn from(err: sqlx::Error) -> Self {
        ReviewError::Database(DatabaseError::from(err))
    }
}

/// Add a review while holding the product row, so concurrent reviews see each other
pub async fn record_review(
    pool: &PgPool,
    product_id: Uuid,
    user: Uuid,
    rating: f64,
    comment: String,
) -> Result<f64, ReviewError> {
    let mut tx = pool.begin().await?;
    let mut ratings = products::lock_ratings(&mut tx, product_id)
        .await?
        .ok_or_else(|| DatabaseError::NotFound("Product not found".to_string()))?;

    let average = add_review(&mut ratings, user, rating, comment)?;
    products::save_reviews(&mut tx, product_id, &ratings, average).await?;
    tx.commit().await?;
    Ok(average)
}
