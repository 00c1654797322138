use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use std::fmt;
use uuid::Uuid;

use super::{lenient_f64, lenient_i32, UnknownVariant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MainCategory {
    #[serde(rename = "bánh")]
    Cake,
    #[serde(rename = "nước")]
    Beverage,
}

impl MainCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            MainCategory::Cake => "bánh",
            MainCategory::Beverage => "nước",
        }
    }
}

impl TryFrom<String> for MainCategory {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "bánh" => Ok(MainCategory::Cake),
            "nước" => Ok(MainCategory::Beverage),
            _ => Err(UnknownVariant { kind: "main category", value }),
        }
    }
}

impl fmt::Display for MainCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ProductStatus {
    #[default]
    #[serde(rename = "Còn hàng")]
    InStock,
    #[serde(rename = "Hết hàng")]
    OutOfStock,
    #[serde(rename = "Ngừng kinh doanh")]
    Discontinued,
}

impl ProductStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductStatus::InStock => "Còn hàng",
            ProductStatus::OutOfStock => "Hết hàng",
            ProductStatus::Discontinued => "Ngừng kinh doanh",
        }
    }
}

impl TryFrom<String> for ProductStatus {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "Còn hàng" => Ok(ProductStatus::InStock),
            "Hết hàng" => Ok(ProductStatus::OutOfStock),
            "Ngừng kinh doanh" => Ok(ProductStatus::Discontinued),
            _ => Err(UnknownVariant { kind: "product status", value }),
        }
    }
}

/// Every file written for one uploaded image
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImageVariant {
    pub original: String,
    pub webp: String,
    pub thumbnail_webp: String,
    pub medium_webp: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProductTypeImage {
    pub unit_type: String,
    pub images: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitOption {
    pub unit_type: String,
    #[serde(deserialize_with = "lenient_f64")]
    pub price: f64,
    #[serde(default, deserialize_with = "lenient_i32")]
    pub stock: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    pub user: Uuid,
    pub rating: f64,
    #[serde(default)]
    pub comment: String,
    pub date: DateTime<Utc>,
}

/// The populated `category` of a product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRef {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(rename = "_id")]
    pub id: Uuid,
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
    pub image_variants: Json<Vec<ImageVariant>>,
    pub product_type_images: Json<Vec<ProductTypeImage>>,
    #[serde(skip_serializing)]
    pub category_id: Option<Uuid>,
    pub category: Option<Json<CategoryRef>>,
    #[sqlx(try_from = "String")]
    pub main_category: MainCategory,
    pub unit_options: Json<Vec<UnitOption>>,
    pub stock: i32,
    pub is_featured: bool,
    pub is_best_seller: bool,
    pub is_must_try: bool,
    pub is_new_arrival: bool,
    pub is_trending: bool,
    #[sqlx(try_from = "String")]
    pub status: ProductStatus,
    pub ratings: Json<Vec<Rating>>,
    pub num_reviews: i32,
    pub average_rating: f64,
    pub gia_goi: f64,
    pub gia_thung: f64,
    pub gia_loc: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// List projection used by the catalog listing
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummary {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    pub name_zh: String,
    pub code: String,
    pub price: f64,
    pub main_image: String,
    #[sqlx(try_from = "String")]
    pub status: ProductStatus,
    pub stock: i32,
    pub created_at: DateTime<Utc>,
    pub category: Option<Json<CategoryRef>>,
    #[sqlx(try_from = "String")]
    pub main_category: MainCategory,
    pub is_featured: bool,
}

/// The stock columns of one product, read under a row lock
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct StockLevels {
    pub stock: i32,
    pub unit_options: Json<Vec<UnitOption>>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct LowStockProduct {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub stock: i32,
    pub main_image: String,
}
