use std::collections::HashMap;

use anyhow::{anyhow, Context};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::hash_password;
use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::database::models::{
    Address, MainCategory, OrderItem, OrderStatus, PaymentResult, Product, ProductLink, ProductStatus,
    ShippingInfo, UnitOption, User,
};
use crate::database::orders::{self, NewOrder, StatusUpdate};
use crate::database::products::{self, ProductRecord};
use crate::database::users::{self, NewUser, ProfileChanges};
use crate::database::{categories, schema, DatabaseManager};
use crate::services::catalog::resolve_price;
use crate::services::slug::create_slug;

const FIXTURE: &str = include_str!("../../../fixtures/seed.yaml");

#[derive(Debug, Deserialize)]
pub struct SeedData {
    pub users: Vec<SeedUser>,
    pub categories: Vec<SeedCategory>,
    pub products: Vec<SeedProduct>,
    pub orders: Vec<SeedOrder>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedUser {
    pub full_name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub address: Address,
}

#[derive(Debug, Deserialize)]
pub struct SeedCategory {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedProduct {
    pub name: String,
    pub name_zh: String,
    pub code: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub description_zh: String,
    pub price: Option<f64>,
    pub main_image: String,
    pub category: String,
    pub main_category: MainCategory,
    #[serde(default)]
    pub stock: i32,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default)]
    pub unit_options: Vec<UnitOption>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedOrder {
    pub customer: String,
    pub items: Vec<SeedItem>,
    #[serde(default)]
    pub shipping_price: f64,
    pub payment_method: String,
    #[serde(default)]
    pub paid: bool,
    #[serde(default)]
    pub status: OrderStatus,
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedItem {
    pub code: String,
    pub qty: i32,
    pub unit_type: String,
}

pub fn load_fixture() -> anyhow::Result<SeedData> {
    serde_yaml::from_str(FIXTURE).context("Bundled seed fixture is invalid")
}

pub async fn handle(destroy: bool, output_format: OutputFormat) -> anyhow::Result<()> {
    let pool = DatabaseManager::pool().await?;
    let result = if destroy {
        destroy_data(&pool).await.and_then(|()| {
            output_success(&output_format, "Data destroyed", None)
        })
    } else {
        import_data(&pool, &output_format).await
    };
    DatabaseManager::close().await;
    result
}

async fn destroy_data(pool: &PgPool) -> anyhow::Result<()> {
    // Settings survive a reseed
    for table in schema::TABLES.iter().filter(|t| **t != "settings") {
        sqlx::query(&format!("DELETE FROM {}", table)).execute(pool).await?;
        tracing::debug!("Cleared {}", table);
    }
    Ok(())
}

async fn import_data(pool: &PgPool, output_format: &OutputFormat) -> anyhow::Result<()> {
    let data = load_fixture()?;
    destroy_data(pool).await?;

    let mut customers: HashMap<String, User> = HashMap::new();
    for seed in &data.users {
        let user = seed_user(pool, seed).await?;
        customers.insert(user.email.clone(), user);
    }

    let mut category_ids: HashMap<&str, Uuid> = HashMap::new();
    for seed in &data.categories {
        let category =
            categories::create(pool, &seed.name, &create_slug(&seed.name), &seed.description, None).await?;
        category_ids.insert(seed.name.as_str(), category.id);
    }

    let mut catalog: HashMap<String, Product> = HashMap::new();
    for seed in &data.products {
        let category_id = category_ids
            .get(seed.category.as_str())
            .copied()
            .ok_or_else(|| anyhow!("Product {} names unknown category {}", seed.code, seed.category))?;
        let product = products::insert(pool, &product_record(seed, category_id)).await?;
        catalog.insert(product.code.clone(), product);
    }

    for seed in &data.orders {
        let customer = customers
            .get(&seed.customer)
            .ok_or_else(|| anyhow!("Order names unknown customer {}", seed.customer))?;
        seed_order(pool, seed, customer, &catalog).await?;
    }

    output_success(
        output_format,
        "Data imported",
        Some(json!({
            "users": data.users.len(),
            "categories": data.categories.len(),
            "products": data.products.len(),
            "orders": data.orders.len(),
        })),
    )
}

async fn seed_user(pool: &PgPool, seed: &SeedUser) -> anyhow::Result<User> {
    let user = users::create(
        pool,
        NewUser {
            full_name: seed.full_name.clone(),
            email: seed.email.clone(),
            password_hash: hash_password(&seed.password).await?,
            is_admin: seed.is_admin,
            google_id: None,
            avatar: None,
        },
    )
    .await?;

    let user = users::update_profile(
        pool,
        user.id,
        ProfileChanges {
            full_name: seed.full_name.clone(),
            email: seed.email.clone(),
            phone: seed.phone.clone(),
            address: seed.address.clone(),
            password_hash: None,
        },
    )
    .await?;
    Ok(user)
}

pub fn product_record(seed: &SeedProduct, category_id: Uuid) -> ProductRecord {
    let price_text = seed.price.map(|p| p.to_string());
    ProductRecord {
        name: seed.name.clone(),
        name_zh: seed.name_zh.clone(),
        slug: create_slug(&seed.name),
        code: seed.code.clone(),
        description: seed.description.clone(),
        description_zh: seed.description_zh.clone(),
        short_description: String::new(),
        short_description_zh: String::new(),
        price: resolve_price(price_text.as_deref(), &seed.unit_options),
        discount_price: 0.0,
        main_image: seed.main_image.clone(),
        images: vec![seed.main_image.clone()],
        image_variants: Vec::new(),
        product_type_images: Vec::new(),
        category_id: Some(category_id),
        main_category: seed.main_category,
        unit_options: seed.unit_options.clone(),
        stock: seed.stock,
        is_featured: seed.is_featured,
        is_best_seller: false,
        is_must_try: false,
        is_new_arrival: false,
        is_trending: false,
        status: ProductStatus::InStock,
        gia_goi: 0.0,
        gia_thung: 0.0,
        gia_loc: 0.0,
    }
}

/// Price of one unit of `unit_type`, falling back to the product price
pub fn unit_price(product: &Product, unit_type: &str) -> f64 {
    product
        .unit_options
        .iter()
        .find(|o| o.unit_type == unit_type)
        .map(|o| o.price)
        .unwrap_or(product.price)
}

async fn seed_order(
    pool: &PgPool,
    seed: &SeedOrder,
    customer: &User,
    catalog: &HashMap<String, Product>,
) -> anyhow::Result<()> {
    let mut items = Vec::with_capacity(seed.items.len());
    for item in &seed.items {
        let product = catalog
            .get(&item.code)
            .ok_or_else(|| anyhow!("Order item names unknown product {}", item.code))?;
        items.push(OrderItem {
            name: product.name.clone(),
            qty: item.qty,
            image: product.main_image.clone(),
            price: unit_price(product, &item.unit_type),
            unit_type: item.unit_type.clone(),
            product: ProductLink::Id(product.id),
        });
    }

    let items_price: f64 = items.iter().map(|i| i.price * f64::from(i.qty)).sum();
    let delivered = seed.status == OrderStatus::Delivered;
    let new = NewOrder {
        user_id: Some(customer.id),
        order_items: items,
        shipping_info: ShippingInfo {
            full_name: customer.full_name.clone(),
            email: customer.email.clone(),
            phone: customer.phone.clone(),
            province: customer.address.province.clone(),
            district: customer.address.district.clone(),
            ward: customer.address.ward.clone(),
            address: customer.address.street.clone(),
            note: None,
        },
        other_shipping_info: Default::default(),
        has_other_address: false,
        payment_method: seed.payment_method.clone(),
        items_price,
        tax_price: 0.0,
        shipping_price: seed.shipping_price,
        total_price: items_price + seed.shipping_price,
        note: seed.note.clone(),
        status: seed.status,
        is_paid: false,
        is_delivered: delivered,
    };

    let mut conn = pool.acquire().await?;
    let id = orders::insert(&mut conn, &new).await?;
    if delivered {
        let update = StatusUpdate {
            status: OrderStatus::Delivered,
            is_delivered: true,
            delivered_at: Some(Utc::now()),
        };
        orders::save_status(&mut conn, id, &update).await?;
    }
    drop(conn);

    if seed.paid {
        let receipt = PaymentResult {
            id: Some(format!("SEED-{}", id.simple())),
            status: Some("COMPLETED".to_string()),
            update_time: Some(Utc::now().to_rfc3339()),
            email_address: Some(customer.email.clone()),
        };
        orders::mark_paid(pool, id, &receipt).await?;
    }
    Ok(())
}
