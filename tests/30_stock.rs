mod common;

use anyhow::Result;
use sqlx::PgPool;
use uuid::Uuid;

use daliyuan_api::database::models::{
    MainCategory, OrderItem, OrderStatus, OtherShippingInfo, Product, ProductLink, ProductStatus,
    ShippingInfo, UnitOption,
};
use daliyuan_api::database::orders::NewOrder;
use daliyuan_api::database::products::{self, ProductRecord};
use daliyuan_api::services::catalog::{self, CatalogError, ReviewError};
use daliyuan_api::services::OrderService;

async fn create_product(pool: &PgPool, stock: i32, units: &[(&str, i32)]) -> Result<Product> {
    let tag = Uuid::new_v4().simple().to_string();
    let code = tag[..6].to_uppercase();
    let record = ProductRecord {
        name: format!("Bánh thử {}", code),
        name_zh: "测试蛋糕".into(),
        slug: format!("banh-thu-{}", tag),
        code,
        description: String::new(),
        description_zh: String::new(),
        short_description: String::new(),
        short_description_zh: String::new(),
        price: 25000.0,
        discount_price: 0.0,
        main_image: "/uploads/images/medium/test-medium.webp".into(),
        images: vec!["/uploads/images/medium/test-medium.webp".into()],
        image_variants: Vec::new(),
        product_type_images: Vec::new(),
        category_id: None,
        main_category: MainCategory::Cake,
        unit_options: units
            .iter()
            .map(|(unit_type, stock)| UnitOption {
                unit_type: unit_type.to_string(),
                price: 25000.0,
                stock: *stock,
            })
            .collect(),
        stock,
        is_featured: false,
        is_best_seller: false,
        is_must_try: false,
        is_new_arrival: false,
        is_trending: false,
        status: ProductStatus::InStock,
        gia_goi: 0.0,
        gia_thung: 0.0,
        gia_loc: 0.0,
    };
    Ok(products::insert(pool, &record).await?)
}

fn line(product: &Product, unit_type: &str, qty: i32) -> OrderItem {
    OrderItem {
        name: product.name.clone(),
        qty,
        image: product.main_image.clone(),
        price: 25000.0,
        unit_type: unit_type.into(),
        product: ProductLink::Id(product.id),
    }
}

fn new_order(items: Vec<OrderItem>) -> NewOrder {
    let items_price: f64 = items.iter().map(|i| i.price * f64::from(i.qty)).sum();
    NewOrder {
        user_id: None,
        order_items: items,
        shipping_info: ShippingInfo {
            full_name: "Trần Thị Bình".into(),
            email: "binh@daliyuan.test".into(),
            phone: "0912345678".into(),
            province: "Hồ Chí Minh".into(),
            district: "Quận 1".into(),
            ward: "Bến Nghé".into(),
            address: "12 Lê Lợi".into(),
            note: None,
        },
        other_shipping_info: OtherShippingInfo::default(),
        has_other_address: false,
        payment_method: "COD".into(),
        items_price,
        tax_price: 0.0,
        shipping_price: 0.0,
        total_price: items_price,
        note: None,
        status: OrderStatus::Processing,
        is_paid: false,
        is_delivered: false,
    }
}

/// (total stock, stock of each unit option in order)
async fn stock_of(pool: &PgPool, id: Uuid) -> Result<(i32, Vec<i32>)> {
    let product = products::get(pool, id).await?;
    Ok((product.stock, product.unit_options.iter().map(|o| o.stock).collect()))
}

#[tokio::test]
async fn cancelling_restores_stock_once() -> Result<()> {
    let Some(pool) = common::database().await? else { return Ok(()) };
    let service = OrderService::from_pool(pool.clone());
    let cake = create_product(&pool, 20, &[("Gói", 12), ("Thùng", 8)]).await?;

    let order = service.place_order(new_order(vec![line(&cake, "Gói", 3)])).await?;
    assert_eq!(stock_of(&pool, cake.id).await?, (17, vec![9, 8]));

    service.set_status(order.id, OrderStatus::Cancelled).await?;
    assert_eq!(stock_of(&pool, cake.id).await?, (20, vec![12, 8]));

    // Already cancelled: nothing comes back a second time
    service.set_status(order.id, OrderStatus::Cancelled).await?;
    assert_eq!(stock_of(&pool, cake.id).await?, (20, vec![12, 8]));

    service.delete_order(order.id).await?;
    assert_eq!(stock_of(&pool, cake.id).await?, (20, vec![12, 8]));

    products::delete(&pool, cake.id).await?;
    Ok(())
}

#[tokio::test]
async fn deleting_restores_open_orders_only() -> Result<()> {
    let Some(pool) = common::database().await? else { return Ok(()) };
    let service = OrderService::from_pool(pool.clone());
    let cake = create_product(&pool, 20, &[("Gói", 12), ("Thùng", 8)]).await?;

    let open = service.place_order(new_order(vec![line(&cake, "Thùng", 2)])).await?;
    assert_eq!(stock_of(&pool, cake.id).await?, (18, vec![12, 6]));
    service.delete_order(open.id).await?;
    assert_eq!(stock_of(&pool, cake.id).await?, (20, vec![12, 8]));

    let delivered = service.place_order(new_order(vec![line(&cake, "Gói", 1)])).await?;
    let delivered = service.mark_delivered(delivered.id).await?;
    assert!(delivered.is_delivered);
    service.delete_order(delivered.id).await?;
    assert_eq!(stock_of(&pool, cake.id).await?, (19, vec![11, 8]));

    products::delete(&pool, cake.id).await?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn opposite_item_orders_both_commit() -> Result<()> {
    let Some(pool) = common::database().await? else { return Ok(()) };
    let service = OrderService::from_pool(pool.clone());
    let tea = create_product(&pool, 100, &[("Lốc", 100)]).await?;
    let cola = create_product(&pool, 100, &[("Lốc", 100)]).await?;

    let mut placed = Vec::new();
    for _ in 0..10 {
        let forward = new_order(vec![line(&tea, "Lốc", 1), line(&cola, "Lốc", 1)]);
        let backward = new_order(vec![line(&cola, "Lốc", 1), line(&tea, "Lốc", 1)]);
        let (a, b) = tokio::join!(service.place_order(forward), service.place_order(backward));
        placed.push(a?.id);
        placed.push(b?.id);
    }

    assert_eq!(stock_of(&pool, tea.id).await?, (80, vec![80]));
    assert_eq!(stock_of(&pool, cola.id).await?, (80, vec![80]));

    sqlx::query("DELETE FROM orders WHERE id = ANY($1)").bind(&placed).execute(&pool).await?;
    products::delete(&pool, tea.id).await?;
    products::delete(&pool, cola.id).await?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_reviews_are_all_kept() -> Result<()> {
    let Some(pool) = common::database().await? else { return Ok(()) };
    let cake = create_product(&pool, 10, &[]).await?;
    let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());

    let (a, b) = tokio::join!(
        catalog::record_review(&pool, cake.id, alice, 5.0, "Ngon".into()),
        catalog::record_review(&pool, cake.id, bob, 3.0, String::new()),
    );
    a?;
    b?;

    let reviewed = products::get(&pool, cake.id).await?;
    assert_eq!(reviewed.num_reviews, 2);
    assert_eq!(reviewed.average_rating, 4.0);

    // The same user racing twice gets exactly one review in
    let carol = Uuid::new_v4();
    let (first, second) = tokio::join!(
        catalog::record_review(&pool, cake.id, carol, 4.0, String::new()),
        catalog::record_review(&pool, cake.id, carol, 4.0, String::new()),
    );
    let outcomes = [first, second];
    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(outcomes
        .iter()
        .any(|r| matches!(r, Err(ReviewError::Catalog(CatalogError::AlreadyReviewed)))));
    assert_eq!(products::get(&pool, cake.id).await?.num_reviews, 3);

    products::delete(&pool, cake.id).await?;
    Ok(())
}
