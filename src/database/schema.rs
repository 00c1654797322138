use sqlx::PgPool;
use tracing::info;

use super::DatabaseError;

/// Table and index definitions, applied in order. Every statement is idempotent.
const STATEMENTS: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS users (
        id UUID PRIMARY KEY,
        full_name TEXT NOT NULL,
        email TEXT NOT NULL,
        password TEXT NOT NULL,
        phone TEXT NOT NULL DEFAULT '',
        address JSONB NOT NULL DEFAULT '{"province":"","district":"","ward":"","street":""}',
        is_admin BOOLEAN NOT NULL DEFAULT FALSE,
        google_id TEXT,
        avatar TEXT,
        wishlist UUID[] NOT NULL DEFAULT '{}',
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )"#,
    r#"CREATE UNIQUE INDEX IF NOT EXISTS users_email_key ON users (email)"#,
    r#"CREATE TABLE IF NOT EXISTS categories (
        id UUID PRIMARY KEY,
        name TEXT NOT NULL,
        slug TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        parent_id UUID REFERENCES categories (id) ON DELETE SET NULL,
        is_active BOOLEAN NOT NULL DEFAULT TRUE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )"#,
    r#"CREATE UNIQUE INDEX IF NOT EXISTS categories_slug_key ON categories (slug)"#,
    r#"CREATE TABLE IF NOT EXISTS products (
        id UUID PRIMARY KEY,
        name TEXT NOT NULL,
        name_zh TEXT NOT NULL,
        slug TEXT NOT NULL,
        code TEXT NOT NULL CHECK (code ~ '^[A-Z0-9]{1,6}$'),
        description TEXT NOT NULL DEFAULT '',
        description_zh TEXT NOT NULL DEFAULT '',
        short_description TEXT NOT NULL DEFAULT '',
        short_description_zh TEXT NOT NULL DEFAULT '',
        price DOUBLE PRECISION NOT NULL DEFAULT 0,
        discount_price DOUBLE PRECISION NOT NULL DEFAULT 0,
        main_image TEXT NOT NULL CHECK (main_image <> ''),
        images TEXT[] NOT NULL DEFAULT '{}',
        image_variants JSONB NOT NULL DEFAULT '[]',
        product_type_images JSONB NOT NULL DEFAULT '[]',
        category_id UUID REFERENCES categories (id) ON DELETE SET NULL,
        main_category TEXT NOT NULL CHECK (main_category IN ('bánh', 'nước')),
        unit_options JSONB NOT NULL DEFAULT '[]',
        stock INTEGER NOT NULL DEFAULT 0,
        is_featured BOOLEAN NOT NULL DEFAULT FALSE,
        is_best_seller BOOLEAN NOT NULL DEFAULT FALSE,
        is_must_try BOOLEAN NOT NULL DEFAULT FALSE,
        is_new_arrival BOOLEAN NOT NULL DEFAULT FALSE,
        is_trending BOOLEAN NOT NULL DEFAULT FALSE,
        status TEXT NOT NULL DEFAULT 'Còn hàng'
            CHECK (status IN ('Còn hàng', 'Hết hàng', 'Ngừng kinh doanh')),
        ratings JSONB NOT NULL DEFAULT '[]',
        num_reviews INTEGER NOT NULL DEFAULT 0,
        average_rating DOUBLE PRECISION NOT NULL DEFAULT 0,
        gia_goi DOUBLE PRECISION NOT NULL DEFAULT 0,
        gia_thung DOUBLE PRECISION NOT NULL DEFAULT 0,
        gia_loc DOUBLE PRECISION NOT NULL DEFAULT 0,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )"#,
    r#"CREATE UNIQUE INDEX IF NOT EXISTS products_slug_key ON products (slug)"#,
    r#"CREATE UNIQUE INDEX IF NOT EXISTS products_code_key ON products (code)"#,
    r#"CREATE INDEX IF NOT EXISTS products_created_at_idx ON products (created_at DESC)"#,
    r#"CREATE INDEX IF NOT EXISTS products_main_category_status_idx
        ON products (main_category, status, created_at DESC)"#,
    r#"CREATE INDEX IF NOT EXISTS products_category_idx ON products (category_id, created_at DESC)"#,
    r#"CREATE INDEX IF NOT EXISTS products_featured_idx ON products (is_featured, created_at DESC)"#,
    r#"CREATE INDEX IF NOT EXISTS products_stock_idx ON products (stock)"#,
    r#"CREATE TABLE IF NOT EXISTS orders (
        id UUID PRIMARY KEY,
        user_id UUID REFERENCES users (id) ON DELETE SET NULL,
        order_items JSONB NOT NULL DEFAULT '[]',
        shipping_info JSONB NOT NULL,
        other_shipping_info JSONB NOT NULL DEFAULT '{}',
        has_other_address BOOLEAN NOT NULL DEFAULT FALSE,
        payment_method TEXT NOT NULL DEFAULT 'card',
        payment_result JSONB,
        items_price DOUBLE PRECISION NOT NULL DEFAULT 0,
        tax_price DOUBLE PRECISION NOT NULL DEFAULT 0,
        shipping_price DOUBLE PRECISION NOT NULL DEFAULT 0,
        total_price DOUBLE PRECISION NOT NULL DEFAULT 0,
        is_paid BOOLEAN NOT NULL DEFAULT FALSE,
        paid_at TIMESTAMPTZ,
        is_delivered BOOLEAN NOT NULL DEFAULT FALSE,
        delivered_at TIMESTAMPTZ,
        status TEXT NOT NULL DEFAULT 'Đang xử lý'
            CHECK (status IN ('Đang xử lý', 'Đã xác nhận', 'Đang giao hàng', 'Đã giao hàng', 'Đã hủy')),
        note TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )"#,
    r#"CREATE INDEX IF NOT EXISTS orders_user_idx ON orders (user_id, created_at DESC)"#,
    r#"CREATE INDEX IF NOT EXISTS orders_created_at_idx ON orders (created_at DESC)"#,
    r#"CREATE TABLE IF NOT EXISTS settings (
        id SMALLINT PRIMARY KEY DEFAULT 1 CHECK (id = 1),
        store_name TEXT NOT NULL DEFAULT 'Daliyuan',
        store_description TEXT NOT NULL DEFAULT 'Tiệm bánh ngọt truyền thống các loại bánh kem, mousse, và tart.',
        store_address TEXT NOT NULL DEFAULT '654/1C, Phạm Văn Chí, P. Bình Tiên, TP. Hồ Chí Minh',
        store_phone TEXT NOT NULL DEFAULT '0766 616 888',
        store_email TEXT NOT NULL DEFAULT 'ccmm1680@gmail.com',
        business_name TEXT NOT NULL DEFAULT 'CÔNG TY TNHH THƯƠNG MẠI - DỊCH VỤ - XUẤT NHẬP KHẨU TÂN THỜI ĐẠI',
        tax_code TEXT NOT NULL DEFAULT '0313713055',
        maintenance_mode BOOLEAN NOT NULL DEFAULT FALSE,
        maintenance_message TEXT NOT NULL DEFAULT 'Website đang bảo trì, vui lòng quay lại sau.',
        seo_title TEXT NOT NULL DEFAULT 'Daliyuan - Tiệm bánh ngọt truyền thống',
        seo_description TEXT NOT NULL DEFAULT 'Mang đến những sản phẩm bánh kẹo chất lượng cao với hương vị tuyệt vời cho mọi gia đình Việt Nam.',
        seo_keywords TEXT NOT NULL DEFAULT 'bánh ngọt, bánh kem, mousse, tart, Daliyuan',
        facebook_url TEXT NOT NULL DEFAULT '',
        instagram_url TEXT NOT NULL DEFAULT '',
        free_shipping_threshold DOUBLE PRECISION NOT NULL DEFAULT 500000,
        delivery_fee DOUBLE PRECISION NOT NULL DEFAULT 30000,
        currency TEXT NOT NULL DEFAULT 'VND',
        timezone TEXT NOT NULL DEFAULT 'Asia/Ho_Chi_Minh',
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )"#,
];

/// Create every table and index the API needs
pub async fn migrate(pool: &PgPool) -> Result<(), DatabaseError> {
    let mut tx = pool.begin().await?;
    for statement in STATEMENTS {
        sqlx::query(statement).execute(&mut *tx).await?;
    }
    tx.commit().await?;

    info!("Schema is up to date ({} statements)", STATEMENTS.len());
    Ok(())
}

/// Tables in dependency order, children first
pub const TABLES: &[&str] = &["orders", "products", "categories", "users", "settings"];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statements_are_idempotent() {
        for statement in STATEMENTS {
            assert!(
                statement.contains("IF NOT EXISTS"),
                "statement must be safe to re-run: {}",
                statement
            );
        }
    }

    #[test]
    fn every_table_is_created() {
        for table in TABLES {
            let needle = format!("CREATE TABLE IF NOT EXISTS {} (", table);
            assert!(STATEMENTS.iter().any(|s| s.contains(&needle)), "missing table {}", table);
        }
    }
}
