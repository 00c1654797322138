use chrono::{DateTime, Utc};
use sqlx::{types::Json, PgPool};
use uuid::Uuid;

use super::filter::{self, Filter};
use super::models::{Address, Product, User};
use super::products::PRODUCT_SELECT;
use super::DatabaseError;

pub struct NewUser {
    pub full_name: String,
    pub email: String,
    pub password_hash: String,
    pub is_admin: bool,
    pub google_id: Option<String>,
    pub avatar: Option<String>,
}

/// Resolved profile values; the caller has already merged them with the current row
pub struct ProfileChanges {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub address: Address,
    pub password_hash: Option<String>,
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<User>, DatabaseError> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

pub async fn get(pool: &PgPool, id: Uuid) -> Result<User, DatabaseError> {
    find_by_id(pool, id)
        .await?
        .ok_or_else(|| DatabaseError::NotFound("User not found".to_string()))
}

pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, DatabaseError> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

pub async fn create(pool: &PgPool, new: NewUser) -> Result<User, DatabaseError> {
    let user = sqlx::query_as::<_, User>(
        "INSERT INTO users (id, full_name, email, password, is_admin, google_id, avatar)
         VALUES ($1, $2, $3, $4, $5, $6, $7)
         RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(new.full_name)
    .bind(new.email)
    .bind(new.password_hash)
    .bind(new.is_admin)
    .bind(new.google_id)
    .bind(new.avatar)
    .fetch_one(pool)
    .await?;
    Ok(user)
}

pub async fn list(pool: &PgPool) -> Result<Vec<User>, DatabaseError> {
    let users = sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY created_at")
        .fetch_all(pool)
        .await?;
    Ok(users)
}

pub async fn update_profile(pool: &PgPool, id: Uuid, changes: ProfileChanges) -> Result<User, DatabaseError> {
    sqlx::query_as::<_, User>(
        "UPDATE users
         SET full_name = $2, email = $3, phone = $4, address = $5,
             password = COALESCE($6, password), updated_at = NOW()
         WHERE id = $1
         RETURNING *",
    )
    .bind(id)
    .bind(changes.full_name)
    .bind(changes.email)
    .bind(changes.phone)
    .bind(Json(changes.address))
    .bind(changes.password_hash)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound("User not found".to_string()))
}

pub async fn update_admin_fields(
    pool: &PgPool,
    id: Uuid,
    full_name: &str,
    email: &str,
    is_admin: bool,
) -> Result<User, DatabaseError> {
    sqlx::query_as::<_, User>(
        "UPDATE users SET full_name = $2, email = $3, is_admin = $4, updated_at = NOW()
         WHERE id = $1
         RETURNING *",
    )
    .bind(id)
    .bind(full_name)
    .bind(email)
    .bind(is_admin)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound("User not found".to_string()))
}

/// Link a Google identity; the avatar is only replaced when one is given
pub async fn link_google(
    pool: &PgPool,
    id: Uuid,
    google_id: &str,
    avatar: Option<&str>,
) -> Result<User, DatabaseError> {
    sqlx::query_as::<_, User>(
        "UPDATE users SET google_id = $2, avatar = COALESCE($3, avatar), updated_at = NOW()
         WHERE id = $1
         RETURNING *",
    )
    .bind(id)
    .bind(google_id)
    .bind(avatar)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound("User not found".to_string()))
}

pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, DatabaseError> {
    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Append a product unless it is already listed
pub async fn wishlist_add(pool: &PgPool, id: Uuid, product_id: Uuid) -> Result<Vec<Uuid>, DatabaseError> {
    sqlx::query_scalar::<_, Vec<Uuid>>(
        "UPDATE users
         SET wishlist = CASE WHEN $2 = ANY(wishlist) THEN wishlist ELSE array_append(wishlist, $2) END,
             updated_at = NOW()
         WHERE id = $1
         RETURNING wishlist",
    )
    .bind(id)
    .bind(product_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound("User not found".to_string()))
}

pub async fn wishlist_remove(pool: &PgPool, id: Uuid, product_id: Uuid) -> Result<Vec<Uuid>, DatabaseError> {
    sqlx::query_scalar::<_, Vec<Uuid>>(
        "UPDATE users SET wishlist = array_remove(wishlist, $2), updated_at = NOW()
         WHERE id = $1
         RETURNING wishlist",
    )
    .bind(id)
    .bind(product_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound("User not found".to_string()))
}

/// Wishlisted products that still exist, in wishlist order
pub async fn wishlist_products(pool: &PgPool, id: Uuid) -> Result<Vec<Product>, DatabaseError> {
    let sql = format!(
        "{} JOIN users u ON p.id = ANY(u.wishlist) WHERE u.id = $1 ORDER BY array_position(u.wishlist, p.id)",
        PRODUCT_SELECT
    );
    let products = sqlx::query_as::<_, Product>(&sql).bind(id).fetch_all(pool).await?;
    Ok(products)
}

/// Non-admin accounts, optionally limited to a creation window
pub async fn count_customers(
    pool: &PgPool,
    since: Option<DateTime<Utc>>,
    until: Option<DateTime<Utc>>,
) -> Result<i64, DatabaseError> {
    let mut f = Filter::new().eq("is_admin", false);
    if let Some(since) = since {
        f = f.gte("created_at", since);
    }
    if let Some(until) = until {
        f = f.lt("created_at", until);
    }
    filter::count(pool, "users", &f).await
}
