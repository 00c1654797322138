use sqlx::PgPool;
use uuid::Uuid;

use super::models::Category;
use super::DatabaseError;

#[derive(Debug)]
pub struct CategoryChanges {
    pub name: String,
    pub slug: String,
    pub description: String,
    pub parent_id: Option<Uuid>,
    pub is_active: bool,
}

pub async fn list(pool: &PgPool) -> Result<Vec<Category>, DatabaseError> {
    let categories = sqlx::query_as::<_, Category>("SELECT * FROM categories ORDER BY created_at")
        .fetch_all(pool)
        .await?;
    Ok(categories)
}

pub async fn get(pool: &PgPool, id: Uuid) -> Result<Category, DatabaseError> {
    sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| DatabaseError::NotFound("Category not found".to_string()))
}

pub async fn slug_exists(pool: &PgPool, slug: &str) -> Result<bool, DatabaseError> {
    let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM categories WHERE slug = $1)")
        .bind(slug)
        .fetch_one(pool)
        .await?;
    Ok(exists)
}

pub async fn create(
    pool: &PgPool,
    name: &str,
    slug: &str,
    description: &str,
    parent_id: Option<Uuid>,
) -> Result<Category, DatabaseError> {
    let category = sqlx::query_as::<_, Category>(
        "INSERT INTO categories (id, name, slug, description, parent_id)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(name)
    .bind(slug)
    .bind(description)
    .bind(parent_id)
    .fetch_one(pool)
    .await?;
    Ok(category)
}

pub async fn update(pool: &PgPool, id: Uuid, changes: CategoryChanges) -> Result<Category, DatabaseError> {
    sqlx::query_as::<_, Category>(
        "UPDATE categories
         SET name = $2, slug = $3, description = $4, parent_id = $5, is_active = $6, updated_at = NOW()
         WHERE id = $1
         RETURNING *",
    )
    .bind(id)
    .bind(changes.name)
    .bind(changes.slug)
    .bind(changes.description)
    .bind(changes.parent_id)
    .bind(changes.is_active)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound("Category not found".to_string()))
}

pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, DatabaseError> {
    let result = sqlx::query("DELETE FROM categories WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
