// handlers/categories.rs - /api/categories

use axum::extract::Path;
use serde::{Deserialize, Deserializer};
use uuid::Uuid;

use super::{parse_id, Message};
use crate::database::categories::{self, CategoryChanges};
use crate::database::models::Category;
use crate::database::DatabaseManager;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, JsonBody};
use crate::services::slug::create_slug;

/// Distinguish an explicit `null` (Some(None)) from an absent field (None)
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCategory {
    pub name: Option<String>,
    #[serde(default)]
    pub description: String,
    pub parent_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCategory {
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub parent_id: Option<Option<String>>,
    pub is_active: Option<bool>,
}

fn parse_parent(raw: Option<&str>) -> Result<Option<Uuid>, ApiError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(id) => parse_id(id, "parent category").map(Some),
    }
}

/// Apply an update to the current category; slug follows a changed name
pub fn apply_update(current: &Category, req: UpdateCategory) -> Result<CategoryChanges, ApiError> {
    let mut changes = CategoryChanges {
        name: current.name.clone(),
        slug: current.slug.clone(),
        description: req.description.unwrap_or_else(|| current.description.clone()),
        parent_id: current.parent_id,
        is_active: req.is_active.unwrap_or(current.is_active),
    };

    if let Some(name) = req.name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()) {
        if name != current.name {
            changes.slug = create_slug(&name);
        }
        changes.name = name;
    }
    if let Some(parent) = req.parent_id {
        changes.parent_id = parse_parent(parent.as_deref())?;
    }
    Ok(changes)
}

pub async fn list() -> ApiResult<Vec<Category>> {
    let pool = DatabaseManager::pool().await?;
    Ok(ApiResponse::success(categories::list(&pool).await?))
}

pub async fn get(Path(id): Path<String>) -> ApiResult<Category> {
    let id = parse_id(&id, "category")?;
    let pool = DatabaseManager::pool().await?;
    Ok(ApiResponse::success(categories::get(&pool, id).await?))
}

/// POST /api/categories (admin)
pub async fn create(JsonBody(req): JsonBody<CreateCategory>) -> ApiResult<Category> {
    let name = req
        .name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .ok_or_else(|| ApiError::missing_fields(&["name"]))?;

    let slug = create_slug(&name);
    if slug.is_empty() {
        return Err(ApiError::bad_request("Category name must contain letters or digits"));
    }
    let parent_id = parse_parent(req.parent_id.as_deref())?;

    let pool = DatabaseManager::pool().await?;
    if categories::slug_exists(&pool, &slug).await? {
        return Err(ApiError::bad_request("A category with this slug already exists"));
    }

    let category = categories::create(&pool, &name, &slug, &req.description, parent_id).await?;
    tracing::info!("Created category {} ({})", category.id, category.slug);
    Ok(ApiResponse::created(category))
}

/// PUT /api/categories/:id (admin)
pub async fn update(Path(id): Path<String>, JsonBody(req): JsonBody<UpdateCategory>) -> ApiResult<Category> {
    let id = parse_id(&id, "category")?;
    let pool = DatabaseManager::pool().await?;
    let current = categories::get(&pool, id).await?;

    let changes = apply_update(&current, req)?;
    Ok(ApiResponse::success(categories::update(&pool, id, changes).await?))
}

/// DELETE /api/categories/:id (admin)
pub async fn delete(Path(id): Path<String>) -> ApiResult<Message> {
    let id = parse_id(&id, "category")?;
    let pool = DatabaseManager::pool().await?;
    if !categories::delete(&pool, id).await? {
        return Err(ApiError::not_found("Category not found"));
    }
    Ok(ApiResponse::success(Message::new("Category removed")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn category() -> Category {
        let now = Utc::now();
        Category {
            id: Uuid::new_v4(),
            name: "Bánh quy".into(),
            slug: "banh-quy".into(),
            description: "Các loại bánh quy".into(),
            parent_id: Some(Uuid::new_v4()),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn update(json: serde_json::Value) -> UpdateCategory {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn rename_regenerates_slug() {
        let changes = apply_update(&category(), update(serde_json::json!({"name": "Bánh mì"}))).unwrap();
        assert_eq!(changes.name, "Bánh mì");
        assert_eq!(changes.slug, "banh-mi");
        assert_eq!(changes.description, "Các loại bánh quy");
    }

    #[test]
    fn absent_fields_are_kept() {
        let current = category();
        let changes = apply_update(&current, update(serde_json::json!({}))).unwrap();
        assert_eq!(changes.slug, "banh-quy");
        assert_eq!(changes.parent_id, current.parent_id);
        assert!(changes.is_active);
    }

    #[test]
    fn null_parent_clears_it() {
        let changes = apply_update(
            &category(),
            update(serde_json::json!({"parentId": null, "isActive": false, "description": ""})),
        )
        .unwrap();
        assert_eq!(changes.parent_id, None);
        assert!(!changes.is_active);
        assert_eq!(changes.description, "");
    }

    #[test]
    fn malformed_parent_is_rejected() {
        let err = apply_update(&category(), update(serde_json::json!({"parentId": "abc"}))).unwrap_err();
        assert_eq!(err.status_code(), 400);
    }
}
