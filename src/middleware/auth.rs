use axum::{
    extract::Request,
    http::HeaderMap,
    middleware::{from_fn, Next},
    response::Response,
    routing::MethodRouter,
};
use uuid::Uuid;

use crate::auth;
use crate::database::models::User;
use crate::database::{users, DatabaseManager};
use crate::error::ApiError;

/// Authenticated user context loaded for the bearer token
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub is_admin: bool,
}

impl From<User> for AuthUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            full_name: user.full_name,
            email: user.email,
            is_admin: user.is_admin,
        }
    }
}

/// Require a valid bearer token for an existing user and inject `AuthUser`
pub async fn protect(headers: HeaderMap, mut request: Request, next: Next) -> Result<Response, ApiError> {
    let token = extract_bearer(&headers).ok_or_else(|| ApiError::unauthorized("Not authorized, no token"))?;

    let claims = auth::validate_token(token).map_err(|e| {
        tracing::debug!("Rejected token: {}", e);
        ApiError::unauthorized("Not authorized, token failed")
    })?;

    let pool = DatabaseManager::pool().await?;
    let user = users::find_by_id(&pool, claims.id)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Not authorized, user no longer exists"))?;

    request.extensions_mut().insert(AuthUser::from(user));
    Ok(next.run(request).await)
}

/// Allow only admins; must run after `protect`
pub async fn require_admin(request: Request, next: Next) -> Result<Response, ApiError> {
    match request.extensions().get::<AuthUser>() {
        Some(user) if user.is_admin => Ok(next.run(request).await),
        Some(_) => Err(ApiError::forbidden("Not authorized as an admin")),
        None => Err(ApiError::unauthorized("Not authorized, no token")),
    }
}

/// Wrap a method router so every handler in it requires a logged-in user
pub fn protected<S>(route: MethodRouter<S>) -> MethodRouter<S>
where
    S: Clone + Send + Sync + 'static,
{
    route.route_layer(from_fn(protect))
}

/// Wrap a method router so every handler in it requires an admin
pub fn admin_only<S>(route: MethodRouter<S>) -> MethodRouter<S>
where
    S: Clone + Send + Sync + 'static,
{
    route.route_layer(from_fn(require_admin)).route_layer(from_fn(protect))
}

/// Extract the token from `Authorization: Bearer <token>`
fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(axum::http::header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}
