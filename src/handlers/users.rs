// handlers/users.rs - /api/users: accounts, profile, wishlist and admin user management

use axum::extract::{Extension, Path};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{parse_id, Message};
use crate::auth;
use crate::database::models::{Address, AddressUpdate, Product, User};
use crate::database::users::{self, NewUser, ProfileChanges};
use crate::database::DatabaseManager;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser, JsonBody};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleLoginRequest {
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub avatar: Option<String>,
    pub google_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileRequest {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<AddressUpdate>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminUserRequest {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub is_admin: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistRequest {
    pub product_id: String,
}

/// `{_id, fullName, email, isAdmin}` plus whichever of phone, address and token apply
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountResponse {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    pub is_admin: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl AccountResponse {
    fn basic(user: &User) -> Self {
        Self {
            id: user.id,
            full_name: user.full_name.clone(),
            email: user.email.clone(),
            phone: None,
            address: None,
            is_admin: user.is_admin,
            token: None,
        }
    }

    fn profile(user: &User) -> Self {
        Self {
            phone: Some(user.phone.clone()),
            address: Some(user.address.0.clone()),
            ..Self::basic(user)
        }
    }

    fn with_token(mut self, user: &User) -> Result<Self, ApiError> {
        self.token = Some(auth::generate_token(user.id, user.is_admin)?);
        Ok(self)
    }
}

#[derive(Debug, Serialize)]
pub struct WishlistResponse {
    pub wishlist: Vec<Uuid>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// POST /api/users - register a customer account
pub async fn register(JsonBody(req): JsonBody<RegisterRequest>) -> ApiResult<AccountResponse> {
    let (Some(full_name), Some(email), Some(password)) =
        (non_empty(req.full_name), non_empty(req.email), req.password.filter(|p| !p.is_empty()))
    else {
        return Err(ApiError::missing_fields(&["fullName", "email", "password"]));
    };

    let pool = DatabaseManager::pool().await?;
    if users::find_by_email(&pool, &email).await?.is_some() {
        return Err(ApiError::bad_request("User already exists"));
    }

    let user = users::create(
        &pool,
        NewUser {
            full_name,
            email,
            password_hash: auth::hash_password(&password).await?,
            is_admin: false,
            google_id: None,
            avatar: None,
        },
    )
    .await?;

    tracing::info!("Registered user {}", user.id);
    Ok(ApiResponse::created(AccountResponse::basic(&user).with_token(&user)?))
}

/// POST /api/users/login
pub async fn login(JsonBody(req): JsonBody<LoginRequest>) -> ApiResult<AccountResponse> {
    let invalid = || ApiError::unauthorized("Invalid email or password");
    let (Some(email), Some(password)) = (non_empty(req.email), req.password) else {
        return Err(invalid());
    };

    let pool = DatabaseManager::pool().await?;
    let user = users::find_by_email(&pool, &email).await?.ok_or_else(invalid)?;
    if !auth::verify_password(&password, &user.password).await? {
        return Err(invalid());
    }

    Ok(ApiResponse::success(AccountResponse::basic(&user).with_token(&user)?))
}

/// POST /api/users/google-login - sign in with an identity the client already verified with Google
pub async fn google_login(JsonBody(req): JsonBody<GoogleLoginRequest>) -> ApiResult<AccountResponse> {
    let (Some(email), Some(google_id)) = (non_empty(req.email), non_empty(req.google_id)) else {
        return Err(ApiError::bad_request("Missing Google sign-in details"));
    };
    let avatar = non_empty(req.avatar);

    let pool = DatabaseManager::pool().await?;
    let user = match users::find_by_email(&pool, &email).await? {
        Some(existing) => users::link_google(&pool, existing.id, &google_id, avatar.as_deref()).await?,
        None => {
            // The account can only be used through Google until the password is changed
            let random_password = Uuid::new_v4().simple().to_string();
            let full_name = non_empty(req.full_name).unwrap_or_else(|| email.clone());
            users::create(
                &pool,
                NewUser {
                    full_name,
                    email,
                    password_hash: auth::hash_password(&random_password).await?,
                    is_admin: false,
                    google_id: Some(google_id),
                    avatar,
                },
            )
            .await?
        }
    };

    Ok(ApiResponse::success(AccountResponse::profile(&user).with_token(&user)?))
}

/// GET /api/users/profile
pub async fn get_profile(Extension(auth_user): Extension<AuthUser>) -> ApiResult<AccountResponse> {
    let pool = DatabaseManager::pool().await?;
    let user = users::get(&pool, auth_user.id).await?;
    Ok(ApiResponse::success(AccountResponse::profile(&user)))
}

/// PUT /api/users/profile - empty values keep the stored ones
pub async fn update_profile(
    Extension(auth_user): Extension<AuthUser>,
    JsonBody(req): JsonBody<ProfileRequest>,
) -> ApiResult<AccountResponse> {
    let pool = DatabaseManager::pool().await?;
    let user = users::get(&pool, auth_user.id).await?;

    let password_hash = match req.password.filter(|p| !p.is_empty()) {
        Some(password) => Some(auth::hash_password(&password).await?),
        None => None,
    };
    let address = match &req.address {
        Some(update) => user.address.merge(update),
        None => user.address.0.clone(),
    };

    let changes = ProfileChanges {
        full_name: non_empty(req.full_name).unwrap_or_else(|| user.full_name.clone()),
        email: non_empty(req.email).unwrap_or_else(|| user.email.clone()),
        phone: non_empty(req.phone).unwrap_or_else(|| user.phone.clone()),
        address,
        password_hash,
    };
    let updated = users::update_profile(&pool, user.id, changes).await?;

    Ok(ApiResponse::success(AccountResponse::profile(&updated).with_token(&updated)?))
}

/// GET /api/users/wishlist - the wishlisted products themselves
pub async fn get_wishlist(Extension(auth_user): Extension<AuthUser>) -> ApiResult<Vec<Product>> {
    let pool = DatabaseManager::pool().await?;
    let products = users::wishlist_products(&pool, auth_user.id).await?;
    Ok(ApiResponse::success(products))
}

pub async fn add_to_wishlist(
    Extension(auth_user): Extension<AuthUser>,
    JsonBody(req): JsonBody<WishlistRequest>,
) -> ApiResult<WishlistResponse> {
    let product_id = parse_id(&req.product_id, "product")?;
    let pool = DatabaseManager::pool().await?;
    let wishlist = users::wishlist_add(&pool, auth_user.id, product_id).await?;
    Ok(ApiResponse::success(WishlistResponse { wishlist }))
}

pub async fn remove_from_wishlist(
    Extension(auth_user): Extension<AuthUser>,
    Path(product_id): Path<String>,
) -> ApiResult<WishlistResponse> {
    let product_id = parse_id(&product_id, "product")?;
    let pool = DatabaseManager::pool().await?;
    let wishlist = users::wishlist_remove(&pool, auth_user.id, product_id).await?;
    Ok(ApiResponse::success(WishlistResponse { wishlist }))
}

/// GET /api/users (admin)
pub async fn list_users() -> ApiResult<Vec<User>> {
    let pool = DatabaseManager::pool().await?;
    Ok(ApiResponse::success(users::list(&pool).await?))
}

/// GET /api/users/:id (admin)
pub async fn get_user(Path(id): Path<String>) -> ApiResult<User> {
    let id = parse_id(&id, "user")?;
    let pool = DatabaseManager::pool().await?;
    Ok(ApiResponse::success(users::get(&pool, id).await?))
}

/// PUT /api/users/:id (admin) - isAdmin changes only when it is sent
pub async fn update_user(Path(id): Path<String>, JsonBody(req): JsonBody<AdminUserRequest>) -> ApiResult<AccountResponse> {
    let id = parse_id(&id, "user")?;
    let pool = DatabaseManager::pool().await?;
    let user = users::get(&pool, id).await?;

    let full_name = non_empty(req.full_name).unwrap_or_else(|| user.full_name.clone());
    let email = non_empty(req.email).unwrap_or_else(|| user.email.clone());
    let is_admin = req.is_admin.unwrap_or(user.is_admin);

    let updated = users::update_admin_fields(&pool, id, &full_name, &email, is_admin).await?;
    Ok(ApiResponse::success(AccountResponse::basic(&updated)))
}

/// DELETE /api/users/:id (admin)
pub async fn delete_user(Path(id): Path<String>) -> ApiResult<Message> {
    let id = parse_id(&id, "user")?;
    let pool = DatabaseManager::pool().await?;
    if !users::delete(&pool, id).await? {
        return Err(ApiError::not_found("User not found"));
    }
    tracing::info!("Deleted user {}", id);
    Ok(ApiResponse::success(Message::new("User removed")))
}
