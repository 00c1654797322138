use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub id: Uuid,
    #[serde(rename = "isAdmin")]
    pub is_admin: bool,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn new(id: Uuid, is_admin: bool, expiry_hours: u64) -> Self {
        let now = Utc::now();
        let exp = (now + Duration::hours(expiry_hours as i64)).timestamp();

        Self {
            id,
            is_admin,
            iat: now.timestamp(),
            exp,
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("JWT generation error: {0}")]
    TokenGeneration(String),

    #[error("Invalid JWT secret")]
    InvalidSecret,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Password hashing error: {0}")]
    PasswordHash(#[from] bcrypt::BcryptError),

    #[error("Password task failed: {0}")]
    Task(String),
}

/// Issue a session token for a user
pub fn generate_token(user_id: Uuid, is_admin: bool) -> Result<String, AuthError> {
    let security = &config::config().security;
    sign(&Claims::new(user_id, is_admin, security.jwt_expiry_hours), &security.jwt_secret)
}

/// Decode and verify a session token
pub fn validate_token(token: &str) -> Result<Claims, AuthError> {
    verify(token, &config::config().security.jwt_secret)
}

fn sign(claims: &Claims, secret: &str) -> Result<String, AuthError> {
    if secret.is_empty() {
        return Err(AuthError::InvalidSecret);
    }

    let encoding_key = EncodingKey::from_secret(secret.as_bytes());
    encode(&Header::default(), claims, &encoding_key).map_err(|e| AuthError::TokenGeneration(e.to_string()))
}

fn verify(token: &str, secret: &str) -> Result<Claims, AuthError> {
    if secret.is_empty() {
        return Err(AuthError::InvalidSecret);
    }

    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    let token_data = decode::<Claims>(token, &decoding_key, &Validation::default())
        .map_err(|e| AuthError::InvalidToken(e.to_string()))?;

    Ok(token_data.claims)
}

/// bcrypt hash with the configured cost, off the async runtime
pub async fn hash_password(password: &str) -> Result<String, AuthError> {
    let password = password.to_string();
    let cost = config::config().security.bcrypt_cost;
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| AuthError::Task(e.to_string()))?
        .map_err(AuthError::from)
}

pub async fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    let password = password.to_string();
    let hash = hash.to_string();
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| AuthError::Task(e.to_string()))?
        .map_err(AuthError::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test_secret";

    #[test]
    fn token_round_trip() {
        let id = Uuid::new_v4();
        let token = sign(&Claims::new(id, true, 720), SECRET).unwrap();
        let claims = verify(&token, SECRET).unwrap();
        assert_eq!(claims.id, id);
        assert!(claims.is_admin);
        assert_eq!(claims.exp - claims.iat, 720 * 3600);
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let token = sign(&Claims::new(Uuid::new_v4(), false, 1), "other").unwrap();
        assert!(matches!(verify(&token, SECRET), Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn expired_token_is_rejected() {
        let mut claims = Claims::new(Uuid::new_v4(), false, 1);
        claims.iat -= 7200;
        claims.exp -= 7200;
        let token = sign(&claims, SECRET).unwrap();
        assert!(matches!(verify(&token, SECRET), Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn empty_secret_refuses_to_sign() {
        assert!(matches!(
            sign(&Claims::new(Uuid::new_v4(), false, 1), ""),
            Err(AuthError::InvalidSecret)
        ));
    }

    #[test]
    fn claims_use_is_admin_key() {
        let value = serde_json::to_value(Claims::new(Uuid::nil(), true, 1)).unwrap();
        assert_eq!(value["isAdmin"], true);
        assert!(value.get("id").is_some());
    }

    #[tokio::test]
    async fn password_hash_verifies() {
        let hash = tokio::task::spawn_blocking(|| bcrypt::hash("123456", 4)).await.unwrap().unwrap();
        assert!(verify_password("123456", &hash).await.unwrap());
        assert!(!verify_password("654321", &hash).await.unwrap());
    }
}
