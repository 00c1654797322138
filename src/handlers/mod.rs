// handlers/mod.rs - HTTP handlers grouped by resource
//
// Each module holds the handlers for one `/api/*` prefix. Routes and their
// auth layers (public, `protected`, `admin_only`) are assembled in main.rs.

pub mod categories;
pub mod dashboard;
pub mod orders;
pub mod products;
pub mod settings;
pub mod users;

use serde::Serialize;
use uuid::Uuid;

use crate::error::ApiError;

/// Parse a path id, rejecting malformed ones before they reach the database
pub(crate) fn parse_id(raw: &str, what: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw.trim()).map_err(|_| ApiError::bad_request(format!("Invalid {} id: {}", what, raw)))
}

/// `{message}` body for deletes and other acknowledgements
#[derive(Debug, Serialize)]
pub struct Message {
    pub message: String,
}

impl Message {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}
