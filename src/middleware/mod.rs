pub mod auth;
pub mod json;
pub mod response;

pub use auth::{admin_only, protect, protected, require_admin, AuthUser};
pub use json::JsonBody;
pub use response::{ApiResponse, ApiResult};
