//! Multipart intake for product images.

pub mod images;

pub use images::{ImageProcessor, ProcessedImage};

use axum::extract::multipart::{Multipart, MultipartError};
use axum::http::StatusCode;
use chrono::Utc;
use std::collections::HashMap;
use thiserror::Error;

use crate::config::UploadConfig;

/// Multipart field that carries product images
pub const IMAGE_FIELD: &str = "images";

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Only image files are accepted: {0}")]
    NotAnImage(String),

    #[error("At most {0} images can be uploaded at once")]
    TooManyFiles(usize),

    #[error("{name} exceeds the upload limit of {limit} bytes")]
    FileTooLarge { name: String, limit: usize },

    #[error("Invalid multipart body: {0}")]
    Multipart(String),

    #[error("Request body is too large: {0}")]
    BodyTooLarge(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error("Image task failed: {0}")]
    Task(String),
}

impl From<MultipartError> for UploadError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            UploadError::BodyTooLarge(err.body_text())
        } else {
            UploadError::Multipart(err.body_text())
        }
    }
}

/// An accepted upload held in memory until it is processed
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub original_name: String,
    pub stored_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// Text fields and image files of a product form
#[derive(Debug, Default)]
pub struct ProductForm {
    pub fields: HashMap<String, String>,
    pub files: Vec<UploadedFile>,
}

impl ProductForm {
    pub fn text(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// The field is exactly "true"
    pub fn flag(&self, key: &str) -> bool {
        self.text(key) == Some("true")
    }
}

/// Read every field of a product form, enforcing the image rules as files stream in
pub async fn read_product_form(mut multipart: Multipart, limits: &UploadConfig) -> Result<ProductForm, UploadError> {
    let mut form = ProductForm::default();

    while let Some(mut field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();

        let Some(file_name) = field.file_name().map(str::to_string) else {
            let value = field.text().await?;
            form.fields.insert(name, value);
            continue;
        };

        if name != IMAGE_FIELD {
            return Err(UploadError::Multipart(format!("Unexpected file field: {}", name)));
        }

        let content_type = field.content_type().unwrap_or_default().to_string();
        if !content_type.starts_with("image/") {
            return Err(UploadError::NotAnImage(file_name));
        }

        if form.files.len() >= limits.max_files {
            return Err(UploadError::TooManyFiles(limits.max_files));
        }

        let mut data = Vec::new();
        while let Some(chunk) = field.chunk().await? {
            if data.len() + chunk.len() > limits.max_file_bytes {
                return Err(UploadError::FileTooLarge {
                    name: file_name,
                    limit: limits.max_file_bytes,
                });
            }
            data.extend_from_slice(&chunk);
        }

        form.files.push(UploadedFile {
            stored_name: stored_name(&file_name),
            original_name: file_name,
            content_type,
            data,
        });
    }

    tracing::debug!("Read product form: {} fields, {} files", form.fields.len(), form.files.len());
    Ok(form)
}

fn stored_name(original: &str) -> String {
    format!("{}-{}", Utc::now().timestamp_millis(), sanitize_filename(original))
}

/// Replace everything outside `[a-zA-Z0-9.-]` with `_`
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use axum::{body::Body, extract::DefaultBodyLimit, http::Request, routing::post, Router};
    use tower::ServiceExt;

    const BOUNDARY: &str = "daliyuan-boundary";

    async fn read_fields(multipart: Multipart) -> Result<String, ApiError> {
        let form = read_product_form(multipart, &UploadConfig::default()).await?;
        Ok(form.text("name").unwrap_or_default().to_string())
    }

    fn form_request(name: &str) -> Request<Body> {
        let body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"name\"\r\n\r\n{name}\r\n--{b}--\r\n",
            b = BOUNDARY
        );
        Request::builder()
            .method("POST")
            .uri("/")
            .header("content-type", format!("multipart/form-data; boundary={}", BOUNDARY))
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn form_within_body_limit_is_read() {
        let app = Router::new().route("/", post(read_fields)).layer(DefaultBodyLimit::max(1024));
        let response = app.oneshot(form_request("Bánh quy")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(String::from_utf8_lossy(&bytes), "Bánh quy");
    }

    #[tokio::test]
    async fn body_over_route_limit_is_payload_too_large() {
        let app = Router::new().route("/", post(read_fields)).layer(DefaultBodyLimit::max(64));
        let response = app.oneshot(form_request(&"x".repeat(4096))).await.unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[test]
    fn sanitizes_filenames() {
        assert_eq!(sanitize_filename("bánh quy (1).PNG"), "b_nh_quy__1_.PNG");
        assert_eq!(sanitize_filename("../../etc/passwd"), ".._.._etc_passwd");
        assert_eq!(sanitize_filename("tra-sua.webp"), "tra-sua.webp");
    }

    #[test]
    fn stored_name_is_prefixed_with_timestamp() {
        let name = stored_name("trà sữa.jpg");
        let (millis, rest) = name.split_once('-').unwrap();
        assert!(millis.parse::<i64>().is_ok());
        assert_eq!(rest, "tr__s_a.jpg");
    }

    #[test]
    fn form_flags_require_literal_true() {
        let mut form = ProductForm::default();
        form.fields.insert("isFeatured".into(), "true".into());
        form.fields.insert("isTrending".into(), "1".into());
        assert!(form.flag("isFeatured"));
        assert!(!form.flag("isTrending"));
        assert!(!form.flag("isMustTry"));
    }
}
