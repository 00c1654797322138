use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
    pub uploads: UploadConfig,
    pub catalog: CatalogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub max_json_body_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub max_connections: u32,
    pub connection_timeout: u64,
    pub migrate_on_startup: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    #[serde(skip_serializing)]
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
    pub bcrypt_cost: u32,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    pub root_dir: PathBuf,
    pub max_file_bytes: usize,
    pub max_files: usize,
    pub thumbnail_size: u32,
    pub medium_size: u32,
}

impl UploadConfig {
    /// Multipart bodies carry every file plus the text fields of the product form.
    pub fn max_body_bytes(&self) -> usize {
        self.max_file_bytes * self.max_files + 1024 * 1024
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    pub default_page_size: i64,
    pub min_page_size: i64,
    pub max_page_size: i64,
    pub featured_limit: i64,
    pub order_page_size: i64,
    pub low_stock_threshold: i32,
    pub low_stock_limit: i64,
    pub recent_orders_limit: i64,
}

const DEVELOPMENT_JWT_SECRET: &str = "daliyuan_secret_key";

fn default_cors_origins() -> Vec<String> {
    [
        "https://daliyuan.com.vn",
        "https://www.daliyuan.com.vn",
        "http://localhost:3000",
        "http://localhost:5173",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Server overrides
        if let Ok(v) = env::var("PORT") {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }
        if let Ok(v) = env::var("SERVER_MAX_JSON_BODY_BYTES") {
            self.server.max_json_body_bytes = v.parse().unwrap_or(self.server.max_json_body_bytes);
        }

        // Database overrides
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }
        if let Ok(v) = env::var("DATABASE_MIGRATE_ON_STARTUP") {
            self.database.migrate_on_startup = v.parse().unwrap_or(self.database.migrate_on_startup);
        }

        // Security overrides
        if let Ok(v) = env::var("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("SECURITY_JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours = v.parse().unwrap_or(self.security.jwt_expiry_hours);
        }
        if let Ok(v) = env::var("SECURITY_BCRYPT_COST") {
            self.security.bcrypt_cost = v.parse().unwrap_or(self.security.bcrypt_cost);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }

        // Upload overrides
        if let Ok(v) = env::var("UPLOADS_DIR") {
            self.uploads.root_dir = PathBuf::from(v);
        }
        if let Ok(v) = env::var("UPLOADS_MAX_FILE_BYTES") {
            self.uploads.max_file_bytes = v.parse().unwrap_or(self.uploads.max_file_bytes);
        }
        if let Ok(v) = env::var("UPLOADS_MAX_FILES") {
            self.uploads.max_files = v.parse().unwrap_or(self.uploads.max_files);
        }

        // Catalog overrides
        if let Ok(v) = env::var("CATALOG_LOW_STOCK_THRESHOLD") {
            self.catalog.low_stock_threshold = v.parse().unwrap_or(self.catalog.low_stock_threshold);
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                port: 5000,
                max_json_body_bytes: 20 * 1024 * 1024, // 20MB
            },
            database: DatabaseConfig {
                max_connections: 10,
                connection_timeout: 5,
                migrate_on_startup: true,
            },
            security: SecurityConfig {
                jwt_secret: DEVELOPMENT_JWT_SECRET.to_string(),
                jwt_expiry_hours: 24 * 30, // 30 days
                bcrypt_cost: 10,
                cors_origins: default_cors_origins(),
            },
            uploads: UploadConfig::default(),
            catalog: CatalogConfig::default(),
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig {
                port: 5000,
                max_json_body_bytes: 20 * 1024 * 1024,
            },
            database: DatabaseConfig {
                max_connections: 20,
                connection_timeout: 10,
                migrate_on_startup: true,
            },
            security: SecurityConfig {
                jwt_secret: DEVELOPMENT_JWT_SECRET.to_string(),
                jwt_expiry_hours: 24 * 30,
                bcrypt_cost: 10,
                cors_origins: default_cors_origins(),
            },
            uploads: UploadConfig::default(),
            catalog: CatalogConfig::default(),
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig {
                port: 5000,
                max_json_body_bytes: 20 * 1024 * 1024,
            },
            database: DatabaseConfig {
                max_connections: 50,
                connection_timeout: 10,
                migrate_on_startup: false,
            },
            security: SecurityConfig {
                // Production must provide JWT_SECRET; an empty secret refuses to sign tokens
                jwt_secret: String::new(),
                jwt_expiry_hours: 24 * 30,
                bcrypt_cost: 12,
                cors_origins: vec![
                    "https://daliyuan.com.vn".to_string(),
                    "https://www.daliyuan.com.vn".to_string(),
                ],
            },
            uploads: UploadConfig::default(),
            catalog: CatalogConfig::default(),
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from("uploads"),
            max_file_bytes: 15 * 1024 * 1024, // 15MB
            max_files: 10,
            thumbnail_size: 150,
            medium_size: 600,
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            default_page_size: 10,
            min_page_size: 5,
            max_page_size: 100,
            featured_limit: 8,
            order_page_size: 10,
            low_stock_threshold: 10,
            low_stock_limit: 10,
            recent_orders_limit: 5,
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_development_config() {
        let config = AppConfig::development();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.security.jwt_secret, DEVELOPMENT_JWT_SECRET);
        assert_eq!(config.security.jwt_expiry_hours, 720);
        assert!(config.database.migrate_on_startup);
    }

    #[test]
    fn test_default_production_config() {
        let config = AppConfig::production();
        assert!(config.security.jwt_secret.is_empty());
        assert!(!config.database.migrate_on_startup);
        assert!(!config.security.cors_origins.iter().any(|o| o.contains("localhost")));
    }

    #[test]
    fn upload_body_limit_covers_all_files() {
        let uploads = UploadConfig::default();
        assert!(uploads.max_body_bytes() > uploads.max_file_bytes * uploads.max_files);
    }
}
