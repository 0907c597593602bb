use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
    pub labels: LabelConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub jwt_secret: String,
    pub access_token_expiry_mins: u64,
    pub refresh_token_expiry_hours: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelConfig {
    /// Maximum label title length in characters, measured after whitespace
    /// normalization. Deployments run this between 50 and 64.
    pub max_title_length: usize,
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
        // Database overrides
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }

        // Security overrides
        if let Ok(v) = env::var("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("SECURITY_ACCESS_TOKEN_EXPIRY_MINS") {
            self.security.access_token_expiry_mins =
                v.parse().unwrap_or(self.security.access_token_expiry_mins);
        }
        if let Ok(v) = env::var("SECURITY_REFRESH_TOKEN_EXPIRY_HOURS") {
            self.security.refresh_token_expiry_hours =
                v.parse().unwrap_or(self.security.refresh_token_expiry_hours);
        }

        // Label overrides
        if let Ok(v) = env::var("LABEL_MAX_TITLE_LENGTH") {
            self.labels.max_title_length = v.parse().unwrap_or(self.labels.max_title_length);
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            database: DatabaseConfig {
                max_connections: 10,
                connection_timeout: 30,
            },
            security: SecurityConfig {
                // Dev-only fallback; real deployments set JWT_SECRET
                jwt_secret: "dev-insecure-secret".to_string(),
                access_token_expiry_mins: 60,
                refresh_token_expiry_hours: 24 * 7, // 1 week
            },
            labels: LabelConfig { max_title_length: 64 },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            database: DatabaseConfig {
                max_connections: 20,
                connection_timeout: 10,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                access_token_expiry_mins: 30,
                refresh_token_expiry_hours: 24,
            },
            labels: LabelConfig { max_title_length: 64 },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            database: DatabaseConfig {
                max_connections: 50,
                connection_timeout: 5,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                access_token_expiry_mins: 15,
                refresh_token_expiry_hours: 12,
            },
            labels: LabelConfig { max_title_length: 50 },
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}
