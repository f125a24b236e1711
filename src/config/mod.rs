use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

/// Secret used when nothing is configured. Refused in production.
pub const DEVELOPMENT_JWT_SECRET: &str = "supersecret";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub filter: FilterConfig,
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
    pub auth: AuthConfig,
    pub notifier: NotifierConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Testing,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    pub max_limit: Option<i32>,
    pub debug_logging: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
    pub enable_query_logging: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub port: u16,
    pub enable_request_logging: bool,
    pub max_request_size_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub jwt_secret: String,
    pub jwt_expiry_days: i64,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Lifetime of an email verification token.
    pub email_token_ttl_secs: i64,
    /// Accept any token value during email verification. Only honoured
    /// outside production; expiry is still enforced.
    pub verification_bypass: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifierConfig {
    pub root_url: String,
    pub webhook_url: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("JWT_SECRET must be set to a non-default value in production")]
    InsecureJwtSecret,
    #[error("AUTH_VERIFICATION_BYPASS cannot be enabled in production")]
    BypassInProduction,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("testing") | Ok("test") => Environment::Testing,
            _ => Environment::Development,
        };

        match environment {
            Environment::Production => Self::production(),
            Environment::Testing => Self::testing(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Filter overrides
        if let Ok(v) = env::var("FILTER_MAX_LIMIT") {
            self.filter.max_limit = v.parse().ok();
        }
        if let Ok(v) = env::var("FILTER_DEBUG_LOGGING") {
            self.filter.debug_logging = v.parse().unwrap_or(self.filter.debug_logging);
        }

        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = Some(v);
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }
        if let Ok(v) = env::var("DATABASE_ENABLE_QUERY_LOGGING") {
            self.database.enable_query_logging = v.parse().unwrap_or(self.database.enable_query_logging);
        }

        // API overrides
        if let Some(port) = env::var("API_PORT")
            .ok()
            .or_else(|| env::var("PORT").ok())
            .and_then(|s| s.parse::<u16>().ok())
        {
            self.api.port = port;
        }
        if let Ok(v) = env::var("API_ENABLE_REQUEST_LOGGING") {
            self.api.enable_request_logging = v.parse().unwrap_or(self.api.enable_request_logging);
        }
        if let Ok(v) = env::var("API_MAX_REQUEST_SIZE_BYTES") {
            self.api.max_request_size_bytes = v.parse().unwrap_or(self.api.max_request_size_bytes);
        }

        // Security overrides
        if let Ok(v) = env::var("JWT_SECRET") {
            if !v.is_empty() {
                self.security.jwt_secret = v;
            }
        }
        if let Ok(v) = env::var("JWT_MAX_AGE_DAYS") {
            self.security.jwt_expiry_days = v.parse().unwrap_or(self.security.jwt_expiry_days);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }

        // Auth overrides
        if let Ok(v) = env::var("EMAIL_TOKEN_AGE") {
            self.auth.email_token_ttl_secs = v.parse().unwrap_or(self.auth.email_token_ttl_secs);
        }
        if let Ok(v) = env::var("AUTH_VERIFICATION_BYPASS") {
            self.auth.verification_bypass = v.parse().unwrap_or(false);
        }

        // Notifier overrides
        if let Ok(v) = env::var("ROOT_URL") {
            self.notifier.root_url = v;
        }
        if let Ok(v) = env::var("EMAIL_WEBHOOK_URL") {
            self.notifier.webhook_url = Some(v).filter(|s| !s.is_empty());
        }

        self
    }

    /// Reject settings that must never reach a production deployment.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.environment == Environment::Production {
            if self.security.jwt_secret == DEVELOPMENT_JWT_SECRET {
                return Err(ConfigError::InsecureJwtSecret);
            }
            if self.auth.verification_bypass {
                return Err(ConfigError::BypassInProduction);
            }
        }
        Ok(())
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            filter: FilterConfig {
                max_limit: Some(1000),
                debug_logging: true,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 10,
                connection_timeout: 30,
                enable_query_logging: true,
            },
            api: ApiConfig {
                port: 3000,
                enable_request_logging: true,
                max_request_size_bytes: 10 * 1024 * 1024, // 10MB
            },
            security: SecurityConfig {
                jwt_secret: DEVELOPMENT_JWT_SECRET.to_string(),
                jwt_expiry_days: 30,
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()],
            },
            auth: AuthConfig {
                email_token_ttl_secs: 6 * 60 * 60,
                verification_bypass: false,
            },
            notifier: NotifierConfig {
                root_url: "http://localhost:3000".to_string(),
                webhook_url: None,
            },
        }
    }

    pub fn testing() -> Self {
        Self {
            environment: Environment::Testing,
            filter: FilterConfig {
                max_limit: Some(1000),
                debug_logging: false,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 2,
                connection_timeout: 5,
                enable_query_logging: false,
            },
            api: ApiConfig {
                port: 0,
                enable_request_logging: false,
                max_request_size_bytes: 1024 * 1024,
            },
            security: SecurityConfig {
                jwt_secret: "testing-secret".to_string(),
                jwt_expiry_days: 1,
                cors_origins: vec![],
            },
            auth: AuthConfig {
                email_token_ttl_secs: 6 * 60 * 60,
                verification_bypass: false,
            },
            notifier: NotifierConfig {
                root_url: "http://localhost".to_string(),
                webhook_url: None,
            },
        }
    }

    pub fn production() -> Self {
        Self {
            environment: Environment::Production,
            filter: FilterConfig {
                max_limit: Some(100),
                debug_logging: false,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 50,
                connection_timeout: 5,
                enable_query_logging: false,
            },
            api: ApiConfig {
                port: 3000,
                enable_request_logging: false,
                max_request_size_bytes: 2 * 1024 * 1024, // 2MB
            },
            security: SecurityConfig {
                jwt_secret: DEVELOPMENT_JWT_SECRET.to_string(),
                jwt_expiry_days: 30,
                cors_origins: vec![],
            },
            auth: AuthConfig {
                email_token_ttl_secs: 6 * 60 * 60,
                verification_bypass: false,
            },
            notifier: NotifierConfig {
                root_url: "https://app.example.com".to_string(),
                webhook_url: None,
            },
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
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
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.security.jwt_expiry_days, 30);
        assert_eq!(config.auth.email_token_ttl_secs, 21_600);
        assert!(!config.auth.verification_bypass);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_production_rejects_default_secret() {
        let config = AppConfig::production();
        assert!(matches!(config.validate(), Err(ConfigError::InsecureJwtSecret)));
    }

    #[test]
    fn test_production_rejects_verification_bypass() {
        let mut config = AppConfig::production();
        config.security.jwt_secret = "a-real-secret".to_string();
        assert!(config.validate().is_ok());
        config.auth.verification_bypass = true;
        assert!(matches!(config.validate(), Err(ConfigError::BypassInProduction)));
    }
}
