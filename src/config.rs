/// Configuration management for the TMS server
use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

/// Minimum length for the JWT signing secrets
const MIN_TOKEN_SECRET_LEN: usize = 32;
/// Signed cookies need at least 64 bytes of key material
const MIN_COOKIE_SECRET_LEN: usize = 64;
/// Upper bound for cache TTL and sweep interval (30 days)
const MAX_CACHE_SECS: u64 = 60 * 60 * 24 * 30;

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub authentication: AuthConfig,
    pub cache: CacheConfig,
    pub email: Option<EmailConfig>,
    pub logging: LoggingConfig,
}

/// Deployment environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

impl FromStr for Environment {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "development" => Ok(Environment::Development),
            "production" => Ok(Environment::Production),
            other => Err(AppError::Config(format!(
                "TMS_ENV must be 'development' or 'production', got '{}'",
                other
            ))),
        }
    }
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub hostname: String,
    pub port: u16,
    pub environment: Environment,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub database_url: String,
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub access_token_secret: String,
    pub refresh_token_secret: String,
    pub cookie_secret: String,
    /// Admin account created at startup if missing
    pub superadmin: Option<SuperAdminConfig>,
}

/// Bootstrap admin credentials
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuperAdminConfig {
    pub email: String,
    pub password: String,
}

/// In-process cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Default TTL for cache entries in seconds
    pub default_ttl: u64,
    /// How often expired entries are swept, in seconds
    pub sweep_interval: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: 600,
            sweep_interval: 60,
        }
    }
}

/// Email configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    pub smtp_url: String,
    pub from_address: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

fn required(name: &str) -> AppResult<String> {
    env::var(name).map_err(|_| AppError::Config(format!("{} is required", name)))
}

fn parsed<T: FromStr>(name: &str, default: T) -> AppResult<T> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::Config(format!("{} has an invalid value: {}", name, raw))),
        Err(_) => Ok(default),
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> AppResult<Self> {
        dotenv::dotenv().ok();

        let environment: Environment = required("TMS_ENV")?.parse()?;
        let hostname = env::var("TMS_HOSTNAME").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = parsed("TMS_PORT", 4000u16)?;

        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://./data/tms.sqlite".to_string());

        let access_token_secret = required("ACCESS_TOKEN_SECRET")?;
        let refresh_token_secret = required("REFRESH_TOKEN_SECRET")?;
        let cookie_secret = required("COOKIE_SECRET")?;

        let superadmin = match (env::var("SUPERADMIN_EMAIL"), env::var("SUPERADMIN_PASSWORD")) {
            (Ok(email), Ok(password)) => Some(SuperAdminConfig { email, password }),
            (Err(_), Err(_)) => None,
            _ => {
                return Err(AppError::Config(
                    "SUPERADMIN_EMAIL and SUPERADMIN_PASSWORD must be set together".to_string(),
                ))
            }
        };

        let cache = CacheConfig {
            default_ttl: parsed("CACHE_TTL_SECS", 600u64)?,
            sweep_interval: parsed("CACHE_SWEEP_INTERVAL_SECS", 60u64)?,
        };

        let email = if let Ok(smtp_url) = env::var("SMTP_URL") {
            Some(EmailConfig {
                smtp_url,
                from_address: env::var("EMAIL_FROM_ADDRESS")
                    .unwrap_or_else(|_| format!("noreply@{}", hostname)),
            })
        } else {
            None
        };

        let log_level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Ok(ServerConfig {
            service: ServiceConfig {
                hostname,
                port,
                environment,
            },
            storage: StorageConfig { database_url },
            authentication: AuthConfig {
                access_token_secret,
                refresh_token_secret,
                cookie_secret,
                superadmin,
            },
            cache,
            email,
            logging: LoggingConfig { level: log_level },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> AppResult<()> {
        if self.service.hostname.is_empty() {
            return Err(AppError::Config("Hostname cannot be empty".to_string()));
        }

        let auth = &self.authentication;
        if auth.access_token_secret.len() < MIN_TOKEN_SECRET_LEN
            || auth.refresh_token_secret.len() < MIN_TOKEN_SECRET_LEN
        {
            return Err(AppError::Config(format!(
                "Token secrets must be at least {} characters",
                MIN_TOKEN_SECRET_LEN
            )));
        }

        if auth.access_token_secret == auth.refresh_token_secret {
            return Err(AppError::Config(
                "Access and refresh token secrets must differ".to_string(),
            ));
        }

        if auth.cookie_secret.len() < MIN_COOKIE_SECRET_LEN {
            return Err(AppError::Config(format!(
                "COOKIE_SECRET must be at least {} characters",
                MIN_COOKIE_SECRET_LEN
            )));
        }

        if let Some(superadmin) = &auth.superadmin {
            if superadmin.email.is_empty() || superadmin.password.is_empty() {
                return Err(AppError::Config(
                    "Superadmin email and password cannot be empty".to_string(),
                ));
            }
        }

        if self.cache.default_ttl == 0 || self.cache.default_ttl > MAX_CACHE_SECS {
            return Err(AppError::Config(format!(
                "CACHE_TTL_SECS must be between 1 and {}",
                MAX_CACHE_SECS
            )));
        }

        if self.cache.sweep_interval == 0 || self.cache.sweep_interval > MAX_CACHE_SECS {
            return Err(AppError::Config(format!(
                "CACHE_SWEEP_INTERVAL_SECS must be between 1 and {}",
                MAX_CACHE_SECS
            )));
        }

        Ok(())
    }

    /// Configuration for tests: in-memory database, development mode, fixed secrets
    pub fn for_tests() -> Self {
        ServerConfig {
            service: ServiceConfig {
                hostname: "127.0.0.1".to_string(),
                port: 0,
                environment: Environment::Development,
            },
            storage: StorageConfig {
                database_url: "sqlite::memory:".to_string(),
            },
            authentication: AuthConfig {
                access_token_secret: "access-secret-for-tests-only-0123456789".to_string(),
                refresh_token_secret: "refresh-secret-for-tests-only-0123456789".to_string(),
                cookie_secret: "cookie-secret-for-tests-only-0123456789-0123456789-0123456789-abcdef"
                    .to_string(),
                superadmin: None,
            },
            cache: CacheConfig::default(),
            email: None,
            logging: LoggingConfig {
                level: "debug".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_test_config_is_valid() {
        assert!(ServerConfig::for_tests().validate().is_ok());
    }

    #[test]
    fn test_short_secret_rejected() {
        let mut config = ServerConfig::for_tests();
        config.authentication.access_token_secret = "short".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_identical_secrets_rejected() {
        let mut config = ServerConfig::for_tests();
        config.authentication.refresh_token_secret =
            config.authentication.access_token_secret.clone();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_short_cookie_secret_rejected() {
        let mut config = ServerConfig::for_tests();
        config.authentication.cookie_secret = "x".repeat(63);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_cache_durations_bounded() {
        let mut config = ServerConfig::for_tests();
        config.cache.default_ttl = u64::MAX;
        assert!(config.validate().is_err());

        let mut config = ServerConfig::for_tests();
        config.cache.sweep_interval = MAX_CACHE_SECS + 1;
        assert!(config.validate().is_err());

        let mut config = ServerConfig::for_tests();
        config.cache.default_ttl = MAX_CACHE_SECS;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_environment_parse() {
        assert_eq!(
            "production".parse::<Environment>().unwrap(),
            Environment::Production
        );
        assert_eq!(
            " Development ".parse::<Environment>().unwrap(),
            Environment::Development
        );
        assert!("staging".parse::<Environment>().is_err());
    }
}
