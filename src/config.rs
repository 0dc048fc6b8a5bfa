use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::error;
use validator::{Validate, ValidationError, ValidationErrors};

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENVIRONMENT: &str = "development";
const DEFAULT_SESSION_TTL_SECS: u64 = 86_400;
const DEFAULT_RESET_TOKEN_TTL_SECS: u64 = 3_600;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_DB_MIN_CONNECTIONS: u32 = 1;
const DEFAULT_DB_CONNECT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_DB_ACQUIRE_TIMEOUT_SECS: u64 = 10;
const DEFAULT_DB_IDLE_TIMEOUT_SECS: u64 = 300;
const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 1024;
const DEFAULT_APP_BASE_URL: &str = "http://localhost:3000";
const DEFAULT_MAIL_API_URL: &str = "https://api.resend.com/emails";
const DEFAULT_MAIL_FROM: &str = "noreply@yourdomain.com";
const DEFAULT_AUTH_ISSUER: &str = "storefront-account-api";
const DEFAULT_AUTH_AUDIENCE: &str = "storefront";

const CONFIG_DIR: &str = "config";

/// Session secrets must not look like obvious placeholders.
fn validate_session_secret(secret: &str) -> Result<(), ValidationError> {
    let lowered = secret.to_lowercase();
    for needle in ["changeme", "placeholder", "secret", "password", "example"] {
        if lowered.contains(needle) {
            return Err(ValidationError::new("session_secret_placeholder"));
        }
    }
    Ok(())
}

#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Database connection string (postgres:// or sqlite://)
    #[validate(length(min = 1))]
    pub database_url: String,

    /// HMAC secret used to verify session tokens. Minimum 256 bits of entropy
    /// expressed as at least 64 characters.
    #[validate(length(min = 64), custom = "validate_session_secret")]
    pub session_secret: String,

    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,

    /// Lifetime of password-reset tokens in seconds.
    #[serde(default = "default_reset_token_ttl_secs")]
    pub reset_token_ttl_secs: u64,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_environment")]
    pub environment: String,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub log_json: bool,

    /// Run pending migrations on startup.
    #[serde(default)]
    pub auto_migrate: bool,

    /// Comma-separated list of allowed CORS origins. Unset in development
    /// falls back to a permissive policy; unset in production is an error.
    #[serde(default)]
    pub cors_allowed_origins: Option<String>,

    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,

    #[serde(default = "default_db_min_connections")]
    pub db_min_connections: u32,

    #[serde(default = "default_db_connect_timeout_secs")]
    pub db_connect_timeout_secs: u64,

    #[serde(default = "default_db_acquire_timeout_secs")]
    pub db_acquire_timeout_secs: u64,

    #[serde(default = "default_db_idle_timeout_secs")]
    pub db_idle_timeout_secs: u64,

    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,

    /// Public base URL of the storefront; used to build password-reset links.
    #[serde(default = "default_app_base_url")]
    #[validate(url)]
    pub app_base_url: String,

    /// Transactional mail provider endpoint.
    #[serde(default = "default_mail_api_url")]
    #[validate(url)]
    pub mail_api_url: String,

    /// Mail provider API key. When unset, outbound mail is logged instead of sent.
    #[serde(default)]
    pub mail_api_key: Option<String>,

    #[serde(default = "default_mail_from")]
    pub mail_from: String,

    #[serde(default = "default_auth_issuer")]
    pub auth_issuer: String,

    #[serde(default = "default_auth_audience")]
    pub auth_audience: String,
}

fn default_session_ttl_secs() -> u64 {
    DEFAULT_SESSION_TTL_SECS
}

fn default_reset_token_ttl_secs() -> u64 {
    DEFAULT_RESET_TOKEN_TTL_SECS
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_environment() -> String {
    DEFAULT_ENVIRONMENT.to_string()
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_db_max_connections() -> u32 {
    DEFAULT_DB_MAX_CONNECTIONS
}

fn default_db_min_connections() -> u32 {
    DEFAULT_DB_MIN_CONNECTIONS
}

fn default_db_connect_timeout_secs() -> u64 {
    DEFAULT_DB_CONNECT_TIMEOUT_SECS
}

fn default_db_acquire_timeout_secs() -> u64 {
    DEFAULT_DB_ACQUIRE_TIMEOUT_SECS
}

fn default_db_idle_timeout_secs() -> u64 {
    DEFAULT_DB_IDLE_TIMEOUT_SECS
}

fn default_event_channel_capacity() -> usize {
    DEFAULT_EVENT_CHANNEL_CAPACITY
}

fn default_app_base_url() -> String {
    DEFAULT_APP_BASE_URL.to_string()
}

fn default_mail_api_url() -> String {
    DEFAULT_MAIL_API_URL.to_string()
}

fn default_mail_from() -> String {
    DEFAULT_MAIL_FROM.to_string()
}

fn default_auth_issuer() -> String {
    DEFAULT_AUTH_ISSUER.to_string()
}

fn default_auth_audience() -> String {
    DEFAULT_AUTH_AUDIENCE.to_string()
}

impl AppConfig {
    /// Direct constructor used by tests; production code goes through [`load_config`].
    pub fn new(database_url: String, session_secret: String, environment: String) -> Self {
        Self {
            database_url,
            session_secret,
            session_ttl_secs: default_session_ttl_secs(),
            reset_token_ttl_secs: default_reset_token_ttl_secs(),
            host: default_host(),
            port: default_port(),
            environment,
            log_level: default_log_level(),
            log_json: false,
            auto_migrate: false,
            cors_allowed_origins: None,
            db_max_connections: default_db_max_connections(),
            db_min_connections: default_db_min_connections(),
            db_connect_timeout_secs: default_db_connect_timeout_secs(),
            db_acquire_timeout_secs: default_db_acquire_timeout_secs(),
            db_idle_timeout_secs: default_db_idle_timeout_secs(),
            event_channel_capacity: default_event_channel_capacity(),
            app_base_url: default_app_base_url(),
            mail_api_url: default_mail_api_url(),
            mail_api_key: None,
            mail_from: default_mail_from(),
            auth_issuer: default_auth_issuer(),
            auth_audience: default_auth_audience(),
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }

    /// CORS origins as a list; `None` when unset.
    pub fn configured_origins(&self) -> Option<Vec<String>> {
        self.cors_allowed_origins.as_ref().map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(str::to_string)
                .collect()
        })
    }

    /// Constraints that cut across fields and can't be expressed as
    /// field-level validators.
    pub fn validate_additional_constraints(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if self.is_production() && self.cors_allowed_origins.is_none() {
            errors.add(
                "cors_allowed_origins",
                ValidationError::new("cors_origins_required_in_production"),
            );
        }

        if self.db_min_connections > self.db_max_connections {
            errors.add(
                "db_min_connections",
                ValidationError::new("db_min_connections_exceeds_max"),
            );
        }

        if self.reset_token_ttl_secs == 0 {
            errors.add(
                "reset_token_ttl_secs",
                ValidationError::new("reset_token_ttl_zero"),
            );
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] ConfigError),

    #[error("configuration validation failed: {0}")]
    Validation(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Initializes the global tracing subscriber.
/// `RUST_LOG` takes precedence over the configured level.
pub fn init_tracing(level: &str, json: bool) {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        format!("storefront_account_api={level},tower_http=debug")
    });

    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let result = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    if let Err(e) = result {
        eprintln!("tracing subscriber already initialized: {e}");
    }
}

/// Loads configuration from `config/default.toml` (optional), an
/// environment-specific file, and `APP__`-prefixed environment variables.
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    let environment =
        std::env::var("APP__ENVIRONMENT").unwrap_or_else(|_| DEFAULT_ENVIRONMENT.to_string());

    let config = Config::builder()
        .set_default("environment", environment.clone())?
        .add_source(File::with_name(&format!("{CONFIG_DIR}/default")).required(false))
        .add_source(File::with_name(&format!("{CONFIG_DIR}/{environment}")).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    let app_config: AppConfig = config.try_deserialize()?;

    if app_config.session_secret.is_empty() {
        error!("session_secret is not configured; set APP__SESSION_SECRET");
        return Err(AppConfigError::Validation(
            "session_secret must be configured".to_string(),
        ));
    }

    app_config
        .validate()
        .map_err(|e| AppConfigError::Validation(e.to_string()))?;
    app_config
        .validate_additional_constraints()
        .map_err(|e| AppConfigError::Validation(e.to_string()))?;

    Ok(app_config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> AppConfig {
        AppConfig::new(
            "sqlite::memory:".to_string(),
            "a".repeat(64),
            "development".to_string(),
        )
    }

    #[test]
    fn valid_config_passes_validation() {
        let cfg = test_config();
        assert!(cfg.validate().is_ok());
        assert!(cfg.validate_additional_constraints().is_ok());
    }

    #[test]
    fn short_session_secret_is_rejected() {
        let mut cfg = test_config();
        cfg.session_secret = "tooshort".to_string();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn placeholder_session_secret_is_rejected() {
        let mut cfg = test_config();
        cfg.session_secret = format!("changeme{}", "a".repeat(64));
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn production_requires_cors_origins() {
        let mut cfg = test_config();
        cfg.environment = "production".to_string();
        assert!(cfg.validate_additional_constraints().is_err());

        cfg.cors_allowed_origins = Some("https://shop.example.com".to_string());
        assert!(cfg.validate_additional_constraints().is_ok());
    }

    #[test]
    fn configured_origins_splits_and_trims() {
        let mut cfg = test_config();
        cfg.cors_allowed_origins =
            Some("https://a.example.com, https://b.example.com ,".to_string());
        let origins = cfg.configured_origins().unwrap();
        assert_eq!(
            origins,
            vec!["https://a.example.com", "https://b.example.com"]
        );
    }

    #[test]
    fn min_connections_must_not_exceed_max() {
        let mut cfg = test_config();
        cfg.db_min_connections = 20;
        cfg.db_max_connections = 5;
        assert!(cfg.validate_additional_constraints().is_err());
    }
}
