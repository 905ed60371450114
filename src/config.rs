use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info};
use validator::Validate;

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";
const DEFAULT_STRIPE_API_BASE: &str = "https://api.stripe.com";
const DEFAULT_SUCCESS_PATH: &str = "/purchase/success?session_id={CHECKOUT_SESSION_ID}";
const DEFAULT_CANCEL_PATH: &str = "/templates";
const DEFAULT_ASSETS_DIR: &str = "files";

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Database connection URL
    pub database_url: String,

    /// Server host address
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Application environment
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Public origin of the storefront, used to build success/cancel
    /// callback URLs and absolute download URLs (e.g. "https://lexcart.dev")
    #[validate(url)]
    pub public_origin: String,

    /// Path (relative to public_origin) the provider redirects to on
    /// success; must contain the provider's session-id placeholder
    #[serde(default = "default_success_path")]
    pub checkout_success_path: String,

    /// Path the provider redirects to when the buyer cancels
    #[serde(default = "default_cancel_path")]
    pub checkout_cancel_path: String,

    /// Directory served under /files for downloadable template assets
    #[serde(default = "default_assets_dir")]
    pub assets_dir: String,

    /// Payment provider secret key
    #[validate(length(min = 1))]
    pub stripe_secret_key: String,

    /// Payment provider API base URL (overridden in tests)
    #[serde(default = "default_stripe_api_base")]
    pub stripe_api_base: String,

    /// Webhook signing secret; webhook endpoint rejects unsigned payloads
    /// when set
    #[serde(default)]
    pub stripe_webhook_secret: Option<String>,

    /// Webhook timestamp tolerance (seconds)
    #[serde(default)]
    pub stripe_webhook_tolerance_secs: Option<u64>,

    /// Allow-listed consultation price references, comma-separated.
    /// The consultation checkout path rejects anything not in this list.
    #[serde(default)]
    pub consultation_price_ids: Option<String>,

    /// Whether to run database migrations on startup
    #[serde(default)]
    pub auto_migrate: bool,

    /// CORS: comma-separated list of allowed origins (production)
    #[serde(default)]
    pub cors_allowed_origins: Option<String>,

    /// Allow permissive CORS fallback
    #[serde(default)]
    pub cors_allow_any_origin: bool,

    /// CORS: allow credentials
    #[serde(default)]
    pub cors_allow_credentials: bool,

    /// DB pool: max connections
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,

    /// DB pool: min connections
    #[serde(default = "default_db_min_connections")]
    pub db_min_connections: u32,

    /// DB timeouts (seconds)
    #[serde(default = "default_db_connect_timeout_secs")]
    pub db_connect_timeout_secs: u64,
    #[serde(default = "default_db_idle_timeout_secs")]
    pub db_idle_timeout_secs: u64,
    #[serde(default = "default_db_acquire_timeout_secs")]
    pub db_acquire_timeout_secs: u64,

    /// Outbound payment-provider HTTP timeouts (seconds)
    #[serde(default = "default_provider_connect_timeout_secs")]
    pub provider_connect_timeout_secs: u64,
    #[serde(default = "default_provider_request_timeout_secs")]
    pub provider_request_timeout_secs: u64,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}
fn default_stripe_api_base() -> String {
    DEFAULT_STRIPE_API_BASE.to_string()
}
fn default_success_path() -> String {
    DEFAULT_SUCCESS_PATH.to_string()
}
fn default_cancel_path() -> String {
    DEFAULT_CANCEL_PATH.to_string()
}
fn default_assets_dir() -> String {
    DEFAULT_ASSETS_DIR.to_string()
}
fn default_db_max_connections() -> u32 {
    10
}
fn default_db_min_connections() -> u32 {
    1
}
fn default_db_connect_timeout_secs() -> u64 {
    30
}
fn default_db_idle_timeout_secs() -> u64 {
    600
}
fn default_db_acquire_timeout_secs() -> u64 {
    8
}
fn default_provider_connect_timeout_secs() -> u64 {
    5
}
fn default_provider_request_timeout_secs() -> u64 {
    15
}

impl AppConfig {
    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
            || self.environment.eq_ignore_ascii_case("dev")
    }

    pub fn should_allow_permissive_cors(&self) -> bool {
        self.is_development() || self.cors_allow_any_origin
    }

    /// Parsed consultation price allow-list. Empty means the consultation
    /// checkout path is disabled.
    pub fn consultation_price_allowlist(&self) -> Vec<String> {
        self.consultation_price_ids
            .as_deref()
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Success callback URL with the provider's session-id placeholder.
    pub fn checkout_success_url(&self) -> String {
        format!(
            "{}{}",
            self.public_origin.trim_end_matches('/'),
            self.checkout_success_path
        )
    }

    pub fn checkout_cancel_url(&self) -> String {
        format!(
            "{}{}",
            self.public_origin.trim_end_matches('/'),
            self.checkout_cancel_path
        )
    }
}

#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("configuration load error: {0}")]
    Load(#[from] ConfigError),
    #[error("configuration validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Initialize the tracing subscriber (plain or JSON) honoring RUST_LOG.
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::fmt;

    let default_directive = format!("lexcart_api={},tower_http=debug", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    if json {
        let _ = fmt().with_env_filter(filter_directive).json().try_init();
    } else {
        let _ = fmt().with_env_filter(filter_directive).try_init();
    }
}

/// Load configuration from config/{default,<env>}.toml plus APP__ env
/// variable overrides.
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("Loading configuration for environment: {}", run_env);

    if !Path::new(CONFIG_DIR).exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            CONFIG_DIR
        );
    }

    let builder = Config::builder()
        .set_default("database_url", "sqlite://lexcart.db?mode=rwc")?
        .set_default("host", "0.0.0.0")?
        .set_default("port", DEFAULT_PORT as i64)?
        .set_default("environment", DEFAULT_ENV)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .set_default("public_origin", "http://localhost:3000")?
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, run_env)).required(false));

    let config = builder
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    // Check for the provider key before deserialization to give a clear error.
    if config.get_string("stripe_secret_key").is_err() {
        error!("Payment provider key is not configured. Set APP__STRIPE_SECRET_KEY.");
        return Err(AppConfigError::Load(ConfigError::NotFound(
            "stripe_secret_key is required but not configured. Set APP__STRIPE_SECRET_KEY."
                .into(),
        )));
    }

    let app_config: AppConfig = config.try_deserialize()?;
    app_config.validate()?;
    Ok(app_config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_config() -> AppConfig {
        AppConfig {
            database_url: "sqlite::memory:".into(),
            host: "127.0.0.1".into(),
            port: 8080,
            environment: "test".into(),
            log_level: "debug".into(),
            log_json: false,
            public_origin: "https://lexcart.dev".into(),
            checkout_success_path: default_success_path(),
            checkout_cancel_path: default_cancel_path(),
            assets_dir: default_assets_dir(),
            stripe_secret_key: "sk_test_123".into(),
            stripe_api_base: default_stripe_api_base(),
            stripe_webhook_secret: None,
            stripe_webhook_tolerance_secs: None,
            consultation_price_ids: Some("price_consult_30, price_consult_60,,".into()),
            auto_migrate: false,
            cors_allowed_origins: None,
            cors_allow_any_origin: false,
            cors_allow_credentials: false,
            db_max_connections: 10,
            db_min_connections: 1,
            db_connect_timeout_secs: 30,
            db_idle_timeout_secs: 600,
            db_acquire_timeout_secs: 8,
            provider_connect_timeout_secs: 5,
            provider_request_timeout_secs: 15,
        }
    }

    #[test]
    fn allowlist_parsing_trims_and_drops_empties() {
        let cfg = sample_config();
        assert_eq!(
            cfg.consultation_price_allowlist(),
            vec!["price_consult_30".to_string(), "price_consult_60".to_string()]
        );
    }

    #[test]
    fn success_url_keeps_session_placeholder() {
        let cfg = sample_config();
        let url = cfg.checkout_success_url();
        assert!(url.starts_with("https://lexcart.dev/purchase/success"));
        assert!(url.contains("{CHECKOUT_SESSION_ID}"));
    }

    #[test]
    fn missing_allowlist_means_empty() {
        let mut cfg = sample_config();
        cfg.consultation_price_ids = None;
        assert!(cfg.consultation_price_allowlist().is_empty());
    }
}
