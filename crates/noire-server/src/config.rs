use noire_types::{AppConfig, AppError, FeatureFlags};
use std::sync::{Arc, OnceLock};

use crate::auth::AuthSettings;

static CONFIG: OnceLock<AppConfig> = OnceLock::new();

/// Path to the config file, relative to the working directory.
/// Overridable with `NOIRE_CONFIG`.
const CONFIG_PATH: &str = "config.toml";

/// Parse a config file body. Unparseable input falls back to defaults.
pub fn parse_config(contents: &str) -> AppConfig {
    toml::from_str(contents).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to parse config file, using defaults");
        AppConfig::default()
    })
}

/// Read `config.toml` and store it in the global `OnceLock`. Safe to call
/// multiple times; only the first call has effect.
///
/// If the file is missing or unparseable, every setting takes its default.
pub fn load_config() -> &'static AppConfig {
    CONFIG.get_or_init(|| {
        let path = std::env::var("NOIRE_CONFIG").unwrap_or_else(|_| CONFIG_PATH.to_string());
        match std::fs::read_to_string(&path) {
            Ok(contents) => {
                let config = parse_config(&contents);
                tracing::info!(
                    path = %path,
                    features = ?config.features,
                    workflow = ?config.workflow,
                    "configuration loaded"
                );
                config
            }
            Err(e) => {
                tracing::warn!(path = %path, error = %e, "config file not found, using defaults");
                AppConfig::default()
            }
        }
    })
}

/// Get the loaded feature flags. Returns all-false defaults if
/// `load_config()` hasn't been called yet.
pub fn feature_flags() -> &'static FeatureFlags {
    static DEFAULT: FeatureFlags = FeatureFlags { telemetry: false };
    CONFIG.get().map(|c| &c.features).unwrap_or(&DEFAULT)
}

/// Process settings read from the environment.
#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub database_max_connections: u32,
    pub bind_addr: String,
    pub max_body_bytes: usize,
    pub auth: AuthSettings,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Settings {
    /// Read settings from the environment (after `.env` has been loaded).
    /// `JWT_SECRET` is the only required variable.
    pub fn from_env() -> Result<Self, AppError> {
        let jwt_secret = std::env::var("JWT_SECRET")
            .ok()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AppError::internal("JWT_SECRET must be set"))?;

        Ok(Self {
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://noire.db?mode=rwc".to_string()),
            database_max_connections: env_or("DATABASE_MAX_CONNECTIONS", 10),
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            max_body_bytes: env_or("MAX_BODY_BYTES", 2 * 1024 * 1024),
            auth: AuthSettings {
                jwt_secret: Arc::from(jwt_secret),
                access_token_minutes: env_or("JWT_ACCESS_TOKEN_EXPIRY_MINUTES", 60),
                admin_email: std::env::var("ADMIN_EMAIL").ok().filter(|s| !s.is_empty()),
            },
        })
    }
}
