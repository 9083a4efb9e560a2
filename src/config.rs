use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::{env, path::Path};
use thiserror::Error;
use tracing::{error, info, warn};
use validator::{Validate, ValidationError};

const CONFIG_DIR: &str = "config";
const DEFAULT_ENV: &str = "development";
const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Service configuration, layered from `config/*.toml` and `APP__*` variables.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    #[serde(default = "default_environment")]
    pub environment: String,

    #[serde(default)]
    #[validate]
    pub server: ServerSettings,

    #[serde(default)]
    #[validate]
    pub database: DatabaseSettings,

    #[serde(default)]
    #[validate]
    pub logging: LogSettings,

    /// Comma-separated `token:user_id:company name` entries for the
    /// in-memory session resolver
    #[serde(default)]
    #[validate(custom = "validate_session_tokens")]
    pub session_tokens: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(default, deny_unknown_fields)]
pub struct ServerSettings {
    #[validate(length(min = 1))]
    pub host: String,
    pub port: u16,
    /// Upper bound on ingested document size
    #[validate(range(min = 1024))]
    pub max_body_bytes: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            max_body_bytes: 2 * 1024 * 1024,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseSettings {
    #[validate(length(min = 1))]
    pub url: String,
    /// Create missing tables at startup
    pub auto_migrate: bool,
    #[validate(range(min = 1))]
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    pub acquire_timeout_secs: u64,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: "sqlite://ubl_invoices.db?mode=rwc".to_string(),
            auto_migrate: true,
            max_connections: 10,
            min_connections: 1,
            connect_timeout_secs: 30,
            idle_timeout_secs: 600,
            acquire_timeout_secs: 8,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(default, deny_unknown_fields)]
pub struct LogSettings {
    #[validate(custom = "validate_log_level")]
    pub level: String,
    /// Emit one JSON object per event
    pub json: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// One session entry seeded from configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSeed {
    pub token: String,
    pub user_id: String,
    pub company_name: String,
}

impl AppConfig {
    pub fn new(database_url: String, host: String, port: u16, environment: String) -> Self {
        Self {
            environment,
            server: ServerSettings {
                host,
                port,
                ..ServerSettings::default()
            },
            database: DatabaseSettings {
                url: database_url,
                ..DatabaseSettings::default()
            },
            logging: LogSettings::default(),
            session_tokens: None,
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    pub fn log_level(&self) -> &str {
        &self.logging.level
    }

    /// Well-formed session entries; malformed ones are rejected by `validate`.
    pub fn session_seeds(&self) -> Vec<SessionSeed> {
        self.session_tokens
            .as_deref()
            .map(parse_session_tokens)
            .unwrap_or_default()
            .into_iter()
            .filter_map(Result::ok)
            .collect()
    }
}

#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("could not read configuration: {0}")]
    Load(#[from] ConfigError),

    #[error("invalid configuration: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

fn default_environment() -> String {
    DEFAULT_ENV.to_string()
}

fn parse_session_tokens(raw: &str) -> Vec<Result<SessionSeed, String>> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let mut parts = entry.splitn(3, ':').map(str::trim);
            match (parts.next(), parts.next(), parts.next()) {
                (Some(token), Some(user_id), Some(company))
                    if !token.is_empty() && !user_id.is_empty() && !company.is_empty() =>
                {
                    Ok(SessionSeed {
                        token: token.to_string(),
                        user_id: user_id.to_string(),
                        company_name: company.to_string(),
                    })
                }
                _ => Err(entry.to_string()),
            }
        })
        .collect()
}

fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    if LOG_LEVELS.contains(&level.to_ascii_lowercase().as_str()) {
        return Ok(());
    }
    let mut err = ValidationError::new("log_level");
    err.message = Some(format!("expected one of {}", LOG_LEVELS.join(", ")).into());
    Err(err)
}

fn validate_session_tokens(raw: &str) -> Result<(), ValidationError> {
    match parse_session_tokens(raw).into_iter().find_map(Result::err) {
        None => Ok(()),
        Some(bad) => {
            let mut err = ValidationError::new("session_tokens");
            err.message =
                Some(format!("'{}' is not token:user_id:company", bad).into());
            Err(err)
        }
    }
}

/// Installs the global subscriber. `RUST_LOG` wins over the configured level.
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| format!("ubl_invoice_api={},tower_http=info", level));

    let builder = fmt().with_env_filter(EnvFilter::new(directive));
    // A second install (tests, embedding) is not an error.
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}

/// Reads `config/default.toml`, then `config/{RUN_ENV}.toml`, then `APP__*`
/// environment variables, e.g. `APP__DATABASE__URL`.
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    let run_env = env::var("RUN_ENV").unwrap_or_else(|_| DEFAULT_ENV.to_string());
    if !Path::new(CONFIG_DIR).is_dir() {
        warn!(dir = CONFIG_DIR, "No config directory; using defaults and environment");
    }

    let cfg: AppConfig = Config::builder()
        .set_default("environment", run_env.as_str())?
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, run_env)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?
        .try_deserialize()?;

    cfg.validate().map_err(|e| {
        error!(error = %e, "Rejected configuration");
        AppConfigError::Validation(e)
    })?;

    info!(environment = %cfg.environment, "Configuration loaded");
    Ok(cfg)
}
