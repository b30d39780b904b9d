use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info, Level};
use validator::{Validate, ValidationError, ValidationErrors};

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const CONFIG_DIR: &str = "config";
const DEFAULT_PAGE_SIZE: u64 = 50;
const DEFAULT_MAX_PAGE_SIZE: u64 = 500;
const DEFAULT_EXPORT_PLACEHOLDER: &str = "N/A";
const DEFAULT_PERCENT_DECIMALS: u32 = 2;
const DEFAULT_CURRENCY: &str = "INR";

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Serialize, Validate)]
pub struct AppConfig {
    /// Application environment
    #[validate(length(min = 1))]
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Logging level
    #[validate(custom = "validate_log_level")]
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Page size used when the caller does not ask for one
    #[validate(range(min = 1, max = 10000))]
    #[serde(default = "default_page_size")]
    pub default_page_size: u64,

    /// Upper bound on caller-requested page sizes
    #[validate(range(min = 1, max = 10000))]
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u64,

    /// Text written for missing values in exports
    #[serde(default = "default_export_placeholder")]
    pub export_placeholder: String,

    /// Decimal places for percentage cells (1 or 2)
    #[validate(range(min = 1, max = 2))]
    #[serde(default = "default_percent_decimals")]
    pub percent_decimals: u32,

    /// ISO currency code shown next to totals
    #[validate(length(equal = 3))]
    #[serde(default = "default_currency")]
    pub currency_code: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: default_environment(),
            log_level: default_log_level(),
            log_json: false,
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
            export_placeholder: default_export_placeholder(),
            percent_decimals: DEFAULT_PERCENT_DECIMALS,
            currency_code: default_currency(),
        }
    }
}

impl AppConfig {
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }

    /// Gets log level reference
    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    /// Caps a requested page size at `max_page_size`, falling back to the
    /// default when none (or zero) is requested.
    pub fn effective_page_size(&self, requested: Option<u64>) -> u64 {
        match requested {
            Some(size) if size > 0 => size.min(self.max_page_size),
            _ => self.default_page_size.min(self.max_page_size),
        }
    }

    fn validate_additional_constraints(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if self.default_page_size > self.max_page_size {
            let mut err = ValidationError::new("default_page_size_exceeds_max");
            err.message = Some("default_page_size must not exceed max_page_size".into());
            errors.add("default_page_size", err);
        }

        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Configuration loading failed: {0}")]
    Load(#[from] ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Default value functions
fn default_environment() -> String {
    DEFAULT_ENV.to_string()
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_page_size() -> u64 {
    DEFAULT_PAGE_SIZE
}

fn default_max_page_size() -> u64 {
    DEFAULT_MAX_PAGE_SIZE
}

fn default_export_placeholder() -> String {
    DEFAULT_EXPORT_PLACEHOLDER.to_string()
}

fn default_percent_decimals() -> u32 {
    DEFAULT_PERCENT_DECIMALS
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

/// Validates log level values
fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if valid_levels.contains(&level.to_lowercase().as_str()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("log_level");
        err.message = Some("Must be one of: trace, debug, info, warn, error".into());
        Err(err)
    }
}

/// Initializes tracing using the provided log level as the default filter.
///
/// `RUST_LOG`, when set, replaces the default directive entirely. Calling this
/// more than once is harmless; later calls are ignored.
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_directive = format!("po_ledger={}", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    let builder = fmt()
        .with_env_filter(EnvFilter::new(filter_directive))
        .with_writer(std::io::stderr);
    if json {
        let _ = builder.json().try_init();
    } else {
        let _ = builder.try_init();
    }
}

/// Subscriber used while the configuration itself loads, before the configured
/// level is known. Honours `RUST_LOG`; otherwise only warnings and errors from
/// this crate are shown.
pub fn bootstrap_subscriber() -> impl tracing::Subscriber + Send + Sync {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("po_ledger={}", Level::WARN)));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).finish()
}

/// Loads application configuration
///
/// Layers configuration sources in this order:
/// 1. Built-in defaults
/// 2. Default config (config/default.toml)
/// 3. Environment-specific config (config/{env}.toml)
/// 4. Environment variables (APP__*)
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    // Support both RUN_ENV and APP_ENV for selecting config profile
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    load_config_from(Path::new(CONFIG_DIR), &run_env)
}

/// Same as [`load_config`], reading the TOML layers from `config_dir`.
pub fn load_config_from(config_dir: &Path, run_env: &str) -> Result<AppConfig, AppConfigError> {
    info!("Loading configuration for environment: {}", run_env);

    if !config_dir.exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            config_dir.display()
        );
    }

    let default_file = config_dir.join("default");
    let env_file = config_dir.join(run_env);

    let config = Config::builder()
        .set_default("environment", run_env)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .set_default("default_page_size", DEFAULT_PAGE_SIZE as i64)?
        .set_default("max_page_size", DEFAULT_MAX_PAGE_SIZE as i64)?
        .set_default("export_placeholder", DEFAULT_EXPORT_PLACEHOLDER)?
        .set_default("percent_decimals", DEFAULT_PERCENT_DECIMALS as i64)?
        .set_default("currency_code", DEFAULT_CURRENCY)?
        .add_source(File::with_name(&default_file.to_string_lossy()).required(false))
        .add_source(File::with_name(&env_file.to_string_lossy()).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    let app_config: AppConfig = config.try_deserialize()?;

    app_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    app_config.validate_additional_constraints().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    info!("Configuration loaded successfully");
    Ok(app_config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::fs::File as StdFile;
    use std::io::Write;
    use tempfile::TempDir;

    fn setup_test_config(files: &[(&str, &str)]) -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        for (filename, content) in files {
            let mut file = StdFile::create(temp_dir.path().join(filename)).unwrap();
            writeln!(file, "{}", content).unwrap();
        }
        temp_dir
    }

    #[test]
    fn defaults_are_valid() {
        let cfg = AppConfig::default();
        assert!(cfg.validate().is_ok());
        assert!(cfg.validate_additional_constraints().is_ok());
        assert_eq!(cfg.default_page_size, 50);
        assert_eq!(cfg.export_placeholder, "N/A");
        assert_eq!(cfg.currency_code, "INR");
    }

    #[test]
    fn missing_directory_falls_back_to_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let cfg = load_config_from(&temp_dir.path().join("absent"), "testing").unwrap();
        assert_eq!(cfg.environment, "testing");
        assert_eq!(cfg.max_page_size, 500);
        assert_eq!(cfg.percent_decimals, 2);
    }

    #[test]
    fn environment_file_overrides_default_file() {
        let temp_dir = setup_test_config(&[
            (
                "default.toml",
                r#"
                    default_page_size = 25
                    export_placeholder = "-"
                "#,
            ),
            ("staging.toml", "default_page_size = 100"),
        ]);

        let cfg = load_config_from(temp_dir.path(), "staging").unwrap();

        assert_eq!(cfg.default_page_size, 100);
        assert_eq!(cfg.export_placeholder, "-");
        assert_eq!(cfg.environment, "staging");
    }

    #[test]
    fn out_of_range_percent_decimals_fail_validation() {
        let temp_dir = setup_test_config(&[("default.toml", "percent_decimals = 3")]);

        let result = load_config_from(temp_dir.path(), "development");

        assert_matches!(result, Err(AppConfigError::Validation(errors)) => {
            assert!(errors.field_errors().contains_key("percent_decimals"));
        });
    }

    #[test]
    fn bad_log_level_fails_validation() {
        let temp_dir = setup_test_config(&[("default.toml", r#"log_level = "loud""#)]);
        let result = load_config_from(temp_dir.path(), "development");
        assert_matches!(result, Err(AppConfigError::Validation(_)));
    }

    #[test]
    fn validation_failure_under_bootstrap_logging() {
        let temp_dir = setup_test_config(&[("default.toml", "max_page_size = 0")]);

        let result = tracing::subscriber::with_default(bootstrap_subscriber(), || {
            load_config_from(temp_dir.path(), "development")
        });

        assert_matches!(result, Err(AppConfigError::Validation(_)));
    }

    #[test]
    fn default_page_size_must_fit_under_max() {
        let cfg = AppConfig {
            default_page_size: 600,
            ..AppConfig::default()
        };
        assert!(cfg.validate_additional_constraints().is_err());
    }

    #[test]
    fn effective_page_size_is_capped() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.effective_page_size(None), 50);
        assert_eq!(cfg.effective_page_size(Some(0)), 50);
        assert_eq!(cfg.effective_page_size(Some(20)), 20);
        assert_eq!(cfg.effective_page_size(Some(10_000)), 500);
    }
}
