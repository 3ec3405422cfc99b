use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_SPOT_PRICE_BASE_URL: &str = "https://api.metalpriceapi.com/v1/latest";
pub const DEFAULT_FALLBACK_PRICE_PER_GRAM: f64 = 65.0;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub spot_price: SpotPriceConfig,
    pub catalog: CatalogConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
}

#[derive(Clone, Debug)]
pub struct SpotPriceConfig {
    pub api_key: Option<SecretString>,
    pub base_url: String,
    pub base_currency: String,
    pub commodity: String,
    pub cache_ttl_secs: u64,
    pub fallback_enabled: bool,
    pub fallback_price_per_gram: f64,
    pub timeout_secs: Option<u64>,
}

#[derive(Clone, Debug, Default)]
pub struct CatalogConfig {
    pub products_path: Option<PathBuf>,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub port: Option<u16>,
    pub log_level: Option<String>,
    pub spot_price_api_key: Option<String>,
    pub spot_price_base_url: Option<String>,
    pub cache_ttl_secs: Option<u64>,
    pub fallback_enabled: Option<bool>,
    pub fallback_price_per_gram: Option<f64>,
    pub products_path: Option<PathBuf>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
    #[error("could not load dotenv file: {0}")]
    DotEnv(#[from] dotenvy::Error),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig { bind_address: "127.0.0.1".to_string(), port: 5000 },
            spot_price: SpotPriceConfig {
                api_key: None,
                base_url: DEFAULT_SPOT_PRICE_BASE_URL.to_string(),
                base_currency: "USD".to_string(),
                commodity: "XAU".to_string(),
                cache_ttl_secs: 300,
                fallback_enabled: true,
                fallback_price_per_gram: DEFAULT_FALLBACK_PRICE_PER_GRAM,
                timeout_secs: None,
            },
            catalog: CatalogConfig::default(),
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl SpotPriceConfig {
    pub fn has_api_key(&self) -> bool {
        self.api_key.as_ref().is_some_and(|key| !key.expose_secret().trim().is_empty())
    }

    /// Fallback price handed out when the live price cannot be sourced, if enabled.
    pub fn fallback(&self) -> Option<f64> {
        self.fallback_enabled.then_some(self.fallback_price_per_gram)
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("aurum.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
        }

        if let Some(spot_price) = patch.spot_price {
            if let Some(api_key) = spot_price.api_key {
                self.spot_price.api_key = Some(secret_value(api_key));
            }
            if let Some(base_url) = spot_price.base_url {
                self.spot_price.base_url = base_url;
            }
            if let Some(base_currency) = spot_price.base_currency {
                self.spot_price.base_currency = base_currency;
            }
            if let Some(commodity) = spot_price.commodity {
                self.spot_price.commodity = commodity;
            }
            if let Some(cache_ttl_secs) = spot_price.cache_ttl_secs {
                self.spot_price.cache_ttl_secs = cache_ttl_secs;
            }
            if let Some(fallback_enabled) = spot_price.fallback_enabled {
                self.spot_price.fallback_enabled = fallback_enabled;
            }
            if let Some(fallback_price_per_gram) = spot_price.fallback_price_per_gram {
                self.spot_price.fallback_price_per_gram = fallback_price_per_gram;
            }
            if let Some(timeout_secs) = spot_price.timeout_secs {
                self.spot_price.timeout_secs = Some(timeout_secs);
            }
        }

        if let Some(catalog) = patch.catalog {
            if let Some(products_path) = catalog.products_path {
                self.catalog.products_path = Some(products_path);
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("AURUM_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some((key, value)) = read_env_aliases(&["AURUM_SERVER_PORT", "PORT"]) {
            self.server.port = parse_u16(key, &value)?;
        }

        if let Some((_, value)) =
            read_env_aliases(&["AURUM_SPOT_PRICE_API_KEY", "METAL_PRICE_API_KEY"])
        {
            self.spot_price.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("AURUM_SPOT_PRICE_BASE_URL") {
            self.spot_price.base_url = value;
        }
        if let Some(value) = read_env("AURUM_SPOT_PRICE_BASE_CURRENCY") {
            self.spot_price.base_currency = value;
        }
        if let Some(value) = read_env("AURUM_SPOT_PRICE_COMMODITY") {
            self.spot_price.commodity = value;
        }
        if let Some(value) = read_env("AURUM_SPOT_PRICE_CACHE_TTL_SECS") {
            self.spot_price.cache_ttl_secs = parse_u64("AURUM_SPOT_PRICE_CACHE_TTL_SECS", &value)?;
        }
        if let Some(value) = read_env("AURUM_SPOT_PRICE_FALLBACK_ENABLED") {
            self.spot_price.fallback_enabled =
                parse_bool("AURUM_SPOT_PRICE_FALLBACK_ENABLED", &value)?;
        }
        if let Some(value) = read_env("AURUM_SPOT_PRICE_FALLBACK_PRICE_PER_GRAM") {
            self.spot_price.fallback_price_per_gram =
                parse_f64("AURUM_SPOT_PRICE_FALLBACK_PRICE_PER_GRAM", &value)?;
        }
        if let Some(value) = read_env("AURUM_SPOT_PRICE_TIMEOUT_SECS") {
            self.spot_price.timeout_secs =
                Some(parse_u64("AURUM_SPOT_PRICE_TIMEOUT_SECS", &value)?);
        }

        if let Some(value) = read_env("AURUM_CATALOG_PRODUCTS_PATH") {
            self.catalog.products_path = Some(PathBuf::from(value));
        }

        if let Some((_, value)) = read_env_aliases(&["AURUM_LOGGING_LEVEL", "AURUM_LOG_LEVEL"]) {
            self.logging.level = value;
        }
        if let Some((_, value)) = read_env_aliases(&["AURUM_LOGGING_FORMAT", "AURUM_LOG_FORMAT"])
        {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(api_key) = overrides.spot_price_api_key {
            self.spot_price.api_key = Some(secret_value(api_key));
        }
        if let Some(base_url) = overrides.spot_price_base_url {
            self.spot_price.base_url = base_url;
        }
        if let Some(cache_ttl_secs) = overrides.cache_ttl_secs {
            self.spot_price.cache_ttl_secs = cache_ttl_secs;
        }
        if let Some(fallback_enabled) = overrides.fallback_enabled {
            self.spot_price.fallback_enabled = fallback_enabled;
        }
        if let Some(fallback_price_per_gram) = overrides.fallback_price_per_gram {
            self.spot_price.fallback_price_per_gram = fallback_price_per_gram;
        }
        if let Some(products_path) = overrides.products_path {
            self.catalog.products_path = Some(products_path);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_server(&self.server)?;
        validate_spot_price(&self.spot_price)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

/// Config file that [`AppConfig::load`] would read for the given explicit path, if any.
pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("aurum.toml"), PathBuf::from("config/aurum.toml")]
        .into_iter()
        .find(|path| path.exists())
}

/// Exports `KEY=value` pairs from a dotenv file into the process environment.
///
/// Reads `path` when given, otherwise `.env` in the working directory or one of its parents.
/// Variables that are already set keep their values. A missing file is not an error.
pub fn load_dotenv(path: Option<&Path>) -> Result<Option<PathBuf>, ConfigError> {
    let loaded = match path {
        Some(path) => dotenvy::from_path(path).map(|()| path.to_path_buf()),
        None => dotenvy::dotenv(),
    };

    match loaded {
        Ok(path) => Ok(Some(path)),
        Err(error) if error.not_found() => Ok(None),
        Err(error) => Err(ConfigError::DotEnv(error)),
    }
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.bind_address.trim().is_empty() {
        return Err(ConfigError::Validation("server.bind_address must not be empty".to_string()));
    }

    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    Ok(())
}

fn validate_spot_price(spot_price: &SpotPriceConfig) -> Result<(), ConfigError> {
    let base_url = spot_price.base_url.trim();
    if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
        return Err(ConfigError::Validation(
            "spot_price.base_url must start with http:// or https://".to_string(),
        ));
    }

    for (key, code) in [
        ("spot_price.base_currency", &spot_price.base_currency),
        ("spot_price.commodity", &spot_price.commodity),
    ] {
        if code.is_empty() || !code.chars().all(|ch| ch.is_ascii_alphabetic()) {
            return Err(ConfigError::Validation(format!(
                "{key} must be an alphabetic currency code (got `{code}`)"
            )));
        }
    }

    if spot_price.cache_ttl_secs == 0 || spot_price.cache_ttl_secs > 86_400 {
        return Err(ConfigError::Validation(
            "spot_price.cache_ttl_secs must be in range 1..=86400".to_string(),
        ));
    }

    let fallback = spot_price.fallback_price_per_gram;
    if !fallback.is_finite() || fallback <= 0.0 {
        return Err(ConfigError::Validation(
            "spot_price.fallback_price_per_gram must be a positive number".to_string(),
        ));
    }

    if let Some(timeout_secs) = spot_price.timeout_secs {
        if timeout_secs == 0 || timeout_secs > 300 {
            return Err(ConfigError::Validation(
                "spot_price.timeout_secs must be in range 1..=300".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn read_env_aliases<'a>(keys: &[&'a str]) -> Option<(&'a str, String)> {
    keys.iter().find_map(|key| read_env(key).map(|value| (*key, value)))
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_f64(key: &str, value: &str) -> Result<f64, ConfigError> {
    value.trim().parse::<f64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.parse::<bool>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    server: Option<ServerPatch>,
    spot_price: Option<SpotPricePatch>,
    catalog: Option<CatalogPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
struct SpotPricePatch {
    api_key: Option<String>,
    base_url: Option<String>,
    base_currency: Option<String>,
    commodity: Option<String>,
    cache_ttl_secs: Option<u64>,
    fallback_enabled: Option<bool>,
    fallback_price_per_gram: Option<f64>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct CatalogPatch {
    products_path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::path::PathBuf;
    use std::sync::{Mutex, OnceLock};

    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use super::{load_dotenv, AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    const ENV_VARS: &[&str] = &[
        "AURUM_SERVER_PORT",
        "PORT",
        "AURUM_SPOT_PRICE_API_KEY",
        "METAL_PRICE_API_KEY",
        "AURUM_SPOT_PRICE_CACHE_TTL_SECS",
        "AURUM_SPOT_PRICE_FALLBACK_ENABLED",
        "AURUM_LOG_LEVEL",
        "AURUM_LOG_FORMAT",
        "TEST_METAL_KEY",
    ];

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars() {
        for var in ENV_VARS {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn defaults_match_storefront_expectations() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars();

        let config = AppConfig::load(LoadOptions::default())
            .map_err(|err| format!("config load failed: {err}"))?;

        ensure(config.server.port == 5000, "default port should be 5000")?;
        ensure(config.spot_price.cache_ttl_secs == 300, "default ttl should be five minutes")?;
        ensure(config.spot_price.fallback() == Some(65.0), "fallback should default to 65.0")?;
        ensure(!config.spot_price.has_api_key(), "api key should be unset by default")?;
        ensure(config.spot_price.commodity == "XAU", "commodity should default to XAU")?;
        ensure(config.spot_price.timeout_secs.is_none(), "no client timeout by default")
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars();

        env::set_var("TEST_METAL_KEY", "key-from-env");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("aurum.toml");
            fs::write(
                &path,
                r#"
[spot_price]
api_key = "${TEST_METAL_KEY}"
cache_ttl_secs = 60

[catalog]
products_path = "data/rings.json"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            let key = config.spot_price.api_key.as_ref().map(|key| key.expose_secret().to_string());
            ensure(key.as_deref() == Some("key-from-env"), "api key should be interpolated")?;
            ensure(config.spot_price.cache_ttl_secs == 60, "ttl should come from file")?;
            ensure(
                config.catalog.products_path == Some(PathBuf::from("data/rings.json")),
                "products path should come from file",
            )
        })();

        clear_vars();
        result
    }

    #[test]
    fn dotenv_file_supplies_unset_variables() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars();

        env::set_var("AURUM_LOG_LEVEL", "warn");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join(".env");
            fs::write(&path, "METAL_PRICE_API_KEY=dotenv-key\nPORT=7123\nAURUM_LOG_LEVEL=debug\n")
                .map_err(|err| err.to_string())?;

            let loaded = load_dotenv(Some(&path)).map_err(|err| err.to_string())?;
            ensure(loaded == Some(path), "dotenv path should be reported")?;

            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            let key = config.spot_price.api_key.as_ref().map(|key| key.expose_secret().to_string());
            ensure(key.as_deref() == Some("dotenv-key"), "api key should come from dotenv")?;
            ensure(config.server.port == 7123, "port should come from dotenv")?;
            ensure(config.logging.level == "warn", "process env should win over dotenv")
        })();

        clear_vars();
        result
    }

    #[test]
    fn missing_dotenv_file_is_ignored() -> Result<(), String> {
        let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;

        let loaded = load_dotenv(Some(&dir.path().join(".env"))).map_err(|err| err.to_string())?;

        ensure(loaded.is_none(), "absent dotenv file should load nothing")
    }

    #[test]
    fn legacy_env_names_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars();

        env::set_var("PORT", "8088");
        env::set_var("METAL_PRICE_API_KEY", "legacy-key");
        env::set_var("AURUM_LOG_LEVEL", "warn");
        env::set_var("AURUM_LOG_FORMAT", "pretty");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.server.port == 8088, "PORT should set the listening port")?;
            ensure(config.spot_price.has_api_key(), "METAL_PRICE_API_KEY should set the key")?;
            ensure(config.logging.level == "warn", "log level alias should apply")?;
            ensure(
                matches!(config.logging.format, LogFormat::Pretty),
                "log format alias should apply",
            )
        })();

        clear_vars();
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars();

        env::set_var("AURUM_SERVER_PORT", "7000");
        env::set_var("AURUM_SPOT_PRICE_CACHE_TTL_SECS", "120");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("aurum.toml");
            fs::write(
                &path,
                r#"
[server]
port = 6000

[spot_price]
cache_ttl_secs = 90
fallback_price_per_gram = 70.5

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    port: Some(9000),
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.server.port == 9000, "override port should win")?;
            ensure(config.logging.level == "debug", "override log level should win")?;
            ensure(config.spot_price.cache_ttl_secs == 120, "env ttl should win over file")?;
            ensure(
                config.spot_price.fallback_price_per_gram == 70.5,
                "file fallback should win over default",
            )
        })();

        clear_vars();
        result
    }

    #[test]
    fn disabled_fallback_yields_none() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars();

        env::set_var("AURUM_SPOT_PRICE_FALLBACK_ENABLED", "false");
        let result = AppConfig::load(LoadOptions::default())
            .map_err(|err| format!("config load failed: {err}"))
            .and_then(|config| {
                ensure(config.spot_price.fallback().is_none(), "fallback should be disabled")
            });

        clear_vars();
        result
    }

    #[test]
    fn invalid_env_override_is_reported_with_key() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars();

        env::set_var("AURUM_SPOT_PRICE_CACHE_TTL_SECS", "five minutes");
        let result = match AppConfig::load(LoadOptions::default()) {
            Ok(_) => Err("expected invalid override to fail".to_string()),
            Err(error) => ensure(
                matches!(
                    error,
                    ConfigError::InvalidEnvOverride { ref key, .. }
                        if key == "AURUM_SPOT_PRICE_CACHE_TTL_SECS"
                ),
                "error should name the offending variable",
            ),
        };

        clear_vars();
        result
    }

    #[test]
    fn validation_rejects_non_positive_fallback() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars();

        let error = match AppConfig::load(LoadOptions {
            overrides: ConfigOverrides {
                fallback_price_per_gram: Some(0.0),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }) {
            Ok(_) => return Err("expected validation failure".to_string()),
            Err(error) => error,
        };

        ensure(
            matches!(
                error,
                ConfigError::Validation(ref message)
                    if message.contains("spot_price.fallback_price_per_gram")
            ),
            "validation failure should mention the fallback price",
        )
    }

    #[test]
    fn validation_bounds_cache_ttl_to_one_day() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars();

        let load = |ttl: u64| {
            AppConfig::load(LoadOptions {
                overrides: ConfigOverrides {
                    cache_ttl_secs: Some(ttl),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
        };

        ensure(load(86_400).is_ok(), "one day should be accepted")?;
        ensure(
            matches!(
                load(86_401),
                Err(ConfigError::Validation(ref message)) if message.contains("1..=86400")
            ),
            "ttl beyond one day should be rejected",
        )?;
        ensure(load(0).is_err(), "zero ttl should be rejected")
    }

    #[test]
    fn api_key_is_not_leaked_by_debug() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars();

        env::set_var("AURUM_SPOT_PRICE_API_KEY", "super-secret-metal-key");
        let result = AppConfig::load(LoadOptions::default())
            .map_err(|err| format!("config load failed: {err}"))
            .and_then(|config| {
                let debug = format!("{config:?}");
                ensure(
                    !debug.contains("super-secret-metal-key"),
                    "debug output should not contain the api key",
                )
            });

        clear_vars();
        result
    }

    #[test]
    fn missing_required_file_fails() {
        let result = AppConfig::load(LoadOptions {
            config_path: Some(PathBuf::from("/definitely/not/here/aurum.toml")),
            require_file: true,
            ..LoadOptions::default()
        });

        assert!(matches!(result, Err(ConfigError::MissingConfigFile(_))));
    }
}
