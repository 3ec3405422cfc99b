use std::env;
use std::fs;
use std::path::Path;

use aurum_core::config::{resolve_config_path, AppConfig, LoadOptions};
use secrecy::ExposeSecret;
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = resolve_config_path(None);
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let source = |key_path: &str, env_keys: &[&str]| {
        field_source(key_path, env_keys, config_file_doc.as_ref(), config_file_path.as_deref())
    };

    let spot = &config.spot_price;
    let api_key = spot.api_key.as_ref().map(|key| redact_key(key.expose_secret()));
    let timeout = spot.timeout_secs.map(|secs| secs.to_string());
    let products_path =
        config.catalog.products_path.as_ref().map(|path| path.display().to_string());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    let mut push = |key: &str, value: String, env_keys: &[&str]| {
        lines.push(render_line(key, &value, source(key, env_keys)));
    };

    push("server.bind_address", config.server.bind_address.clone(), &["AURUM_SERVER_BIND_ADDRESS"]);
    push("server.port", config.server.port.to_string(), &["AURUM_SERVER_PORT", "PORT"]);
    push(
        "spot_price.api_key",
        api_key.unwrap_or_else(|| "<unset>".to_string()),
        &["AURUM_SPOT_PRICE_API_KEY", "METAL_PRICE_API_KEY"],
    );
    push("spot_price.base_url", spot.base_url.clone(), &["AURUM_SPOT_PRICE_BASE_URL"]);
    push(
        "spot_price.base_currency",
        spot.base_currency.clone(),
        &["AURUM_SPOT_PRICE_BASE_CURRENCY"],
    );
    push("spot_price.commodity", spot.commodity.clone(), &["AURUM_SPOT_PRICE_COMMODITY"]);
    push(
        "spot_price.cache_ttl_secs",
        spot.cache_ttl_secs.to_string(),
        &["AURUM_SPOT_PRICE_CACHE_TTL_SECS"],
    );
    push(
        "spot_price.fallback_enabled",
        spot.fallback_enabled.to_string(),
        &["AURUM_SPOT_PRICE_FALLBACK_ENABLED"],
    );
    push(
        "spot_price.fallback_price_per_gram",
        spot.fallback_price_per_gram.to_string(),
        &["AURUM_SPOT_PRICE_FALLBACK_PRICE_PER_GRAM"],
    );
    push(
        "spot_price.timeout_secs",
        timeout.unwrap_or_else(|| "<none>".to_string()),
        &["AURUM_SPOT_PRICE_TIMEOUT_SECS"],
    );
    push(
        "catalog.products_path",
        products_path.unwrap_or_else(|| "<auto>".to_string()),
        &["AURUM_CATALOG_PRODUCTS_PATH"],
    );
    push(
        "logging.level",
        config.logging.level.clone(),
        &["AURUM_LOGGING_LEVEL", "AURUM_LOG_LEVEL"],
    );
    push(
        "logging.format",
        format!("{:?}", config.logging.format),
        &["AURUM_LOGGING_FORMAT", "AURUM_LOG_FORMAT"],
    );

    lines.join("\n")
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

fn redact_key(key: &str) -> String {
    let trimmed = key.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    let visible: String = trimmed.chars().take(4).collect();
    if trimmed.chars().count() > 8 {
        return format!("{visible}***");
    }

    "<redacted>".to_string()
}
