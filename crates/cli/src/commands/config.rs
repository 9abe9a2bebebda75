use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use cotar_core::config::{AppConfig, LoadOptions};
use secrecy::ExposeSecret;
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];

    let mut push = |key: &str, value: &str, env_key: Option<&str>| {
        lines.push(render_line(
            key,
            value,
            field_source(key, env_key, config_file_doc.as_ref(), config_file_path.as_deref()),
        ));
    };

    push("database.url", &config.database.url, Some("COTAR_DATABASE_URL"));
    push(
        "database.max_connections",
        &config.database.max_connections.to_string(),
        Some("COTAR_DATABASE_MAX_CONNECTIONS"),
    );
    push(
        "database.timeout_secs",
        &config.database.timeout_secs.to_string(),
        Some("COTAR_DATABASE_TIMEOUT_SECS"),
    );

    push("server.bind_address", &config.server.bind_address, Some("COTAR_SERVER_BIND_ADDRESS"));
    push("server.port", &config.server.port.to_string(), Some("COTAR_SERVER_PORT"));
    push(
        "server.public_base_url",
        &config.server.public_base_url,
        Some("COTAR_SERVER_PUBLIC_BASE_URL"),
    );
    push(
        "server.graceful_shutdown_secs",
        &config.server.graceful_shutdown_secs.to_string(),
        None,
    );

    push("eligibility.base_url", &config.eligibility.base_url, Some("COTAR_ELIGIBILITY_BASE_URL"));

    push("auth.base_url", &config.auth.base_url, Some("COTAR_AUTH_BASE_URL"));
    push(
        "auth.service_key",
        &redact_secret(config.auth.service_key.expose_secret()),
        Some("COTAR_AUTH_SERVICE_KEY"),
    );

    push("cep.base_url", &config.cep.base_url, Some("COTAR_CEP_BASE_URL"));

    push(
        "storage.root_dir",
        &config.storage.root_dir.display().to_string(),
        Some("COTAR_STORAGE_ROOT_DIR"),
    );
    push("storage.public_path", &config.storage.public_path, None);

    push("escrow.enabled", &config.escrow.enabled.to_string(), Some("COTAR_ESCROW_ENABLED"));
    push(
        "escrow.base_url",
        config.escrow.base_url.as_deref().unwrap_or("<unset>"),
        Some("COTAR_ESCROW_BASE_URL"),
    );
    let escrow_api_key = match &config.escrow.api_key {
        Some(key) => redact_secret(key.expose_secret()),
        None => "<unset>".to_string(),
    };
    push("escrow.api_key", &escrow_api_key, Some("COTAR_ESCROW_API_KEY"));

    push("logging.level", &config.logging.level, Some("COTAR_LOGGING_LEVEL"));
    push("logging.format", &format!("{:?}", config.logging.format), Some("COTAR_LOGGING_FORMAT"));

    lines.join("\n")
}

fn detect_config_path() -> Option<PathBuf> {
    let root = PathBuf::from("cotar.toml");
    if root.exists() {
        return Some(root);
    }

    let nested = PathBuf::from("config/cotar.toml");
    if nested.exists() {
        return Some(nested);
    }

    None
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_key: Option<&str>,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_key {
        if env::var_os(env_key).is_some() {
            return format!("env ({env_key})");
        }
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

fn redact_secret(value: &str) -> String {
    if value.trim().is_empty() {
        return "<empty>".to_string();
    }

    "<redacted>".to_string()
}
