use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub eligibility: EligibilityConfig,
    pub auth: AuthConfig,
    pub cep: CepConfig,
    pub storage: StorageConfig,
    pub escrow: EscrowConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub public_base_url: String,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct EligibilityConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub base_url: String,
    pub service_key: SecretString,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct CepConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct StorageConfig {
    pub root_dir: PathBuf,
    pub public_path: String,
}

#[derive(Clone, Debug)]
pub struct EscrowConfig {
    pub enabled: bool,
    pub base_url: Option<String>,
    pub api_key: Option<SecretString>,
    pub timeout_secs: u64,
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
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub server_port: Option<u16>,
    pub eligibility_base_url: Option<String>,
    pub auth_base_url: Option<String>,
    pub auth_service_key: Option<String>,
    pub storage_root_dir: Option<PathBuf>,
    pub escrow_enabled: Option<bool>,
    pub escrow_base_url: Option<String>,
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
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://cotar.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8080,
                public_base_url: "http://localhost:8080".to_string(),
                graceful_shutdown_secs: 15,
            },
            eligibility: EligibilityConfig {
                base_url: "http://localhost:9400".to_string(),
                timeout_secs: 10,
            },
            auth: AuthConfig {
                base_url: "http://localhost:9999".to_string(),
                service_key: String::new().into(),
                timeout_secs: 10,
            },
            cep: CepConfig { base_url: "https://viacep.com.br".to_string(), timeout_secs: 10 },
            storage: StorageConfig {
                root_dir: PathBuf::from("uploads"),
                public_path: "/uploads".to_string(),
            },
            escrow: EscrowConfig { enabled: false, base_url: None, api_key: None, timeout_secs: 15 },
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

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    server: Option<ServerPatch>,
    eligibility: Option<EndpointPatch>,
    auth: Option<AuthPatch>,
    cep: Option<EndpointPatch>,
    storage: Option<StoragePatch>,
    escrow: Option<EscrowPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    public_base_url: Option<String>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct EndpointPatch {
    base_url: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct AuthPatch {
    base_url: Option<String>,
    service_key: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct StoragePatch {
    root_dir: Option<PathBuf>,
    public_path: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct EscrowPatch {
    enabled: Option<bool>,
    base_url: Option<String>,
    api_key: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("cotar.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(public_base_url) = server.public_base_url {
                self.server.public_base_url = public_base_url;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(eligibility) = patch.eligibility {
            if let Some(base_url) = eligibility.base_url {
                self.eligibility.base_url = base_url;
            }
            if let Some(timeout_secs) = eligibility.timeout_secs {
                self.eligibility.timeout_secs = timeout_secs;
            }
        }

        if let Some(auth) = patch.auth {
            if let Some(base_url) = auth.base_url {
                self.auth.base_url = base_url;
            }
            if let Some(service_key) = auth.service_key {
                self.auth.service_key = secret_value(service_key);
            }
            if let Some(timeout_secs) = auth.timeout_secs {
                self.auth.timeout_secs = timeout_secs;
            }
        }

        if let Some(cep) = patch.cep {
            if let Some(base_url) = cep.base_url {
                self.cep.base_url = base_url;
            }
            if let Some(timeout_secs) = cep.timeout_secs {
                self.cep.timeout_secs = timeout_secs;
            }
        }

        if let Some(storage) = patch.storage {
            if let Some(root_dir) = storage.root_dir {
                self.storage.root_dir = root_dir;
            }
            if let Some(public_path) = storage.public_path {
                self.storage.public_path = public_path;
            }
        }

        if let Some(escrow) = patch.escrow {
            if let Some(enabled) = escrow.enabled {
                self.escrow.enabled = enabled;
            }
            if let Some(base_url) = escrow.base_url {
                self.escrow.base_url = Some(base_url);
            }
            if let Some(api_key) = escrow.api_key {
                self.escrow.api_key = Some(secret_value(api_key));
            }
            if let Some(timeout_secs) = escrow.timeout_secs {
                self.escrow.timeout_secs = timeout_secs;
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
        if let Some(value) = read_env("COTAR_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("COTAR_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = parse_u32("COTAR_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("COTAR_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("COTAR_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("COTAR_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("COTAR_SERVER_PORT") {
            self.server.port = parse_u16("COTAR_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("COTAR_SERVER_PUBLIC_BASE_URL") {
            self.server.public_base_url = value;
        }

        if let Some(value) = read_env("COTAR_ELIGIBILITY_BASE_URL") {
            self.eligibility.base_url = value;
        }
        if let Some(value) = read_env("COTAR_AUTH_BASE_URL") {
            self.auth.base_url = value;
        }
        if let Some(value) = read_env("COTAR_AUTH_SERVICE_KEY") {
            self.auth.service_key = secret_value(value);
        }
        if let Some(value) = read_env("COTAR_CEP_BASE_URL") {
            self.cep.base_url = value;
        }
        if let Some(value) = read_env("COTAR_STORAGE_ROOT_DIR") {
            self.storage.root_dir = PathBuf::from(value);
        }
        if let Some(value) = read_env("COTAR_ESCROW_ENABLED") {
            self.escrow.enabled = parse_bool("COTAR_ESCROW_ENABLED", &value)?;
        }
        if let Some(value) = read_env("COTAR_ESCROW_BASE_URL") {
            self.escrow.base_url = Some(value);
        }
        if let Some(value) = read_env("COTAR_ESCROW_API_KEY") {
            self.escrow.api_key = Some(secret_value(value));
        }

        let log_level = read_env("COTAR_LOGGING_LEVEL").or_else(|| read_env("COTAR_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format = read_env("COTAR_LOGGING_FORMAT").or_else(|| read_env("COTAR_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(server_port) = overrides.server_port {
            self.server.port = server_port;
        }
        if let Some(eligibility_base_url) = overrides.eligibility_base_url {
            self.eligibility.base_url = eligibility_base_url;
        }
        if let Some(auth_base_url) = overrides.auth_base_url {
            self.auth.base_url = auth_base_url;
        }
        if let Some(auth_service_key) = overrides.auth_service_key {
            self.auth.service_key = secret_value(auth_service_key);
        }
        if let Some(storage_root_dir) = overrides.storage_root_dir {
            self.storage.root_dir = storage_root_dir;
        }
        if let Some(escrow_enabled) = overrides.escrow_enabled {
            self.escrow.enabled = escrow_enabled;
        }
        if let Some(escrow_base_url) = overrides.escrow_base_url {
            self.escrow.base_url = Some(escrow_base_url);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_server(&self.server)?;
        validate_endpoint("eligibility.base_url", &self.eligibility.base_url)?;
        validate_endpoint("auth.base_url", &self.auth.base_url)?;
        validate_endpoint("cep.base_url", &self.cep.base_url)?;
        validate_storage(&self.storage)?;
        validate_escrow(&self.escrow)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("cotar.toml"), PathBuf::from("config/cotar.toml")]
        .into_iter()
        .find(|path| path.exists())
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

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }
    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }
    validate_endpoint("server.public_base_url", &server.public_base_url)
}

fn validate_endpoint(key: &str, base_url: &str) -> Result<(), ConfigError> {
    let trimmed = base_url.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Validation(format!("{key} must not be empty")));
    }
    if !trimmed.starts_with("http://") && !trimmed.starts_with("https://") {
        return Err(ConfigError::Validation(format!("{key} must be an http(s) URL")));
    }
    Ok(())
}

fn validate_storage(storage: &StorageConfig) -> Result<(), ConfigError> {
    if storage.root_dir.as_os_str().is_empty() {
        return Err(ConfigError::Validation("storage.root_dir must not be empty".to_string()));
    }
    if !storage.public_path.starts_with('/') {
        return Err(ConfigError::Validation(
            "storage.public_path must start with `/`".to_string(),
        ));
    }
    Ok(())
}

fn validate_escrow(escrow: &EscrowConfig) -> Result<(), ConfigError> {
    if !escrow.enabled {
        return Ok(());
    }
    match &escrow.base_url {
        Some(base_url) => validate_endpoint("escrow.base_url", base_url)?,
        None => {
            return Err(ConfigError::Validation(
                "escrow.base_url is required when escrow.enabled is true".to_string(),
            ));
        }
    }
    let missing_key = escrow
        .api_key
        .as_ref()
        .map(|value| value.expose_secret().trim().is_empty())
        .unwrap_or(true);
    if missing_key {
        return Err(ConfigError::Validation(
            "escrow.api_key is required when escrow.enabled is true".to_string(),
        ));
    }
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    match logging.level.trim().to_ascii_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        other => Err(ConfigError::Validation(format!(
            "unsupported logging.level `{other}` (expected trace|debug|info|warn|error)"
        ))),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
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

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidEnvOverride {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}
