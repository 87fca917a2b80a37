use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_AUTH_URL: &str = "https://ngw.devices.sberbank.ru:9443/api/v2/oauth";
pub const DEFAULT_BASE_URL: &str = "https://gigachat.devices.sberbank.ru/api/v1";
pub const DEFAULT_SCOPE: &str = "GIGACHAT_API_PERS";
pub const DEFAULT_MODEL: &str = "GigaChat";
pub const DEFAULT_UPLOAD_MAX_BYTES: usize = 10 * 1024 * 1024;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub llm: LlmConfig,
    pub server: ServerConfig,
    pub upload: UploadConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

/// Forecasting vendor settings. Credentials are all optional; without any
/// of them the forecasting client runs in mock mode.
#[derive(Clone, Debug)]
pub struct LlmConfig {
    /// Pre-issued bearer token, used as-is with no token call.
    pub credentials: Option<SecretString>,
    pub client_id: Option<String>,
    pub client_secret: Option<SecretString>,
    /// Pre-encoded Basic authorization key.
    pub auth_key: Option<SecretString>,
    pub scope: String,
    pub auth_url: String,
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
    pub token_timeout_secs: u64,
    pub max_attempts: u32,
    pub retry_base_delay_ms: u64,
    pub max_tokens: u32,
    pub temperature: f32,
    pub accept_invalid_certs: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialMode {
    Legacy,
    AuthKey,
    ClientPair,
    None,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
    pub cors_allow_any_origin: bool,
}

#[derive(Clone, Debug)]
pub struct UploadConfig {
    pub max_bytes: usize,
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
    pub llm_base_url: Option<String>,
    pub llm_model: Option<String>,
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
                url: "sqlite://salescast.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            llm: LlmConfig {
                credentials: None,
                client_id: None,
                client_secret: None,
                auth_key: None,
                scope: DEFAULT_SCOPE.to_string(),
                auth_url: DEFAULT_AUTH_URL.to_string(),
                base_url: DEFAULT_BASE_URL.to_string(),
                model: DEFAULT_MODEL.to_string(),
                timeout_secs: 60,
                token_timeout_secs: 60,
                max_attempts: 3,
                retry_base_delay_ms: 2_000,
                max_tokens: 2_000,
                temperature: 0.1,
                accept_invalid_certs: false,
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8000,
                graceful_shutdown_secs: 15,
                cors_allow_any_origin: true,
            },
            upload: UploadConfig { max_bytes: DEFAULT_UPLOAD_MAX_BYTES },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

/// Blank secrets count as unset.
fn present(secret: &Option<SecretString>) -> bool {
    secret.as_ref().is_some_and(|value| !value.expose_secret().trim().is_empty())
}

impl LlmConfig {
    /// Which credential set authenticates vendor calls, in precedence order.
    pub fn credential_mode(&self) -> CredentialMode {
        let has_client_id =
            self.client_id.as_ref().is_some_and(|value| !value.trim().is_empty());
        if present(&self.credentials) {
            CredentialMode::Legacy
        } else if present(&self.auth_key) {
            CredentialMode::AuthKey
        } else if has_client_id && present(&self.client_secret) {
            CredentialMode::ClientPair
        } else {
            CredentialMode::None
        }
    }

    pub fn is_mock(&self) -> bool {
        self.credential_mode() == CredentialMode::None
    }
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

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("salescast.toml"));
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

        if let Some(llm) = patch.llm {
            if let Some(credentials) = llm.credentials {
                self.llm.credentials = Some(secret_value(credentials));
            }
            if let Some(client_id) = llm.client_id {
                self.llm.client_id = Some(client_id);
            }
            if let Some(client_secret) = llm.client_secret {
                self.llm.client_secret = Some(secret_value(client_secret));
            }
            if let Some(auth_key) = llm.auth_key {
                self.llm.auth_key = Some(secret_value(auth_key));
            }
            if let Some(scope) = llm.scope {
                self.llm.scope = scope;
            }
            if let Some(auth_url) = llm.auth_url {
                self.llm.auth_url = auth_url;
            }
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = base_url;
            }
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = timeout_secs;
            }
            if let Some(token_timeout_secs) = llm.token_timeout_secs {
                self.llm.token_timeout_secs = token_timeout_secs;
            }
            if let Some(max_attempts) = llm.max_attempts {
                self.llm.max_attempts = max_attempts;
            }
            if let Some(retry_base_delay_ms) = llm.retry_base_delay_ms {
                self.llm.retry_base_delay_ms = retry_base_delay_ms;
            }
            if let Some(max_tokens) = llm.max_tokens {
                self.llm.max_tokens = max_tokens;
            }
            if let Some(temperature) = llm.temperature {
                self.llm.temperature = temperature;
            }
            if let Some(accept_invalid_certs) = llm.accept_invalid_certs {
                self.llm.accept_invalid_certs = accept_invalid_certs;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
            if let Some(cors_allow_any_origin) = server.cors_allow_any_origin {
                self.server.cors_allow_any_origin = cors_allow_any_origin;
            }
        }

        if let Some(upload) = patch.upload {
            if let Some(max_bytes) = upload.max_bytes {
                self.upload.max_bytes = max_bytes;
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
        if let Some(value) = read_env("SALESCAST_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("SALESCAST_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections =
                parse_env("SALESCAST_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("SALESCAST_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_env("SALESCAST_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("SALESCAST_LLM_CREDENTIALS") {
            self.llm.credentials = Some(secret_value(value));
        }
        if let Some(value) = read_env("SALESCAST_LLM_CLIENT_ID") {
            self.llm.client_id = Some(value);
        }
        if let Some(value) = read_env("SALESCAST_LLM_CLIENT_SECRET") {
            self.llm.client_secret = Some(secret_value(value));
        }
        if let Some(value) = read_env("SALESCAST_LLM_AUTH_KEY") {
            self.llm.auth_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("SALESCAST_LLM_SCOPE") {
            self.llm.scope = value;
        }
        if let Some(value) = read_env("SALESCAST_LLM_AUTH_URL") {
            self.llm.auth_url = value;
        }
        if let Some(value) = read_env("SALESCAST_LLM_BASE_URL") {
            self.llm.base_url = value;
        }
        if let Some(value) = read_env("SALESCAST_LLM_MODEL") {
            self.llm.model = value;
        }
        if let Some(value) = read_env("SALESCAST_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_env("SALESCAST_LLM_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("SALESCAST_LLM_MAX_ATTEMPTS") {
            self.llm.max_attempts = parse_env("SALESCAST_LLM_MAX_ATTEMPTS", &value)?;
        }
        if let Some(value) = read_env("SALESCAST_LLM_RETRY_BASE_DELAY_MS") {
            self.llm.retry_base_delay_ms =
                parse_env("SALESCAST_LLM_RETRY_BASE_DELAY_MS", &value)?;
        }
        if let Some(value) = read_env("SALESCAST_LLM_ACCEPT_INVALID_CERTS") {
            self.llm.accept_invalid_certs =
                parse_env("SALESCAST_LLM_ACCEPT_INVALID_CERTS", &value)?;
        }

        if let Some(value) = read_env("SALESCAST_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("SALESCAST_SERVER_PORT") {
            self.server.port = parse_env("SALESCAST_SERVER_PORT", &value)?;
        }

        if let Some(value) = read_env("SALESCAST_UPLOAD_MAX_BYTES") {
            self.upload.max_bytes = parse_env("SALESCAST_UPLOAD_MAX_BYTES", &value)?;
        }

        let log_level =
            read_env("SALESCAST_LOGGING_LEVEL").or_else(|| read_env("SALESCAST_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("SALESCAST_LOGGING_FORMAT").or_else(|| read_env("SALESCAST_LOG_FORMAT"));
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
        if let Some(llm_base_url) = overrides.llm_base_url {
            self.llm.base_url = llm_base_url;
        }
        if let Some(llm_model) = overrides.llm_model {
            self.llm.model = llm_model;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_llm(&self.llm)?;
        validate_server(&self.server)?;
        validate_upload(&self.upload)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("salescast.toml"), PathBuf::from("config/salescast.toml")]
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

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    for (key, url) in [("llm.auth_url", &llm.auth_url), ("llm.base_url", &llm.base_url)] {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ConfigError::Validation(format!(
                "{key} must start with http:// or https://"
            )));
        }
    }

    if llm.timeout_secs == 0 || llm.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "llm.timeout_secs must be in range 1..=300".to_string(),
        ));
    }
    if llm.token_timeout_secs == 0 || llm.token_timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "llm.token_timeout_secs must be in range 1..=300".to_string(),
        ));
    }
    if llm.max_attempts == 0 || llm.max_attempts > 10 {
        return Err(ConfigError::Validation(
            "llm.max_attempts must be in range 1..=10".to_string(),
        ));
    }
    if llm.max_tokens == 0 {
        return Err(ConfigError::Validation(
            "llm.max_tokens must be greater than zero".to_string(),
        ));
    }
    if !(0.0..=2.0).contains(&llm.temperature) {
        return Err(ConfigError::Validation(
            "llm.temperature must be in range 0.0..=2.0".to_string(),
        ));
    }

    let has_client_id = llm.client_id.as_ref().is_some_and(|value| !value.trim().is_empty());
    if has_client_id != present(&llm.client_secret) && llm.credential_mode() == CredentialMode::None
    {
        return Err(ConfigError::Validation(
            "llm.client_id and llm.client_secret must be configured together".to_string(),
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

    Ok(())
}

fn validate_upload(upload: &UploadConfig) -> Result<(), ConfigError> {
    if upload.max_bytes == 0 {
        return Err(ConfigError::Validation(
            "upload.max_bytes must be greater than zero".to_string(),
        ));
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

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse::<T>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    llm: Option<LlmPatch>,
    server: Option<ServerPatch>,
    upload: Option<UploadPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    credentials: Option<String>,
    client_id: Option<String>,
    client_secret: Option<String>,
    auth_key: Option<String>,
    scope: Option<String>,
    auth_url: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
    token_timeout_secs: Option<u64>,
    max_attempts: Option<u32>,
    retry_base_delay_ms: Option<u64>,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
    accept_invalid_certs: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
    cors_allow_any_origin: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct UploadPatch {
    max_bytes: Option<usize>,
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
    use std::sync::{Mutex, OnceLock};

    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use super::{
        AppConfig, ConfigError, ConfigOverrides, CredentialMode, LoadOptions, LogFormat,
        DEFAULT_UPLOAD_MAX_BYTES,
    };

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
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
    fn defaults_run_in_mock_mode() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let config = AppConfig::load(LoadOptions::default())
            .map_err(|err| format!("config load failed: {err}"))?;

        ensure(config.llm.is_mock(), "no credentials should mean mock mode")?;
        ensure(config.llm.max_attempts == 3, "three token attempts by default")?;
        ensure(config.upload.max_bytes == DEFAULT_UPLOAD_MAX_BYTES, "10 MiB upload limit")?;
        ensure(config.server.port == 8000, "default port should be 8000")?;
        ensure(
            matches!(config.logging.format, LogFormat::Compact),
            "default logging format should be compact",
        )
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_SALESCAST_CLIENT_ID", "client-from-env");
        env::set_var("TEST_SALESCAST_CLIENT_SECRET", "secret-from-env");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("salescast.toml");
            fs::write(
                &path,
                r#"
[llm]
client_id = "${TEST_SALESCAST_CLIENT_ID}"
client_secret = "${TEST_SALESCAST_CLIENT_SECRET}"
retry_base_delay_ms = 250
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.llm.client_id.as_deref() == Some("client-from-env"),
                "client id should be loaded from environment",
            )?;
            ensure(
                config.llm.client_secret.as_ref().map(|s| s.expose_secret().to_string())
                    == Some("secret-from-env".to_string()),
                "client secret should be loaded from environment",
            )?;
            ensure(
                config.llm.credential_mode() == CredentialMode::ClientPair,
                "client pair should select the OAuth credential mode",
            )?;
            ensure(config.llm.retry_base_delay_ms == 250, "file value should replace default")?;
            Ok(())
        })();

        clear_vars(&["TEST_SALESCAST_CLIENT_ID", "TEST_SALESCAST_CLIENT_SECRET"]);
        result
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("SALESCAST_LOG_LEVEL", "warn");
        env::set_var("SALESCAST_LOG_FORMAT", "json");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warning log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Json),
                "json logging format should be set from env var",
            )?;
            Ok(())
        })();

        clear_vars(&["SALESCAST_LOG_LEVEL", "SALESCAST_LOG_FORMAT"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("SALESCAST_DATABASE_URL", "sqlite://from-env.db");
        env::set_var("SALESCAST_LLM_MODEL", "GigaChat-Pro");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("salescast.toml");
            fs::write(
                &path,
                r#"
[database]
url = "sqlite://from-file.db"

[llm]
model = "GigaChat-Lite"

[server]
port = 9000

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    database_url: Some("sqlite://from-override.db".to_string()),
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.database.url == "sqlite://from-override.db",
                "override database url should win",
            )?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            ensure(config.llm.model == "GigaChat-Pro", "env model should win over file")?;
            ensure(config.server.port == 9000, "file port should win over default")?;
            Ok(())
        })();

        clear_vars(&["SALESCAST_DATABASE_URL", "SALESCAST_LLM_MODEL"]);
        result
    }

    #[test]
    fn invalid_env_override_is_reported_with_its_key() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("SALESCAST_SERVER_PORT", "eighty");

        let result = match AppConfig::load(LoadOptions::default()) {
            Err(ConfigError::InvalidEnvOverride { key, .. }) => {
                ensure(key == "SALESCAST_SERVER_PORT", "error should name the env key")
            }
            Err(other) => Err(format!("unexpected error: {other}")),
            Ok(_) => Err("expected invalid override to fail".to_string()),
        };

        clear_vars(&["SALESCAST_SERVER_PORT"]);
        result
    }

    #[test]
    fn validation_fails_fast_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("SALESCAST_DATABASE_URL", "postgres://localhost/sales");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("database.url")
            );
            ensure(has_message, "validation failure should mention database.url")
        })();

        clear_vars(&["SALESCAST_DATABASE_URL"]);
        result
    }

    #[test]
    fn half_configured_client_pair_is_rejected() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("SALESCAST_LLM_CLIENT_ID", "only-the-id");

        let result = match AppConfig::load(LoadOptions::default()) {
            Err(ConfigError::Validation(message)) => {
                ensure(message.contains("llm.client_secret"), "error should name the secret")
            }
            other => Err(format!("unexpected result: {other:?}")),
        };

        clear_vars(&["SALESCAST_LLM_CLIENT_ID"]);
        result
    }

    #[test]
    fn credential_precedence_prefers_legacy_token() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("SALESCAST_LLM_CREDENTIALS", "legacy-token");
        env::set_var("SALESCAST_LLM_AUTH_KEY", "encoded-key");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;
            ensure(
                config.llm.credential_mode() == CredentialMode::Legacy,
                "legacy credentials take precedence",
            )?;
            ensure(!config.llm.is_mock(), "configured credentials disable mock mode")
        })();

        clear_vars(&["SALESCAST_LLM_CREDENTIALS", "SALESCAST_LLM_AUTH_KEY"]);
        result
    }

    #[test]
    fn secret_values_are_not_leaked_by_debug() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("SALESCAST_LLM_AUTH_KEY", "auth-key-secret-value");
        env::set_var("SALESCAST_LLM_CREDENTIALS", "legacy-secret-value");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;
            let debug = format!("{config:?}");

            ensure(
                !debug.contains("auth-key-secret-value"),
                "debug output should not contain the auth key",
            )?;
            ensure(
                !debug.contains("legacy-secret-value"),
                "debug output should not contain the legacy token",
            )?;
            Ok(())
        })();

        clear_vars(&["SALESCAST_LLM_AUTH_KEY", "SALESCAST_LLM_CREDENTIALS"]);
        result
    }
}
