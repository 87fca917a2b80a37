use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use salescast_core::config::{AppConfig, LoadOptions};
use secrecy::{ExposeSecret, SecretString};
use toml::Value;

/// Key path, optional environment override and rendered value.
struct Entry {
    key: &'static str,
    env_keys: &'static [&'static str],
    value: String,
}

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for entry in entries(&config) {
        let source = field_source(
            entry.key,
            entry.env_keys,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(render_line(entry.key, &entry.value, source));
    }
    lines.push(format!("- llm.credential_mode = {:?} (derived)", config.llm.credential_mode()));

    lines.join("\n")
}

fn entries(config: &AppConfig) -> Vec<Entry> {
    let llm = &config.llm;

    vec![
        entry("database.url", &["SALESCAST_DATABASE_URL"], config.database.url.clone()),
        entry(
            "database.max_connections",
            &["SALESCAST_DATABASE_MAX_CONNECTIONS"],
            config.database.max_connections.to_string(),
        ),
        entry(
            "database.timeout_secs",
            &["SALESCAST_DATABASE_TIMEOUT_SECS"],
            config.database.timeout_secs.to_string(),
        ),
        entry(
            "llm.credentials",
            &["SALESCAST_LLM_CREDENTIALS"],
            redact_secret(llm.credentials.as_ref()),
        ),
        entry(
            "llm.client_id",
            &["SALESCAST_LLM_CLIENT_ID"],
            llm.client_id.clone().unwrap_or_else(|| "<unset>".to_string()),
        ),
        entry(
            "llm.client_secret",
            &["SALESCAST_LLM_CLIENT_SECRET"],
            redact_secret(llm.client_secret.as_ref()),
        ),
        entry("llm.auth_key", &["SALESCAST_LLM_AUTH_KEY"], redact_secret(llm.auth_key.as_ref())),
        entry("llm.scope", &["SALESCAST_LLM_SCOPE"], llm.scope.clone()),
        entry("llm.auth_url", &["SALESCAST_LLM_AUTH_URL"], llm.auth_url.clone()),
        entry("llm.base_url", &["SALESCAST_LLM_BASE_URL"], llm.base_url.clone()),
        entry("llm.model", &["SALESCAST_LLM_MODEL"], llm.model.clone()),
        entry("llm.timeout_secs", &["SALESCAST_LLM_TIMEOUT_SECS"], llm.timeout_secs.to_string()),
        entry("llm.max_attempts", &["SALESCAST_LLM_MAX_ATTEMPTS"], llm.max_attempts.to_string()),
        entry(
            "llm.retry_base_delay_ms",
            &["SALESCAST_LLM_RETRY_BASE_DELAY_MS"],
            llm.retry_base_delay_ms.to_string(),
        ),
        entry(
            "llm.accept_invalid_certs",
            &["SALESCAST_LLM_ACCEPT_INVALID_CERTS"],
            llm.accept_invalid_certs.to_string(),
        ),
        entry(
            "server.bind_address",
            &["SALESCAST_SERVER_BIND_ADDRESS"],
            config.server.bind_address.clone(),
        ),
        entry("server.port", &["SALESCAST_SERVER_PORT"], config.server.port.to_string()),
        entry(
            "upload.max_bytes",
            &["SALESCAST_UPLOAD_MAX_BYTES"],
            config.upload.max_bytes.to_string(),
        ),
        entry(
            "logging.level",
            &["SALESCAST_LOGGING_LEVEL", "SALESCAST_LOG_LEVEL"],
            config.logging.level.clone(),
        ),
        entry(
            "logging.format",
            &["SALESCAST_LOGGING_FORMAT", "SALESCAST_LOG_FORMAT"],
            format!("{:?}", config.logging.format),
        ),
    ]
}

fn entry(key: &'static str, env_keys: &'static [&'static str], value: String) -> Entry {
    Entry { key, env_keys, value }
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("salescast.toml"), PathBuf::from("config/salescast.toml")]
        .into_iter()
        .find(|path| path.exists())
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

fn redact_secret(secret: Option<&SecretString>) -> String {
    match secret.map(|secret| secret.expose_secret().trim().len()) {
        None => "<unset>".to_string(),
        Some(0) => "<empty>".to_string(),
        Some(_) => "<redacted>".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;
    use toml::Value;

    use super::{contains_path, redact_secret};

    #[test]
    fn secrets_never_render_their_value() {
        let secret = SecretString::from("super-secret-key".to_string());
        assert_eq!(redact_secret(Some(&secret)), "<redacted>");
        assert_eq!(redact_secret(None), "<unset>");
        assert_eq!(redact_secret(Some(&SecretString::from("  ".to_string()))), "<empty>");
    }

    #[test]
    fn nested_keys_are_found_in_config_documents() {
        let doc: Value = "[llm]\nmodel = \"GigaChat-Pro\"\n".parse().expect("valid toml");
        assert!(contains_path(&doc, "llm.model"));
        assert!(!contains_path(&doc, "llm.scope"));
        assert!(!contains_path(&doc, "server.port"));
    }
}
