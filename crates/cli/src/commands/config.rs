use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::ExposeSecret;
use talentscout_core::config::{AppConfig, LoadOptions};
use toml::Value;

/// Renders every effective setting with the layer it came from.
pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let sources = Sources { doc: config_file_doc.as_ref(), path: config_file_path.as_deref() };

    let api_key = match &config.llm.api_key {
        Some(key) => redact_secret(key.expose_secret()),
        None => "<unset>".to_string(),
    };
    let taxonomy_path = config
        .taxonomy
        .path
        .as_ref()
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "<builtin>".to_string());

    let settings = vec![
        setting("app.name", config.app.name.clone(), &["TALENTSCOUT_APP_NAME"]),
        setting("app.debug_mode", config.app.debug_mode.to_string(), &["TALENTSCOUT_DEBUG_MODE"]),
        setting("llm.provider", config.llm.provider.as_str().to_string(), &["TALENTSCOUT_LLM_PROVIDER"]),
        setting("llm.model", config.llm.model.clone(), &["TALENTSCOUT_LLM_MODEL"]),
        setting(
            "llm.base_url",
            config.llm.base_url.clone().unwrap_or_else(|| "<provider default>".to_string()),
            &["TALENTSCOUT_LLM_BASE_URL"],
        ),
        setting("llm.api_key", api_key, &["TALENTSCOUT_LLM_API_KEY", "OPENAI_API_KEY"]),
        setting("llm.timeout_secs", config.llm.timeout_secs.to_string(), &["TALENTSCOUT_LLM_TIMEOUT_SECS"]),
        setting("interview.min_per_technology", config.interview.min_per_technology.to_string(), &[]),
        setting(
            "interview.max_per_technology",
            config.interview.max_per_technology.to_string(),
            &["TALENTSCOUT_INTERVIEW_MAX_PER_TECHNOLOGY"],
        ),
        setting(
            "interview.max_total",
            config.interview.max_total.to_string(),
            &["TALENTSCOUT_INTERVIEW_MAX_TOTAL"],
        ),
        setting(
            "interview.tailored_per_technology",
            config.interview.tailored_per_technology.to_string(),
            &[],
        ),
        setting("taxonomy.path", taxonomy_path, &["TALENTSCOUT_TAXONOMY_PATH"]),
        setting("database.url", config.database.url.clone(), &["TALENTSCOUT_DATABASE_URL"]),
        setting(
            "database.max_connections",
            config.database.max_connections.to_string(),
            &["TALENTSCOUT_DATABASE_MAX_CONNECTIONS"],
        ),
        setting(
            "database.timeout_secs",
            config.database.timeout_secs.to_string(),
            &["TALENTSCOUT_DATABASE_TIMEOUT_SECS"],
        ),
        setting("privacy.encrypt_data", config.privacy.encrypt_data.to_string(), &["TALENTSCOUT_ENCRYPT_DATA"]),
        setting(
            "privacy.data_retention_days",
            config.privacy.data_retention_days.to_string(),
            &["TALENTSCOUT_DATA_RETENTION_DAYS"],
        ),
        setting(
            "privacy.identity_path",
            config.privacy.identity_path.display().to_string(),
            &["TALENTSCOUT_IDENTITY_PATH"],
        ),
        setting("logging.level", config.logging.level.clone(), &["TALENTSCOUT_LOGGING_LEVEL", "TALENTSCOUT_LOG_LEVEL"]),
        setting(
            "logging.format",
            format!("{:?}", config.logging.format).to_lowercase(),
            &["TALENTSCOUT_LOGGING_FORMAT", "TALENTSCOUT_LOG_FORMAT"],
        ),
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    lines.extend(
        settings
            .into_iter()
            .map(|(key, value, env_keys)| render_line(key, &value, sources.field_source(key, env_keys))),
    );
    lines.join("\n")
}

type Setting = (&'static str, String, &'static [&'static str]);

fn setting(key: &'static str, value: String, env_keys: &'static [&'static str]) -> Setting {
    (key, value, env_keys)
}

struct Sources<'a> {
    doc: Option<&'a Value>,
    path: Option<&'a Path>,
}

impl Sources<'_> {
    fn field_source(&self, key_path: &str, env_keys: &[&str]) -> String {
        if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
            return format!("env ({env_key})");
        }

        if self.doc.is_some_and(|doc| contains_path(doc, key_path)) {
            let file_path = self
                .path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }

        "default".to_string()
    }
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("talentscout.toml"), PathBuf::from("config/talentscout.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let raw = fs::read_to_string(path?).ok()?;
    raw.parse::<Value>().ok()
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

/// Keeps a recognisable key prefix such as `sk-` and hides the rest.
fn redact_secret(secret: &str) -> String {
    let trimmed = secret.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    if let Some((prefix, _)) = trimmed.split_once('-') {
        return format!("{prefix}-***");
    }

    "<redacted>".to_string()
}
