use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub app: ApplicationConfig,
    pub llm: LlmConfig,
    pub interview: InterviewConfig,
    pub taxonomy: TaxonomyConfig,
    pub database: DatabaseConfig,
    pub privacy: PrivacyConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct ApplicationConfig {
    pub name: String,
    pub debug_mode: bool,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub api_key: Option<SecretString>,
    pub base_url: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Question-generation policy knobs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InterviewConfig {
    pub min_per_technology: usize,
    pub max_per_technology: usize,
    pub max_total: usize,
    /// Slots per technology reserved for LLM-tailored questions.
    pub tailored_per_technology: usize,
}

#[derive(Clone, Debug, Default)]
pub struct TaxonomyConfig {
    pub path: Option<PathBuf>,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct PrivacyConfig {
    pub encrypt_data: bool,
    pub data_retention_days: u32,
    pub identity_path: PathBuf,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    Disabled,
    OpenAi,
    Anthropic,
    Ollama,
}

impl LlmProvider {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
            Self::Ollama => "ollama",
        }
    }
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
    pub debug_mode: Option<bool>,
    pub llm_provider: Option<LlmProvider>,
    pub llm_model: Option<String>,
    pub encrypt_data: Option<bool>,
    pub data_retention_days: Option<u32>,
    pub taxonomy_path: Option<PathBuf>,
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
            app: ApplicationConfig {
                name: "TalentScout Hiring Assistant".to_string(),
                debug_mode: false,
            },
            llm: LlmConfig {
                provider: LlmProvider::Disabled,
                api_key: None,
                base_url: None,
                model: "gpt-3.5-turbo".to_string(),
                timeout_secs: 20,
                max_tokens: 600,
                temperature: 0.7,
            },
            interview: InterviewConfig::default(),
            taxonomy: TaxonomyConfig::default(),
            database: DatabaseConfig {
                url: "sqlite://talentscout.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            privacy: PrivacyConfig {
                encrypt_data: true,
                data_retention_days: 30,
                identity_path: PathBuf::from("data/identity.key"),
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl Default for InterviewConfig {
    fn default() -> Self {
        Self { min_per_technology: 3, max_per_technology: 5, max_total: 15, tailored_per_technology: 0 }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "disabled" | "none" | "off" => Ok(Self::Disabled),
            "openai" => Ok(Self::OpenAi),
            "anthropic" => Ok(Self::Anthropic),
            "ollama" => Ok(Self::Ollama),
            other => Err(ConfigError::Validation(format!(
                "unsupported llm provider `{other}` (expected disabled|openai|anthropic|ollama)"
            ))),
        }
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
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from("talentscout.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.apply_provider_key_fallback();
        config.validate()?;

        Ok(config)
    }

    /// `debug_mode` forces debug logging regardless of `logging.level`.
    pub fn effective_log_level(&self) -> &str {
        if self.app.debug_mode {
            "debug"
        } else {
            self.logging.level.as_str()
        }
    }

    pub fn llm_enabled(&self) -> bool {
        self.llm.provider != LlmProvider::Disabled
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(app) = patch.app {
            if let Some(name) = app.name {
                self.app.name = name;
            }
            if let Some(debug_mode) = app.debug_mode {
                self.app.debug_mode = debug_mode;
            }
        }

        if let Some(llm) = patch.llm {
            if let Some(provider) = llm.provider {
                self.llm.provider = provider;
            }
            if let Some(api_key) = llm.api_key {
                self.llm.api_key = Some(secret_value(api_key));
            }
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = Some(base_url);
            }
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = timeout_secs;
            }
            if let Some(max_tokens) = llm.max_tokens {
                self.llm.max_tokens = max_tokens;
            }
            if let Some(temperature) = llm.temperature {
                self.llm.temperature = temperature;
            }
        }

        if let Some(interview) = patch.interview {
            if let Some(value) = interview.min_per_technology {
                self.interview.min_per_technology = value;
            }
            if let Some(value) = interview.max_per_technology {
                self.interview.max_per_technology = value;
            }
            if let Some(value) = interview.max_total {
                self.interview.max_total = value;
            }
            if let Some(value) = interview.tailored_per_technology {
                self.interview.tailored_per_technology = value;
            }
        }

        if let Some(taxonomy) = patch.taxonomy {
            if let Some(path) = taxonomy.path {
                self.taxonomy.path = Some(path);
            }
        }

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

        if let Some(privacy) = patch.privacy {
            if let Some(encrypt_data) = privacy.encrypt_data {
                self.privacy.encrypt_data = encrypt_data;
            }
            if let Some(days) = privacy.data_retention_days {
                self.privacy.data_retention_days = days;
            }
            if let Some(identity_path) = privacy.identity_path {
                self.privacy.identity_path = identity_path;
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
        if let Some(value) = read_env("TALENTSCOUT_APP_NAME") {
            self.app.name = value;
        }
        if let Some(value) = read_env("TALENTSCOUT_DEBUG_MODE") {
            self.app.debug_mode = parse_bool("TALENTSCOUT_DEBUG_MODE", &value)?;
        }

        if let Some(value) = read_env("TALENTSCOUT_LLM_PROVIDER") {
            self.llm.provider = value.parse()?;
        }
        if let Some(value) = read_env("TALENTSCOUT_LLM_API_KEY") {
            self.llm.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("TALENTSCOUT_LLM_BASE_URL") {
            self.llm.base_url = Some(value);
        }
        if let Some(value) = read_env("TALENTSCOUT_LLM_MODEL") {
            self.llm.model = value;
        }
        if let Some(value) = read_env("TALENTSCOUT_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_u64("TALENTSCOUT_LLM_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("TALENTSCOUT_INTERVIEW_MAX_PER_TECHNOLOGY") {
            self.interview.max_per_technology =
                parse_usize("TALENTSCOUT_INTERVIEW_MAX_PER_TECHNOLOGY", &value)?;
        }
        if let Some(value) = read_env("TALENTSCOUT_INTERVIEW_MAX_TOTAL") {
            self.interview.max_total = parse_usize("TALENTSCOUT_INTERVIEW_MAX_TOTAL", &value)?;
        }

        if let Some(value) = read_env("TALENTSCOUT_TAXONOMY_PATH") {
            self.taxonomy.path = Some(PathBuf::from(value));
        }

        if let Some(value) = read_env("TALENTSCOUT_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("TALENTSCOUT_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections =
                parse_u32("TALENTSCOUT_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("TALENTSCOUT_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("TALENTSCOUT_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("TALENTSCOUT_ENCRYPT_DATA") {
            self.privacy.encrypt_data = parse_bool("TALENTSCOUT_ENCRYPT_DATA", &value)?;
        }
        if let Some(value) = read_env("TALENTSCOUT_DATA_RETENTION_DAYS") {
            self.privacy.data_retention_days =
                parse_u32("TALENTSCOUT_DATA_RETENTION_DAYS", &value)?;
        }
        if let Some(value) = read_env("TALENTSCOUT_IDENTITY_PATH") {
            self.privacy.identity_path = PathBuf::from(value);
        }

        let log_level =
            read_env("TALENTSCOUT_LOGGING_LEVEL").or_else(|| read_env("TALENTSCOUT_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("TALENTSCOUT_LOGGING_FORMAT").or_else(|| read_env("TALENTSCOUT_LOG_FORMAT"));
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
        if let Some(debug_mode) = overrides.debug_mode {
            self.app.debug_mode = debug_mode;
        }
        if let Some(llm_provider) = overrides.llm_provider {
            self.llm.provider = llm_provider;
        }
        if let Some(llm_model) = overrides.llm_model {
            self.llm.model = llm_model;
        }
        if let Some(encrypt_data) = overrides.encrypt_data {
            self.privacy.encrypt_data = encrypt_data;
        }
        if let Some(days) = overrides.data_retention_days {
            self.privacy.data_retention_days = days;
        }
        if let Some(path) = overrides.taxonomy_path {
            self.taxonomy.path = Some(path);
        }
    }

    /// Falls back to the provider's conventional key variable when no key was configured.
    fn apply_provider_key_fallback(&mut self) {
        if self.llm.api_key.is_some() {
            return;
        }
        let fallback = match self.llm.provider {
            LlmProvider::OpenAi => read_env("OPENAI_API_KEY"),
            LlmProvider::Anthropic => read_env("ANTHROPIC_API_KEY"),
            LlmProvider::Ollama | LlmProvider::Disabled => None,
        };
        self.llm.api_key = fallback.map(secret_value);
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_app(&self.app)?;
        validate_llm(&self.llm)?;
        validate_interview(&self.interview)?;
        validate_database(&self.database)?;
        validate_privacy(&self.privacy)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("talentscout.toml"), PathBuf::from("config/talentscout.toml")]
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

fn validate_app(app: &ApplicationConfig) -> Result<(), ConfigError> {
    if app.name.trim().is_empty() {
        return Err(ConfigError::Validation("app.name must not be empty".to_string()));
    }
    Ok(())
}

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    if llm.timeout_secs == 0 || llm.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "llm.timeout_secs must be in range 1..=300".to_string(),
        ));
    }
    if !(0.0..=2.0).contains(&llm.temperature) {
        return Err(ConfigError::Validation(
            "llm.temperature must be in range 0.0..=2.0".to_string(),
        ));
    }
    if llm.max_tokens == 0 {
        return Err(ConfigError::Validation(
            "llm.max_tokens must be greater than zero".to_string(),
        ));
    }

    match llm.provider {
        LlmProvider::Disabled => {}
        LlmProvider::OpenAi | LlmProvider::Anthropic => {
            let missing = llm
                .api_key
                .as_ref()
                .map(|value| value.expose_secret().trim().is_empty())
                .unwrap_or(true);
            if missing {
                return Err(ConfigError::Validation(
                    "llm.api_key is required for openai/anthropic providers (or set OPENAI_API_KEY / ANTHROPIC_API_KEY)"
                        .to_string(),
                ));
            }
        }
        LlmProvider::Ollama => {
            let missing =
                llm.base_url.as_ref().map(|value| value.trim().is_empty()).unwrap_or(true);
            if missing {
                return Err(ConfigError::Validation(
                    "llm.base_url is required for ollama provider".to_string(),
                ));
            }
        }
    }

    if let Some(base_url) = &llm.base_url {
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ConfigError::Validation(
                "llm.base_url must start with http:// or https://".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_interview(interview: &InterviewConfig) -> Result<(), ConfigError> {
    if interview.min_per_technology == 0 {
        return Err(ConfigError::Validation(
            "interview.min_per_technology must be greater than zero".to_string(),
        ));
    }
    if interview.max_per_technology < interview.min_per_technology
        || interview.max_per_technology > 10
    {
        return Err(ConfigError::Validation(
            "interview.max_per_technology must be in range min_per_technology..=10".to_string(),
        ));
    }
    if interview.max_total == 0 || interview.max_total > 50 {
        return Err(ConfigError::Validation(
            "interview.max_total must be in range 1..=50".to_string(),
        ));
    }
    if interview.tailored_per_technology > interview.max_per_technology {
        return Err(ConfigError::Validation(
            "interview.tailored_per_technology must not exceed max_per_technology".to_string(),
        ));
    }
    Ok(())
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

fn validate_privacy(privacy: &PrivacyConfig) -> Result<(), ConfigError> {
    if privacy.data_retention_days == 0 || privacy.data_retention_days > 3650 {
        return Err(ConfigError::Validation(
            "privacy.data_retention_days must be in range 1..=3650".to_string(),
        ));
    }
    if privacy.encrypt_data && privacy.identity_path.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "privacy.identity_path is required when privacy.encrypt_data is true".to_string(),
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

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.trim().parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.trim().parse::<usize>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidEnvOverride { key: key.to_string(), value: value.to_string() }),
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    app: Option<ApplicationPatch>,
    llm: Option<LlmPatch>,
    interview: Option<InterviewPatch>,
    taxonomy: Option<TaxonomyPatch>,
    database: Option<DatabasePatch>,
    privacy: Option<PrivacyPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct ApplicationPatch {
    name: Option<String>,
    debug_mode: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    provider: Option<LlmProvider>,
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
struct InterviewPatch {
    min_per_technology: Option<usize>,
    max_per_technology: Option<usize>,
    max_total: Option<usize>,
    tailored_per_technology: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct TaxonomyPatch {
    path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct PrivacyPatch {
    encrypt_data: Option<bool>,
    data_retention_days: Option<u32>,
    identity_path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
