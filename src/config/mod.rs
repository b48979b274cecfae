pub mod validation;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use self::validation::validate_config;

/// Error type for configuration loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Kind of Dify application sitting behind the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum BotType {
    Chat,
    Completion,
    #[default]
    Workflow,
}

impl BotType {
    /// Upstream path appended to `dify.api_url`.
    #[must_use]
    pub fn api_path(self) -> &'static str {
        match self {
            BotType::Chat => "/chat-messages",
            BotType::Completion => "/completion-messages",
            BotType::Workflow => "/workflows/run",
        }
    }
}

impl fmt::Display for BotType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BotType::Chat => write!(f, "Chat"),
            BotType::Completion => write!(f, "Completion"),
            BotType::Workflow => write!(f, "Workflow"),
        }
    }
}

impl FromStr for BotType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Chat" => Ok(BotType::Chat),
            "Completion" => Ok(BotType::Completion),
            "Workflow" => Ok(BotType::Workflow),
            other => Err(ConfigError::Validation(format!(
                "Invalid bot type '{other}'. Must be one of: Chat, Completion, Workflow"
            ))),
        }
    }
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_host")]
    pub host: String,
    /// Total budget in seconds for one upstream call, body included.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    #[serde(default = "default_http_pool_max_idle_per_host")]
    pub http_pool_max_idle_per_host: usize,
    #[serde(default = "default_http_pool_idle_timeout_secs")]
    pub http_pool_idle_timeout_secs: u64,
    #[serde(default)]
    pub base_path: String,
    #[serde(default)]
    pub http_use_env_proxy: bool,
}

fn default_port() -> u16 {
    3012
}
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_timeout() -> u64 {
    300
}
fn default_http_pool_max_idle_per_host() -> usize {
    16
}
fn default_http_pool_idle_timeout_secs() -> u64 {
    15
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            timeout: default_timeout(),
            http_pool_max_idle_per_host: default_http_pool_max_idle_per_host(),
            http_pool_idle_timeout_secs: default_http_pool_idle_timeout_secs(),
            base_path: String::new(),
            http_use_env_proxy: false,
        }
    }
}

/// Upstream Dify application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DifyConfig {
    #[serde(default)]
    pub api_url: String,
    #[serde(default)]
    pub bot_type: BotType,
    /// When set, the query is sent as `inputs.<input_variable>` instead of `query`.
    #[serde(default)]
    pub input_variable: Option<String>,
    /// When set, `workflow_finished` answers with `outputs.<output_variable>`.
    #[serde(default)]
    pub output_variable: Option<String>,
    #[serde(default = "default_user")]
    pub user: String,
}

fn default_user() -> String {
    "apiuser".to_string()
}

impl Default for DifyConfig {
    fn default() -> Self {
        Self {
            api_url: String::new(),
            bot_type: BotType::default(),
            input_variable: None,
            output_variable: None,
            user: default_user(),
        }
    }
}

impl DifyConfig {
    /// Full upstream endpoint for the configured bot type.
    #[must_use]
    pub fn endpoint_url(&self) -> String {
        let base = self.api_url.trim().trim_end_matches('/');
        format!("{base}{}", self.bot_type.api_path())
    }
}

/// Model advertised on `/v1/models`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ModelsConfig {
    #[serde(default)]
    pub name: Option<String>,
}

impl ModelsConfig {
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("dify")
    }
}

/// Feature flags and settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeaturesConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "INFO".to_string()
}

impl Default for FeaturesConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub dify: DifyConfig,
    #[serde(default)]
    pub models: ModelsConfig,
    #[serde(default)]
    pub features: FeaturesConfig,
}

/// Default location of the optional YAML config file.
pub const DEFAULT_CONFIG_PATH: &str = "config.yaml";

/// Load configuration from an optional YAML file plus process environment,
/// then validate it.
///
/// A missing file at [`DEFAULT_CONFIG_PATH`] is not an error; an explicitly
/// requested path must exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] when reading the file fails, [`ConfigError::Yaml`]
/// when parsing fails, or [`ConfigError::Validation`] when semantic validation fails.
pub fn load_config(path: Option<&str>) -> Result<AppConfig, ConfigError> {
    let mut config = match path {
        Some(path) => parse_config_yaml(&std::fs::read_to_string(path)?)?,
        None => match std::fs::read_to_string(DEFAULT_CONFIG_PATH) {
            Ok(contents) => parse_config_yaml(&contents)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => AppConfig::default(),
            Err(err) => return Err(err.into()),
        },
    };
    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    validate_config(&config)?;
    Ok(config)
}

/// Parse a YAML document into an [`AppConfig`] without validating it.
///
/// # Errors
///
/// Returns [`ConfigError::Yaml`] when the document is malformed.
pub fn parse_config_yaml(contents: &str) -> Result<AppConfig, ConfigError> {
    if contents.trim().is_empty() {
        return Ok(AppConfig::default());
    }
    Ok(serde_yaml::from_str(contents)?)
}

/// Overlay environment variables on top of `config`.
///
/// Empty values count as unset.
///
/// # Errors
///
/// Returns [`ConfigError::Validation`] for an unknown `BOT_TYPE` or a
/// non-numeric `PORT`.
pub fn apply_env_overrides<F>(config: &mut AppConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

    if let Some(api_url) = var("DIFY_API_URL") {
        config.dify.api_url = api_url;
    }
    if let Some(bot_type) = var("BOT_TYPE") {
        config.dify.bot_type = bot_type.trim().parse()?;
    }
    if let Some(input_variable) = var("INPUT_VARIABLE") {
        config.dify.input_variable = Some(input_variable);
    }
    if let Some(output_variable) = var("OUTPUT_VARIABLE") {
        config.dify.output_variable = Some(output_variable);
    }
    if let Some(user) = var("DIFY_USER") {
        config.dify.user = user;
    }
    if let Some(model_name) = var("MODELS_NAME") {
        config.models.name = Some(model_name);
    }
    if let Some(port) = var("PORT") {
        config.server.port = port.trim().parse().map_err(|_| {
            ConfigError::Validation(format!("PORT must be a valid port number, got '{port}'"))
        })?;
    }
    if let Some(host) = var("HOST") {
        config.server.host = host;
    }
    if let Some(log_level) = var("LOG_LEVEL") {
        config.features.log_level = log_level;
    }

    let api_url = config.dify.api_url.trim();
    if api_url.len() != config.dify.api_url.len() {
        config.dify.api_url = api_url.to_string();
    }

    // Empty variable names from YAML mean "not configured".
    if config
        .dify
        .input_variable
        .as_deref()
        .is_some_and(|name| name.trim().is_empty())
    {
        config.dify.input_variable = None;
    }
    if config
        .dify
        .output_variable
        .as_deref()
        .is_some_and(|name| name.trim().is_empty())
    {
        config.dify.output_variable = None;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_load_example_config() {
        let contents = std::fs::read_to_string("config.example.yaml").unwrap();
        let config = parse_config_yaml(&contents).unwrap();
        validate_config(&config).unwrap();
        assert_eq!(config.server.port, 3012);
        assert_eq!(config.dify.bot_type, BotType::Workflow);
        assert_eq!(config.dify.user, "apiuser");
        assert_eq!(config.models.display_name(), "dify");
    }

    #[test]
    fn test_bot_type_default_and_paths() {
        assert_eq!(BotType::default(), BotType::Workflow);
        assert_eq!(BotType::Chat.api_path(), "/chat-messages");
        assert_eq!(BotType::Completion.api_path(), "/completion-messages");
        assert_eq!(BotType::Workflow.api_path(), "/workflows/run");
    }

    #[test]
    fn test_bot_type_rejects_unknown() {
        let err = "Agent".parse::<BotType>().unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!("chat".parse::<BotType>().is_err());
    }

    #[test]
    fn test_env_overrides() {
        let vars = env(&[
            ("DIFY_API_URL", "https://dify.example.com/v1/"),
            ("BOT_TYPE", "Chat"),
            ("INPUT_VARIABLE", "question"),
            ("OUTPUT_VARIABLE", ""),
            ("MODELS_NAME", "my-bot"),
            ("PORT", "8080"),
        ]);
        let mut config = AppConfig::default();
        apply_env_overrides(&mut config, |key| vars.get(key).cloned()).unwrap();

        assert_eq!(config.dify.bot_type, BotType::Chat);
        assert_eq!(config.dify.input_variable.as_deref(), Some("question"));
        assert_eq!(config.dify.output_variable, None);
        assert_eq!(config.models.display_name(), "my-bot");
        assert_eq!(config.server.port, 8080);
        assert_eq!(
            config.dify.endpoint_url(),
            "https://dify.example.com/v1/chat-messages"
        );
    }

    #[test]
    fn test_env_invalid_bot_type_is_fatal() {
        let vars = env(&[("BOT_TYPE", "Assistant")]);
        let mut config = AppConfig::default();
        let err = apply_env_overrides(&mut config, |key| vars.get(key).cloned()).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_env_invalid_port_is_fatal() {
        let vars = env(&[("PORT", "http")]);
        let mut config = AppConfig::default();
        assert!(apply_env_overrides(&mut config, |key| vars.get(key).cloned()).is_err());
    }

    #[test]
    fn test_yaml_blank_variables_are_unset() {
        let config_yaml = "dify:\n  api_url: http://localhost/v1\n  input_variable: ''\n";
        let mut config = parse_config_yaml(config_yaml).unwrap();
        apply_env_overrides(&mut config, |_| None).unwrap();
        assert_eq!(config.dify.input_variable, None);
    }

    #[test]
    fn test_env_api_url_whitespace_is_trimmed() {
        let mut config = AppConfig::default();
        let vars = env(&[("DIFY_API_URL", " https://api.dify.ai/v1/ ")]);
        apply_env_overrides(&mut config, |key| vars.get(key).cloned()).unwrap();
        assert_eq!(config.dify.api_url, "https://api.dify.ai/v1/");
        validate_config(&config).unwrap();
        assert_eq!(
            config.dify.endpoint_url(),
            "https://api.dify.ai/v1/workflows/run"
        );
    }

    #[test]
    fn test_endpoint_url_ignores_surrounding_whitespace() {
        let mut config = parse_config_yaml("dify:\n  api_url: \"http://localhost/v1 \"\n  bot_type: Chat\n").unwrap();
        assert_eq!(config.dify.endpoint_url(), "http://localhost/v1/chat-messages");
        apply_env_overrides(&mut config, |_| None).unwrap();
        assert_eq!(config.dify.api_url, "http://localhost/v1");
    }

    #[test]
    fn test_yaml_invalid_bot_type_fails_to_parse() {
        let config_yaml = "dify:\n  api_url: http://localhost/v1\n  bot_type: Agent\n";
        assert!(matches!(
            parse_config_yaml(config_yaml),
            Err(ConfigError::Yaml(_))
        ));
    }
}
