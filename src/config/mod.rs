mod loader;

use serde::{Deserialize, Serialize};
use std::path::Path;

pub use loader::{load_config, load_env_overrides};

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub completion: CompletionConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub stats: StatsConfig,
}

/// Relay HTTP server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Raises the default log level to debug
    #[serde(default)]
    pub debug: bool,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            debug: false,
        }
    }
}

/// Completion provider (OpenAI-compatible API) configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderConfig {
    /// Base URL of the API (e.g., "https://api.openai.com")
    #[serde(default = "default_provider_url")]
    pub url: String,
    /// API credential, usually supplied through OPENAI_API_KEY
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,
    /// Overall request timeout; unset means a stream may run as long as generation takes
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
    /// Check connectivity (GET /v1/models) before accepting traffic
    #[serde(default = "default_probe_on_startup")]
    pub probe_on_startup: bool,
    #[serde(default)]
    pub tls: Option<TlsConfig>,
}

/// TLS configuration for provider connections
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Accept invalid certificates (self-signed, expired)
    #[serde(default)]
    pub accept_invalid_certs: bool,
    /// Path to custom CA certificate (PEM format)
    pub ca_cert_path: Option<String>,
}

fn default_provider_url() -> String {
    "https://api.openai.com".to_string()
}

fn default_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_probe_on_startup() -> bool {
    true
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            url: default_provider_url(),
            api_key: None,
            model: default_model(),
            connect_timeout_seconds: default_connect_timeout(),
            timeout_seconds: None,
            probe_on_startup: default_probe_on_startup(),
            tls: None,
        }
    }
}

impl ProviderConfig {
    /// Returns the base URL with trailing slash stripped
    pub fn base_url(&self) -> &str {
        self.url.trim_end_matches('/')
    }

    /// Returns the credential if one is set and not blank
    pub fn credential(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }

    /// Credential with everything but the last four characters hidden
    pub fn masked_credential(&self) -> String {
        match self.credential() {
            Some(key) if key.chars().count() > 8 => {
                let tail: String = key.chars().rev().take(4).collect::<Vec<_>>().into_iter().rev().collect();
                format!("****{}", tail)
            }
            Some(_) => "****".to_string(),
            None => "(not set)".to_string(),
        }
    }
}

/// Tuning parameters sent with every completion request
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq)]
pub struct CompletionConfig {
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_penalty")]
    pub presence_penalty: f32,
    #[serde(default = "default_penalty")]
    pub frequency_penalty: f32,
}

fn default_max_tokens() -> u32 {
    2000
}

fn default_temperature() -> f32 {
    0.7
}

fn default_penalty() -> f32 {
    0.1
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            presence_penalty: default_penalty(),
            frequency_penalty: default_penalty(),
        }
    }
}

/// Input bounds applied to every /prompt request
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq)]
pub struct LimitsConfig {
    #[serde(default = "default_max_messages")]
    pub max_messages: usize,
    #[serde(default = "default_max_message_chars")]
    pub max_message_chars: usize,
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_max_messages() -> usize {
    100
}

fn default_max_message_chars() -> usize {
    8000
}

fn default_max_body_bytes() -> usize {
    16 * 1024 * 1024
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_messages: default_max_messages(),
            max_message_chars: default_max_message_chars(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

/// Process-wide request throttle for /prompt
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq)]
pub struct RateLimitConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: u32,
    #[serde(default = "default_burst")]
    pub burst: u32,
}

fn default_requests_per_minute() -> u32 {
    60
}

fn default_burst() -> u32 {
    10
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            requests_per_minute: default_requests_per_minute(),
            burst: default_burst(),
        }
    }
}

/// Stats logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StatsConfig {
    #[serde(default = "default_stats_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub format: StatsFormat,
}

fn default_stats_enabled() -> bool {
    true
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            enabled: default_stats_enabled(),
            format: StatsFormat::default(),
        }
    }
}

/// Stats output format
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum StatsFormat {
    Pretty,
    Json,
    #[default]
    Compact,
}

/// Values read from the process environment that override the file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvOverrides {
    pub api_key: Option<String>,
    pub provider_url: Option<String>,
    pub model: Option<String>,
    pub host: Option<String>,
    pub port: Option<String>,
    pub debug: Option<String>,
}

impl AppConfig {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        load_config(path)
    }

    /// Load configuration from the given path, a default location, or built-in defaults
    pub fn load_or_default(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        match config_path {
            Some(path) => Self::from_file(path),
            None => {
                let default_paths = ["config.yaml", "config.yml", "./config/config.yaml"];
                for p in default_paths {
                    let path = Path::new(p);
                    if path.exists() {
                        return Self::from_file(path);
                    }
                }
                tracing::debug!("No config file found, using built-in defaults");
                Ok(Self::default())
            }
        }
    }

    /// Apply environment overrides on top of the loaded file
    pub fn apply_env(&mut self, env: &EnvOverrides) -> Result<(), ConfigError> {
        if let Some(ref key) = env.api_key {
            self.provider.api_key = Some(key.clone());
        }
        if let Some(ref url) = env.provider_url {
            self.provider.url = url.clone();
        }
        if let Some(ref model) = env.model {
            self.provider.model = model.clone();
        }
        if let Some(ref host) = env.host {
            self.server.host = host.clone();
        }
        if let Some(ref port) = env.port {
            self.server.port = port.trim().parse().map_err(|_| {
                ConfigError::Validation(format!("CHAT_RELAY_PORT is not a valid port: {:?}", port))
            })?;
        }
        if let Some(ref debug) = env.debug {
            self.server.debug = matches!(debug.trim().to_lowercase().as_str(), "true" | "1" | "yes");
        }
        Ok(())
    }

    /// Check the configuration before the server binds
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.provider.credential().is_none() {
            return Err(ConfigError::MissingCredential);
        }

        let url = url::Url::parse(&self.provider.url)
            .map_err(|e| ConfigError::Validation(format!("invalid provider url {:?}: {}", self.provider.url, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::Validation(format!(
                "provider url must be http or https, got {:?}",
                url.scheme()
            )));
        }

        if self.provider.model.trim().is_empty() {
            return Err(ConfigError::Validation("provider model must not be empty".to_string()));
        }
        if self.limits.max_messages == 0 {
            return Err(ConfigError::Validation("limits.max_messages must be > 0".to_string()));
        }
        if self.limits.max_message_chars == 0 {
            return Err(ConfigError::Validation("limits.max_message_chars must be > 0".to_string()));
        }
        if self.limits.max_body_bytes == 0 {
            return Err(ConfigError::Validation("limits.max_body_bytes must be > 0".to_string()));
        }
        if self.rate_limit.enabled && (self.rate_limit.requests_per_minute == 0 || self.rate_limit.burst == 0) {
            return Err(ConfigError::Validation(
                "rate_limit.requests_per_minute and rate_limit.burst must be > 0 when enabled".to_string(),
            ));
        }

        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(String),

    #[error("Failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Provider API key missing: set OPENAI_API_KEY or provider.api_key")]
    MissingCredential,

    #[error("Configuration validation error: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.provider.api_key = Some("sk-test-key-123456".to_string());
        config
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 5000);
        assert!(!config.server.debug);
        assert_eq!(config.provider.model, "gpt-3.5-turbo");
        assert!(config.provider.timeout_seconds.is_none());
        assert!(config.provider.probe_on_startup);
        assert_eq!(config.completion.max_tokens, 2000);
        assert_eq!(config.completion.temperature, 0.7);
        assert_eq!(config.completion.presence_penalty, 0.1);
        assert_eq!(config.completion.frequency_penalty, 0.1);
        assert_eq!(config.limits.max_messages, 100);
        assert_eq!(config.limits.max_message_chars, 8000);
        assert_eq!(config.limits.max_body_bytes, 16 * 1024 * 1024);
        assert!(!config.rate_limit.enabled);
    }

    #[test]
    fn test_provider_base_url_trailing_slash() {
        let config = ProviderConfig {
            url: "https://api.example.com/".to_string(),
            ..ProviderConfig::default()
        };
        assert_eq!(config.base_url(), "https://api.example.com");
    }

    #[test]
    fn test_blank_credential_is_missing() {
        let mut config = AppConfig::default();
        config.provider.api_key = Some("   ".to_string());
        assert!(config.provider.credential().is_none());
        assert!(matches!(config.validate(), Err(ConfigError::MissingCredential)));
    }

    #[test]
    fn test_validate_requires_credential() {
        let config = AppConfig::default();
        assert!(matches!(config.validate(), Err(ConfigError::MissingCredential)));
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_url() {
        let mut config = valid_config();
        config.provider.url = "not a url".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));

        config.provider.url = "ftp://api.example.com".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_validate_rejects_zero_limits() {
        let mut config = valid_config();
        config.limits.max_messages = 0;
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.rate_limit.enabled = true;
        config.rate_limit.burst = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_masked_credential() {
        let mut config = ProviderConfig::default();
        assert_eq!(config.masked_credential(), "(not set)");

        config.api_key = Some("short".to_string());
        assert_eq!(config.masked_credential(), "****");

        config.api_key = Some("sk-abcdefghijklmnop".to_string());
        assert_eq!(config.masked_credential(), "****mnop");
    }

    #[test]
    fn test_apply_env_overrides() {
        let mut config = AppConfig::default();
        let env = EnvOverrides {
            api_key: Some("sk-from-env".to_string()),
            provider_url: Some("http://127.0.0.1:18080".to_string()),
            model: Some("gpt-4o-mini".to_string()),
            host: Some("0.0.0.0".to_string()),
            port: Some("8080".to_string()),
            debug: Some("True".to_string()),
        };

        config.apply_env(&env).unwrap();
        assert_eq!(config.provider.credential(), Some("sk-from-env"));
        assert_eq!(config.provider.url, "http://127.0.0.1:18080");
        assert_eq!(config.provider.model, "gpt-4o-mini");
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert!(config.server.debug);
    }

    #[test]
    fn test_apply_env_debug_false() {
        let mut config = AppConfig::default();
        config.server.debug = true;
        let env = EnvOverrides {
            debug: Some("False".to_string()),
            ..EnvOverrides::default()
        };
        config.apply_env(&env).unwrap();
        assert!(!config.server.debug);
    }

    #[test]
    fn test_apply_env_bad_port() {
        let mut config = AppConfig::default();
        let env = EnvOverrides {
            port: Some("not-a-port".to_string()),
            ..EnvOverrides::default()
        };
        assert!(matches!(config.apply_env(&env), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_stats_format_serde() {
        assert_eq!(serde_json::to_string(&StatsFormat::Pretty).unwrap(), "\"pretty\"");
        assert_eq!(serde_json::to_string(&StatsFormat::Json).unwrap(), "\"json\"");
        assert_eq!(serde_json::to_string(&StatsFormat::Compact).unwrap(), "\"compact\"");

        let parsed: StatsFormat = serde_json::from_str("\"json\"").unwrap();
        assert_eq!(parsed, StatsFormat::Json);
        assert_eq!(StatsFormat::default(), StatsFormat::Compact);
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::NotFound("test.yaml".to_string());
        assert!(err.to_string().contains("test.yaml"));

        let err = ConfigError::MissingCredential;
        assert!(err.to_string().contains("OPENAI_API_KEY"));

        let err = ConfigError::Validation("invalid URL".to_string());
        assert!(err.to_string().contains("invalid URL"));
    }

    #[test]
    fn test_load_or_default_with_missing_path() {
        let result = AppConfig::load_or_default(Some(Path::new("/nonexistent/config.yaml")));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }
}
