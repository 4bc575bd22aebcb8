use std::path::Path;

use super::{AppConfig, ConfigError, EnvOverrides};

/// Load configuration from a YAML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig, ConfigError> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(ConfigError::NotFound(path.display().to_string()));
    }

    let content = std::fs::read_to_string(path)?;
    let config: AppConfig = serde_yaml::from_str(&content)?;

    Ok(config)
}

/// Collect overrides from the process environment
pub fn load_env_overrides() -> EnvOverrides {
    env_overrides_from(|name| std::env::var(name).ok())
}

fn env_overrides_from<F>(lookup: F) -> EnvOverrides
where
    F: Fn(&str) -> Option<String>,
{
    let read = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
    EnvOverrides {
        api_key: read("OPENAI_API_KEY"),
        provider_url: read("OPENAI_BASE_URL"),
        model: read("OPENAI_MODEL"),
        host: read("CHAT_RELAY_HOST"),
        port: read("CHAT_RELAY_PORT"),
        debug: read("CHAT_RELAY_DEBUG"),
    }
}
