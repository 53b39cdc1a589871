use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::ai_provider::{AIConfig, AIProvider};

const CONFIG_FILE: &str = "config.json";
const DATABASE_FILE: &str = "neurocalm.db";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    #[serde(skip)]
    pub data_dir: PathBuf,
    pub default_provider: String,
    pub providers: HashMap<String, ProviderConfig>,
    pub server: ServerConfig,
    pub rate_limit: RateLimitConfig,
    pub error_tracking: ErrorTrackingConfig,
    pub history_days: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub default_model: String,
    pub host: Option<String>,
    pub api_key: Option<String>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub window_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorTrackingConfig {
    pub enabled: bool,
    pub max_events: usize,
}

impl Default for Config {
    fn default() -> Self {
        let mut providers = HashMap::new();

        providers.insert(
            "ollama".to_string(),
            ProviderConfig {
                default_model: "qwen2.5".to_string(),
                host: Some("http://localhost:11434".to_string()),
                api_key: None,
                temperature: Some(0.7),
                max_tokens: Some(1024),
            },
        );

        providers.insert(
            "openai".to_string(),
            ProviderConfig {
                default_model: "gpt-4o-mini".to_string(),
                host: None,
                api_key: None,
                temperature: Some(0.7),
                max_tokens: Some(1024),
            },
        );

        Config {
            data_dir: default_data_dir(),
            default_provider: "ollama".to_string(),
            providers,
            server: ServerConfig::default(),
            rate_limit: RateLimitConfig::default(),
            error_tracking: ErrorTrackingConfig::default(),
            history_days: 7,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window_secs: 15 * 60,
        }
    }
}

impl Default for ErrorTrackingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_events: 100,
        }
    }
}

fn default_data_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("neurocalm")
}

impl Config {
    pub fn new(data_dir: Option<PathBuf>) -> Result<Self> {
        let data_dir = data_dir.unwrap_or_else(default_data_dir);

        std::fs::create_dir_all(&data_dir).context("Failed to create data directory")?;

        let config_path = data_dir.join(CONFIG_FILE);
        let mut config = if config_path.exists() {
            Self::load(&config_path)
        } else {
            let config = Config {
                data_dir: data_dir.clone(),
                ..Config::default()
            };
            config.save()?;
            info!(path = %config_path.display(), "wrote default config");
            config
        };
        config.data_dir = data_dir;

        if let Some(openai) = config.providers.get_mut("openai") {
            if openai.api_key.as_deref().map_or(true, str::is_empty) {
                openai.api_key = std::env::var("OPENAI_API_KEY").ok();
            }
        }

        Ok(config)
    }

    fn load(path: &Path) -> Config {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "config unreadable, using defaults");
                return Config::default();
            }
        };

        if content.trim().is_empty() {
            warn!(path = %path.display(), "config is empty, using defaults");
            return Config::default();
        }

        match serde_json::from_str(&content) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "config is malformed, using defaults");
                Config::default()
            }
        }
    }

    pub fn save(&self) -> Result<()> {
        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(self.data_dir.join(CONFIG_FILE), content)
            .context("Failed to write config file")?;
        Ok(())
    }

    pub fn get_provider(&self, provider_name: &str) -> Option<&ProviderConfig> {
        self.providers.get(provider_name)
    }

    pub fn get_ai_config(&self, provider: Option<String>, model: Option<String>) -> Result<AIConfig> {
        let provider_name = provider.as_deref().unwrap_or(&self.default_provider);
        let ai_provider: AIProvider = provider_name.parse()?;
        let provider_config = self
            .get_provider(&ai_provider.to_string())
            .ok_or_else(|| anyhow::anyhow!("Unknown provider: {}", provider_name))?;

        let defaults = AIConfig::default();
        Ok(AIConfig {
            provider: ai_provider,
            model: model.unwrap_or_else(|| provider_config.default_model.clone()),
            api_key: provider_config.api_key.clone(),
            base_url: provider_config.host.clone(),
            max_tokens: provider_config.max_tokens.or(defaults.max_tokens),
            temperature: provider_config.temperature.or(defaults.temperature),
            timeout_secs: defaults.timeout_secs,
        })
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(DATABASE_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_writes_default_config() {
        let dir = TempDir::new().unwrap();
        let config = Config::new(Some(dir.path().to_path_buf())).unwrap();

        assert!(dir.path().join(CONFIG_FILE).exists());
        assert_eq!(config.default_provider, "ollama");
        assert_eq!(config.history_days, 7);
        assert_eq!(config.database_path(), dir.path().join("neurocalm.db"));
    }

    #[test]
    fn test_reads_saved_values() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            r#"{"default_provider": "openai", "history_days": 14, "server": {"host": "0.0.0.0", "port": 3000}}"#,
        )
        .unwrap();

        let config = Config::new(Some(dir.path().to_path_buf())).unwrap();
        assert_eq!(config.default_provider, "openai");
        assert_eq!(config.history_days, 14);
        assert_eq!(config.server.port, 3000);
        // missing sections fall back to defaults
        assert_eq!(config.rate_limit.max_requests, 100);
        assert_eq!(config.data_dir, dir.path());
    }

    #[test]
    fn test_partial_section_keeps_other_values() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            r#"{"default_provider": "openai", "rate_limit": {"max_requests": 5}, "server": {"port": 3000}}"#,
        )
        .unwrap();

        let config = Config::new(Some(dir.path().to_path_buf())).unwrap();
        assert_eq!(config.default_provider, "openai");
        assert_eq!(config.rate_limit.max_requests, 5);
        assert_eq!(config.rate_limit.window_secs, 15 * 60);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert!(config.error_tracking.enabled);
    }

    #[test]
    fn test_malformed_config_uses_defaults() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "{not json").unwrap();

        let config = Config::new(Some(dir.path().to_path_buf())).unwrap();
        assert_eq!(config.server.port, 8080);

        std::fs::write(dir.path().join(CONFIG_FILE), "  \n").unwrap();
        let config = Config::new(Some(dir.path().to_path_buf())).unwrap();
        assert_eq!(config.default_provider, "ollama");
    }

    #[test]
    fn test_get_ai_config() {
        let config = Config::default();

        let ai = config.get_ai_config(None, None).unwrap();
        assert_eq!(ai.provider, AIProvider::Ollama);
        assert_eq!(ai.model, "qwen2.5");
        assert_eq!(ai.base_url.as_deref(), Some("http://localhost:11434"));

        let ai = config
            .get_ai_config(Some("gpt".to_string()), Some("gpt-4o".to_string()))
            .unwrap();
        assert_eq!(ai.provider, AIProvider::OpenAI);
        assert_eq!(ai.model, "gpt-4o");

        assert!(config.get_ai_config(Some("claude".to_string()), None).is_err());
    }
}
