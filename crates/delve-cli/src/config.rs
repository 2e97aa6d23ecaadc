//! Configuration file support

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration for delve
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Default model to use
    pub model: Option<String>,
    /// Default provider
    pub provider: Option<String>,
    /// Sampling temperature for the reasoning model
    pub temperature: Option<f32>,
    /// Iteration cap per session
    pub max_iterations: Option<u32>,
    /// Passes before the reflection gate may stop
    pub min_iterations: Option<u32>,
    /// Results requested per search
    pub max_results: Option<usize>,
    /// Search depth (basic, advanced)
    pub search_depth: Option<String>,
    /// Drop repeated urls from the gathered sources
    pub dedup_sources: Option<bool>,
    /// Reuse results for repeated queries within a session
    pub cache_lookups: Option<bool>,
    /// Retries for transient service errors
    pub max_retries: Option<u32>,
    /// API keys (alternative to environment variables)
    #[serde(default)]
    pub api_keys: ApiKeys,
}

/// API key configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiKeys {
    pub openai: Option<String>,
    pub anthropic: Option<String>,
    pub groq: Option<String>,
    pub openrouter: Option<String>,
    pub tavily: Option<String>,
}

impl Config {
    /// Get the config directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("delve")
    }

    /// Get the config file path
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("DELVE_CONFIG_PATH") {
            return PathBuf::from(path);
        }
        Self::config_dir().join("config.toml")
    }

    /// Load config from the default location
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// Load config from `path`. A missing or unreadable file yields defaults.
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("Warning: Failed to parse config file: {}", e);
                    Self::default()
                }
            },
            Err(e) => {
                eprintln!("Warning: Failed to read config file: {}", e);
                Self::default()
            }
        }
    }

    /// Save config to `path`
    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let content = toml::to_string_pretty(self).map_err(std::io::Error::other)?;
        fs::write(path, content)
    }

    /// Create a default config file if it doesn't exist
    pub fn init() -> std::io::Result<PathBuf> {
        let path = Self::config_path();
        if path.exists() {
            return Ok(path);
        }

        let default_config = Config {
            model: Some("gpt-4o-mini".to_string()),
            provider: Some("openai".to_string()),
            max_iterations: Some(5),
            max_results: Some(5),
            search_depth: Some("advanced".to_string()),
            ..Default::default()
        };

        default_config.save_to(&path)?;
        Ok(path)
    }

    /// API key for the reasoning provider, checking config then env
    pub fn get_api_key(&self, provider: &str) -> Option<String> {
        let from_config = match provider {
            "openai" => self.api_keys.openai.clone(),
            "anthropic" => self.api_keys.anthropic.clone(),
            "groq" => self.api_keys.groq.clone(),
            "openrouter" => self.api_keys.openrouter.clone(),
            _ => None,
        };
        if from_config.is_some() {
            return from_config;
        }

        let env_var = delve_ai::Provider::parse(provider).api_key_env_var()?;
        std::env::var(env_var).ok().filter(|k| !k.is_empty())
    }

    /// Search API key, checking config then `TAVILY_API_KEY`
    pub fn get_search_key(&self) -> Option<String> {
        self.api_keys.tavily.clone().or_else(|| {
            std::env::var("TAVILY_API_KEY")
                .ok()
                .filter(|k| !k.is_empty())
        })
    }
}

/// Generate example config content
pub fn example_config() -> &'static str {
    r#"# delve configuration file
# Place at ~/.config/delve/config.toml (Linux), ~/Library/Application Support/delve/config.toml (macOS)
# or %APPDATA%\delve\config.toml (Windows). DELVE_CONFIG_PATH overrides the location.

# Default model and provider (openai, anthropic, groq, openrouter, ollama)
model = "gpt-4o-mini"
provider = "openai"

# Sampling temperature for the reasoning model
# temperature = 0.0

# Research loop
max_iterations = 5
# min_iterations = 1
# dedup_sources = false
# cache_lookups = false

# Search (basic, advanced)
max_results = 5
search_depth = "advanced"

# Retries for rate limits and transient service errors
# max_retries = 3

# API keys (optional - can also use environment variables or a .env file)
[api_keys]
# openai = "sk-..."
# anthropic = "sk-ant-..."
# tavily = "tvly-..."
"#
}
