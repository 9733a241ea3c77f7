use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Gemini model configuration
    pub gemini: GeminiConfig,

    /// AssemblyAI transcription configuration
    pub assembly: AssemblyConfig,

    /// Application settings
    pub app: AppConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// API key, environment-only (never written to the config file)
    #[serde(skip)]
    pub api_key: Option<String>,

    /// Model name
    pub model: String,

    /// Sampling temperature
    pub temperature: f64,

    /// Nucleus sampling mass
    pub top_p: f64,

    /// Top-k sampling cutoff
    pub top_k: u32,

    /// Output length bound
    pub max_output_tokens: u32,

    /// HTTP request timeout in seconds
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssemblyConfig {
    /// API key, environment-only (never written to the config file)
    #[serde(skip)]
    pub api_key: Option<String>,

    /// API base URL
    pub base_url: String,

    /// Seconds between transcription status polls
    pub poll_interval_secs: u64,

    /// HTTP request timeout in seconds
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Artifact file the webpage loader overwrites on each successful load
    pub sink_path: PathBuf,

    /// HTTP request timeout in seconds for page and caption fetches
    pub request_timeout_secs: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gemini-1.5-pro".to_string(),
            temperature: 0.5,
            top_p: 0.95,
            top_k: 64,
            max_output_tokens: 8192,
            request_timeout_secs: 120,
        }
    }
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.assemblyai.com".to_string(),
            poll_interval_secs: 3,
            request_timeout_secs: 60,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            sink_path: PathBuf::from("output.txt"),
            request_timeout_secs: 30,
        }
    }
}

impl Config {
    /// Load configuration from file or create default, then apply environment secrets
    pub async fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        let mut config = if config_path.exists() {
            let content =
                fs_err::read_to_string(&config_path).context("Failed to read config file")?;

            serde_yaml::from_str(&content).context("Failed to parse config file")?
        } else {
            let config = Self::default();
            config.save().await?;
            config
        };

        config.gemini.api_key = std::env::var("GEMINI_API_KEY").ok();
        config.assembly.api_key = std::env::var("ASSEMBLY_API_KEY").ok();

        Ok(config)
    }

    /// Save configuration to file
    pub async fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            fs_err::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(self).context("Failed to serialize config")?;

        fs_err::write(&config_path, content).context("Failed to write config file")?;

        Ok(())
    }

    /// Get configuration file path
    fn config_path() -> Result<PathBuf> {
        // First try current directory for easy testing
        let local_config = PathBuf::from("config.yaml");
        if local_config.exists() {
            return Ok(local_config);
        }

        let config_dir = dirs::config_dir().context("Could not determine config directory")?;

        Ok(config_dir.join("contextor").join("config.yaml"))
    }

    /// Validate configuration for commands that reach the Gemini model
    pub fn validate(&self) -> Result<()> {
        if self.gemini.api_key.is_none() {
            anyhow::bail!("GEMINI_API_KEY environment variable not set");
        }

        Ok(())
    }

    /// Interactive configuration setup
    pub fn interactive_setup(&self) -> Result<()> {
        println!("Set GEMINI_API_KEY and ASSEMBLY_API_KEY in the environment or a .env file.");
        println!("Other settings live in the config file:");
        println!("  {}", Self::config_path()?.display());
        Ok(())
    }

    /// Display current configuration
    pub fn display(&self) {
        println!("Current Configuration:");
        println!("  Gemini Model: {}", self.gemini.model);
        println!("  Gemini Key Set: {}", self.gemini.api_key.is_some());
        println!("  AssemblyAI Key Set: {}", self.assembly.api_key.is_some());
        println!("  AssemblyAI URL: {}", self.assembly.base_url);
        println!("  Webpage Sink: {}", self.app.sink_path.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_fixed_model_parameters() {
        let config = Config::default();
        assert_eq!(config.gemini.model, "gemini-1.5-pro");
        assert_eq!(config.gemini.temperature, 0.5);
        assert_eq!(config.gemini.top_p, 0.95);
        assert_eq!(config.gemini.top_k, 64);
        assert_eq!(config.gemini.max_output_tokens, 8192);
        assert_eq!(config.app.sink_path, PathBuf::from("output.txt"));
    }

    #[test]
    fn api_keys_never_serialize_to_file() {
        let mut config = Config::default();
        config.gemini.api_key = Some("secret-a".to_string());
        config.assembly.api_key = Some("secret-b".to_string());

        let yaml = serde_yaml::to_string(&config).unwrap();
        assert!(!yaml.contains("secret-a"));
        assert!(!yaml.contains("secret-b"));
        assert!(!yaml.contains("api_key"));
    }

    #[test]
    fn validate_requires_gemini_key() {
        let config = Config::default();
        let err = config.validate().unwrap_err();
        assert_eq!(err.to_string(), "GEMINI_API_KEY environment variable not set");

        let mut config = Config::default();
        config.gemini.api_key = Some("key".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_round_trips_through_yaml() {
        let config = Config::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.gemini.model, config.gemini.model);
        assert_eq!(parsed.assembly.base_url, config.assembly.base_url);
        assert_eq!(parsed.app.sink_path, config.app.sink_path);
    }
}
