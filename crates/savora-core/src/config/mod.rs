//! Configuration management with file persistence

use anyhow::{Context, anyhow};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;

use crate::signing::Credentials;

/// Savora configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub image: ImageConfig,
    pub llm: LlmConfig,
    pub weather: WeatherConfig,
    pub recommend: RecommendConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageConfig {
    #[serde(skip)]
    pub access_key: Option<String>,
    #[serde(skip)]
    pub secret_key: Option<String>,
    pub host: String,
    pub region: String,
    pub service: String,
    pub model: String,
    pub schedule_conf: String,
    pub width: u32,
    pub height: u32,
    pub timeout_secs: u64,
    // TOML cannot represent a bare None
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
    pub max_kept_images: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(skip)]
    pub api_key: Option<String>,
    pub enabled: bool,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: usize,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    pub enabled: bool,
    pub base_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_city: Option<String>,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendConfig {
    pub session_ttl_hours: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            image: ImageConfig {
                access_key: None,
                secret_key: None,
                host: "visual.volcengineapi.com".to_string(),
                region: "cn-north-1".to_string(),
                service: "cv".to_string(),
                model: "high_aes_general_v21_L".to_string(),
                schedule_conf: "general_v20_9B_pe".to_string(),
                width: 1024,
                height: 1024,
                timeout_secs: 30,
                output_dir: None,
                max_kept_images: 10,
            },
            llm: LlmConfig {
                api_key: None,
                enabled: true,
                base_url: "https://openrouter.ai/api/v1".to_string(),
                model: "anthropic/claude-3.5-haiku".to_string(),
                temperature: 0.9,
                max_tokens: 256,
                timeout_secs: 30,
            },
            weather: WeatherConfig {
                enabled: true,
                base_url: "https://wttr.in".to_string(),
                default_city: None,
                timeout_secs: 10,
            },
            recommend: RecommendConfig {
                session_ttl_hours: 24,
            },
        }
    }
}

impl ImageConfig {
    /// Resolve signing credentials from the environment
    ///
    /// Both keys must be present and non-empty to count.
    pub fn resolved_credentials(&self) -> anyhow::Result<Option<Credentials>> {
        self.enforce_env_only()?;

        let access_key = env::var("VOLC_ACCESS_KEY").unwrap_or_default();
        let secret_key = env::var("VOLC_SECRET_KEY").unwrap_or_default();

        if access_key.is_empty() || secret_key.is_empty() {
            return Ok(None);
        }
        Ok(Some(Credentials::new(access_key, secret_key)))
    }

    pub fn redacted_access_key(&self) -> anyhow::Result<Option<String>> {
        self.enforce_env_only()?;
        Ok(env::var("VOLC_ACCESS_KEY").ok().map(|k| redact_tail(&k)))
    }

    pub fn enforce_env_only(&self) -> anyhow::Result<()> {
        if self.access_key.is_some() || self.secret_key.is_some() {
            return Err(anyhow!(
                "Image API credentials must be provided via environment variables, not stored in configuration"
            ));
        }
        Ok(())
    }

    /// The directory generated images land in
    pub fn resolved_output_dir(&self) -> anyhow::Result<PathBuf> {
        if let Some(dir) = &self.output_dir {
            return Ok(dir.clone());
        }
        Ok(Config::config_dir()?.join("images"))
    }
}

impl LlmConfig {
    pub fn resolved_api_key(&self) -> anyhow::Result<Option<String>> {
        self.enforce_env_only()?;

        Ok(env::var("SAVORA_LLM_API_KEY")
            .or_else(|_| env::var("OPENROUTER_API_KEY"))
            .ok())
    }

    pub fn redacted_api_key(&self) -> anyhow::Result<Option<String>> {
        self.resolved_api_key()
            .map(|opt| opt.map(|key| redact_tail(&key)))
    }

    pub fn enforce_env_only(&self) -> anyhow::Result<()> {
        if self.api_key.is_some() {
            return Err(anyhow!(
                "LLM API keys must be provided via environment variables, not stored in configuration"
            ));
        }
        Ok(())
    }
}

impl RecommendConfig {
    /// Session entry lifetime as a duration
    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.session_ttl_hours)
    }
}

fn redact_tail(key: &str) -> String {
    let length = key.chars().count();
    if length <= 4 {
        "***".to_string()
    } else {
        let suffix: String = key.chars().skip(length - 4).collect();
        format!("***{}", suffix)
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> anyhow::Result<PathBuf> {
        let dir = if let Ok(custom_dir) = env::var("SAVORA_CONFIG_DIR") {
            PathBuf::from(custom_dir)
        } else {
            dirs::config_dir()
                .ok_or_else(|| anyhow!("Could not determine config directory"))?
                .join("savora")
        };
        Ok(dir)
    }

    /// Get the config file path
    pub fn config_path() -> anyhow::Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load configuration from file, or create default if it doesn't exist
    pub fn load() -> anyhow::Result<Self> {
        let path = Self::config_path()?;

        if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            let config: Config = toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
            config.validate()?;
            Ok(config)
        } else {
            // Return default config without creating file
            Ok(Config::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> anyhow::Result<()> {
        self.validate()?;

        let dir = Self::config_dir()?;
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create config directory: {}", dir.display()))?;

        let path = Self::config_path()?;
        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(&path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        self.image.enforce_env_only()?;
        self.llm.enforce_env_only()?;

        if self.image.width == 0 || self.image.height == 0 {
            return Err(anyhow!("Image dimensions must be positive"));
        }
        if self.recommend.session_ttl_hours < 1 {
            return Err(anyhow!("Session TTL must be at least one hour"));
        }
        Ok(())
    }

    /// Get a configuration value by key
    pub fn get(&self, key: &str) -> anyhow::Result<String> {
        match key {
            // Image generation settings
            "image.host" => Ok(self.image.host.clone()),
            "image.region" => Ok(self.image.region.clone()),
            "image.service" => Ok(self.image.service.clone()),
            "image.model" => Ok(self.image.model.clone()),
            "image.schedule_conf" => Ok(self.image.schedule_conf.clone()),
            "image.width" => Ok(self.image.width.to_string()),
            "image.height" => Ok(self.image.height.to_string()),
            "image.timeout_secs" => Ok(self.image.timeout_secs.to_string()),
            "image.output_dir" => Ok(self.image.resolved_output_dir()?.display().to_string()),
            "image.max_kept_images" => Ok(self.image.max_kept_images.to_string()),

            // LLM settings
            "llm.enabled" => Ok(self.llm.enabled.to_string()),
            "llm.base_url" => Ok(self.llm.base_url.clone()),
            "llm.model" => Ok(self.llm.model.clone()),
            "llm.temperature" => Ok(self.llm.temperature.to_string()),
            "llm.max_tokens" => Ok(self.llm.max_tokens.to_string()),
            "llm.timeout_secs" => Ok(self.llm.timeout_secs.to_string()),

            // Weather settings
            "weather.enabled" => Ok(self.weather.enabled.to_string()),
            "weather.base_url" => Ok(self.weather.base_url.clone()),
            "weather.timeout_secs" => Ok(self.weather.timeout_secs.to_string()),
            "weather.default_city" => Ok(self
                .weather
                .default_city
                .clone()
                .unwrap_or_else(|| "(not set)".to_string())),

            // Recommendation settings
            "recommend.session_ttl_hours" => Ok(self.recommend.session_ttl_hours.to_string()),

            // Secrets (special handling - show redacted)
            "image.access_key" => match self.image.redacted_access_key()? {
                Some(redacted) => Ok(redacted),
                None => Ok("(not set - use VOLC_ACCESS_KEY env var)".to_string()),
            },
            "llm.api_key" => match self.llm.redacted_api_key()? {
                Some(redacted) => Ok(redacted),
                None => {
                    Ok("(not set - use SAVORA_LLM_API_KEY or OPENROUTER_API_KEY env var)"
                        .to_string())
                }
            },

            _ => Err(anyhow!(
                "Unknown configuration key: {}. Use `savora config list` to see available keys.",
                key
            )),
        }
    }

    /// Set a configuration value by key
    pub fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        match key {
            // Image generation settings
            "image.host" => {
                self.image.host = value.to_string();
            }
            "image.region" => {
                self.image.region = value.to_string();
            }
            "image.service" => {
                self.image.service = value.to_string();
            }
            "image.model" => {
                self.image.model = value.to_string();
            }
            "image.schedule_conf" => {
                self.image.schedule_conf = value.to_string();
            }
            "image.width" => {
                let width: u32 = value
                    .parse()
                    .with_context(|| format!("Invalid width value: {}", value))?;
                if width == 0 {
                    return Err(anyhow!("Width must be positive"));
                }
                self.image.width = width;
            }
            "image.height" => {
                let height: u32 = value
                    .parse()
                    .with_context(|| format!("Invalid height value: {}", value))?;
                if height == 0 {
                    return Err(anyhow!("Height must be positive"));
                }
                self.image.height = height;
            }
            "image.timeout_secs" => {
                self.image.timeout_secs = value
                    .parse()
                    .with_context(|| format!("Invalid timeout_secs value: {}", value))?;
            }
            "image.output_dir" => {
                self.image.output_dir = Some(PathBuf::from(value));
            }
            "image.max_kept_images" => {
                self.image.max_kept_images = value
                    .parse()
                    .with_context(|| format!("Invalid max_kept_images value: {}", value))?;
            }

            // LLM settings
            "llm.enabled" => {
                self.llm.enabled = value
                    .parse()
                    .with_context(|| format!("Invalid llm.enabled value: {}", value))?;
            }
            "llm.base_url" => {
                self.llm.base_url = value.to_string();
            }
            "llm.model" => {
                self.llm.model = value.to_string();
            }
            "llm.temperature" => {
                let temp: f32 = value
                    .parse()
                    .with_context(|| format!("Invalid temperature value: {}", value))?;
                if !(0.0..=2.0).contains(&temp) {
                    return Err(anyhow!("Temperature must be between 0.0 and 2.0"));
                }
                self.llm.temperature = temp;
            }
            "llm.max_tokens" => {
                self.llm.max_tokens = value
                    .parse()
                    .with_context(|| format!("Invalid max_tokens value: {}", value))?;
            }
            "llm.timeout_secs" => {
                self.llm.timeout_secs = value
                    .parse()
                    .with_context(|| format!("Invalid timeout_secs value: {}", value))?;
            }

            // Weather settings
            "weather.enabled" => {
                self.weather.enabled = value
                    .parse()
                    .with_context(|| format!("Invalid weather.enabled value: {}", value))?;
            }
            "weather.base_url" => {
                self.weather.base_url = value.to_string();
            }
            "weather.timeout_secs" => {
                self.weather.timeout_secs = value
                    .parse()
                    .with_context(|| format!("Invalid weather timeout_secs value: {}", value))?;
            }
            "weather.default_city" => {
                self.weather.default_city = if value.is_empty() {
                    None
                } else {
                    Some(value.to_string())
                };
            }

            // Recommendation settings
            "recommend.session_ttl_hours" => {
                let hours: i64 = value
                    .parse()
                    .with_context(|| format!("Invalid session_ttl_hours value: {}", value))?;
                if hours < 1 {
                    return Err(anyhow!("Session TTL must be at least one hour"));
                }
                self.recommend.session_ttl_hours = hours;
            }

            // Secrets cannot be set via config
            "image.access_key" | "image.secret_key" => {
                return Err(anyhow!(
                    "Image API credentials cannot be stored in configuration for security. \
                     Set the VOLC_ACCESS_KEY and VOLC_SECRET_KEY environment variables instead."
                ));
            }
            "llm.api_key" => {
                return Err(anyhow!(
                    "API keys cannot be stored in configuration for security. \
                     Set the SAVORA_LLM_API_KEY or OPENROUTER_API_KEY environment variable instead."
                ));
            }

            _ => {
                return Err(anyhow!(
                    "Unknown configuration key: {}. Use `savora config list` to see available keys.",
                    key
                ));
            }
        }
        Ok(())
    }

    /// List all configuration keys and their values
    pub fn list(&self) -> anyhow::Result<Vec<(String, String)>> {
        let keys = vec![
            "image.host",
            "image.region",
            "image.service",
            "image.model",
            "image.schedule_conf",
            "image.width",
            "image.height",
            "image.timeout_secs",
            "image.output_dir",
            "image.max_kept_images",
            "image.access_key",
            "llm.enabled",
            "llm.base_url",
            "llm.model",
            "llm.temperature",
            "llm.max_tokens",
            "llm.timeout_secs",
            "llm.api_key",
            "weather.enabled",
            "weather.base_url",
            "weather.timeout_secs",
            "weather.default_city",
            "recommend.session_ttl_hours",
        ];

        keys.into_iter()
            .map(|key| {
                let value = self.get(key)?;
                Ok((key.to_string(), value))
            })
            .collect()
    }

    /// Reset configuration to defaults
    pub fn reset() -> anyhow::Result<()> {
        let path = Self::config_path()?;
        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to remove config file: {}", path.display()))?;
        }
        Ok(())
    }
}
