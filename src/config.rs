use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::error::{Result, ScraperError};

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub processing: ProcessingConfig,
    pub rate_limiting: RateLimitConfig,
    pub retry: RetryConfig,
    pub identities: IdentityConfig,
    pub logging: LoggingConfig,
    pub data: DataConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    pub deduplicate: bool,
    pub min_quality_score: f64,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            deduplicate: true,
            min_quality_score: 0.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub max_requests_per_hour: u32,
    pub min_delay_seconds: f64,
    pub max_delay_seconds: f64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests_per_hour: 50,
            min_delay_seconds: 3.0,
            max_delay_seconds: 8.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub backoff_base: f64,
    pub rate_limit_cooldown_seconds: f64,
    pub timeout_seconds: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base: 2.0,
            rate_limit_cooldown_seconds: 60.0,
            timeout_seconds: 15,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Empty means the built-in browser signature pool
    pub pool: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub directory: String,
    pub level: String,
    pub console_output: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: "logs".to_string(),
            level: "info".to_string(),
            console_output: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub processed_dir: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            processed_dir: "data/processed".to_string(),
        }
    }
}

impl Config {
    /// Load `config.toml` from the working directory, falling back to defaults when absent
    pub fn load() -> Result<Self> {
        if Path::new(DEFAULT_CONFIG_PATH).exists() {
            Self::load_from(DEFAULT_CONFIG_PATH)
        } else {
            let mut config = Config::default();
            config.apply_env_overrides()?;
            config.validate()?;
            Ok(config)
        }
    }

    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config_content = fs::read_to_string(path).map_err(|e| {
            ScraperError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        let mut config = Self::from_toml_str(&config_content)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    /// Apply `LEADS_*` overrides from the process environment (and `.env`, if present)
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        dotenv::dotenv().ok();

        if let Some(value) = env_override::<f64>("LEADS_MIN_QUALITY_SCORE")? {
            self.processing.min_quality_score = value;
        }
        if let Some(value) = env_override::<bool>("LEADS_DEDUPLICATE")? {
            self.processing.deduplicate = value;
        }
        if let Some(value) = env_override::<u32>("LEADS_MAX_REQUESTS_PER_HOUR")? {
            self.rate_limiting.max_requests_per_hour = value;
        }
        if let Ok(level) = std::env::var("LEADS_LOG_LEVEL") {
            self.logging.level = level;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let processing = &self.processing;
        if !(0.0..=1.0).contains(&processing.min_quality_score) {
            return Err(ScraperError::Config(format!(
                "min_quality_score must be within [0, 1], got {}",
                processing.min_quality_score
            )));
        }

        let rate = &self.rate_limiting;
        if rate.max_requests_per_hour == 0 {
            return Err(ScraperError::Config(
                "max_requests_per_hour must be positive".to_string(),
            ));
        }
        if !rate.min_delay_seconds.is_finite() || !rate.max_delay_seconds.is_finite() {
            return Err(ScraperError::Config(
                "request delays must be finite".to_string(),
            ));
        }
        if rate.min_delay_seconds < 0.0 || rate.max_delay_seconds < 0.0 {
            return Err(ScraperError::Config(
                "request delays must not be negative".to_string(),
            ));
        }
        if rate.min_delay_seconds > rate.max_delay_seconds {
            return Err(ScraperError::Config(format!(
                "min_delay_seconds ({}) exceeds max_delay_seconds ({})",
                rate.min_delay_seconds, rate.max_delay_seconds
            )));
        }

        let retry = &self.retry;
        if retry.max_attempts == 0 {
            return Err(ScraperError::Config(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        if !retry.backoff_base.is_finite() || retry.backoff_base <= 0.0 {
            return Err(ScraperError::Config(
                "retry.backoff_base must be a positive finite number".to_string(),
            ));
        }
        let cooldown = retry.rate_limit_cooldown_seconds;
        if !cooldown.is_finite() || cooldown < 0.0 {
            return Err(ScraperError::Config(
                "retry.rate_limit_cooldown_seconds must be finite and not negative".to_string(),
            ));
        }

        Ok(())
    }
}

fn env_override<T: FromStr>(key: &str) -> Result<Option<T>> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ScraperError::Config(format!("{} has an invalid value: '{}'", key, raw))),
        Err(_) => Ok(None),
    }
}
