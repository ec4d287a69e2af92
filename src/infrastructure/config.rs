use crate::domain::error::AppError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_bind")]
    pub bind: String,
    pub database_path: Option<String>,
    #[serde(default = "default_seed_dir")]
    pub seed_dir: String,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub webhook: WebhookConfig,
    #[serde(default)]
    pub logging: Logging,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CacheConfig {
    #[serde(default = "default_cache_ttl_ms")]
    pub ttl_ms: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct WebhookConfig {
    #[serde(default = "default_contact_url")]
    pub contact_url: String,
    #[serde(default = "default_new_lead_url")]
    pub new_lead_url: String,
    #[serde(default = "default_webhook_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Logging {
    #[serde(default = "default_enable")]
    pub enable: bool,
    pub path: Option<String>,
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_ms: default_cache_ttl_ms(),
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            contact_url: default_contact_url(),
            new_lead_url: default_new_lead_url(),
            timeout_secs: default_webhook_timeout(),
        }
    }
}

impl Default for Logging {
    fn default() -> Self {
        Self {
            enable: true,
            path: None,
            level: default_log_level(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            database_path: None,
            seed_dir: default_seed_dir(),
            cache: CacheConfig::default(),
            webhook: WebhookConfig::default(),
            logging: Logging::default(),
        }
    }
}

// Defaults
fn default_bind() -> String {
    "127.0.0.1:3000".to_string()
}
fn default_seed_dir() -> String {
    "bck_database".to_string()
}
fn default_cache_ttl_ms() -> u64 {
    // Long enough to absorb duplicate dashboard refetches
    3000
}
fn default_contact_url() -> String {
    "https://webhook.elev8.com.br/webhook/e400a55e-a59d-4130-9add-db88cd65bfd1".to_string()
}
fn default_new_lead_url() -> String {
    "https://webhook.elev8.com.br/webhook/8c9a8d62-81f9-4290-ba3d-b3669f1c0025".to_string()
}
fn default_webhook_timeout() -> u64 {
    15
}
fn default_enable() -> bool {
    true
}
fn default_log_level() -> String {
    "INFO".to_string()
}

pub fn get_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("leadboard").join("config.toml"))
}

/// Database path from config, else `~/.config/leadboard/leadboard.db` (Linux)
pub fn get_database_path(config: &Config) -> PathBuf {
    if let Some(path) = config.database_path.as_deref().filter(|p| !p.is_empty()) {
        return PathBuf::from(path);
    }
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("leadboard")
        .join("leadboard.db")
}

/// Loads the config at `path`, or the default location when `None`.
/// A missing file yields defaults; an unparsable one yields defaults with a
/// warning.
pub fn load_config(path: Option<&Path>) -> Result<Config, AppError> {
    let config_path = path.map(Path::to_path_buf).or_else(get_config_path);

    if let Some(path) = config_path {
        if path.exists() {
            let content = fs::read_to_string(&path)?;
            return Ok(parse_config(&content).unwrap_or_else(|e| {
                eprintln!(
                    "Warning: Failed to parse config file {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Config::default()
            }));
        }
    }

    Ok(Config::default())
}

pub fn parse_config(content: &str) -> Result<Config, AppError> {
    Ok(toml::from_str::<Config>(content)?)
}

pub fn generate_config_sample(path: Option<&Path>) -> Result<PathBuf, AppError> {
    let path = path
        .map(Path::to_path_buf)
        .or_else(get_config_path)
        .ok_or_else(|| AppError::Config("Cannot determine config directory".to_string()))?;

    if path.exists() {
        eprintln!("Config file already exists at: {}", path.display());
        return Ok(path);
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let sample = Config::default();
    let toml_content = toml::to_string_pretty(&sample)
        .map_err(|e| AppError::Config(format!("Failed to serialize config: {}", e)))?;
    fs::write(&path, toml_content)
        .map_err(|e| AppError::Config(format!("Failed to write config file: {}", e)))?;
    println!("Generated config file at: {}", path.display());

    Ok(path)
}
