use anyhow::Context;
use serde::Deserialize;
use std::{path::PathBuf, time::Duration};

#[derive(Debug, Deserialize)]
pub struct Config {
    pub version: u32,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub license: LicenseConfig,
    #[serde(default)]
    pub downloads: DownloadsConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

impl Config {
    pub fn load(path: &str) -> anyhow::Result<Config> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {path}"))?;
        toml::from_str(&contents).with_context(|| "Failed to parse config TOML")
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StoreConfig {
    /// optional TOML catalog replacing the built-in one
    pub catalog: Option<PathBuf>,
    pub preview_limit_secs: u64,
    pub payment_delay_ms: u64,
    pub buyer_name: String,
    pub entity: String,
    /// download audio and receipt right after payment
    pub auto_download: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            catalog: None,
            preview_limit_secs: 20,
            payment_delay_ms: 2500,
            buyer_name: "Cliente Muvuka".to_string(),
            entity: "00342".to_string(),
            auto_download: true,
        }
    }
}

impl StoreConfig {
    pub fn preview_limit(&self) -> Duration {
        Duration::from_secs(self.preview_limit_secs)
    }

    pub fn payment_delay(&self) -> Duration {
        Duration::from_millis(self.payment_delay_ms)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LicenseConfig {
    pub endpoint: String,
    pub model: String,
    /// name of the environment variable holding the API key
    pub api_key_env: String,
    pub timeout_secs: u64,
}

impl Default for LicenseConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-3-flash-preview".to_string(),
            api_key_env: "API_KEY".to_string(),
            timeout_secs: 30,
        }
    }
}

impl LicenseConfig {
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DownloadsConfig {
    pub dir: PathBuf,
}

impl Default for DownloadsConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("downloads"),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct HttpConfig {
    pub bind_addr: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}
