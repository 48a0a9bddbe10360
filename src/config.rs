use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::debounce::DEFAULT_QUIET_PERIOD;
use crate::omdb::OMDB_API_BASE;
use crate::search::DEFAULT_TOPIC;

const DEFAULT_ENV_PREFIX: &str = "REEL_TUI";
pub const API_KEY_ENV: &str = "OMDB_API_KEY";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing OMDb API key: set OMDB_API_KEY (or REEL_TUI_OMDB__API_KEY), or omdb.api_key in {0}")]
    MissingApiKey(String),
    #[error("invalid omdb.base_url {url:?}: {source}")]
    InvalidBaseUrl {
        url: String,
        source: url::ParseError,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub omdb: OmdbConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OmdbConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for OmdbConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_base_url(),
            timeout: default_timeout(),
        }
    }
}

fn default_base_url() -> String {
    OMDB_API_BASE.to_string()
}

fn default_timeout() -> Duration {
    Duration::from_secs(10)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchConfig {
    #[serde(default = "default_topic")]
    pub default_topic: String,
    #[serde(default = "default_debounce", with = "humantime_serde")]
    pub debounce: Duration,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_topic: default_topic(),
            debounce: default_debounce(),
        }
    }
}

fn default_topic() -> String {
    DEFAULT_TOPIC.to_string()
}

fn default_debounce() -> Duration {
    DEFAULT_QUIET_PERIOD
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogConfig {
    #[serde(default = "default_log_file")]
    pub file: Option<PathBuf>,
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            file: default_log_file(),
            filter: default_log_filter(),
        }
    }
}

fn default_log_file() -> Option<PathBuf> {
    dirs::cache_dir().map(|dir| dir.join("reel-tui").join("reel-tui.log"))
}

fn default_log_filter() -> String {
    "info".into()
}

impl Config {
    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        let key = self.omdb.api_key.trim();
        if key.is_empty() {
            let location = default_config_path()
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config.yaml".to_string());
            return Err(ConfigError::MissingApiKey(location));
        }
        Ok(key)
    }

    pub fn base_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.omdb.base_url).map_err(|source| ConfigError::InvalidBaseUrl {
            url: self.omdb.base_url.clone(),
            source,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub config_file: Option<PathBuf>,
    pub env_prefix: Option<String>,
}

pub fn load(options: LoadOptions) -> Result<Config> {
    let mut cfg = Config::default();

    if let Some(path) = options.config_file.as_ref() {
        if path.exists() {
            let from_file = read_config_file(path)?;
            cfg = merge_config(cfg, from_file);
        }
    } else if let Some(default_path) = default_config_path() {
        if default_path.exists() {
            let from_file = read_config_file(&default_path)?;
            cfg = merge_config(cfg, from_file);
        }
    }

    let prefix = options.env_prefix.as_deref().unwrap_or(DEFAULT_ENV_PREFIX);
    apply_env(&mut cfg, prefix);

    if let Ok(key) = env::var(API_KEY_ENV) {
        if !key.trim().is_empty() {
            cfg.omdb.api_key = key;
        }
    }

    Ok(cfg)
}

fn read_config_file(path: &Path) -> Result<Config> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file at {}", path.display()))?;
    let config: Config = serde_yaml::from_str(&data)
        .with_context(|| format!("Failed to parse config file at {}", path.display()))?;
    Ok(config)
}

fn merge_config(mut base: Config, other: Config) -> Config {
    if !other.omdb.api_key.is_empty() {
        base.omdb.api_key = other.omdb.api_key;
    }
    if !other.omdb.base_url.is_empty() {
        base.omdb.base_url = other.omdb.base_url;
    }
    if !other.omdb.timeout.is_zero() {
        base.omdb.timeout = other.omdb.timeout;
    }

    if !other.search.default_topic.trim().is_empty() {
        base.search.default_topic = other.search.default_topic;
    }
    base.search.debounce = other.search.debounce;

    if other.log.file.is_some() {
        base.log.file = other.log.file;
    }
    if !other.log.filter.is_empty() {
        base.log.filter = other.log.filter;
    }

    base
}

fn apply_env(cfg: &mut Config, prefix: &str) {
    let mut map: HashMap<String, String> = HashMap::new();
    let upper_prefix = format!("{}_", prefix.to_uppercase());

    for (key, value) in env::vars() {
        if let Some(stripped) = key.strip_prefix(&upper_prefix) {
            let normalized = stripped.to_ascii_lowercase().replace("__", ".");
            map.insert(normalized, value);
        }
    }

    for (key, value) in map {
        apply_env_value(cfg, &key, value);
    }
}

fn apply_env_value(cfg: &mut Config, key: &str, value: String) {
    match key {
        "omdb.api_key" => cfg.omdb.api_key = value,
        "omdb.base_url" => cfg.omdb.base_url = value,
        "omdb.timeout" => {
            if let Ok(duration) = humantime::parse_duration(&value) {
                cfg.omdb.timeout = duration;
            }
        }
        "search.default_topic" => cfg.search.default_topic = value,
        "search.debounce" => {
            if let Ok(duration) = humantime::parse_duration(&value) {
                cfg.search.debounce = duration;
            }
        }
        "log.file" => cfg.log.file = Some(PathBuf::from(value)),
        "log.filter" => cfg.log.filter = value,
        _ => {}
    }
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("reel-tui").join("config.yaml"))
}
