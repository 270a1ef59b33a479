use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;

pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_MUSICBRAINZ_INTERVAL_MS: u64 = 1100;
pub const DEFAULT_FAILURE_REPORT_LIMIT: usize = 5;

/// Placeholder shipped in example configs; treated as "no key".
const API_KEY_PLACEHOLDER: &str = "your_api_key_here";

/// Settings that can be saved to a file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub getsongbpm_api_key: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub spotify_access_token: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub musicbrainz_interval_ms: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform_tempo_fallback: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_report_limit: Option<usize>,
}

impl Config {
    /// Create a new empty config
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the config file path (~/.config/tempocraft/config.toml)
    pub fn get_config_path() -> Result<PathBuf, ConfigError> {
        let home = std::env::var_os("HOME").ok_or(ConfigError::NoHome)?;
        Ok(Path::new(&home)
            .join(".config")
            .join("tempocraft")
            .join("config.toml"))
    }

    /// Load config from the default location
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::get_config_path()?)
    }

    /// Load config from a file.  A missing file is an empty config.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Config::new());
        }

        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Save config to the default location
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Merge this config with another, preferring values from other
    pub fn merge(&mut self, other: &Config) {
        if other.getsongbpm_api_key.is_some() {
            self.getsongbpm_api_key = other.getsongbpm_api_key.clone();
        }
        if other.spotify_access_token.is_some() {
            self.spotify_access_token = other.spotify_access_token.clone();
        }
        if other.timeout_secs.is_some() {
            self.timeout_secs = other.timeout_secs;
        }
        if other.musicbrainz_interval_ms.is_some() {
            self.musicbrainz_interval_ms = other.musicbrainz_interval_ms;
        }
        if other.platform_tempo_fallback.is_some() {
            self.platform_tempo_fallback = other.platform_tempo_fallback;
        }
        if other.failure_report_limit.is_some() {
            self.failure_report_limit = other.failure_report_limit;
        }
    }

    /// Credentials from `GETSONGBPM_API_KEY` / `SPOTIFY_ACCESS_TOKEN`
    /// override the file.
    pub fn apply_env(&mut self) {
        let env = Config {
            getsongbpm_api_key: std::env::var("GETSONGBPM_API_KEY").ok(),
            spotify_access_token: std::env::var("SPOTIFY_ACCESS_TOKEN").ok(),
            ..Config::default()
        };
        self.merge(&env);
    }

    /// A real GetSongBPM key is configured.
    pub fn has_getsongbpm_key(&self) -> bool {
        self.getsongbpm_api_key
            .as_deref()
            .is_some_and(|k| !k.is_empty() && k != API_KEY_PLACEHOLDER)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    pub fn musicbrainz_interval_ms(&self) -> u64 {
        self.musicbrainz_interval_ms
            .unwrap_or(DEFAULT_MUSICBRAINZ_INTERVAL_MS)
    }

    pub fn platform_tempo_fallback(&self) -> bool {
        self.platform_tempo_fallback.unwrap_or(false)
    }

    pub fn failure_report_limit(&self) -> usize {
        self.failure_report_limit
            .unwrap_or(DEFAULT_FAILURE_REPORT_LIMIT)
    }

    /// Print the config in a human-readable format.  Secrets are masked.
    pub fn print(&self, title: &str) {
        println!("{}:", title);

        let mask = |set: bool| if set { "set" } else { "not set" };
        println!("  GetSongBPM key:      {}", mask(self.has_getsongbpm_key()));
        println!("  Spotify token:       {}", mask(self.spotify_access_token.is_some()));
        println!("  Request timeout:     {} seconds", self.timeout().as_secs());
        println!("  MusicBrainz pacing:  {} ms", self.musicbrainz_interval_ms());
        println!(
            "  Spotify BPM tier:    {}",
            if self.platform_tempo_fallback() { "enabled" } else { "disabled" }
        );
    }
}
