// File: src/config.rs
use crate::client::DEFAULT_API_URL;
use crate::paths::AppPaths;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

fn default_true() -> bool {
    true
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_chunk_chars() -> usize {
    3
}

fn default_interval_ms() -> u64 {
    10
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct Config {
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Socket.IO endpoint; derived from `api_url` when unset.
    #[serde(default)]
    pub push_url: Option<String>,

    #[serde(default = "default_true")]
    pub enable_push: bool,

    #[serde(default = "default_chunk_chars")]
    pub reveal_chunk_chars: usize,
    #[serde(default = "default_interval_ms")]
    pub reveal_interval_ms: u64,

    #[serde(default = "default_true")]
    pub confirm_delete: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            push_url: None,
            enable_push: true,
            reveal_chunk_chars: default_chunk_chars(),
            reveal_interval_ms: default_interval_ms(),
            confirm_delete: true,
        }
    }
}

impl Config {
    /// Loads the config file, writing the defaults out on first run.
    pub fn load() -> Result<Self> {
        let path = AppPaths::get_config_file_path()?;
        if path.exists() {
            return Self::load_from(&path);
        }
        let config = Self::default();
        if let Err(e) = config.save() {
            tracing::warn!(error = %e, "could not write default config");
        }
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;
        config.sanitize();
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let path = AppPaths::get_config_file_path()?;
        let toml_str = toml::to_string_pretty(self)?;
        fs::write(path, toml_str)?;
        Ok(())
    }

    pub fn get_path_string() -> Result<String> {
        let path = AppPaths::get_config_file_path()?;
        Ok(path.to_string_lossy().to_string())
    }

    fn sanitize(&mut self) {
        if self.reveal_chunk_chars == 0 {
            self.reveal_chunk_chars = default_chunk_chars();
        }
        if self.reveal_interval_ms == 0 {
            self.reveal_interval_ms = default_interval_ms();
        }
    }

    pub fn reveal_interval(&self) -> Duration {
        Duration::from_millis(self.reveal_interval_ms)
    }

    /// `http(s)://host` → `ws(s)://host/socket.io/?EIO=4&transport=websocket`.
    pub fn effective_push_url(&self) -> String {
        if let Some(url) = &self.push_url
            && !url.trim().is_empty()
        {
            return url.trim().to_string();
        }
        let base = self.api_url.trim().trim_end_matches('/');
        let ws_base = if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{}", rest)
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{}", rest)
        } else {
            base.to_string()
        };
        format!("{}/socket.io/?EIO=4&transport=websocket", ws_base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_gives_defaults() {
        let cfg: Config = toml::from_str("").unwrap();
        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.api_url, "http://127.0.0.1:5000");
        assert!(cfg.enable_push);
    }

    #[test]
    fn test_push_url_derivation() {
        let mut cfg = Config {
            api_url: "https://notes.example.org/".into(),
            ..Config::default()
        };
        assert_eq!(
            cfg.effective_push_url(),
            "wss://notes.example.org/socket.io/?EIO=4&transport=websocket"
        );
        cfg.push_url = Some("ws://other:9000/socket.io/?EIO=4&transport=websocket".into());
        assert_eq!(
            cfg.effective_push_url(),
            "ws://other:9000/socket.io/?EIO=4&transport=websocket"
        );
    }

    #[test]
    fn test_zero_reveal_settings_are_sanitized() {
        let mut cfg: Config = toml::from_str("reveal_chunk_chars = 0\nreveal_interval_ms = 0").unwrap();
        cfg.sanitize();
        assert_eq!(cfg.reveal_chunk_chars, 3);
        assert_eq!(cfg.reveal_interval(), Duration::from_millis(10));
    }
}
