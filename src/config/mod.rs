use crate::error::ConfigError;
use anyhow::{Context, Result};
use directories::UserDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

// ── Service config ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to config.toml - computed from home, not serialized
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Gateway bind host (default: 127.0.0.1)
    #[serde(default = "default_host")]
    pub host: String,

    /// Gateway bind port (default: 8087)
    #[serde(default = "default_port")]
    pub port: u16,

    /// SQLite database file
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// Public base URL of this service, used to build OAuth redirect URIs
    #[serde(default = "default_public_app_url")]
    pub public_app_url: String,

    #[serde(default)]
    pub vendor: VendorConfig,
}

// ── Vendor endpoints ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VendorConfig {
    /// OAuth2 host (login + token endpoints)
    #[serde(default = "default_auth_base")]
    pub auth_base: String,

    /// Collection API host
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Items requested per collection page
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl Default for VendorConfig {
    fn default() -> Self {
        Self {
            auth_base: default_auth_base(),
            api_base: default_api_base(),
            page_size: default_page_size(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".into()
}

fn default_port() -> u16 {
    8087
}

fn default_database_path() -> PathBuf {
    PathBuf::from("contabridge.db")
}

fn default_public_app_url() -> String {
    "http://127.0.0.1:8087".into()
}

fn default_auth_base() -> String {
    "https://auth.contaazul.com".into()
}

fn default_api_base() -> String {
    "https://api-v2.contaazul.com".into()
}

fn default_page_size() -> u32 {
    20
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_path: PathBuf::new(),
            host: default_host(),
            port: default_port(),
            database_path: default_database_path(),
            public_app_url: default_public_app_url(),
            vendor: VendorConfig::default(),
        }
    }
}

impl Config {
    /// Load `~/.contabridge/config.toml`, writing a default file on first run.
    pub fn load_or_init() -> Result<Self> {
        let home = UserDirs::new()
            .map(|u| u.home_dir().to_path_buf())
            .context("could not resolve home directory")?;
        let dir = home.join(".contabridge");
        fs::create_dir_all(&dir).context("create config directory")?;
        let path = dir.join("config.toml");

        if !path.exists() {
            let default = Self {
                database_path: dir.join("contabridge.db"),
                ..Self::default()
            };
            let rendered =
                toml::to_string_pretty(&default).context("serialize default config")?;
            fs::write(&path, rendered).context("write default config")?;
            tracing::info!(path = %path.display(), "wrote default config");
        }

        Self::from_path(&path)
    }

    /// Load config from an explicit path.
    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("read config file: {}", path.display()))?;
        let mut config: Self = toml::from_str(&raw)
            .map_err(|e| ConfigError::Load(e.to_string()))
            .with_context(|| format!("parse config file: {}", path.display()))?;
        config.config_path = path.to_path_buf();
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.vendor.page_size == 0 {
            return Err(ConfigError::Validation(
                "vendor.page_size must be at least 1".into(),
            ));
        }
        if self.public_app_url.trim_end_matches('/').is_empty() {
            return Err(ConfigError::Validation(
                "public_app_url must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Redirect URI registered with the vendor; must match between the
    /// authorize redirect and the callback exchange.
    pub fn oauth_redirect_uri(&self) -> String {
        format!(
            "{}/integrations/contaazul/callback",
            self.public_app_url.trim_end_matches('/')
        )
    }
}
