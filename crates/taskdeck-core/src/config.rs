//! Application configuration management.
//!
//! The configuration holds the backend URL, the last email used to sign in,
//! where the bearer credential is kept, and the request timeout.
//!
//! Configuration is stored at `~/.config/taskdeck/config.json`. The
//! `TASKDECK_API_BASE_URL` environment variable overrides the stored URL.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::api::{ApiClient, DEFAULT_API_BASE_URL};
use crate::auth::{FileStorage, KeyringStorage, TokenStore};

/// Application name used for config/data directory paths
const APP_NAME: &str = "taskdeck";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Credential file name, used by the file token backend
const CREDENTIAL_FILE: &str = "credential.json";

/// Environment variable overriding the backend URL
pub const API_BASE_URL_ENV: &str = "TASKDECK_API_BASE_URL";

/// Where the bearer credential is persisted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenBackend {
    #[default]
    Keyring,
    File,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub api_base_url: Option<String>,
    pub last_email: Option<String>,
    pub token_storage: TokenBackend,
    /// Opt-in request timeout; unset or `0` leaves timing to the transport
    pub request_timeout_secs: Option<u64>,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn data_dir() -> Result<PathBuf> {
        let data_dir =
            dirs::data_dir().ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME))
    }

    /// Backend URL: environment, then config file, then the built-in default
    pub fn api_base_url(&self) -> String {
        resolve_base_url(
            std::env::var(API_BASE_URL_ENV).ok().as_deref(),
            self.api_base_url.as_deref(),
        )
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    pub fn token_store(&self) -> Result<TokenStore> {
        Ok(match self.token_storage {
            TokenBackend::Keyring => TokenStore::new(KeyringStorage::new()),
            TokenBackend::File => {
                TokenStore::new(FileStorage::new(Self::data_dir()?.join(CREDENTIAL_FILE)))
            }
        })
    }

    pub fn api_client(&self, tokens: Arc<TokenStore>) -> Result<ApiClient> {
        ApiClient::with_timeout(self.api_base_url(), tokens, self.request_timeout())
            .context("Failed to build HTTP client")
    }
}

fn resolve_base_url(env: Option<&str>, configured: Option<&str>) -> String {
    [env, configured]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|url| !url.is_empty())
        .unwrap_or(DEFAULT_API_BASE_URL)
        .to_string()
}
