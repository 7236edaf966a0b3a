use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ConfigError;
use crate::retry::RetryPolicy;

pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub user: UserConfig,
    pub exiftool: ExifToolConfig,
    pub retry: RetryPolicy,
    pub paths: PathsConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub key: String,
    pub secret: String,
    /// Pre-authorized write token.
    pub token: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            key: "yourkey".to_string(),
            secret: "yoursecret".to_string(),
            token: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserConfig {
    pub id: String,
    pub name: String,
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            id: "yourid".to_string(),
            name: "yourname".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExifToolConfig {
    pub path: PathBuf,
}

impl Default for ExifToolConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("/usr/bin/exiftool"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub downloads: PathBuf,
    pub status_file: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            downloads: PathBuf::from("downloads"),
            status_file: PathBuf::from("status.txt"),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&content)?)
    }

    /// Loads `path`, writing a placeholder file first if there is none.
    pub fn load_or_create(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            info!(path = %path.display(), "No config file found, generating one");
            Config::default().save(path)?;
        }
        Self::load(path)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        fs::write(path, self.render()?).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn render(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Key and secret only travel together.
    pub fn set_api_credentials(&mut self, key: Option<String>, secret: Option<String>) -> Result<bool, ConfigError> {
        match (key, secret) {
            (Some(key), Some(secret)) => {
                self.api.key = key;
                self.api.secret = secret;
                Ok(true)
            }
            (None, None) => Ok(false),
            _ => Err(ConfigError::IncompleteApiCredentials),
        }
    }

    pub fn token(&self) -> Option<String> {
        Some(self.api.token.clone()).filter(|t| !t.is_empty())
    }
}
