use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variables consulted for the API token, in order.
pub const TOKEN_VARS: [&str; 2] = ["GHA_STATS_TOKEN", "GITHUB_TOKEN"];

pub const DEFAULT_CONFIG_PATH: &str = "config.yml";

/// Largest page size the Actions API accepts.
pub const MAX_PER_PAGE: u8 = 100;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("No API token found (set {} or {})", TOKEN_VARS[0], TOKEN_VARS[1])]
    MissingToken,
    #[error("Failed to read config file {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config file {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Settings read from the optional config file. The token is never part of it.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct FileConfig {
    pub db: DbConfig,
    pub sync: SyncConfig,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub db: DbConfig,
    pub github: GitHubConfig,
    pub sync: SyncConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DbConfig {
    pub url: String,
}

impl Default for DbConfig {
    fn default() -> Self { Self { url: "sqlite://gha-stats.db".to_string() } }
}

#[derive(Debug, Clone)]
pub struct GitHubConfig {
    pub token: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Runs fetched per workflow. Only this one page is ever requested.
    pub per_page: u8,
    /// Maximum number of job listings in flight at once.
    pub concurrency: usize,
}

impl Default for SyncConfig {
    fn default() -> Self { Self { per_page: MAX_PER_PAGE, concurrency: 10 } }
}

impl SyncConfig {
    pub fn per_page(&self) -> u8 { self.per_page.clamp(1, MAX_PER_PAGE) }

    pub fn concurrency(&self) -> usize { self.concurrency.max(1) }
}

impl FileConfig {
    /// Loads the config file at `path`. When no path is given the default file is used
    /// if present, otherwise defaults apply.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(path) => path,
            None => {
                let default = Path::new(DEFAULT_CONFIG_PATH);
                if !default.exists() {
                    return Ok(Self::default());
                }
                default
            }
        };
        let contents = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        tracing::debug!(path = %path.display(), "Loaded config file");
        Self::parse(&contents).map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
    }

    pub fn parse(contents: &str) -> Result<Self, serde_yaml::Error> {
        // An empty file deserializes as null
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(contents)
    }
}

impl GitHubConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Resolves the token through `lookup`, trying each of [`TOKEN_VARS`] in order.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        TOKEN_VARS
            .iter()
            .filter_map(|name| lookup(name))
            .find(|token| !token.is_empty())
            .map(|token| Self { token })
            .ok_or(ConfigError::MissingToken)
    }
}
