//! Server configuration, read from TOML.

use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use api_client::uri::ParseUriError;
use octocat::GithubConfig;
use serde::Deserialize;
use thiserror::Error;

use crate::render::RenderOptions;
use crate::server::AppState;

/// Errors loading the server configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("reading {path}: {source}")]
    Io {
        /// The configuration file.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The file is not valid configuration.
    #[error("parsing {path}: {source}")]
    Parse {
        /// The configuration file.
        path: PathBuf,
        /// Underlying error.
        source: toml_edit::de::Error,
    },

    /// The Github API base is not a usable URL.
    #[error("github.api_base: {0}")]
    ApiBase(#[from] ParseUriError),
}

/// Configuration for the installations server.
///
/// ```toml
/// bind = "127.0.0.1:8080"
/// resolve_timeout = 10
///
/// [github]
/// api_base = "https://github.example.com/api/v3/"
///
/// [render]
/// max_repositories = 3
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to listen on.
    pub bind: SocketAddr,

    /// Seconds allowed for fetching the repositories of one installation. `0` disables the deadline.
    pub resolve_timeout: u64,

    /// Github API client settings.
    pub github: GithubConfig,

    /// Markdown output settings.
    pub render: RenderOptions,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from((Ipv4Addr::UNSPECIFIED, 8080)),
            resolve_timeout: 30,
            github: GithubConfig::default(),
            render: RenderOptions::default(),
        }
    }
}

impl ServerConfig {
    /// Parse a TOML document.
    pub fn from_toml(document: &str) -> Result<Self, toml_edit::de::Error> {
        toml_edit::de::from_str(document)
    }

    /// Read configuration from `path`. A file which doesn't exist yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let document = match std::fs::read_to_string(path) {
            Ok(document) => document,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(path = %path.display(), "Configuration file not found, using defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_owned(),
                    source,
                });
            }
        };

        Self::from_toml(&document).map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source,
        })
    }

    /// The per-installation deadline, if any.
    pub fn resolve_timeout(&self) -> Option<Duration> {
        (self.resolve_timeout > 0).then(|| Duration::from_secs(self.resolve_timeout))
    }

    /// Connect to Github and build the server state.
    pub fn state(&self) -> Result<AppState, ConfigError> {
        let github = self.github.connect()?;
        Ok(AppState::new(github)
            .resolve_timeout(self.resolve_timeout())
            .render_options(self.render.clone()))
    }
}
