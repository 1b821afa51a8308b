//! Configuration file loader with position-aware error reporting.
//!
//! Loads TOML configuration from an explicit path or the default XDG location.
//! A bot cannot run without servers, so a missing file is an error either way.

use std::fs;
use std::path::Path;

use crate::config::error::ConfigError;
use crate::config::schema::Config;
use crate::config::xdg;

/// Stateless configuration loader.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load from `path` if given, otherwise from the default XDG location.
    pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => Self::load_default(),
        }
    }

    /// Load configuration from a specific path.
    ///
    /// Returns `ConfigError::NotFound` if the file does not exist, or
    /// `ConfigError::ReadError` for other I/O failures.
    pub fn load_from_path(path: &Path) -> Result<Config, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound {
                    path: path.to_path_buf(),
                }
            } else {
                ConfigError::ReadError {
                    path: path.to_path_buf(),
                    source: e,
                }
            }
        })?;
        let config = Self::parse_toml(&content, path)?;
        tracing::debug!(
            "Loaded configuration from {:?} ({} servers)",
            path,
            config.servers.len()
        );
        Ok(config)
    }

    /// Load configuration from the default XDG location.
    pub fn load_default() -> Result<Config, ConfigError> {
        Self::load_from_path(&xdg::config_path())
    }

    /// Parse a TOML string into `Config` with position-aware error reporting.
    pub(crate) fn parse_toml(content: &str, path: &Path) -> Result<Config, ConfigError> {
        toml::from_str(content).map_err(|e| {
            let (line, column) = e
                .span()
                .map(|span| {
                    let line = content[..span.start].matches('\n').count() + 1;
                    let last_newline = content[..span.start]
                        .rfind('\n')
                        .map(|p| p + 1)
                        .unwrap_or(0);
                    let column = span.start - last_newline + 1;
                    (line, column)
                })
                .unwrap_or((0, 0));
            ConfigError::ParseError {
                path: path.to_path_buf(),
                line,
                column,
                message: e.message().to_string(),
            }
        })
    }
}
