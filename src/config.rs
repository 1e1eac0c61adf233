//! YAML-backed configuration for the router binary.
//!
//! Only the handful of settings this binary itself needs live here; the
//! router's actual behavior (buffering, wake semantics, tombstone capacity)
//! is intentionally not configurable — it is part of `router-core`'s
//! contract, not deployment-time policy.

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// Top-level configuration loaded from a YAML file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RouterConfig {
    /// Address the gRPC server binds to, e.g. `"0.0.0.0:50051"`.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
        }
    }
}

fn default_listen_addr() -> String {
    "0.0.0.0:50051".to_string()
}

impl RouterConfig {
    /// Loads and validates configuration from a YAML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }
}

/// Errors produced while loading [`RouterConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read from disk.
    #[error("failed to read config file {path}: {source}")]
    Read {
        /// Path that was attempted.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The config file's contents did not parse as valid YAML for this schema.
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        /// Path that was attempted.
        path: String,
        /// Underlying YAML error.
        #[source]
        source: serde_yaml::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_listen_addr_parses_as_socket_addr() {
        let config = RouterConfig::default();
        let _: std::net::SocketAddr = config.listen_addr.parse().unwrap();
    }
}
