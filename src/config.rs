use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

/// Names a YAML file to load settings from.
pub const CONFIG_ENV: &str = "COOLIPC_CONFIG";
/// Overrides both the server and the client socket path.
pub const SOCKET_ENV: &str = "COOLIPC_SOCKET";

pub const DEFAULT_SOCKET_PATH: &str = "/var/run/coolipc/coold.sock";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub client: ClientConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub socket_path: PathBuf,
    /// Value of the `Server` header; omitted when unset.
    pub server_header: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            socket_path: PathBuf::from(DEFAULT_SOCKET_PATH),
            server_header: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub socket_path: PathBuf,
    /// Default `Host` header.
    pub host: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            socket_path: PathBuf::from(DEFAULT_SOCKET_PATH),
            host: crate::framework_id(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `tracing` filter directive used when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Defaults, overlaid by the file named in `COOLIPC_CONFIG`, overlaid
    /// by `COOLIPC_SOCKET`.
    pub fn load() -> anyhow::Result<Self> {
        let mut config = match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::default(),
        };
        if let Some(socket) = std::env::var_os(SOCKET_ENV) {
            config.set_socket_path(PathBuf::from(socket));
        }
        Ok(config)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        Self::from_yaml_str(&text).with_context(|| format!("parsing config file {}", path.display()))
    }

    pub fn from_yaml_str(text: &str) -> anyhow::Result<Self> {
        // An empty document deserializes to unit, not to a mapping.
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn set_socket_path(&mut self, path: PathBuf) {
        self.client.socket_path = path.clone();
        self.server.socket_path = path;
    }
}
