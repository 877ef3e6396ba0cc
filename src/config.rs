//! Runtime configuration.
//!
//! Values come from (lowest to highest precedence) built-in defaults, an
//! optional TOML file, `QUILLCAST_*` environment variables (a `.env` file is
//! honoured) and finally CLI flags applied by the binary.

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ReconnectPolicy;
use crate::server::pages::SiteMetadata;
use crate::sync::BridgeOptions;

pub const DEFAULT_CONFIG_FILE: &str = "quillcast.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub relay: RelayConfig,
    /// Channel every editor publishes to and subscribes on
    pub channel: String,
    pub sync: SyncConfig,
    pub site: SiteMetadata,
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            relay: RelayConfig::default(),
            channel: "editor".to_string(),
            sync: SyncConfig::default(),
            site: SiteMetadata::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the relay listens on
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8000".to_string(),
        }
    }
}

/// How editors reach the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// `host:port` of the relay
    pub address: String,
    pub app_key: String,
    pub cluster: String,
    /// Use `https`/`wss` instead of `http`/`ws`
    pub encrypted: bool,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:8000".to_string(),
            app_key: "quillcast".to_string(),
            cluster: "local".to_string(),
            encrypted: false,
        }
    }
}

impl RelayConfig {
    /// Root of the REST ingress
    pub fn http_url(&self) -> Result<Url> {
        let scheme = if self.encrypted { "https" } else { "http" };
        Url::parse(&format!("{scheme}://{}/", self.address))
            .with_context(|| format!("invalid relay address `{}`", self.address))
    }

    /// Socket endpoint for this app key and cluster
    pub fn socket_url(&self) -> Result<Url> {
        let scheme = if self.encrypted { "wss" } else { "ws" };
        let mut url = Url::parse(&format!("{scheme}://{}/", self.address))
            .with_context(|| format!("invalid relay address `{}`", self.address))?;
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("relay address `{}` cannot carry a path", self.address))?
            .push("app")
            .push(&self.app_key);
        url.query_pairs_mut().append_pair("cluster", &self.cluster);
        Ok(url)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SyncConfig {
    /// Re-render the preview when a structural update arrives
    pub refresh_preview_on_editor_update: bool,
    pub reconnect: ReconnectPolicy,
}

impl SyncConfig {
    pub fn bridge_options(&self) -> BridgeOptions {
        BridgeOptions {
            refresh_preview_on_editor_update: self.refresh_preview_on_editor_update,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing` filter directive used when `RUST_LOG` is unset
    pub filter: Option<String>,
    /// Write a daily rolling log file here in addition to stderr
    pub directory: Option<PathBuf>,
}

impl Config {
    /// Load from `path`, or from `quillcast.toml` in the working directory
    /// when it exists, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let _ = dotenvy::dotenv();

        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };
        config.apply_overrides(|name| std::env::var(name).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("failed to parse config {}", path.display()))
    }

    /// Apply `QUILLCAST_*` overrides looked up through `lookup`
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(bind) = lookup("QUILLCAST_BIND") {
            self.server.bind = bind;
        }
        if let Some(address) = lookup("QUILLCAST_RELAY") {
            self.relay.address = address;
        }
        if let Some(channel) = lookup("QUILLCAST_CHANNEL") {
            self.channel = channel;
        }
        if let Some(key) = lookup("QUILLCAST_APP_KEY") {
            self.relay.app_key = key;
        }
        if let Some(cluster) = lookup("QUILLCAST_CLUSTER") {
            self.relay.cluster = cluster;
        }
        if let Some(encrypted) = lookup("QUILLCAST_ENCRYPTED") {
            self.relay.encrypted = matches!(encrypted.as_str(), "1" | "true" | "yes");
        }
    }
}
