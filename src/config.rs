//! Router configuration
//!
//! Values come from an optional YAML file, then environment overrides.
//! Everything here is read once at startup and never mutated afterwards.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable naming the YAML config file when `--config` is absent
pub const CONFIG_ENV: &str = "EDGE_ROUTER_CONFIG";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub routing: RoutingConfig,
    pub upstream: UpstreamConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address the router listens on
    pub listen_addr: String,
    /// Default tracing filter when `RUST_LOG` is unset
    pub log_level: String,
}

/// Where traffic goes
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Origin serving API and dynamic traffic
    pub backend_origin: String,
    /// Origin serving the static single-page app
    pub frontend_origin: String,
    /// Ordered path prefixes routed to the backend
    pub backend_paths: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Redirect hops followed on the backend HTTP branch
    pub max_redirects: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8080".into(),
            log_level: "info".into(),
        }
    }
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            backend_origin: "https://backend.leke.xyz".into(),
            frontend_origin: "https://xiaole-ai.pages.dev".into(),
            backend_paths: ["/api", "/uploads", "/ws", "/static", "/files"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self { max_redirects: 20 }
    }
}

impl Config {
    /// Load configuration.
    ///
    /// Uses `path` if given, otherwise the file named by `EDGE_ROUTER_CONFIG`,
    /// otherwise built-in defaults. Environment overrides are applied last.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));

        let mut config = match path {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse a YAML config file. Missing keys fall back to defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_yaml(&contents)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn from_yaml(contents: &str) -> Result<Self> {
        // An empty document deserializes to unit, not to a struct
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(contents).context("Failed to parse YAML")
    }

    pub fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("LISTEN") {
            self.server.listen_addr = v;
        }
        if let Ok(v) = std::env::var("EDGE_LOG_LEVEL") {
            self.server.log_level = v;
        }
        if let Ok(v) = std::env::var("EDGE_BACKEND_ORIGIN") {
            self.routing.backend_origin = v;
        }
        if let Ok(v) = std::env::var("EDGE_FRONTEND_ORIGIN") {
            self.routing.frontend_origin = v;
        }
    }
}
