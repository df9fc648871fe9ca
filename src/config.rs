//! Server configuration
//!
//! Loaded from an optional YAML file, then overridden from the environment.
//! The public base URIs are derived from the result: `app_base` is the
//! scheme/host/port the server is reachable under, `ldp_base` is the root
//! container (app base plus the context path).

use oxiri::Iri;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid base URI {0}: {1}")]
    InvalidBase(String, String),

    #[error("Invalid port: {0}")]
    InvalidPort(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address
    pub listen_host: String,
    /// Bind port
    pub listen_port: u16,
    /// Public scheme
    pub scheme: String,
    /// Public host name
    pub host: String,
    /// Public port (None = listen port)
    pub port: Option<u16>,
    /// Path of the root container
    pub context: String,
    /// Explicit root container URI, overriding scheme/host/port/context
    pub ldp_base: Option<String>,
    /// RocksDB directory (None = in-memory only)
    pub data_path: Option<PathBuf>,
    /// Path of the constraints document
    pub constraints_path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_host: "0.0.0.0".to_string(),
            listen_port: 3000,
            scheme: "http".to_string(),
            host: "localhost".to_string(),
            port: None,
            context: "/r/".to_string(),
            ldp_base: None,
            data_path: None,
            constraints_path: "/constraints".to_string(),
        }
    }
}

fn add_slash(mut s: String) -> String {
    if !s.ends_with('/') {
        s.push('/');
    }
    s
}

fn parse_port(value: &str) -> ConfigResult<u16> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidPort(value.to_string()))
}

impl ServerConfig {
    /// Read a YAML config file; missing keys take their defaults
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&text)?)
    }

    /// Apply `LDP_*` / `PORT` overrides from the process environment
    pub fn with_env_overrides(mut self) -> ConfigResult<Self> {
        self.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(self)
    }

    /// Apply overrides from an arbitrary variable lookup
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> ConfigResult<()> {
        if let Some(base) = lookup("LDP_BASE") {
            self.ldp_base = Some(base);
        }
        if let Some(host) = lookup("LDP_LISTEN_HOST") {
            self.listen_host = host;
        }
        if let Some(port) = lookup("LDP_LISTEN_PORT").or_else(|| lookup("PORT")) {
            self.listen_port = parse_port(&port)?;
        }
        if let Some(host) = lookup("LDP_HOST") {
            self.host = host;
        }
        if let Some(path) = lookup("LDP_DATA_PATH") {
            self.data_path = Some(PathBuf::from(path));
        }
        Ok(())
    }

    /// Socket address to bind
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.listen_host, self.listen_port)
    }

    fn public_port(&self) -> u16 {
        self.port.unwrap_or(self.listen_port)
    }

    fn explicit_base(&self) -> ConfigResult<Option<Iri<String>>> {
        self.ldp_base
            .as_ref()
            .map(|base| {
                Iri::parse(add_slash(base.clone())).map_err(|e| ConfigError::InvalidBase(base.clone(), e.to_string()))
            })
            .transpose()
    }

    /// Scheme, host and (non-default) port, without a trailing slash
    pub fn app_base(&self) -> ConfigResult<String> {
        if let Some(base) = self.explicit_base()? {
            let authority = base.authority().unwrap_or_default();
            return Ok(format!("{}://{}", base.scheme(), authority));
        }

        let port = self.public_port();
        let default_port = matches!((self.scheme.as_str(), port), ("http", 80) | ("https", 443));
        let app_base = if default_port {
            format!("{}://{}", self.scheme, self.host)
        } else {
            format!("{}://{}:{}", self.scheme, self.host, port)
        };
        Iri::parse(app_base.clone()).map_err(|e| ConfigError::InvalidBase(app_base.clone(), e.to_string()))?;
        Ok(app_base)
    }

    /// Path of the root container, with leading and trailing slash
    pub fn context_path(&self) -> ConfigResult<String> {
        if let Some(base) = self.explicit_base()? {
            return Ok(base.path().to_string());
        }
        let context = self.context.trim_matches('/');
        if context.is_empty() {
            Ok("/".to_string())
        } else {
            Ok(format!("/{}/", context))
        }
    }

    /// URI of the root container
    pub fn ldp_base(&self) -> ConfigResult<String> {
        Ok(format!("{}{}", self.app_base()?, self.context_path()?))
    }

    /// URI of the constraints document
    pub fn constraints_uri(&self) -> ConfigResult<String> {
        Ok(format!("{}{}", self.app_base()?, self.constraints_path))
    }
}
