//! Configuration loading for greeterd.
//!
//! Configuration is loaded from TOML files with the following resolution order:
//! 1. `--config <path>` (CLI flag, must exist)
//! 2. `~/.greeter/config.toml` (user)
//! 3. `/etc/greeter/config.toml` (system)
//!
//! When no file is found the built-in defaults apply. Command-line flags are
//! layered on top by the daemon binary; the merged [`Config`] is then passed
//! by reference and never mutated.

use serde::Deserialize;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::tls::TlsFiles;
use crate::{GreeterError, Result};

/// Server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub tls: TlsConfig,
}

/// Server network configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address to bind to (default: 0.0.0.0:9000).
    #[serde(default = "default_address")]
    pub address: String,
    /// Name reported in greetings. Falls back to the OS hostname.
    #[serde(default)]
    pub identity: Option<String>,
    /// How long in-flight requests may run after shutdown is requested (default: 10).
    #[serde(default = "default_grace_period")]
    pub grace_period_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            identity: None,
            grace_period_secs: default_grace_period(),
        }
    }
}

fn default_address() -> String {
    "0.0.0.0:9000".to_string()
}

fn default_grace_period() -> u64 {
    10
}

/// Mutual TLS settings.
#[derive(Debug, Clone, Deserialize)]
pub struct TlsConfig {
    /// Require mutual TLS (default: true).
    #[serde(default = "default_tls_enabled")]
    pub enabled: bool,
    /// Root CA used to validate client certificates.
    #[serde(default = "default_ca_cert")]
    pub ca_cert_file: PathBuf,
    /// Intermediate CA used to validate client certificates.
    #[serde(default = "default_int_cert")]
    pub int_cert_file: PathBuf,
    /// Server certificate.
    #[serde(default = "default_cert")]
    pub cert_file: PathBuf,
    /// Server certificate key.
    #[serde(default = "default_key")]
    pub key_file: PathBuf,
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            enabled: default_tls_enabled(),
            ca_cert_file: default_ca_cert(),
            int_cert_file: default_int_cert(),
            cert_file: default_cert(),
            key_file: default_key(),
        }
    }
}

fn default_tls_enabled() -> bool {
    true
}

fn default_ca_cert() -> PathBuf {
    PathBuf::from("pki/ca.pem")
}

fn default_int_cert() -> PathBuf {
    PathBuf::from("pki/support.pem")
}

fn default_cert() -> PathBuf {
    PathBuf::from("pki/server.pem")
}

fn default_key() -> PathBuf {
    PathBuf::from("pki/server-key.pem")
}

impl TlsConfig {
    pub fn files(&self) -> TlsFiles {
        TlsFiles {
            ca_cert: self.ca_cert_file.clone(),
            int_cert: self.int_cert_file.clone(),
            cert: self.cert_file.clone(),
            key: self.key_file.clone(),
        }
    }
}

impl Config {
    /// Load configuration from the standard locations.
    ///
    /// Resolution order:
    /// 1. Explicit path (if provided)
    /// 2. `~/.greeter/config.toml`
    /// 3. `/etc/greeter/config.toml`
    /// 4. Built-in defaults
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        match Self::resolve_config_path(explicit_path)? {
            Some(path) => Self::from_file(&path),
            None => Ok(Self::default()),
        }
    }

    /// Parse a single TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            GreeterError::Configuration(format!("Failed to read config file {path:?}: {e}"))
        })?;
        toml::from_str(&content).map_err(|e| {
            GreeterError::Configuration(format!("Failed to parse config file {path:?}: {e}"))
        })
    }

    /// Resolve the config file path. `None` means use the defaults.
    fn resolve_config_path(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit {
            if path.exists() {
                return Ok(Some(path.to_path_buf()));
            }
            return Err(GreeterError::Configuration(format!(
                "Config file not found: {path:?}"
            )));
        }

        // User config
        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".greeter").join("config.toml");
            if user_config.exists() {
                return Ok(Some(user_config));
            }
        }

        // System config
        let system_config = PathBuf::from("/etc/greeter/config.toml");
        if system_config.exists() {
            return Ok(Some(system_config));
        }

        Ok(None)
    }

    /// Parsed bind address.
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        self.server.address.parse().map_err(|e| {
            GreeterError::Configuration(format!(
                "Invalid address {:?}: {e}",
                self.server.address
            ))
        })
    }

    pub fn grace_period(&self) -> Duration {
        Duration::from_secs(self.server.grace_period_secs)
    }
}
