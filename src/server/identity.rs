//! Server identity embedded in every greeting.

use async_trait::async_trait;

use crate::{GreeterError, Result};

/// Source of the name the server reports as its own.
///
/// Looked up on every request so that a failing source turns into a failed
/// call rather than a stale value.
#[async_trait]
pub trait IdentitySource: Send + Sync + 'static {
    async fn identity(&self) -> Result<String>;
}

/// Identity taken from configuration, or from the OS hostname when none is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostIdentity {
    Fixed(String),
    Hostname,
}

impl HostIdentity {
    /// Blank or missing configuration falls back to the hostname.
    pub fn from_config(explicit: Option<&str>) -> Self {
        match explicit.map(str::trim) {
            Some(name) if !name.is_empty() => HostIdentity::Fixed(name.to_string()),
            _ => HostIdentity::Hostname,
        }
    }
}

#[async_trait]
impl IdentitySource for HostIdentity {
    async fn identity(&self) -> Result<String> {
        match self {
            HostIdentity::Fixed(name) => Ok(name.clone()),
            HostIdentity::Hostname => hostname::get()
                .map_err(|e| GreeterError::Identity(e.to_string()))?
                .into_string()
                .map_err(|raw| {
                    GreeterError::Identity(format!("hostname is not valid UTF-8: {raw:?}"))
                }),
        }
    }
}
