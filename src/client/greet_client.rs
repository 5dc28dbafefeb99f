//! [`GreetClient`]: one connection, one `Greet` call, one deadline.

use std::time::{Duration, Instant};

use tonic::Request;
use tonic::transport::{Channel, Endpoint};
use tracing::debug;

use crate::server::proto::GreetRequest;
use crate::server::proto::greeter_client::GreeterClient;
use crate::tls::TlsMaterial;
use crate::version;
use crate::{GreeterError, Result};

/// Deadline applied to the exchange unless overridden.
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(1);

/// Immutable client settings, built once at startup.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    server: String,
    tls: Option<TlsMaterial>,
    server_name: Option<String>,
    deadline: Duration,
}

impl ClientConfig {
    /// Plaintext connection to `server` (`host:port` or a full URI).
    pub fn new(server: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            tls: None,
            server_name: None,
            deadline: DEFAULT_DEADLINE,
        }
    }

    /// Use mutual TLS with the given material.
    pub fn with_tls(mut self, material: TlsMaterial) -> Self {
        self.tls = Some(material);
        self
    }

    /// Name to verify in the server certificate instead of the dialled host.
    pub fn with_server_name(mut self, name: impl Into<String>) -> Self {
        self.server_name = Some(name.into());
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    pub fn tls_enabled(&self) -> bool {
        self.tls.is_some()
    }

    /// URI to dial. A bare `host:port` gets `https://` under TLS and
    /// `http://` otherwise. Under TLS any scheme other than `https` is
    /// rejected, since tonic would dial it in plaintext.
    pub fn endpoint_uri(&self) -> Result<String> {
        let Some((scheme, _)) = self.server.split_once("://") else {
            let scheme = if self.tls.is_some() { "https" } else { "http" };
            return Ok(format!("{scheme}://{}", self.server));
        };
        if self.tls.is_some() && !scheme.eq_ignore_ascii_case("https") {
            return Err(GreeterError::Configuration(format!(
                "TLS is enabled but {:?} uses the {scheme:?} scheme; use https:// or a bare host:port",
                self.server
            )));
        }
        Ok(self.server.clone())
    }
}

/// Treat any failure observed at or after the deadline as the deadline
/// itself, whatever layer happened to notice first.
fn past_deadline(err: GreeterError, started: Instant, deadline: Duration) -> GreeterError {
    if started.elapsed() >= deadline {
        GreeterError::DeadlineExceeded(deadline)
    } else {
        err
    }
}

/// A connected greeter client.
pub struct GreetClient {
    inner: GreeterClient<Channel>,
    deadline: Duration,
}

impl GreetClient {
    /// Connect (and handshake, under TLS) within the configured deadline.
    pub async fn connect(config: &ClientConfig) -> Result<Self> {
        let uri = config.endpoint_uri()?;
        let deadline = config.deadline;

        let mut endpoint = Endpoint::from_shared(uri.clone())
            .map_err(|e| {
                GreeterError::Configuration(format!("invalid server address {uri:?}: {e}"))
            })?
            .user_agent(version::user_agent())?;

        if let Some(material) = &config.tls {
            endpoint = endpoint.tls_config(material.client_config(config.server_name.as_deref()))?;
        }

        debug!(%uri, tls = config.tls_enabled(), "connecting");
        let started = Instant::now();
        let channel = tokio::time::timeout(deadline, endpoint.connect())
            .await
            .map_err(|_| GreeterError::DeadlineExceeded(deadline))?
            .map_err(|e| past_deadline(e.into(), started, deadline))?;

        Ok(Self {
            inner: GreeterClient::new(channel),
            deadline,
        })
    }

    /// Issue one `Greet` and return the reply message.
    ///
    /// The deadline is sent to the server as `grpc-timeout`; locally the
    /// only timer is the `tokio::time::timeout` around the call.
    pub async fn greet(&self, name: &str) -> Result<String> {
        let mut request = Request::new(GreetRequest {
            name: name.to_string(),
        });
        request.set_timeout(self.deadline);

        let started = Instant::now();
        let response = tokio::time::timeout(self.deadline, self.inner.clone().greet(request))
            .await
            .map_err(|_| GreeterError::DeadlineExceeded(self.deadline))?
            .map_err(|status| past_deadline(status.into(), started, self.deadline))?;

        Ok(response.into_inner().message)
    }
}

/// Connect, greet, and close, all within one deadline.
pub async fn greet_once(config: &ClientConfig, name: &str) -> Result<String> {
    let deadline = config.deadline;
    let started = Instant::now();
    tokio::time::timeout(deadline, async {
        let client = GreetClient::connect(config).await?;
        client.greet(name).await
    })
    .await
    .map_err(|_| GreeterError::DeadlineExceeded(deadline))?
    .map_err(|e| past_deadline(e, started, deadline))
}
