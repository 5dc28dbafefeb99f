//! Listener lifecycle: bind, serve, drain on shutdown.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::{Server, ServerTlsConfig};
use tracing::{info, warn};

use super::config::Config;
use super::identity::{HostIdentity, IdentitySource};
use super::proto::greeter_server::GreeterServer;
use super::service::GreeterService;
use crate::tls::TlsMaterial;
use crate::{GreeterError, Result};

/// A bound greeter server, ready to serve.
///
/// Binding and TLS loading happen up front so that every setup failure is
/// reported before the first connection is accepted.
pub struct Daemon<I: IdentitySource = HostIdentity> {
    listener: TcpListener,
    tls: Option<ServerTlsConfig>,
    service: GreeterService<I>,
    grace_period: Duration,
}

impl Daemon<HostIdentity> {
    /// Bind using the identity named in `config`, or the hostname.
    pub async fn bind(config: &Config) -> Result<Self> {
        let identity = HostIdentity::from_config(config.server.identity.as_deref());
        Self::bind_with_identity(config, identity).await
    }
}

impl<I: IdentitySource> Daemon<I> {
    pub async fn bind_with_identity(config: &Config, identity: I) -> Result<Self> {
        let addr = config.socket_addr()?;

        let tls = if config.tls.enabled {
            Some(TlsMaterial::load(&config.tls.files())?.server_config())
        } else {
            None
        };

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| GreeterError::Bind { addr, source })?;

        Ok(Self {
            listener,
            tls,
            service: GreeterService::new(Arc::new(identity)),
            grace_period: config.grace_period(),
        })
    }

    /// Address actually bound; differs from the configured one for port 0.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener
            .local_addr()
            .map_err(|e| GreeterError::Configuration(format!("listener has no address: {e}")))
    }

    /// Serve until `signal` resolves, then drain.
    ///
    /// After the signal no new connections are accepted. Requests already in
    /// flight get up to the configured grace period to finish; whatever is
    /// still running after that is dropped.
    pub async fn serve_with_shutdown<F>(self, signal: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let addr = self.local_addr()?;
        let tls_enabled = self.tls.is_some();

        let mut builder = Server::builder();
        if let Some(tls) = self.tls {
            builder = builder.tls_config(tls)?;
        }

        let (drain_tx, drain_rx) = oneshot::channel::<()>();
        let server = builder
            .add_service(GreeterServer::new(self.service))
            .serve_with_incoming_shutdown(TcpListenerStream::new(self.listener), async {
                let _ = drain_rx.await;
            });
        tokio::pin!(server);

        info!(%addr, tls = tls_enabled, "server listening");

        tokio::select! {
            result = &mut server => return result.map_err(Into::into),
            () = signal => {}
        }

        info!(grace_period = ?self.grace_period, "shutdown requested, draining");
        let _ = drain_tx.send(());

        match tokio::time::timeout(self.grace_period, server).await {
            Ok(result) => result?,
            Err(_) => warn!("grace period elapsed with requests still in flight"),
        }

        info!("good bye");
        Ok(())
    }
}

/// Resolves on Ctrl-C, or on SIGTERM where supported.
pub async fn shutdown_signal() {
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "cannot listen for interrupt");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = interrupt => info!("interrupt received"),
        () = terminate => info!("terminate received"),
    }
}
