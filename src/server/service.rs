//! gRPC service implementation.

use std::sync::Arc;
use std::time::Instant;

use tonic::{Request, Response, Status};
use tracing::{info, warn};

use super::identity::IdentitySource;
use super::proto::greeter_server::Greeter;
use super::proto::{GreetReply, GreetRequest};
use crate::telemetry;

/// Build the reply text for `name` as served by `host`.
pub fn format_greeting(name: &str, host: &str) -> String {
    format!("Hello {name} from {host}")
}

/// gRPC service answering `Greet` with the server's identity.
///
/// Holds no mutable state; concurrent requests share only the identity source.
pub struct GreeterService<I: IdentitySource> {
    identity: Arc<I>,
}

impl<I: IdentitySource> GreeterService<I> {
    /// Create a new service reporting the given identity.
    pub fn new(identity: Arc<I>) -> Self {
        Self { identity }
    }
}

#[tonic::async_trait]
impl<I: IdentitySource> Greeter for GreeterService<I> {
    async fn greet(
        &self,
        request: Request<GreetRequest>,
    ) -> std::result::Result<Response<GreetReply>, Status> {
        let start = Instant::now();
        let peer = request.remote_addr();
        let authenticated = request.peer_certs().is_some();
        let name = request.into_inner().name;
        info!(%name, ?peer, authenticated, "received greet");

        let result = self
            .identity
            .identity()
            .await
            .map(|host| format_greeting(&name, &host));

        let status = if result.is_ok() { "ok" } else { "error" };
        metrics::counter!(telemetry::REQUESTS_TOTAL, "status" => status).increment(1);
        metrics::histogram!(telemetry::REQUEST_DURATION_SECONDS)
            .record(start.elapsed().as_secs_f64());

        match result {
            Ok(message) => Ok(Response::new(GreetReply { message })),
            Err(e) => {
                warn!(error = %e, "greet failed");
                Err(e.into())
            }
        }
    }
}
