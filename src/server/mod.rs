//! gRPC server and shared proto types.
//!
//! This module provides:
//! - Generated protobuf types (`proto`) used by both server and client
//! - Configuration types (`config`, server-only)
//! - Host identity resolution (`identity`, server-only)
//! - The `Greeter` service implementation (`service`, server-only)
//! - Listener lifecycle and graceful shutdown (`daemon`, server-only)

#[cfg(feature = "server")]
pub mod config;
#[cfg(feature = "server")]
pub mod daemon;
#[cfg(feature = "server")]
pub mod identity;
#[cfg(feature = "server")]
pub mod service;

/// Re-exported generated proto types.
pub mod proto {
    tonic::include_proto!("greeter.v1");
}

#[cfg(feature = "server")]
pub use daemon::{Daemon, shutdown_signal};
#[cfg(feature = "server")]
pub use identity::{HostIdentity, IdentitySource};
#[cfg(feature = "server")]
pub use service::GreeterService;
