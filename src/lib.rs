//! Greeter - a mutually-authenticated gRPC greeting service
//!
//! The server (`greeterd`) answers a single `Greet` call with
//! `"Hello {name} from {host}"`. With TLS enabled both peers present
//! certificates and each verifies the other against a pool built from a
//! root and an intermediate CA.
//!
//! # Client Example
//!
//! ```rust,no_run
//! use greeter::client::{ClientConfig, greet_once};
//! use greeter::tls::{TlsFiles, TlsMaterial};
//!
//! #[tokio::main]
//! async fn main() -> greeter::Result<()> {
//!     let material = TlsMaterial::load(&TlsFiles {
//!         ca_cert: "pki/ca.pem".into(),
//!         int_cert: "pki/support.pem".into(),
//!         cert: "pki/client.pem".into(),
//!         key: "pki/client-key.pem".into(),
//!     })?;
//!     let config = ClientConfig::new("127.0.0.1:9000").with_tls(material);
//!
//!     let message = greet_once(&config, "Ada").await?;
//!     println!("{message}");
//!     Ok(())
//! }
//! ```

#[cfg(feature = "client")]
pub mod client;
pub mod error;
#[cfg(any(feature = "server", feature = "client"))]
pub mod server;
pub mod telemetry;
pub mod tls;
mod version;

// Re-export main types at crate root
pub use error::{GreeterError, Result};
pub use version::{GIT_BRANCH, GIT_SHA, PKG_VERSION, user_agent, version_string};
