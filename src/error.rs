//! Greeter error types

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Greeter error types
#[derive(Debug, thiserror::Error)]
pub enum GreeterError {
    // Configuration errors
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A certificate or key file could not be read, parsed, or added to the
    /// trust pool.
    #[error("certificate error ({}): {reason}", .path.display())]
    Certificate { path: PathBuf, reason: String },

    #[error("failed to listen on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    // Network errors
    #[error("transport error: {0}")]
    Transport(#[from] tonic::transport::Error),

    #[error("deadline of {0:?} exceeded")]
    DeadlineExceeded(Duration),

    #[error("rpc failed ({code:?}): {message}")]
    Rpc { code: tonic::Code, message: String },

    // Service errors
    #[error("cannot determine host identity: {0}")]
    Identity(String),
}

impl GreeterError {
    /// Whether the failure came from the network rather than from local setup.
    ///
    /// Transient errors may succeed if the same call is issued again later;
    /// configuration and certificate errors will not.
    pub fn is_transient(&self) -> bool {
        match self {
            GreeterError::Transport(_) | GreeterError::DeadlineExceeded(_) => true,
            GreeterError::Rpc { code, .. } => matches!(
                code,
                tonic::Code::Unavailable
                    | tonic::Code::DeadlineExceeded
                    | tonic::Code::ResourceExhausted
                    | tonic::Code::Aborted
            ),
            GreeterError::Configuration(_)
            | GreeterError::Certificate { .. }
            | GreeterError::Bind { .. }
            | GreeterError::Identity(_) => false,
        }
    }

    pub(crate) fn certificate(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        GreeterError::Certificate {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

impl From<tonic::Status> for GreeterError {
    fn from(status: tonic::Status) -> Self {
        GreeterError::Rpc {
            code: status.code(),
            message: status.message().to_string(),
        }
    }
}

impl From<GreeterError> for tonic::Status {
    fn from(err: GreeterError) -> Self {
        match err {
            GreeterError::Rpc { code, message } => tonic::Status::new(code, message),
            GreeterError::DeadlineExceeded(deadline) => {
                tonic::Status::deadline_exceeded(format!("deadline of {deadline:?} exceeded"))
            }
            other => tonic::Status::internal(other.to_string()),
        }
    }
}

/// Result type alias for Greeter operations
pub type Result<T> = std::result::Result<T, GreeterError>;
