//! Error types used throughout the workspace

use std::error::Error as StdError;

use thiserror::Error;

/// Boxed cause attached to client-side failures.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Main error type for Warden
#[derive(Error, Debug)]
pub enum WardenError {
    /// Local failure before or while talking to the peer: I/O errors,
    /// malformed credentials, unsupported auth types, interrupted backoff.
    #[error("Client request failed: {message}")]
    ClientRequest {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// The peer answered with a status outside the expected set.
    #[error("Server responded with {status} {reason}{}", trace_suffix(.trace_id))]
    ServerResponse { status: u16, reason: String, trace_id: Option<String> },

    /// The peer rejected the credentials (401 or 403).
    #[error("Authorization rejected with {status} {reason}{}", trace_suffix(.trace_id))]
    Authorization { status: u16, reason: String, trace_id: Option<String> },

    /// A bounded buffer or queue is full; the caller should shed load.
    #[error("Buffer overflow: capacity of {capacity} exhausted")]
    BufferOverflow { capacity: usize },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

fn trace_suffix(trace_id: &Option<String>) -> String {
    trace_id.as_ref().map(|id| format!(" (trace id {id})")).unwrap_or_default()
}

impl WardenError {
    /// Client-side failure without an underlying cause.
    pub fn client_request(message: impl Into<String>) -> Self {
        Self::ClientRequest { message: message.into(), source: None }
    }

    /// Client-side failure wrapping the error that caused it.
    pub fn client_request_with<E>(message: impl Into<String>, source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::ClientRequest { message: message.into(), source: Some(Box::new(source)) }
    }

    /// Raised when a backoff sleep or queued job is cancelled.
    pub fn interrupted(message: impl Into<String>) -> Self {
        Self::client_request(format!("interrupted: {}", message.into()))
    }

    /// Map a rejected status to [`WardenError::Authorization`] for 401/403
    /// and [`WardenError::ServerResponse`] otherwise.
    pub fn from_status(status: u16, reason: impl Into<String>, trace_id: Option<String>) -> Self {
        let reason = reason.into();
        match status {
            401 | 403 => Self::Authorization { status, reason, trace_id },
            _ => Self::ServerResponse { status, reason, trace_id },
        }
    }

    /// HTTP status carried by response errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::ServerResponse { status, .. } | Self::Authorization { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }

    /// Trace identifier reported by the peer, if any.
    pub fn trace_id(&self) -> Option<&str> {
        match self {
            Self::ServerResponse { trace_id, .. } | Self::Authorization { trace_id, .. } => {
                trace_id.as_deref()
            }
            _ => None,
        }
    }

    /// True for both server responses and their authorization specialization.
    pub fn is_server_response(&self) -> bool {
        matches!(self, Self::ServerResponse { .. } | Self::Authorization { .. })
    }

    pub fn is_authorization(&self) -> bool {
        matches!(self, Self::Authorization { .. })
    }

    pub fn is_client_request(&self) -> bool {
        matches!(self, Self::ClientRequest { .. })
    }

    pub fn is_buffer_overflow(&self) -> bool {
        matches!(self, Self::BufferOverflow { .. })
    }
}

/// Result type alias for Warden operations
pub type Result<T> = std::result::Result<T, WardenError>;
