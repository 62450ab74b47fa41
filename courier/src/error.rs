use thiserror::Error;

/// Result type alias for courier operations
pub type Result<T> = std::result::Result<T, CourierError>;

/// Error types for bootstrap, transport, routing and delivery
#[derive(Error, Debug)]
pub enum CourierError {
    /// AMQP connection or channel errors
    #[error("AMQP error: {0}")]
    Connection(#[from] lapin::Error),

    /// A dependency never became ready within its retry budget
    #[error("could not connect to {dependency} after {attempts} attempts: {reason}")]
    Bootstrap {
        dependency: String,
        attempts: u32,
        reason: String,
    },

    /// Downstream rejected the credentials
    #[error("invalid credentials")]
    Unauthorized,

    /// Downstream answered with a status other than the accepted one
    #[error("error calling {service}: unexpected status {status}")]
    UnexpectedStatus { service: String, status: u16 },

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Binary RPC dial or call errors
    #[error("RPC error: {0}")]
    Rpc(String),

    /// Typed RPC status errors
    #[error("gRPC error: {0}")]
    Grpc(#[from] tonic::Status),

    /// gRPC channel could not be established
    #[error("gRPC transport error: {0}")]
    GrpcTransport(#[from] tonic::transport::Error),

    /// Deadline exceeded
    #[error("call timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// Action tag outside the known set
    #[error("unknown action")]
    UnknownAction(String),

    /// Invalid message or envelope format
    #[error("invalid message format: {reason}")]
    InvalidMessage { reason: String },

    /// Subscriber handler failed for a dequeued event
    #[error("delivery failed: {0}")]
    Delivery(String),

    /// Message serialization/deserialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Network I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Tokio join errors
    #[error("join error: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl CourierError {
    /// Create a new RPC error
    pub fn rpc_error<T: ToString>(message: T) -> Self {
        Self::Rpc(message.to_string())
    }

    /// Create a new delivery error
    pub fn delivery_error<T: ToString>(message: T) -> Self {
        Self::Delivery(message.to_string())
    }

    /// Create a new invalid-message error
    pub fn invalid_message<T: ToString>(reason: T) -> Self {
        Self::InvalidMessage {
            reason: reason.to_string(),
        }
    }

    /// Check if error is recoverable (a later attempt might succeed)
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Connection(_)
                | Self::Timeout { .. }
                | Self::Io(_)
                | Self::Http(_)
                | Self::GrpcTransport(_)
        ) || matches!(self, Self::UnexpectedStatus { status, .. } if *status >= 500)
    }

    /// Check if error was caused by the request itself rather than a transport
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::UnknownAction(_) | Self::InvalidMessage { .. })
    }
}
