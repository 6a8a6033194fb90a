use std::time::Duration;
use thiserror::Error;

/// The main error type for ds-* crates
#[derive(Error, Debug)]
pub enum Error {
  /// Environment variable error
  #[error("Environment variable error: {0}")]
  EnvVar(#[from] std::env::VarError),

  /// Configuration error
  #[error("Configuration error: {0}")]
  Config(String),

  /// Authentication failed; unrecoverable without new credentials
  #[error("Authentication error: {0}")]
  Authentication(String),

  /// Rate limit hit, either client-side (retry_after known) or
  /// server-side after exhausted retries (retry_after unknown)
  #[error("Rate limit exceeded: {message}")]
  RateLimit {
    /// How long to wait before retrying; None means the server did not say
    retry_after: Option<Duration>,
    message: String,
  },

  /// Request was rejected by the server as invalid (4xx); not retryable
  #[error("Validation error: {0}")]
  Validation(String),

  /// Server-side failure that survived the retry budget
  #[error("Service error ({status}): {message}")]
  Service { status: u16, message: String },

  /// A long-running operation reported failure
  #[error("Operation {id} failed: {reason}")]
  OperationFailed { id: String, reason: String },

  /// A long-running operation did not reach a terminal state in time
  #[error("Operation {id} did not complete within {deadline_secs} seconds")]
  OperationTimeout { id: String, deadline_secs: u64 },

  /// Serialization/Deserialization error
  #[error("Serialization error")]
  Serde(#[from] serde_json::Error),

  /// HTTP transport error (connection, timeout, malformed URL)
  #[error("HTTP error: {0}")]
  Http(String),
}

impl Error {
  /// Whether this error may succeed on a plain retry.
  pub fn is_transient(&self) -> bool {
    matches!(self, Error::RateLimit { .. } | Error::Http(_) | Error::Service { .. })
  }

  /// The retry hint attached to a rate-limit error, if any.
  pub fn retry_after(&self) -> Option<Duration> {
    match self {
      Error::RateLimit { retry_after, .. } => *retry_after,
      _ => None,
    }
  }
}

/// Result type alias for ds-* crates
pub type Result<T> = std::result::Result<T, Error>;
