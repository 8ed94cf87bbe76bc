//! Error types for the Vigil agent.

use std::fmt;
use std::io;

/// Errors raised by agent operations.
///
/// The request path never surfaces these to clients — a protocol failure
/// becomes a single-byte `SSH_AGENT_FAILURE` reply instead — so the
/// variants cover only what the agent reports to its operator: transport
/// I/O, unusable configuration, and key material that fails validation.
#[derive(Debug)]
pub enum VigilError {
    /// Transport I/O failure: reading or writing a client stream, or
    /// setting up the agent socket.
    Io(io::Error),

    /// The agent was configured with something unusable, such as a
    /// socket path that cannot be bound.
    Config(String),

    /// Key material failed validation, or a cryptographic operation was
    /// refused.
    Security(String),
}

impl VigilError {
    /// Builds a [`VigilError::Config`] from any message type.
    pub fn config(msg: impl Into<String>) -> Self {
        VigilError::Config(msg.into())
    }

    /// Builds a [`VigilError::Security`] from any message type.
    pub fn security(msg: impl Into<String>) -> Self {
        VigilError::Security(msg.into())
    }
}

impl fmt::Display for VigilError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VigilError::Io(e) => write!(f, "I/O error: {}", e),
            VigilError::Config(msg) => write!(f, "configuration error: {}", msg),
            VigilError::Security(msg) => write!(f, "security error: {}", msg),
        }
    }
}

impl std::error::Error for VigilError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            VigilError::Io(e) => Some(e),
            VigilError::Config(_) | VigilError::Security(_) => None,
        }
    }
}

// Lets transport code propagate socket errors with `?`.
impl From<io::Error> for VigilError {
    fn from(err: io::Error) -> Self {
        VigilError::Io(err)
    }
}

/// Result type for Vigil operations
pub type VigilResult<T> = Result<T, VigilError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_formats() {
        assert_eq!(
            VigilError::security("key is invalid").to_string(),
            "security error: key is invalid"
        );
        assert_eq!(
            VigilError::config("socket path unusable").to_string(),
            "configuration error: socket path unusable"
        );
    }

    #[test]
    fn test_constructors_pick_variant() {
        assert!(matches!(VigilError::config("x"), VigilError::Config(_)));
        assert!(matches!(VigilError::security("x"), VigilError::Security(_)));
    }

    #[test]
    fn test_io_conversion_keeps_source() {
        use std::error::Error as _;

        let io_err = io::Error::new(io::ErrorKind::BrokenPipe, "peer closed");
        let err: VigilError = io_err.into();
        assert!(matches!(err, VigilError::Io(_)));
        assert!(err.source().is_some());
        assert!(VigilError::security("x").source().is_none());
    }
}
