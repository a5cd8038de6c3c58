//! Channel error types and recovery hints

use std::io;
use thiserror::Error;

/// Failures that end a telemetry channel
#[derive(Debug, Error)]
pub enum LinkError {
    /// Discovery never returned the service within the configured poll cap
    #[error("service {group}/{name} not registered after {polls} polls")]
    DiscoveryExhausted { group: String, name: String, polls: u32 },
    /// Every connect attempt to the resolved endpoint failed
    #[error("could not connect to {endpoint} after {attempts} attempts: {source}")]
    ConnectFailed {
        endpoint: String,
        attempts: u32,
        #[source]
        source: io::Error,
    },
    /// The channel thread panicked
    #[error("channel {channel} thread panicked")]
    ThreadPanicked { channel: String },
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Result type for channel operations
pub type LinkResult<T> = Result<T, LinkError>;

/// What the caller can do after a channel failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryStrategy {
    /// Open a new channel (fresh discovery and connect)
    Reopen,
    /// Retrying will not help without outside intervention
    Fail,
}

impl LinkError {
    pub fn recovery_strategy(&self) -> RecoveryStrategy {
        match self {
            LinkError::DiscoveryExhausted { .. } => RecoveryStrategy::Reopen,
            LinkError::ConnectFailed { .. } => RecoveryStrategy::Reopen,
            LinkError::ThreadPanicked { .. } => RecoveryStrategy::Fail,
            LinkError::Io(_) => RecoveryStrategy::Reopen,
        }
    }

    pub fn is_recoverable(&self) -> bool {
        !matches!(self.recovery_strategy(), RecoveryStrategy::Fail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_failure_message() {
        let err = LinkError::ConnectFailed {
            endpoint: "127.0.0.1:60000".to_string(),
            attempts: 5,
            source: io::Error::new(io::ErrorKind::ConnectionRefused, "refused"),
        };
        assert_eq!(
            err.to_string(),
            "could not connect to 127.0.0.1:60000 after 5 attempts: refused"
        );
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_panic_is_not_recoverable() {
        let err = LinkError::ThreadPanicked { channel: "accel/sensor1".to_string() };
        assert_eq!(err.recovery_strategy(), RecoveryStrategy::Fail);
    }
}
