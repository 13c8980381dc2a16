//! Store Errors
//!
//! Every store surfaces failures as a single human-readable string. The
//! tagged variants below sit behind that string so callers that need to
//! branch on the failure kind can do so without changing what the UI shows.

use thiserror::Error;

use crate::gateway::GatewayError;

/// Failure raised by a store, index cache or registry operation
#[derive(Debug, Error)]
pub enum StoreError {
    /// The gateway failed (network) or the backend rejected the command
    #[error("{message}")]
    Remote { command: String, message: String },

    /// The backend answered with a payload of the wrong shape
    #[error("unexpected response from '{command}': {source}")]
    Decode {
        command: String,
        #[source]
        source: serde_json::Error,
    },

    /// The request payload could not be serialized
    #[error("could not encode request: {source}")]
    Encode {
        #[source]
        source: serde_json::Error,
    },

    /// The entity's command set has no command for this operation
    #[error("{kind} does not support '{operation}'")]
    Unsupported {
        kind: &'static str,
        operation: &'static str,
    },
}

impl StoreError {
    pub fn remote(command: impl Into<String>, err: GatewayError) -> Self {
        Self::Remote {
            command: command.into(),
            message: err.to_string(),
        }
    }

    /// The gateway command that produced this error, if any
    pub fn command(&self) -> Option<&str> {
        match self {
            Self::Remote { command, .. } | Self::Decode { command, .. } => Some(command),
            Self::Encode { .. } | Self::Unsupported { .. } => None,
        }
    }

    /// True when the failure came from the remote side rather than this layer
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote { .. })
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(source: serde_json::Error) -> Self {
        Self::Encode { source }
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_error_displays_backend_message() {
        let err = StoreError::remote("post_cliente", GatewayError::Rejected("Código duplicado".into()));
        assert_eq!(err.to_string(), "Código duplicado");
        assert_eq!(err.command(), Some("post_cliente"));
        assert!(err.is_remote());
    }

    #[test]
    fn test_unsupported_has_no_command() {
        let err = StoreError::Unsupported { kind: "client", operation: "reactivate" };
        assert_eq!(err.command(), None);
        assert_eq!(err.to_string(), "client does not support 'reactivate'");
    }
}
