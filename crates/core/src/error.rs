// Error handling for the instance registry and state machine

use crate::id::InstanceId;
use crate::status::InstanceStatus;
use std::fmt;

/// Errors raised while validating commands or applying native messages
#[derive(Debug, Clone, PartialEq)]
pub enum YanapError {
    /// No instance is registered under this id
    UnknownInstance(InstanceId),

    /// The instance already reached `RELEASED`
    Released(InstanceId),

    /// The instance is parked in `ERROR`
    Errored(InstanceId),

    /// The command is not valid for the current status
    InvalidState {
        id: InstanceId,
        status: InstanceStatus,
        reason: &'static str,
    },

    /// Inbound message carried an unknown `msgType`
    UnknownMessageType(String),

    /// Inbound status update carried an unknown status code
    UnknownStatus(String),

    /// Inbound message could not be decoded
    MalformedMessage(String),

    /// The transport refused an operation
    Transport(String),
}

impl YanapError {
    /// Caller misuse: logged as a warning and the command is dropped.
    pub fn is_usage(&self) -> bool {
        matches!(
            self,
            YanapError::UnknownInstance(_)
                | YanapError::Released(_)
                | YanapError::Errored(_)
                | YanapError::InvalidState { .. }
        )
    }

    /// Malformed or unrecognised data on the inbound channel.
    pub fn is_protocol(&self) -> bool {
        matches!(
            self,
            YanapError::UnknownMessageType(_)
                | YanapError::UnknownStatus(_)
                | YanapError::MalformedMessage(_)
        )
    }
}

impl fmt::Display for YanapError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            YanapError::UnknownInstance(id) => write!(f, "unknown audio instance `{}`", id),
            YanapError::Released(id) => {
                write!(f, "audio instance `{}` has already been released", id)
            }
            YanapError::Errored(id) => write!(f, "audio instance `{}` is in an error state", id),
            YanapError::InvalidState { id, status, reason } => write!(
                f,
                "audio instance `{}` is {:?}: {}",
                id, status, reason
            ),
            YanapError::UnknownMessageType(msg) => {
                write!(f, "received an unknown native message: {}", msg)
            }
            YanapError::UnknownStatus(msg) => {
                write!(f, "unknown status code in native message: {}", msg)
            }
            YanapError::MalformedMessage(msg) => write!(f, "malformed native message: {}", msg),
            YanapError::Transport(msg) => write!(f, "Transport error: {}", msg),
        }
    }
}

impl std::error::Error for YanapError {}

/// Result type alias for registry operations
pub type Result<T> = std::result::Result<T, YanapError>;

impl From<serde_json::Error> for YanapError {
    fn from(err: serde_json::Error) -> Self {
        YanapError::MalformedMessage(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        let id = InstanceId::new("a");
        assert!(YanapError::Released(id.clone()).is_usage());
        assert!(YanapError::InvalidState {
            id,
            status: InstanceStatus::Loaded,
            reason: "load requires EMPTY",
        }
        .is_usage());
        assert!(YanapError::UnknownStatus("NONE".into()).is_protocol());
        assert!(!YanapError::Transport("closed".into()).is_protocol());
        assert!(!YanapError::Transport("closed".into()).is_usage());
    }
}
