//! Error types for spanning tree configuration.

use sonic_cfgmgr_common::CfgMgrError;
use thiserror::Error;

use crate::ipc::IpcError;

/// Result type alias for stpmgr operations.
pub type StpResult<T> = Result<T, StpError>;

/// Errors returned by validation, persistence and daemon notification.
#[derive(Debug, Error)]
pub enum StpError {
    /// Malformed numeric, range or interface name input.
    #[error("{message}")]
    Format { message: String },

    /// Value outside its documented bounds (including the multiple-of-4096
    /// priority rule and the timer consistency rule).
    #[error("{message}")]
    Range { message: String },

    /// Global or interface STP state is wrong for the requested operation.
    #[error("{message}")]
    Precondition { message: String },

    /// MST instance/VLAN mapping conflict or mapping capacity exhausted.
    #[error("{message}")]
    Conflict { message: String },

    /// The daemon could not be reached or did not answer in time.
    #[error("STP daemon unavailable: {message}")]
    DaemonUnavailable { message: String },

    /// Persisted store failure.
    #[error(transparent)]
    Store(#[from] CfgMgrError),

    /// Wire encoding failure.
    #[error(transparent)]
    Ipc(#[from] IpcError),
}

/// Coarse classification of an [`StpError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Format,
    Range,
    Precondition,
    Conflict,
    DaemonUnavailable,
    Store,
    Encoding,
}

impl StpError {
    /// Creates a format error.
    pub fn format(message: impl Into<String>) -> Self {
        Self::Format {
            message: message.into(),
        }
    }

    /// Creates a range error.
    pub fn range(message: impl Into<String>) -> Self {
        Self::Range {
            message: message.into(),
        }
    }

    /// Creates a precondition error.
    pub fn precondition(message: impl Into<String>) -> Self {
        Self::Precondition {
            message: message.into(),
        }
    }

    /// Creates a conflict error.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// Creates a daemon unavailable error.
    pub fn daemon_unavailable(message: impl Into<String>) -> Self {
        Self::DaemonUnavailable {
            message: message.into(),
        }
    }

    /// Returns the error classification.
    pub fn kind(&self) -> ErrorKind {
        match self {
            StpError::Format { .. } => ErrorKind::Format,
            StpError::Range { .. } => ErrorKind::Range,
            StpError::Precondition { .. } => ErrorKind::Precondition,
            StpError::Conflict { .. } => ErrorKind::Conflict,
            StpError::DaemonUnavailable { .. } => ErrorKind::DaemonUnavailable,
            StpError::Store(_) => ErrorKind::Store,
            StpError::Ipc(_) => ErrorKind::Encoding,
        }
    }

    /// Returns true for errors raised before anything was written.
    pub fn is_side_effect_free(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Format | ErrorKind::Range | ErrorKind::Precondition | ErrorKind::Conflict
        )
    }
}
