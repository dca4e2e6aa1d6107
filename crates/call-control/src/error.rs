//! Error types for the call-control widget

use thiserror::Error;

use crate::render::TargetId;

/// Result type for call-control operations
pub type CallControlResult<T> = Result<T, CallControlError>;

/// Errors that can occur in the call-control widget
///
/// Absent collaborators (no current call, no user agent) are not errors:
/// actions against them are silent no-ops.
#[derive(Debug, Error)]
pub enum CallControlError {
    /// Configuration error, surfaced at construction or `add_target` time
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Template failed to compile
    #[error("Template error at byte {position}: {message}")]
    Template { message: String, position: usize },

    /// A mount rejected rendered markup
    #[error("Mount error on target {target}: {message}")]
    Mount { target: TargetId, message: String },

    /// No registered target binds the given element id
    #[error("Unknown element id: {element_id}")]
    UnknownElement { element_id: String },

    /// Internal error
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl CallControlError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a template error at the given byte offset
    pub fn template(message: impl Into<String>, position: usize) -> Self {
        Self::Template {
            message: message.into(),
            position,
        }
    }

    /// Create a mount error for a target
    pub fn mount(target: TargetId, message: impl Into<String>) -> Self {
        Self::Mount {
            target,
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether this error was caused by caller-supplied configuration
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration { .. } | Self::Template { .. })
    }
}
