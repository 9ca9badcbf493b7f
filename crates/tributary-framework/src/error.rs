//! Error types for the Tributary framework.

use thiserror::Error;

use tributary_core::CallbackKind;

/// Errors raised while resolving a source's callbacks at setup time.
///
/// These are initialization errors: they are fatal to the source binding and
/// are never deferred to the first message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    /// None of the success, error or terminate callbacks is declared.
    #[error("source '{source_name}' declares no success, error or terminate callback")]
    NoCallbacks {
        /// The source being bound.
        source_name: String,
    },

    /// The matched callback kind has no parameter model to bind against.
    #[error("source '{source_name}' has no {kind} callback model to bind parameters against")]
    MissingCallbackModel {
        /// The source being bound.
        source_name: String,
        /// The kind that matched.
        kind: CallbackKind,
    },
}

/// Result type for resolution operations.
pub type ResolutionResult<T> = Result<T, ResolutionError>;

/// Errors returned to extension code reading typed parameters.
#[derive(Debug, Clone, Error)]
pub enum ParameterError {
    /// No value is bound under this name.
    #[error("parameter '{0}' is not bound")]
    Missing(String),

    /// The bound value does not deserialize into the requested type.
    #[error("parameter '{name}' has an unexpected type: {reason}")]
    InvalidType {
        /// Parameter name.
        name: String,
        /// Deserialization failure.
        reason: String,
    },
}
