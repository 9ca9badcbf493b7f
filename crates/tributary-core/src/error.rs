//! Error types for callback execution.
//!
//! Every per-invocation failure is delivered through the `Failed` branch of a
//! [`CompletionSignal`](crate::CompletionSignal) as a [`CallbackError`]. The
//! completing side of the protocol sees [`CompletionError`] when it breaks the
//! exactly-once contract.

use std::error::Error as StdError;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

/// Boxed error returned by extension callbacks.
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// Shared form of a callback's original cause, so [`CallbackError`] stays `Clone`.
pub type SharedCause = Arc<dyn StdError + Send + Sync>;

// =============================================================================
// Callback Errors
// =============================================================================

/// Why a callback invocation failed.
#[derive(Debug, Clone, Error)]
pub enum CallbackError {
    /// The callback returned an error, or completed its handle with one.
    #[error("callback failed: {0}")]
    Invocation(#[source] SharedCause),

    /// The callback panicked.
    ///
    /// Fatal failures are still delivered through the completion signal, but
    /// callers should not retry them.
    #[error("callback panicked: {message}")]
    Fatal {
        /// The panic payload, when it was a string.
        message: String,
    },

    /// A declared parameter could not be bound for this invocation.
    #[error("missing required parameter '{parameter}' in group '{group}'")]
    MissingArgument {
        /// Group declaring the parameter.
        group: String,
        /// Name of the parameter.
        parameter: String,
    },

    /// The completion handle was dropped without ever being completed.
    #[error("completion handle dropped without completing the callback")]
    Abandoned,

    /// The caller stopped waiting for an asynchronous completion.
    #[error("callback did not complete within {0:?}")]
    Timeout(Duration),
}

impl CallbackError {
    /// Wraps an error raised by extension code, preserving it as the source.
    pub fn invocation(cause: impl Into<BoxError>) -> Self {
        let boxed: BoxError = cause.into();
        Self::Invocation(Arc::from(boxed))
    }

    /// Builds a fatal error from a caught panic payload.
    pub fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        Self::Fatal { message }
    }

    /// Returns `true` for unrecoverable failures that should not be retried.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal { .. })
    }

    /// Returns `true` when the failure breaks the completion protocol rather
    /// than coming from the callback's own logic.
    pub fn is_protocol_violation(&self) -> bool {
        matches!(self, Self::Abandoned | Self::Timeout(_))
    }

    /// Returns the original error raised by extension code, if any.
    pub fn cause(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        match self {
            Self::Invocation(cause) => Some(cause.as_ref()),
            _ => None,
        }
    }

    /// Attempts to downcast the original cause to a concrete error type.
    pub fn downcast_cause<E: StdError + 'static>(&self) -> Option<&E> {
        self.cause().and_then(|c| c.downcast_ref::<E>())
    }
}

/// Result type for callback execution.
pub type CallbackResult<T> = Result<T, CallbackError>;

// =============================================================================
// Completion Errors
// =============================================================================

/// Returned to extension code that completes a handle more than once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CompletionError {
    /// The completion signal was already resolved; this completion was ignored.
    #[error("completion signal already resolved")]
    AlreadyCompleted,
}
