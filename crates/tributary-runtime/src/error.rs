//! Error types for the runtime layer.

use thiserror::Error;
use tributary_framework::ResolutionError;

pub use crate::config::{ConfigError, ConfigResult};

/// Errors raised while setting up a runtime.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// A source's callbacks could not be bound.
    #[error("callback binding failed: {0}")]
    Resolution(#[from] ResolutionError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
