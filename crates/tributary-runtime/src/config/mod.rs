//! Configuration module for the Tributary runtime.
//!
//! This module provides figment-based configuration loading and validation
//! for logging and callback execution settings.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config, load_config_from_file};
pub use schema::{
    CallbackConfig, LogFormat, LogLevel, LogOutput, LogRotation, LoggingConfig, SpanEventConfig,
    TributaryConfig,
};
pub use validation::validate_config;
