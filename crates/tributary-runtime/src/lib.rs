//! Runtime layer for Tributary.
//!
//! Hosts source callbacks inside a pipeline: layered configuration, logging
//! setup, and [`SourceBinding`], which sequences a source's success, error
//! and terminate callbacks for each message.
//!
//! ```rust,ignore
//! use tributary_runtime::{SourceBinding, BindingSettings, MessageOutcome, config, logging};
//!
//! let config = config::load_config()?;
//! logging::init_from_config(&config.logging);
//!
//! let binding = SourceBinding::bind(&model, &callbacks, BindingSettings::from(&config.callbacks))?;
//! binding.complete(&message, MessageOutcome::Success, &args, &ctx).await?;
//! ```

pub mod binding;
pub mod config;
pub mod error;
pub mod logging;

pub use binding::{
    BindingSettings, CompletionHook, CompletionRecord, ERROR_ARGUMENT, MessageOutcome,
    PipelineError, SOURCE_RESPONSE_ERROR, SourceBinding,
};
pub use config::{ConfigLoader, TributaryConfig, load_config};
pub use error::{ConfigError, ConfigResult, RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, SpanEvents, init_from_config};
