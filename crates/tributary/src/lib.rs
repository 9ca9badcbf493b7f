//! # Tributary
//!
//! A callback execution engine for long-running message sources.
//!
//! ## Overview
//!
//! A source emits messages into a pipeline. When the pipeline is done with a
//! message, one of the source's callbacks runs: success, error or terminate.
//! Tributary resolves which callback applies, binds its arguments, invokes it
//! and hands back a single-fire completion signal, whether the callback
//! finished inline or completes later through a handle.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐  bind   ┌───────────────┐ execute ┌──────────────┐
//! │ SourceModel  │────────▶│ SourceBinding │────────▶│   Executor   │──▶ extension callback
//! │ + callbacks  │         │   (runtime)   │◀────────│ (framework)  │◀── CompletionHandle
//! └──────────────┘         └───────────────┘  signal └──────────────┘
//! ```
//!
//! - **Core**: messages, callback context, completion protocol, errors
//! - **Framework**: models, resolver, executor, tower service adapter
//! - **Runtime**: configuration, logging, source bindings
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tributary::prelude::*;
//!
//! let model = SourceModel::new("listener")
//!     .with_callback(CallbackKind::Success, CallbackModel::new())
//!     .with_callback(CallbackKind::Terminate, CallbackModel::new());
//! let callbacks = SourceCallbacks::new()
//!     .on_success(CallbackFn::spawn(|ctx| async move { ack(ctx.message()).await }))
//!     .on_terminate(CallbackFn::sync(|_| Ok(())));
//!
//! let binding = SourceBinding::bind(&model, &callbacks, BindingSettings::default())?;
//! binding.complete(&message, MessageOutcome::Success, &Arguments::new(), &ctx).await?;
//! ```
//!
//! ## Features
//!
//! - `toml-config`: TOML configuration files (default)
//! - `yaml-config`: YAML configuration files
//! - `json-log`: JSON log output

pub use tributary_core as core;
pub use tributary_framework as framework;
pub use tributary_runtime as runtime;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use tributary_core::prelude::*;

    pub use tributary_framework::{
        Arguments, CallbackExecutor, CallbackFn, CallbackInvocationContext, CallbackModel,
        CallbackService, ParameterGroup, ParameterModel, SourceCallbacks, SourceModel, resolve,
    };

    pub use tributary_runtime::{
        BindingSettings, CompletionHook, MessageOutcome, PipelineError, SourceBinding,
        TributaryConfig,
    };
}
