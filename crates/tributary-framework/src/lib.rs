//! # Tributary Framework
//!
//! Callback resolution and execution for message sources.
//!
//! This layer provides:
//! - Source and parameter models ([`SourceModel`], [`ParameterGroup`])
//! - Statically typed callbacks chosen at registration ([`CallbackFn`])
//! - The resolver that turns a source declaration into reusable
//!   [`CallbackDescriptor`]s ([`CallbackResolver`])
//! - The execution engine ([`CallbackExecutor`]) and its tower adapter
//!   ([`CallbackService`])
//!
//! # Data Flow
//!
//! ```text
//! source setup:   SourceModel + SourceCallbacks ──resolve──▶ CallbackDescriptor (shared)
//! per message:    descriptor + message + args + ctx ──execute──▶ CompletionSignal
//! ```

pub mod callback;
pub mod context;
pub mod descriptor;
pub mod error;
pub mod executor;
pub mod model;
pub mod resolver;
pub mod service;

pub use callback::{AsyncSourceCallback, CallbackFn, SourceCallback, SourceCallbacks};
pub use context::{Arguments, BoundParameter, CallbackInvocationContext, ResolvedParameters};
pub use descriptor::CallbackDescriptor;
pub use error::{ParameterError, ResolutionError, ResolutionResult};
pub use executor::CallbackExecutor;
pub use model::{CallbackModel, ParameterGroup, ParameterModel, SourceModel};
pub use resolver::{CallbackResolver, resolve};
pub use service::{CallbackRequest, CallbackService};
