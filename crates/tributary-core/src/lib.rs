//! # Tributary Core
//!
//! Foundation types shared by the Tributary callback engine.
//!
//! A *source* is a long-running component that emits messages into a
//! processing pipeline. Every emitted message eventually triggers one of the
//! source's lifecycle callbacks (success, error, terminate). This crate holds
//! the vocabulary those callbacks are expressed in:
//!
//! - **Messages**: the triggering [`SourceMessage`] and its [`MessageId`]
//! - **Callback context**: per-message correlation state ([`SourceCallbackContext`])
//!   that also carries upstream [`FlowControlAction`]s
//! - **Completion protocol**: the single-fire [`CompletionSignal`] and the
//!   move-only [`CompletionHandle`] that resolves it
//! - **Errors**: [`CallbackError`] and [`CompletionError`]
//!
//! ## Completion Protocol
//!
//! ```text
//! ┌──────────────┐  completion_channel()  ┌──────────────────┐
//! │    Engine    │───────────────────────▶│ CompletionHandle │──▶ extension code
//! │              │                        └──────────────────┘
//! │              │◀─── CompletionSignal ── resolves exactly once (Done | Failed)
//! └──────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use tributary_core::{completion_channel, Completion};
//!
//! let (handle, _fallback, signal) = completion_channel();
//! std::thread::spawn(move || handle.success());
//! assert!(matches!(signal.await, Completion::Done));
//! ```

pub mod completion;
pub mod context;
pub mod error;
pub mod flow;
pub mod kind;
pub mod message;

pub use completion::{
    Completion, CompletionFallback, CompletionHandle, CompletionSignal, SharedCompletionHandle,
    completion_channel,
};
pub use context::{FLOW_CONTROL_ACTION_VARIABLE, SourceCallbackContext};
pub use error::{BoxError, CallbackError, CallbackResult, CompletionError};
pub use flow::FlowControlAction;
pub use kind::CallbackKind;
pub use message::{MessageId, SourceMessage};

/// Prelude for common imports.
pub mod prelude {
    pub use super::{
        BoxError, CallbackError, CallbackKind, Completion, CompletionHandle, CompletionSignal,
        FlowControlAction, MessageId, SharedCompletionHandle, SourceCallbackContext,
        SourceMessage,
    };
}
