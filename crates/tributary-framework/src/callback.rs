//! Callback traits and registration.
//!
//! Extension authors pick the completion contract when they register a
//! callback: a [`SourceCallback`] completes when it returns, an
//! [`AsyncSourceCallback`] receives a [`CompletionHandle`] and completes
//! whenever it calls it. The choice is carried by [`CallbackFn`] and never
//! probed at invocation time.
//!
//! # Example
//!
//! ```rust,ignore
//! use tributary_framework::{CallbackFn, SourceCallbacks};
//!
//! let callbacks = SourceCallbacks::new()
//!     .on_success(CallbackFn::sync(|ctx| {
//!         tracing::info!(message = %ctx.message().id(), "acknowledged");
//!         Ok(())
//!     }))
//!     .on_error(CallbackFn::spawn(|ctx| async move {
//!         nack(ctx.message()).await?;
//!         Ok(())
//!     }));
//! ```

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tributary_core::{BoxError, CallbackError, CallbackKind, CompletionHandle};

use crate::context::CallbackInvocationContext;

// ============================================================================
// Callback traits
// ============================================================================

/// A callback that completes when it returns.
///
/// Returning `Err` (or panicking) fails the invocation.
pub trait SourceCallback: Send + Sync + 'static {
    fn call(&self, ctx: &CallbackInvocationContext) -> Result<(), BoxError>;
}

impl<F> SourceCallback for F
where
    F: Fn(&CallbackInvocationContext) -> Result<(), BoxError> + Send + Sync + 'static,
{
    fn call(&self, ctx: &CallbackInvocationContext) -> Result<(), BoxError> {
        self(ctx)
    }
}

/// A callback that signals completion explicitly through a [`CompletionHandle`].
///
/// Returning `Ok` does not complete the invocation; only the handle does.
/// Returning `Err` before the handle was used fails the invocation.
pub trait AsyncSourceCallback: Send + Sync + 'static {
    fn call(
        &self,
        ctx: &CallbackInvocationContext,
        handle: CompletionHandle,
    ) -> Result<(), BoxError>;
}

impl<F> AsyncSourceCallback for F
where
    F: Fn(&CallbackInvocationContext, CompletionHandle) -> Result<(), BoxError>
        + Send
        + Sync
        + 'static,
{
    fn call(
        &self,
        ctx: &CallbackInvocationContext,
        handle: CompletionHandle,
    ) -> Result<(), BoxError> {
        self(ctx, handle)
    }
}

// ============================================================================
// CallbackFn
// ============================================================================

/// A registered callback, tagged with its completion contract.
///
/// Cloning is cheap and clones compare as the same callback in
/// [`same_as`](Self::same_as), which is what the resolver matches on.
#[derive(Clone)]
pub enum CallbackFn {
    /// Completes when the call returns.
    Sync(Arc<dyn SourceCallback>),
    /// Completes through its [`CompletionHandle`].
    Async(Arc<dyn AsyncSourceCallback>),
}

impl CallbackFn {
    /// Registers a synchronous closure.
    pub fn sync<F>(f: F) -> Self
    where
        F: Fn(&CallbackInvocationContext) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        Self::Sync(Arc::new(f))
    }

    /// Registers a closure that completes through its handle.
    pub fn deferred<F>(f: F) -> Self
    where
        F: Fn(&CallbackInvocationContext, CompletionHandle) -> Result<(), BoxError>
            + Send
            + Sync
            + 'static,
    {
        Self::Async(Arc::new(f))
    }

    /// Registers a [`SourceCallback`] implementation.
    pub fn from_sync<C: SourceCallback>(callback: C) -> Self {
        Self::Sync(Arc::new(callback))
    }

    /// Registers an [`AsyncSourceCallback`] implementation.
    pub fn from_async<C: AsyncSourceCallback>(callback: C) -> Self {
        Self::Async(Arc::new(callback))
    }

    /// Registers an async function run on the current tokio runtime.
    ///
    /// The handle is completed with the future's result; a panic inside the
    /// future fails the invocation as fatal. Invoking it outside a tokio
    /// runtime fails the invocation.
    pub fn spawn<F, Fut>(f: F) -> Self
    where
        F: Fn(CallbackInvocationContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        Self::deferred(move |ctx, handle| {
            let runtime = tokio::runtime::Handle::try_current()?;
            let fut = f(ctx.clone());
            runtime.spawn(async move {
                match AssertUnwindSafe(fut).catch_unwind().await {
                    Ok(result) => handle.finish(result),
                    Err(payload) => handle.fail(CallbackError::from_panic(payload)),
                }
            });
            Ok(())
        })
    }

    /// Returns `true` if this callback completes through a handle.
    pub fn is_async(&self) -> bool {
        matches!(self, Self::Async(_))
    }

    /// Returns `true` if both values refer to the same registered callback.
    pub fn same_as(&self, other: &CallbackFn) -> bool {
        match (self, other) {
            (Self::Sync(a), Self::Sync(b)) => {
                std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
            }
            (Self::Async(a), Self::Async(b)) => {
                std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
            }
            _ => false,
        }
    }
}

impl std::fmt::Debug for CallbackFn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sync(_) => f.write_str("CallbackFn::Sync"),
            Self::Async(_) => f.write_str("CallbackFn::Async"),
        }
    }
}

// ============================================================================
// SourceCallbacks
// ============================================================================

/// The callbacks a source registered, one optional slot per kind.
#[derive(Debug, Clone, Default)]
pub struct SourceCallbacks {
    success: Option<CallbackFn>,
    error: Option<CallbackFn>,
    terminate: Option<CallbackFn>,
}

impl SourceCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_success(mut self, callback: CallbackFn) -> Self {
        self.success = Some(callback);
        self
    }

    pub fn on_error(mut self, callback: CallbackFn) -> Self {
        self.error = Some(callback);
        self
    }

    pub fn on_terminate(mut self, callback: CallbackFn) -> Self {
        self.terminate = Some(callback);
        self
    }

    /// Returns the callback registered for `kind`.
    pub fn get(&self, kind: CallbackKind) -> Option<&CallbackFn> {
        match kind {
            CallbackKind::Success => self.success.as_ref(),
            CallbackKind::Error => self.error.as_ref(),
            CallbackKind::Terminate => self.terminate.as_ref(),
        }
    }

    /// Returns the registered kinds in priority order.
    pub fn declared_kinds(&self) -> Vec<CallbackKind> {
        CallbackKind::ALL
            .into_iter()
            .filter(|kind| self.get(*kind).is_some())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.success.is_none() && self.error.is_none() && self.terminate.is_none()
    }
}
