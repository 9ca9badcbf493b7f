//! Tower integration for the execution engine.
//!
//! [`CallbackService`] wraps a [`CallbackExecutor`] and implements
//! `tower::Service<CallbackRequest>`, with the completion signal as its
//! future. Hosting pipelines can stack ordinary tower layers (timeouts,
//! concurrency limits, tracing) over callback execution:
//!
//! ```rust,ignore
//! use tower::{ServiceBuilder, ServiceExt};
//!
//! let svc = ServiceBuilder::new()
//!     .concurrency_limit(64)
//!     .service(CallbackService::new(executor));
//! svc.oneshot(CallbackRequest::new(message, ctx)).await?;
//! ```

use std::sync::Arc;
use std::task::{Context, Poll};

use futures::FutureExt;
use futures::future::MapInto;
use tower::Service;

use tributary_core::{
    CallbackError, CallbackResult, CompletionSignal, SourceCallbackContext, SourceMessage,
};

use crate::context::Arguments;
use crate::descriptor::CallbackDescriptor;
use crate::executor::CallbackExecutor;

/// One callback invocation request.
#[derive(Debug, Clone)]
pub struct CallbackRequest {
    pub message: Arc<SourceMessage>,
    pub arguments: Arguments,
    pub callback_context: Arc<SourceCallbackContext>,
}

impl CallbackRequest {
    /// Creates a request with no bound arguments.
    pub fn new(message: Arc<SourceMessage>, callback_context: Arc<SourceCallbackContext>) -> Self {
        Self {
            message,
            arguments: Arguments::new(),
            callback_context,
        }
    }

    pub fn with_arguments(mut self, arguments: Arguments) -> Self {
        self.arguments = arguments;
        self
    }
}

/// A tower [`Service`] that executes one resolved callback per request.
///
/// The service is always ready; back-pressure belongs to the layers stacked
/// on top of it.
#[derive(Debug, Clone)]
pub struct CallbackService {
    executor: CallbackExecutor,
}

impl CallbackService {
    pub fn new(executor: CallbackExecutor) -> Self {
        Self { executor }
    }

    pub fn descriptor(&self) -> &CallbackDescriptor {
        self.executor.descriptor()
    }
}

impl From<CallbackDescriptor> for CallbackService {
    fn from(descriptor: CallbackDescriptor) -> Self {
        Self::new(CallbackExecutor::new(descriptor))
    }
}

impl Service<CallbackRequest> for CallbackService {
    type Response = ();
    type Error = CallbackError;
    type Future = MapInto<CompletionSignal, CallbackResult<()>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: CallbackRequest) -> Self::Future {
        self.executor
            .execute(request.message, &request.arguments, request.callback_context)
            .map_into()
    }
}
