//! Pipeline-side view of a source's callbacks.
//!
//! A [`SourceBinding`] is built once when a source starts. It resolves every
//! declared callback up front and then drives them for each message outcome,
//! awaiting completion signals under the configured timeout.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use tributary_core::{
    BoxError, CallbackError, CallbackKind, CallbackResult, Completion, MessageId,
    SourceCallbackContext, SourceMessage,
};
use tributary_framework::{
    Arguments, CallbackDescriptor, CallbackExecutor, CallbackResolver, SourceCallbacks,
    SourceModel,
};

use crate::config::CallbackConfig;
use crate::error::RuntimeResult;

/// Name of the bound argument carrying the pipeline error into the error
/// callback.
pub const ERROR_ARGUMENT: &str = "error";

/// Error type reported when a success callback itself fails.
pub const SOURCE_RESPONSE_ERROR: &str = "SOURCE_RESPONSE";

/// How a binding waits on completion signals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingSettings {
    pub completion_timeout: Option<Duration>,
    pub slow_callback_warn: Option<Duration>,
    pub on_error_after_success_failure: bool,
}

impl Default for BindingSettings {
    fn default() -> Self {
        Self::from(&CallbackConfig::default())
    }
}

impl From<&CallbackConfig> for BindingSettings {
    fn from(config: &CallbackConfig) -> Self {
        Self {
            completion_timeout: config.completion_timeout(),
            slow_callback_warn: config.slow_callback_warn(),
            on_error_after_success_failure: config.on_error_after_success_failure,
        }
    }
}

/// The error a failed flow hands to the error callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineError {
    /// Error type identifier, e.g. `CONNECTIVITY`.
    pub kind: String,
    pub description: String,
}

impl PipelineError {
    pub fn new(kind: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            description: description.into(),
        }
    }

    fn from_callback_failure(error: &CallbackError) -> Self {
        Self::new(SOURCE_RESPONSE_ERROR, error.to_string())
    }

    fn to_value(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }
}

/// How the pipeline finished processing a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageOutcome {
    Success,
    Failure(PipelineError),
}

/// A finished callback, as reported to [`CompletionHook`]s.
#[derive(Debug, Clone)]
pub struct CompletionRecord {
    pub source: String,
    pub kind: CallbackKind,
    pub message_id: MessageId,
    pub completion: Completion,
    pub elapsed: Duration,
}

/// Observer notified after every callback a binding runs.
#[async_trait]
pub trait CompletionHook: Send + Sync {
    async fn on_completion(&self, record: &CompletionRecord) -> Result<(), BoxError>;
}

/// The callbacks of one source, resolved and ready to run.
pub struct SourceBinding {
    source: String,
    success: Option<CallbackExecutor>,
    error: Option<CallbackExecutor>,
    terminate: Option<CallbackExecutor>,
    settings: BindingSettings,
    hooks: Vec<Arc<dyn CompletionHook>>,
}

impl SourceBinding {
    /// Resolves every declared callback of `model`.
    ///
    /// Fails if the source declares no callbacks, or if a declared callback
    /// has no matching callback model.
    pub fn bind(
        model: &SourceModel,
        callbacks: &SourceCallbacks,
        settings: BindingSettings,
    ) -> RuntimeResult<Self> {
        let resolver = CallbackResolver::new(model, callbacks)?;
        let executor = |kind: CallbackKind| {
            resolver
                .resolve_kind(kind)
                .transpose()
                .map(|d| d.map(CallbackExecutor::new))
        };

        let binding = Self {
            source: model.name.clone(),
            success: executor(CallbackKind::Success)?,
            error: executor(CallbackKind::Error)?,
            terminate: executor(CallbackKind::Terminate)?,
            settings,
            hooks: Vec::new(),
        };
        info!(
            source = %binding.source,
            kinds = ?callbacks.declared_kinds(),
            timeout = ?binding.settings.completion_timeout,
            "Source callbacks bound"
        );
        Ok(binding)
    }

    pub fn with_hook(mut self, hook: Arc<dyn CompletionHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    pub fn source_name(&self) -> &str {
        &self.source
    }

    pub fn settings(&self) -> &BindingSettings {
        &self.settings
    }

    fn executor(&self, kind: CallbackKind) -> Option<&CallbackExecutor> {
        match kind {
            CallbackKind::Success => self.success.as_ref(),
            CallbackKind::Error => self.error.as_ref(),
            CallbackKind::Terminate => self.terminate.as_ref(),
        }
    }

    pub fn descriptor(&self, kind: CallbackKind) -> Option<&CallbackDescriptor> {
        self.executor(kind).map(CallbackExecutor::descriptor)
    }

    pub fn has_callback(&self, kind: CallbackKind) -> bool {
        self.executor(kind).is_some()
    }

    pub async fn on_success(
        &self,
        message: &Arc<SourceMessage>,
        arguments: &Arguments,
        callback_context: &Arc<SourceCallbackContext>,
    ) -> CallbackResult<()> {
        self.run(CallbackKind::Success, message, arguments, callback_context)
            .await
            .into_result()
    }

    /// Runs the error callback with `error` bound as the `error` argument.
    pub async fn on_error(
        &self,
        message: &Arc<SourceMessage>,
        error: &PipelineError,
        arguments: &Arguments,
        callback_context: &Arc<SourceCallbackContext>,
    ) -> CallbackResult<()> {
        let mut arguments = arguments.clone();
        let value = error.to_value().map_err(CallbackError::invocation)?;
        arguments.insert(ERROR_ARGUMENT.to_string(), value);
        self.run(CallbackKind::Error, message, &arguments, callback_context)
            .await
            .into_result()
    }

    pub async fn on_terminate(
        &self,
        message: &Arc<SourceMessage>,
        arguments: &Arguments,
        callback_context: &Arc<SourceCallbackContext>,
    ) -> CallbackResult<()> {
        self.run(CallbackKind::Terminate, message, arguments, callback_context)
            .await
            .into_result()
    }

    /// Runs the callbacks for a finished message.
    ///
    /// The success or error callback runs first. A failing success callback
    /// is followed by the error callback when enabled. Terminate always runs
    /// last. The first failure is returned.
    pub async fn complete(
        &self,
        message: &Arc<SourceMessage>,
        outcome: MessageOutcome,
        arguments: &Arguments,
        callback_context: &Arc<SourceCallbackContext>,
    ) -> CallbackResult<()> {
        let primary = match outcome {
            MessageOutcome::Success => {
                let result = self.on_success(message, arguments, callback_context).await;
                if let Err(e) = &result
                    && self.settings.on_error_after_success_failure
                    && self.has_callback(CallbackKind::Error)
                {
                    let error = PipelineError::from_callback_failure(e);
                    if let Err(secondary) = self
                        .on_error(message, &error, arguments, callback_context)
                        .await
                    {
                        warn!(
                            source = %self.source,
                            message_id = %message.id(),
                            error = %secondary,
                            "Error callback failed after success callback failure"
                        );
                    }
                }
                result
            }
            MessageOutcome::Failure(error) => {
                self.on_error(message, &error, arguments, callback_context)
                    .await
            }
        };

        let terminate = self
            .on_terminate(message, arguments, callback_context)
            .await;
        primary.and(terminate)
    }

    async fn run(
        &self,
        kind: CallbackKind,
        message: &Arc<SourceMessage>,
        arguments: &Arguments,
        callback_context: &Arc<SourceCallbackContext>,
    ) -> Completion {
        let Some(executor) = self.executor(kind) else {
            return Completion::Done;
        };

        let started = Instant::now();
        let signal = executor.execute(message.clone(), arguments, callback_context.clone());
        let completion = match self.settings.completion_timeout {
            Some(limit) => match tokio::time::timeout(limit, signal).await {
                Ok(completion) => completion,
                Err(_) => {
                    warn!(
                        source = %self.source,
                        kind = %kind,
                        message_id = %message.id(),
                        timeout = ?limit,
                        "Callback did not complete in time"
                    );
                    Completion::Failed(CallbackError::Timeout(limit))
                }
            },
            None => signal.await,
        };
        let elapsed = started.elapsed();

        if let Some(threshold) = self.settings.slow_callback_warn
            && elapsed > threshold
        {
            warn!(
                source = %self.source,
                kind = %kind,
                message_id = %message.id(),
                elapsed = ?elapsed,
                "Slow callback"
            );
        }
        debug!(
            source = %self.source,
            kind = %kind,
            message_id = %message.id(),
            done = completion.is_done(),
            "Callback completed"
        );

        if !self.hooks.is_empty() {
            let record = CompletionRecord {
                source: self.source.clone(),
                kind,
                message_id: message.id().clone(),
                completion: completion.clone(),
                elapsed,
            };
            for hook in &self.hooks {
                if let Err(err) = hook.on_completion(&record).await {
                    warn!(error = %err, kind = %kind, "Completion hook failed");
                }
            }
        }
        completion
    }
}

impl std::fmt::Debug for SourceBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceBinding")
            .field("source", &self.source)
            .field("success", &self.success.is_some())
            .field("error", &self.error.is_some())
            .field("terminate", &self.terminate.is_some())
            .field("settings", &self.settings)
            .field("hooks", &self.hooks.len())
            .finish()
    }
}
