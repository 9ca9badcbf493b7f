//! The callback execution engine.
//!
//! [`CallbackExecutor::execute`] runs one callback for one message and returns
//! a [`CompletionSignal`] that resolves exactly once:
//!
//! - **Synchronous descriptors**: the callback runs inline on the caller's
//!   thread and the returned signal is already resolved, `Done` or `Failed`.
//! - **Asynchronous descriptors**: the callback receives a
//!   [`CompletionHandle`](tributary_core::CompletionHandle) and the signal
//!   stays pending until the handle is completed, possibly from another
//!   thread. If the callback raises before completing the handle, the engine
//!   fails the signal itself.
//!
//! Binding failures, callback errors and panics are all delivered through the
//! signal; `execute` itself never fails.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use tracing::{debug, debug_span, error, trace};

use tributary_core::{
    BoxError, CallbackError, CallbackResult, CompletionSignal, SourceCallbackContext,
    SourceMessage, completion_channel,
};

use crate::callback::CallbackFn;
use crate::context::{Arguments, CallbackInvocationContext, ResolvedParameters};
use crate::descriptor::CallbackDescriptor;

/// Executes one resolved callback.
///
/// The executor holds no per-message state; a single instance may run
/// invocations for many messages concurrently.
#[derive(Debug, Clone)]
pub struct CallbackExecutor {
    descriptor: CallbackDescriptor,
}

impl CallbackExecutor {
    pub fn new(descriptor: CallbackDescriptor) -> Self {
        Self { descriptor }
    }

    pub fn descriptor(&self) -> &CallbackDescriptor {
        &self.descriptor
    }

    /// Invokes the callback for `message`.
    ///
    /// `arguments` are bound against the descriptor's parameter groups;
    /// `callback_context` is the caller's per-message state and is exposed to
    /// the callback together with any flow-control action recorded in it.
    pub fn execute(
        &self,
        message: Arc<SourceMessage>,
        arguments: &Arguments,
        callback_context: Arc<SourceCallbackContext>,
    ) -> CompletionSignal {
        let descriptor = &self.descriptor;
        let span = debug_span!(
            "callback",
            source = %descriptor.source_name(),
            kind = %descriptor.kind(),
            message_id = %message.id(),
            mode = if descriptor.is_async() { "async" } else { "sync" },
        );
        let _enter = span.enter();

        let ctx = match self.invocation_context(message, arguments, callback_context) {
            Ok(ctx) => ctx,
            Err(e) => {
                debug!(error = %e, "Failed to bind callback arguments");
                return CompletionSignal::failed(e);
            }
        };

        if let Some(action) = ctx.flow_control_action() {
            debug!(action = %action, "Relaying flow-control action to callback");
        }

        match descriptor.callback() {
            CallbackFn::Sync(callback) => {
                let result = invoke(|| callback.call(&ctx));
                trace!(ok = result.is_ok(), "Synchronous callback finished");
                CompletionSignal::resolved(result.into())
            }
            CallbackFn::Async(callback) => {
                let (handle, fallback, signal) = completion_channel();
                if let Err(e) = invoke(move || callback.call(&ctx, handle)) {
                    if !fallback.fail(e) {
                        debug!("Callback raised after completing its handle; keeping first outcome");
                    }
                } else {
                    trace!("Asynchronous callback returned; awaiting its handle");
                }
                signal
            }
        }
    }

    fn invocation_context(
        &self,
        message: Arc<SourceMessage>,
        arguments: &Arguments,
        callback_context: Arc<SourceCallbackContext>,
    ) -> CallbackResult<CallbackInvocationContext> {
        let parameters = bind_arguments(&self.descriptor, arguments)?;
        Ok(CallbackInvocationContext::new(
            self.descriptor.source_arc(),
            self.descriptor.kind(),
            message,
            parameters,
            callback_context,
        ))
    }
}

/// Binds caller arguments against the descriptor's groups.
///
/// Declared parameters are taken in group order, falling back to their
/// default; an unbound required parameter fails the binding. A name declared
/// in several groups is bound once, by the first group declaring it.
/// Arguments without a declaration are kept after the declared ones.
fn bind_arguments(
    descriptor: &CallbackDescriptor,
    arguments: &Arguments,
) -> CallbackResult<ResolvedParameters> {
    let mut resolved = ResolvedParameters::default();

    for group in descriptor.groups() {
        for parameter in &group.parameters {
            if resolved.contains(&parameter.name) {
                continue;
            }
            let value = arguments
                .get(&parameter.name)
                .or(parameter.default_value.as_ref());
            match value {
                Some(value) => resolved.push(Some(&group.name), &parameter.name, value.clone()),
                None if parameter.required => {
                    return Err(CallbackError::MissingArgument {
                        group: group.name.clone(),
                        parameter: parameter.name.clone(),
                    });
                }
                None => {}
            }
        }
    }

    for (name, value) in arguments {
        if !resolved.contains(name) {
            resolved.push(None, name, value.clone());
        }
    }

    Ok(resolved)
}

/// Runs extension code, turning errors and panics into [`CallbackError`]s.
fn invoke(f: impl FnOnce() -> Result<(), BoxError>) -> CallbackResult<()> {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(cause)) => {
            debug!(error = %cause, "Callback returned an error");
            Err(CallbackError::invocation(cause))
        }
        Err(payload) => {
            let err = CallbackError::from_panic(payload);
            error!(error = %err, "Callback panicked");
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callback::SourceCallbacks;
    use crate::model::{CallbackModel, ParameterGroup, ParameterModel, SourceModel};
    use crate::resolver::resolve;
    use serde_json::json;
    use tributary_core::{CallbackKind, Completion};

    fn executor_for(model: SourceModel, callback: CallbackFn) -> CallbackExecutor {
        let callbacks = SourceCallbacks::new().on_success(callback.clone());
        CallbackExecutor::new(resolve(&model, &callbacks, &callback).unwrap())
    }

    fn plain_model() -> SourceModel {
        SourceModel::new("listener").with_callback(CallbackKind::Success, CallbackModel::new())
    }

    fn run(executor: &CallbackExecutor, arguments: Arguments) -> CompletionSignal {
        executor.execute(
            Arc::new(SourceMessage::new(json!("hello"))),
            &arguments,
            Arc::new(SourceCallbackContext::new()),
        )
    }

    #[test]
    fn binds_declared_parameters_in_group_order_with_defaults() {
        let model = SourceModel::new("listener")
            .with_group(
                ParameterGroup::new("General")
                    .with_parameter(ParameterModel::required("path"))
                    .with_parameter(ParameterModel::optional("encoding").with_default("utf-8")),
            )
            .with_callback(
                CallbackKind::Success,
                CallbackModel::new().with_group(
                    ParameterGroup::new("Response")
                        .with_parameter(ParameterModel::optional("status")),
                ),
            );
        let executor = executor_for(
            model,
            CallbackFn::sync(|ctx| {
                assert_eq!(ctx.parameters().names(), vec!["path", "encoding", "trace"]);
                assert_eq!(ctx.param::<String>("encoding")?, "utf-8");
                assert!(!ctx.parameters().contains("status"));
                Ok(())
            }),
        );

        let mut args = Arguments::new();
        args.insert("trace".into(), json!(true));
        args.insert("path".into(), json!("/orders"));

        let mut signal = run(&executor, args);
        assert!(signal.try_take().unwrap().is_done());
    }

    #[test]
    fn missing_required_argument_fails_without_invoking() {
        let model = SourceModel::new("listener")
            .with_group(ParameterGroup::new("General").with_parameter(ParameterModel::required("path")))
            .with_callback(CallbackKind::Success, CallbackModel::new());
        let executor = executor_for(model, CallbackFn::sync(|_| panic!("must not be invoked")));

        let mut signal = run(&executor, Arguments::new());
        let completion = signal.try_take().unwrap();
        assert!(matches!(
            completion,
            Completion::Failed(CallbackError::MissingArgument { ref parameter, .. }) if parameter == "path"
        ));
    }

    #[test]
    fn sync_panic_is_fatal() {
        let executor = executor_for(plain_model(), CallbackFn::sync(|_| panic!("out of memory")));

        let mut signal = run(&executor, Arguments::new());
        let completion = signal.try_take().unwrap();
        assert!(completion.error().unwrap().is_fatal());
    }

    #[test]
    fn async_panic_before_completion_fails_the_signal() {
        let executor = executor_for(
            plain_model(),
            CallbackFn::deferred(|_, _handle| panic!("exploded")),
        );

        let mut signal = run(&executor, Arguments::new());
        assert!(signal.try_take().unwrap().error().unwrap().is_fatal());
    }

    #[test]
    fn async_error_after_completion_keeps_first_outcome() {
        let executor = executor_for(
            plain_model(),
            CallbackFn::deferred(|_, handle| {
                handle.success();
                Err("raised afterwards".into())
            }),
        );

        let mut signal = run(&executor, Arguments::new());
        assert!(signal.try_take().unwrap().is_done());
    }

    #[test]
    fn parameter_declared_in_two_groups_binds_from_the_first() {
        let model = SourceModel::new("listener")
            .with_group(
                ParameterGroup::new("General")
                    .with_parameter(ParameterModel::optional("x").with_default(1)),
            )
            .with_callback(
                CallbackKind::Success,
                CallbackModel::new().with_group(
                    ParameterGroup::new("Response")
                        .with_parameter(ParameterModel::optional("x").with_default(2)),
                ),
            );
        let executor = executor_for(
            model,
            CallbackFn::sync(|ctx| {
                let bound: Vec<_> = ctx.parameters().iter().collect();
                assert_eq!(bound.len(), 1);
                assert_eq!(bound[0].group.as_deref(), Some("General"));
                assert_eq!(ctx.param::<i64>("x")?, 1);
                Ok(())
            }),
        );

        let mut signal = run(&executor, Arguments::new());
        assert!(signal.try_take().unwrap().is_done());
    }
}
