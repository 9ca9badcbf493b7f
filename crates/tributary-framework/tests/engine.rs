//! End-to-end behavior of the resolver and execution engine.

use std::sync::{Arc, Mutex};
use std::thread;

use serde_json::json;
use thiserror::Error;
use tokio_test::{assert_pending, assert_ready, task};

use tributary_core::{
    BoxError, CallbackError, CallbackKind, Completion, CompletionError, CompletionHandle, FlowControlAction,
    SourceCallbackContext, SourceMessage,
};
use tributary_framework::{
    Arguments, CallbackExecutor, CallbackFn, CallbackModel, CallbackResolver, ParameterGroup,
    ParameterModel, SourceCallbacks, SourceModel, resolve,
};

#[derive(Debug, Error)]
#[error("illegal state: {0}")]
struct IllegalState(String);

fn model() -> SourceModel {
    SourceModel::new("http-listener")
        .with_group(ParameterGroup::new("General").with_parameter(ParameterModel::optional("path")))
        .with_callback(
            CallbackKind::Success,
            CallbackModel::new().with_group(
                ParameterGroup::new("Response")
                    .with_parameter(ParameterModel::optional("status").with_default(200)),
            ),
        )
        .with_callback(CallbackKind::Error, CallbackModel::new())
        .with_callback(CallbackKind::Terminate, CallbackModel::new())
}

fn success_executor(callback: CallbackFn) -> CallbackExecutor {
    let callbacks = SourceCallbacks::new().on_success(callback.clone());
    CallbackExecutor::new(resolve(&model(), &callbacks, &callback).unwrap())
}

fn message() -> Arc<SourceMessage> {
    Arc::new(SourceMessage::new(json!({"body": "ping"})).with_id("m-1"))
}

#[test]
fn sync_success_resolves_before_execute_returns() {
    let caller = thread::current().id();
    let ran_on = Arc::new(Mutex::new(None));
    let seen = ran_on.clone();
    let executor = success_executor(CallbackFn::sync(move |_| {
        *seen.lock().unwrap() = Some(thread::current().id());
        Ok(())
    }));

    let mut signal = executor.execute(message(), &Arguments::new(), Arc::default());

    assert!(matches!(signal.try_take(), Some(Completion::Done)));
    assert_eq!(*ran_on.lock().unwrap(), Some(caller));
}

#[test]
fn sync_failure_wraps_the_original_cause() {
    let executor = success_executor(CallbackFn::sync(|_| Err(IllegalState("x".into()).into())));
    assert!(!executor.descriptor().is_async());

    let mut signal = executor.execute(message(), &Arguments::new(), Arc::default());
    let completion = signal.try_take().expect("sync signal is resolved");

    let err = completion.error().expect("callback failed");
    assert!(matches!(err, CallbackError::Invocation(_)));
    assert_eq!(err.downcast_cause::<IllegalState>().unwrap().0, "x");
}

#[test]
fn async_callback_defers_until_the_handle_fires() {
    let parked: Arc<Mutex<Option<CompletionHandle>>> = Arc::default();
    let slot = parked.clone();
    let executor = success_executor(CallbackFn::deferred(move |_, handle| {
        *slot.lock().unwrap() = Some(handle);
        Ok(())
    }));
    assert!(executor.descriptor().is_async());

    let mut signal = task::spawn(executor.execute(message(), &Arguments::new(), Arc::default()));
    assert_pending!(signal.poll());
    assert_pending!(signal.poll());

    let handle = parked.lock().unwrap().take().unwrap();
    thread::spawn(move || handle.success()).join().unwrap();

    assert!(signal.is_woken());
    assert!(assert_ready!(signal.poll()).is_done());
}

#[test]
fn async_handle_failure_resolves_failed() {
    let executor = success_executor(CallbackFn::deferred(|_, handle| {
        handle.error(IllegalState("y".into()));
        Ok(())
    }));

    let mut signal = executor.execute(message(), &Arguments::new(), Arc::default());
    let completion = signal.try_take().unwrap();
    assert_eq!(
        completion.error().unwrap().downcast_cause::<IllegalState>().unwrap().0,
        "y"
    );
}

#[test]
fn async_callback_raising_before_completion_fails_directly() {
    let executor = success_executor(CallbackFn::deferred(|_, _handle| {
        Err(IllegalState("never completed".into()).into())
    }));

    let mut signal = executor.execute(message(), &Arguments::new(), Arc::default());
    let completion = signal.try_take().expect("engine failed the signal itself");
    assert!(matches!(completion.error(), Some(CallbackError::Invocation(_))));
}

#[test]
fn second_completion_is_a_no_op() {
    let second = Arc::new(Mutex::new(None));
    let record = second.clone();
    let executor = success_executor(CallbackFn::deferred(move |_, handle| {
        let shared = handle.shared();
        shared.success()?;
        *record.lock().unwrap() = Some(shared.success());
        Ok(())
    }));

    let mut signal = executor.execute(message(), &Arguments::new(), Arc::default());

    assert!(signal.try_take().unwrap().is_done());
    assert_eq!(
        *second.lock().unwrap(),
        Some(Err(CompletionError::AlreadyCompleted))
    );
}

#[test]
fn abandoned_handle_resolves_failed() {
    let executor = success_executor(CallbackFn::deferred(|_, handle| {
        drop(handle);
        Ok(())
    }));

    let mut signal = executor.execute(message(), &Arguments::new(), Arc::default());
    assert!(matches!(
        signal.try_take(),
        Some(Completion::Failed(CallbackError::Abandoned))
    ));
}

#[test]
fn flow_control_action_is_relayed_unchanged() {
    let seen = Arc::new(Mutex::new(None));
    let record = seen.clone();
    let executor = success_executor(CallbackFn::sync(move |ctx| {
        *record.lock().unwrap() = ctx.flow_control_action().cloned();
        Ok(())
    }));
    let callback_context = Arc::new(SourceCallbackContext::new());
    callback_context.set_flow_control_action(FlowControlAction::Requeue);

    let mut signal = executor.execute(message(), &Arguments::new(), callback_context.clone());

    assert!(signal.try_take().unwrap().is_done());
    assert_eq!(*seen.lock().unwrap(), Some(FlowControlAction::Requeue));
    assert_eq!(
        callback_context.flow_control_action(),
        Some(FlowControlAction::Requeue)
    );
}

#[test]
fn no_flow_control_action_without_upstream_decision() {
    let executor = success_executor(CallbackFn::sync(|ctx| {
        assert!(ctx.flow_control_action().is_none());
        Ok(())
    }));

    let mut signal = executor.execute(message(), &Arguments::new(), Arc::default());
    assert!(signal.try_take().unwrap().is_done());
}

#[test]
fn callback_context_correlates_success_and_terminate() {
    let success = CallbackFn::sync(|ctx| {
        let status: u16 = ctx.param("status")?;
        ctx.callback_context().set_variable("acked_status", status);
        Ok(())
    });
    let terminate = CallbackFn::sync(|ctx| {
        match ctx.callback_context().variable::<u16>("acked_status") {
            Some(200) => Ok(()),
            other => Err(format!("unexpected correlation state: {other:?}").into()),
        }
    });
    let callbacks = SourceCallbacks::new()
        .on_success(success.clone())
        .on_terminate(terminate.clone());
    let model = model();
    let resolver = CallbackResolver::new(&model, &callbacks).unwrap();
    let on_success = CallbackExecutor::new(resolver.resolve(&success).unwrap());
    let on_terminate = CallbackExecutor::new(resolver.resolve(&terminate).unwrap());
    assert_eq!(on_terminate.descriptor().kind(), CallbackKind::Terminate);

    let msg = message();
    let state = Arc::new(SourceCallbackContext::new().with_correlation_id("m-1"));

    let mut first = on_success.execute(msg.clone(), &Arguments::new(), state.clone());
    assert!(first.try_take().unwrap().is_done());
    let mut second = on_terminate.execute(msg, &Arguments::new(), state);
    assert!(second.try_take().unwrap().is_done());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_invocations_share_one_descriptor() {
    let executor = success_executor(CallbackFn::spawn(|ctx| async move {
        tokio::task::yield_now().await;
        let body = ctx.message().payload()["body"]
            .as_str()
            .unwrap_or_default()
            .to_owned();
        let result: Result<(), BoxError> = if body.starts_with("bad") {
            Err(IllegalState(body).into())
        } else {
            Ok(())
        };
        result
    }));

    let signals: Vec<_> = (0..16)
        .map(|i| {
            let body = if i % 4 == 0 { format!("bad-{i}") } else { format!("ok-{i}") };
            executor.execute(
                Arc::new(SourceMessage::new(json!({ "body": body }))),
                &Arguments::new(),
                Arc::default(),
            )
        })
        .collect();

    let outcomes = futures::future::join_all(signals).await;
    assert_eq!(outcomes.iter().filter(|c| c.is_failed()).count(), 4);
    assert_eq!(outcomes.iter().filter(|c| c.is_done()).count(), 12);
}

async fn crash() -> Result<(), BoxError> {
    panic!("worker crashed")
}

#[tokio::test]
async fn spawned_callback_panic_is_fatal() {
    let executor = success_executor(CallbackFn::spawn(|_| crash()));

    let completion = executor
        .execute(message(), &Arguments::new(), Arc::default())
        .await;
    assert!(completion.error().unwrap().is_fatal());
}

#[test]
fn spawned_callback_without_runtime_fails() {
    let executor = success_executor(CallbackFn::spawn(|_| async { Ok(()) }));

    let mut signal = executor.execute(message(), &Arguments::new(), Arc::default());
    assert!(signal.try_take().unwrap().is_failed());
}
