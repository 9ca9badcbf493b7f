//! Single-fire completion protocol.
//!
//! [`completion_channel`] creates the three pieces of one asynchronous
//! invocation:
//!
//! - [`CompletionHandle`]: handed to extension code. Move-only; consuming
//!   [`success`](CompletionHandle::success) or [`error`](CompletionHandle::error)
//!   resolves the signal, so completing twice does not compile.
//! - [`CompletionFallback`]: kept by the engine while the callback runs, so
//!   the engine can fail the signal itself when the callback raises before the
//!   handle was ever used.
//! - [`CompletionSignal`]: the future returned to the caller. It resolves
//!   exactly once to a [`Completion`].
//!
//! Extensions that need to race completion from several places can opt into a
//! cloneable [`SharedCompletionHandle`]; every completion after the first is
//! rejected with [`CompletionError::AlreadyCompleted`] and leaves the resolved
//! outcome untouched.
//!
//! Dropping every handle without completing resolves the signal to
//! [`CallbackError::Abandoned`] instead of leaving it pending. A handle that is
//! kept alive but never completed leaves the signal pending forever; only the
//! caller can bound that wait.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::{trace, warn};

use crate::error::{BoxError, CallbackError, CallbackResult, CompletionError};

// =============================================================================
// Completion
// =============================================================================

/// The outcome of one callback invocation.
#[derive(Debug, Clone)]
pub enum Completion {
    /// The callback finished normally.
    Done,
    /// The callback failed; the cause is preserved.
    Failed(CallbackError),
}

impl Completion {
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// Returns the failure cause, if any.
    pub fn error(&self) -> Option<&CallbackError> {
        match self {
            Self::Done => None,
            Self::Failed(err) => Some(err),
        }
    }

    pub fn into_result(self) -> CallbackResult<()> {
        self.into()
    }
}

impl From<CallbackResult<()>> for Completion {
    fn from(result: CallbackResult<()>) -> Self {
        match result {
            Ok(()) => Self::Done,
            Err(err) => Self::Failed(err),
        }
    }
}

impl From<Completion> for CallbackResult<()> {
    fn from(completion: Completion) -> Self {
        match completion {
            Completion::Done => Ok(()),
            Completion::Failed(err) => Err(err),
        }
    }
}

// =============================================================================
// Slot shared by the completing side
// =============================================================================

struct CompletionSlot {
    sender: Mutex<Option<oneshot::Sender<Completion>>>,
}

impl CompletionSlot {
    fn fire(&self, completion: Completion) -> Result<(), CompletionError> {
        let Some(sender) = self.sender.lock().take() else {
            return Err(CompletionError::AlreadyCompleted);
        };
        if sender.send(completion).is_err() {
            trace!("completion signal dropped before the callback completed");
        }
        Ok(())
    }
}

impl Drop for CompletionSlot {
    fn drop(&mut self) {
        if self.sender.get_mut().is_some() {
            warn!("completion handle dropped without completing the callback");
        }
    }
}

/// Creates a connected handle, engine fallback, and signal.
pub fn completion_channel() -> (CompletionHandle, CompletionFallback, CompletionSignal) {
    let (tx, rx) = oneshot::channel();
    let slot = Arc::new(CompletionSlot {
        sender: Mutex::new(Some(tx)),
    });
    (
        CompletionHandle { slot: slot.clone() },
        CompletionFallback { slot },
        CompletionSignal {
            state: SignalState::Pending(rx),
        },
    )
}

// =============================================================================
// CompletionHandle
// =============================================================================

/// Move-only handle an asynchronous callback uses to signal that it finished.
///
/// The handle may be moved to another thread or task; completing it from there
/// resolves the caller's [`CompletionSignal`].
pub struct CompletionHandle {
    slot: Arc<CompletionSlot>,
}

impl CompletionHandle {
    /// Resolves the signal with [`Completion::Done`].
    pub fn success(self) {
        self.complete(Completion::Done);
    }

    /// Resolves the signal with a failure wrapping `cause`.
    pub fn error(self, cause: impl Into<BoxError>) {
        self.complete(Completion::Failed(CallbackError::invocation(cause)));
    }

    /// Resolves the signal with an already-classified failure.
    pub fn fail(self, error: CallbackError) {
        self.complete(Completion::Failed(error));
    }

    /// Resolves the signal from a callback-style result.
    pub fn finish(self, result: Result<(), BoxError>) {
        match result {
            Ok(()) => self.success(),
            Err(cause) => self.error(cause),
        }
    }

    /// Converts into a cloneable handle for racing completions.
    pub fn shared(self) -> SharedCompletionHandle {
        SharedCompletionHandle { slot: self.slot }
    }

    fn complete(self, completion: Completion) {
        // Only reachable when the engine already failed the signal because the
        // callback raised after moving the handle elsewhere.
        if self.slot.fire(completion).is_err() {
            warn!("callback completed after the engine had already failed it; ignoring");
        }
    }
}

impl std::fmt::Debug for CompletionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionHandle").finish_non_exhaustive()
    }
}

// =============================================================================
// SharedCompletionHandle
// =============================================================================

/// Cloneable completion handle that enforces exactly-once at runtime.
///
/// The first completion wins. Later ones return
/// [`CompletionError::AlreadyCompleted`] and never change the outcome.
#[derive(Clone)]
pub struct SharedCompletionHandle {
    slot: Arc<CompletionSlot>,
}

impl SharedCompletionHandle {
    pub fn success(&self) -> Result<(), CompletionError> {
        self.complete(Completion::Done)
    }

    pub fn error(&self, cause: impl Into<BoxError>) -> Result<(), CompletionError> {
        self.complete(Completion::Failed(CallbackError::invocation(cause)))
    }

    /// Returns `true` once any clone (or the engine) has resolved the signal.
    pub fn is_completed(&self) -> bool {
        self.slot.sender.lock().is_none()
    }

    fn complete(&self, completion: Completion) -> Result<(), CompletionError> {
        self.slot.fire(completion).inspect_err(|_| {
            warn!("completion handle invoked more than once; ignoring");
        })
    }
}

impl std::fmt::Debug for SharedCompletionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedCompletionHandle")
            .field("completed", &self.is_completed())
            .finish()
    }
}

// =============================================================================
// CompletionFallback
// =============================================================================

/// Engine-side access to a pending signal while its callback is running.
pub struct CompletionFallback {
    slot: Arc<CompletionSlot>,
}

impl CompletionFallback {
    /// Fails the signal unless the handle already completed it.
    ///
    /// Returns `true` if this call resolved the signal.
    pub fn fail(self, error: CallbackError) -> bool {
        self.slot.fire(Completion::Failed(error)).is_ok()
    }
}

// =============================================================================
// CompletionSignal
// =============================================================================

enum SignalState {
    Ready(Option<Completion>),
    Pending(oneshot::Receiver<Completion>),
}

/// The single-fire outcome of one callback invocation.
///
/// A signal for a synchronous callback is already resolved when the engine
/// returns it. A signal for an asynchronous callback resolves when the
/// extension completes its [`CompletionHandle`], possibly from another thread.
#[must_use = "a completion signal does nothing unless awaited or inspected"]
pub struct CompletionSignal {
    state: SignalState,
}

impl CompletionSignal {
    /// An already-resolved, successful signal.
    pub fn done() -> Self {
        Self::resolved(Completion::Done)
    }

    /// An already-resolved, failed signal.
    pub fn failed(error: CallbackError) -> Self {
        Self::resolved(Completion::Failed(error))
    }

    pub fn resolved(completion: Completion) -> Self {
        Self {
            state: SignalState::Ready(Some(completion)),
        }
    }

    /// Returns the outcome if it is already available, without waiting.
    ///
    /// Once an outcome has been returned (here or by awaiting), the signal is
    /// spent and further calls return `None`.
    pub fn try_take(&mut self) -> Option<Completion> {
        match &mut self.state {
            SignalState::Ready(completion) => completion.take(),
            SignalState::Pending(rx) => {
                let completion = match rx.try_recv() {
                    Ok(completion) => completion,
                    Err(oneshot::error::TryRecvError::Empty) => return None,
                    Err(oneshot::error::TryRecvError::Closed) => {
                        Completion::Failed(CallbackError::Abandoned)
                    }
                };
                self.state = SignalState::Ready(None);
                Some(completion)
            }
        }
    }
}

impl Future for CompletionSignal {
    type Output = Completion;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let completion = match &mut self.state {
            SignalState::Ready(completion) => match completion.take() {
                Some(completion) => completion,
                None => panic!("CompletionSignal polled after completion"),
            },
            SignalState::Pending(rx) => match Pin::new(rx).poll(cx) {
                Poll::Ready(Ok(completion)) => completion,
                Poll::Ready(Err(_)) => Completion::Failed(CallbackError::Abandoned),
                Poll::Pending => return Poll::Pending,
            },
        };
        self.state = SignalState::Ready(None);
        Poll::Ready(completion)
    }
}

impl std::fmt::Debug for CompletionSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match &self.state {
            SignalState::Ready(Some(_)) => "resolved",
            SignalState::Ready(None) => "spent",
            SignalState::Pending(_) => "pending",
        };
        f.debug_struct("CompletionSignal")
            .field("state", &state)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_pending, assert_ready, task};

    #[test]
    fn resolved_signal_is_available_immediately() {
        let mut signal = CompletionSignal::done();
        assert!(matches!(signal.try_take(), Some(Completion::Done)));
        assert!(signal.try_take().is_none());
    }

    #[test]
    fn pending_until_handle_completes() {
        let (handle, _fallback, signal) = completion_channel();
        let mut signal = task::spawn(signal);

        assert_pending!(signal.poll());
        handle.success();
        assert!(signal.is_woken());
        assert!(assert_ready!(signal.poll()).is_done());
    }

    #[test]
    fn handle_error_preserves_cause() {
        let (handle, _fallback, mut signal) = completion_channel();
        handle.error("disk full");

        let completion = signal.try_take().unwrap();
        let err = completion.error().unwrap();
        assert_eq!(err.to_string(), "callback failed: disk full");
    }

    #[test]
    fn shared_handle_rejects_second_completion() {
        let (handle, _fallback, mut signal) = completion_channel();
        let shared = handle.shared();
        let other = shared.clone();

        assert_eq!(shared.success(), Ok(()));
        assert_eq!(other.error("late"), Err(CompletionError::AlreadyCompleted));
        assert_eq!(shared.success(), Err(CompletionError::AlreadyCompleted));
        assert!(other.is_completed());
        assert!(signal.try_take().unwrap().is_done());
    }

    #[test]
    fn fallback_does_not_override_handle() {
        let (handle, fallback, mut signal) = completion_channel();
        handle.success();

        assert!(!fallback.fail(CallbackError::invocation("too late")));
        assert!(signal.try_take().unwrap().is_done());
    }

    #[test]
    fn fallback_wins_when_handle_is_used_afterwards() {
        let (handle, fallback, mut signal) = completion_channel();

        assert!(fallback.fail(CallbackError::invocation("raised")));
        handle.success();
        assert!(signal.try_take().unwrap().is_failed());
    }

    #[test]
    fn dropping_all_handles_abandons_the_signal() {
        let (handle, fallback, mut signal) = completion_channel();
        assert!(signal.try_take().is_none());

        drop(handle);
        drop(fallback);
        let completion = signal.try_take().unwrap();
        assert!(matches!(completion, Completion::Failed(CallbackError::Abandoned)));
    }

    #[tokio::test]
    async fn completes_from_another_thread() {
        let (handle, fallback, signal) = completion_channel();
        drop(fallback);

        let worker = std::thread::spawn(move || handle.success());
        assert!(signal.await.is_done());
        worker.join().unwrap();
    }

    #[test]
    fn completion_converts_to_result() {
        assert!(Completion::Done.into_result().is_ok());
        let failed: Completion = Err(CallbackError::Abandoned).into();
        assert!(matches!(failed.into_result(), Err(CallbackError::Abandoned)));
    }
}
