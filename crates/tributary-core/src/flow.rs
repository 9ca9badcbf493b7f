//! Flow-control actions relayed to callbacks.

use serde::{Deserialize, Serialize};

/// A back-pressure instruction recorded by the hosting pipeline.
///
/// When the pipeline refuses a message (for example because it is saturated)
/// it records the action it took in the message's
/// [`SourceCallbackContext`](crate::SourceCallbackContext). The callback engine
/// never originates one of these; it only hands the recorded value to the
/// callback so extension code can react to it or pass it through.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowControlAction {
    /// The message was rejected and the source should report a failure.
    Fail,
    /// The message was dropped silently.
    Drop,
    /// The message should be handed back to the source for a later retry.
    Requeue,
    /// The message should be redirected to another destination.
    Redirect(String),
}

impl FlowControlAction {
    /// Returns a short, stable name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Fail => "fail",
            Self::Drop => "drop",
            Self::Requeue => "requeue",
            Self::Redirect(_) => "redirect",
        }
    }
}

impl std::fmt::Display for FlowControlAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Redirect(target) => write!(f, "redirect({target})"),
            other => f.write_str(other.name()),
        }
    }
}
