//! Callback kinds.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The lifecycle outcome a callback is bound to.
///
/// Exactly one kind is bound per logical outcome of a message's processing.
/// The declaration order (success, error, terminate) is also the priority used
/// when a single callback could serve several kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallbackKind {
    /// The pipeline processed the message successfully.
    Success,
    /// The pipeline failed to process the message.
    Error,
    /// Processing of the message is over, whatever its outcome.
    Terminate,
}

impl CallbackKind {
    /// All kinds in resolution priority order.
    pub const ALL: [CallbackKind; 3] = [Self::Success, Self::Error, Self::Terminate];

    /// Returns the lowercase name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Terminate => "terminate",
        }
    }
}

impl fmt::Display for CallbackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CallbackKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "success" | "on_success" => Ok(Self::Success),
            "error" | "on_error" => Ok(Self::Error),
            "terminate" | "on_terminate" => Ok(Self::Terminate),
            other => Err(format!("unknown callback kind '{other}'")),
        }
    }
}
