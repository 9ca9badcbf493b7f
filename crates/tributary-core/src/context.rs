//! Per-message callback context.
//!
//! A [`SourceCallbackContext`] is created by the source when it emits a
//! message and handed back on every callback for that message. Extension code
//! uses it to correlate the success/error call with the terminate call of the
//! same message (e.g. to remember a broker delivery tag), and the hosting
//! pipeline uses it to record the [`FlowControlAction`] it applied.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::flow::FlowControlAction;

/// Variable under which the pipeline records its back-pressure decision.
pub const FLOW_CONTROL_ACTION_VARIABLE: &str = "tributary.flow_control_action";

type Variable = Arc<dyn Any + Send + Sync>;

/// Callback-scoped state shared by all callbacks of one emitted message.
///
/// Variables are typed and keyed by name; reading a variable with the wrong
/// type behaves like reading a missing one.
///
/// # Thread Safety
///
/// The context is shared (`Arc`) between the source and its callbacks, which
/// may run on different threads. Variable access is guarded by a read/write
/// lock that is never held across a callback invocation.
///
/// # Example
///
/// ```rust,ignore
/// let ctx = SourceCallbackContext::new().with_correlation_id("order-7");
/// ctx.set_variable("delivery_tag", 42_u64);
///
/// // ...later, in the terminate callback...
/// let tag: Option<u64> = ctx.variable("delivery_tag");
/// ```
#[derive(Default)]
pub struct SourceCallbackContext {
    correlation_id: Option<String>,
    variables: RwLock<HashMap<String, Variable>>,
}

impl SourceCallbackContext {
    /// Creates an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the correlation id used to tie log lines and callbacks together.
    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    pub fn correlation_id(&self) -> Option<&str> {
        self.correlation_id.as_deref()
    }

    /// Stores a variable, replacing any previous value under the same name.
    pub fn set_variable<T: Any + Send + Sync>(&self, name: impl Into<String>, value: T) {
        self.variables.write().insert(name.into(), Arc::new(value));
    }

    /// Returns a clone of the variable, if present with type `T`.
    pub fn variable<T: Any + Clone>(&self, name: &str) -> Option<T> {
        self.variables
            .read()
            .get(name)
            .and_then(|v| v.downcast_ref::<T>())
            .cloned()
    }

    /// Returns the shared variable without cloning its value.
    pub fn variable_arc<T: Any + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
        let value = self.variables.read().get(name).cloned()?;
        value.downcast::<T>().ok()
    }

    /// Returns `true` if a variable with this name exists, whatever its type.
    pub fn has_variable(&self, name: &str) -> bool {
        self.variables.read().contains_key(name)
    }

    /// Removes a variable, returning `true` if it existed.
    pub fn remove_variable(&self, name: &str) -> bool {
        self.variables.write().remove(name).is_some()
    }

    /// Returns the names of all stored variables, sorted.
    pub fn variable_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.variables.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Records the back-pressure action the pipeline applied to this message.
    pub fn set_flow_control_action(&self, action: FlowControlAction) {
        self.set_variable(FLOW_CONTROL_ACTION_VARIABLE, action);
    }

    /// Returns the recorded back-pressure action, if any.
    pub fn flow_control_action(&self) -> Option<FlowControlAction> {
        self.variable(FLOW_CONTROL_ACTION_VARIABLE)
    }
}

impl std::fmt::Debug for SourceCallbackContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceCallbackContext")
            .field("correlation_id", &self.correlation_id)
            .field("variables", &self.variable_names())
            .finish()
    }
}
