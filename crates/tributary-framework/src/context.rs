//! Invocation context handed to callbacks.
//!
//! A [`CallbackInvocationContext`] is built by the engine for exactly one
//! invocation. It carries:
//!
//! - the triggering [`SourceMessage`]
//! - the parameters bound against the descriptor's groups ([`ResolvedParameters`])
//! - the caller's [`SourceCallbackContext`], shared with the other callbacks of
//!   the same message
//! - the [`FlowControlAction`] recorded in that context, if any
//!
//! The context is cheap to clone so asynchronous callbacks can move it into
//! the task that eventually completes their handle.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use tributary_core::{CallbackKind, FlowControlAction, SourceCallbackContext, SourceMessage};

use crate::error::ParameterError;

/// Argument values supplied by the caller, keyed by parameter name.
pub type Arguments = Map<String, Value>;

/// One parameter bound for an invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundParameter {
    /// Declaring group, or `None` for values the caller passed without a
    /// matching declaration.
    pub group: Option<String>,
    pub name: String,
    pub value: Value,
}

/// Parameters bound for one invocation, in binding order.
///
/// Declared parameters come first, in descriptor group order; undeclared
/// arguments follow in the order the caller supplied them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedParameters {
    parameters: Vec<BoundParameter>,
}

impl ResolvedParameters {
    pub(crate) fn push(&mut self, group: Option<&str>, name: &str, value: Value) {
        self.parameters.push(BoundParameter {
            group: group.map(str::to_owned),
            name: name.to_owned(),
            value,
        });
    }

    /// Returns the value bound under `name`.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.parameters
            .iter()
            .find(|p| p.name == name)
            .map(|p| &p.value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Returns the bound parameter names in binding order.
    pub fn names(&self) -> Vec<&str> {
        self.parameters.iter().map(|p| p.name.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BoundParameter> {
        self.parameters.iter()
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }
}

/// Everything a callback sees about the invocation it is serving.
#[derive(Debug, Clone)]
pub struct CallbackInvocationContext {
    source: Arc<str>,
    kind: CallbackKind,
    message: Arc<SourceMessage>,
    parameters: Arc<ResolvedParameters>,
    callback_context: Arc<SourceCallbackContext>,
    flow_control_action: Option<FlowControlAction>,
}

impl CallbackInvocationContext {
    /// Builds the context, relaying any flow-control action recorded in
    /// `callback_context`.
    pub(crate) fn new(
        source: Arc<str>,
        kind: CallbackKind,
        message: Arc<SourceMessage>,
        parameters: ResolvedParameters,
        callback_context: Arc<SourceCallbackContext>,
    ) -> Self {
        let flow_control_action = callback_context.flow_control_action();
        Self {
            source,
            kind,
            message,
            parameters: Arc::new(parameters),
            callback_context,
            flow_control_action,
        }
    }

    /// Name of the source that owns the callback.
    pub fn source_name(&self) -> &str {
        &self.source
    }

    pub fn kind(&self) -> CallbackKind {
        self.kind
    }

    pub fn message(&self) -> &Arc<SourceMessage> {
        &self.message
    }

    pub fn parameters(&self) -> &ResolvedParameters {
        &self.parameters
    }

    /// Deserializes the parameter bound under `name`.
    pub fn param<T: DeserializeOwned>(&self, name: &str) -> Result<T, ParameterError> {
        let value = self
            .parameters
            .get(name)
            .ok_or_else(|| ParameterError::Missing(name.to_string()))?;
        T::deserialize(value).map_err(|e| ParameterError::InvalidType {
            name: name.to_string(),
            reason: e.to_string(),
        })
    }

    /// Like [`param`](Self::param), but an unbound parameter yields `None`.
    pub fn param_opt<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, ParameterError> {
        match self.param(name) {
            Ok(value) => Ok(Some(value)),
            Err(ParameterError::Missing(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// The caller's per-message state, shared with the message's other callbacks.
    pub fn callback_context(&self) -> &Arc<SourceCallbackContext> {
        &self.callback_context
    }

    /// The back-pressure action recorded upstream for this message.
    pub fn flow_control_action(&self) -> Option<&FlowControlAction> {
        self.flow_control_action.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn context_with(params: ResolvedParameters, ctx: SourceCallbackContext) -> CallbackInvocationContext {
        CallbackInvocationContext::new(
            Arc::from("listener"),
            CallbackKind::Success,
            Arc::new(SourceMessage::new(json!("payload"))),
            params,
            Arc::new(ctx),
        )
    }

    #[test]
    fn typed_parameter_access() {
        let mut params = ResolvedParameters::default();
        params.push(Some("Response"), "status", json!(202));
        params.push(None, "note", json!("extra"));
        let ctx = context_with(params, SourceCallbackContext::new());

        assert_eq!(ctx.param::<u16>("status").unwrap(), 202);
        assert_eq!(ctx.param_opt::<String>("missing").unwrap(), None);
        assert!(matches!(
            ctx.param::<bool>("note"),
            Err(ParameterError::InvalidType { .. })
        ));
        assert!(matches!(ctx.param::<u16>("nope"), Err(ParameterError::Missing(_))));
        assert_eq!(ctx.parameters().names(), vec!["status", "note"]);
    }

    #[test]
    fn relays_recorded_flow_control_action() {
        let state = SourceCallbackContext::new();
        state.set_flow_control_action(FlowControlAction::Redirect("dlq".into()));
        let ctx = context_with(ResolvedParameters::default(), state);

        assert_eq!(
            ctx.flow_control_action(),
            Some(&FlowControlAction::Redirect("dlq".into()))
        );
        assert_eq!(ctx.source_name(), "listener");
    }
}
