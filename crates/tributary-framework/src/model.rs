//! Source and parameter models.
//!
//! Models are produced by extension metadata loading (outside this crate) and
//! describe what a source and each of its callbacks declare. They carry no
//! behavior; the resolver combines them with the registered callbacks.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use tributary_core::CallbackKind;

/// A single declared parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterModel {
    pub name: String,
    /// Required parameters must be bound, either explicitly or by default.
    #[serde(default)]
    pub required: bool,
    /// Value used when the caller binds nothing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
}

impl ParameterModel {
    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required: true,
            default_value: None,
        }
    }

    pub fn optional(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required: false,
            default_value: None,
        }
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default_value = Some(value.into());
        self
    }
}

/// An ordered, named group of parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterGroup {
    pub name: String,
    #[serde(default)]
    pub parameters: Vec<ParameterModel>,
}

impl ParameterGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: Vec::new(),
        }
    }

    pub fn with_parameter(mut self, parameter: ParameterModel) -> Self {
        self.parameters.push(parameter);
        self
    }
}

/// The parameter groups declared by one callback kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallbackModel {
    #[serde(default)]
    pub groups: Vec<ParameterGroup>,
}

impl CallbackModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_group(mut self, group: ParameterGroup) -> Self {
        self.groups.push(group);
        self
    }
}

/// Declaration of a source: its own parameter groups and, per callback kind,
/// the callback's parameter groups. Every callback is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceModel {
    pub name: String,
    #[serde(default)]
    pub groups: Vec<ParameterGroup>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success_callback: Option<CallbackModel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_callback: Option<CallbackModel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminate_callback: Option<CallbackModel>,
}

impl SourceModel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_group(mut self, group: ParameterGroup) -> Self {
        self.groups.push(group);
        self
    }

    /// Declares the callback model for `kind`, replacing any previous one.
    pub fn with_callback(mut self, kind: CallbackKind, model: CallbackModel) -> Self {
        match kind {
            CallbackKind::Success => self.success_callback = Some(model),
            CallbackKind::Error => self.error_callback = Some(model),
            CallbackKind::Terminate => self.terminate_callback = Some(model),
        }
        self
    }

    /// Returns the callback model declared for `kind`.
    pub fn callback(&self, kind: CallbackKind) -> Option<&CallbackModel> {
        match kind {
            CallbackKind::Success => self.success_callback.as_ref(),
            CallbackKind::Error => self.error_callback.as_ref(),
            CallbackKind::Terminate => self.terminate_callback.as_ref(),
        }
    }
}
