//! Resolved callback descriptors.

use std::sync::Arc;

use tributary_core::CallbackKind;

use crate::callback::CallbackFn;
use crate::model::ParameterGroup;

/// Immutable description of how to invoke one callback.
///
/// Created once when the source is bound and shared, without locking, by every
/// invocation of that callback. Cloning only bumps a reference count.
#[derive(Debug, Clone)]
pub struct CallbackDescriptor {
    inner: Arc<DescriptorInner>,
}

#[derive(Debug)]
struct DescriptorInner {
    source: Arc<str>,
    kind: CallbackKind,
    groups: Vec<ParameterGroup>,
    is_async: bool,
    callback: CallbackFn,
}

impl CallbackDescriptor {
    pub(crate) fn new(
        source: &str,
        kind: CallbackKind,
        groups: Vec<ParameterGroup>,
        callback: CallbackFn,
    ) -> Self {
        Self {
            inner: Arc::new(DescriptorInner {
                source: Arc::from(source),
                kind,
                groups,
                is_async: callback.is_async(),
                callback,
            }),
        }
    }

    /// Name of the owning source.
    pub fn source_name(&self) -> &str {
        &self.inner.source
    }

    pub(crate) fn source_arc(&self) -> Arc<str> {
        self.inner.source.clone()
    }

    pub fn kind(&self) -> CallbackKind {
        self.inner.kind
    }

    /// Parameter groups to bind against: the source's own groups followed by
    /// the callback kind's groups.
    pub fn groups(&self) -> &[ParameterGroup] {
        &self.inner.groups
    }

    /// Whether the callback completes through a [`CompletionHandle`](tributary_core::CompletionHandle).
    pub fn is_async(&self) -> bool {
        self.inner.is_async
    }

    pub fn callback(&self) -> &CallbackFn {
        &self.inner.callback
    }
}
