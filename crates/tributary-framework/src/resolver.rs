//! Callback parameter resolution.
//!
//! The resolver runs once per source binding. It decides which callback kind
//! a registered callback serves and which parameter groups its invocations
//! bind against, and captures both in a [`CallbackDescriptor`].
//!
//! # Priority
//!
//! A candidate callback is matched against the success handler, then the
//! error handler; anything else is bound as the terminate handler. The same
//! callback registered as both success and error therefore resolves as
//! success.

use tracing::debug;

use tributary_core::CallbackKind;

use crate::callback::{CallbackFn, SourceCallbacks};
use crate::descriptor::CallbackDescriptor;
use crate::error::{ResolutionError, ResolutionResult};
use crate::model::SourceModel;

/// Lookup table built from a source's declaration.
#[derive(Debug)]
pub struct CallbackResolver<'a> {
    model: &'a SourceModel,
    /// Registered callbacks in priority order.
    table: Vec<(CallbackKind, &'a CallbackFn)>,
}

impl<'a> CallbackResolver<'a> {
    /// Builds the lookup table, failing if the source registered no callback.
    pub fn new(model: &'a SourceModel, callbacks: &'a SourceCallbacks) -> ResolutionResult<Self> {
        let table: Vec<_> = CallbackKind::ALL
            .into_iter()
            .filter_map(|kind| callbacks.get(kind).map(|cb| (kind, cb)))
            .collect();

        if table.is_empty() {
            return Err(ResolutionError::NoCallbacks {
                source_name: model.name.clone(),
            });
        }
        Ok(Self { model, table })
    }

    /// Resolves the descriptor for `candidate`.
    pub fn resolve(&self, candidate: &CallbackFn) -> ResolutionResult<CallbackDescriptor> {
        let kind = self
            .table
            .iter()
            .filter(|(kind, _)| *kind != CallbackKind::Terminate)
            .find(|(_, registered)| registered.same_as(candidate))
            .map(|(kind, _)| *kind)
            .unwrap_or(CallbackKind::Terminate);

        self.descriptor(kind, candidate.clone())
    }

    /// Resolves the descriptor of the callback registered for `kind`, if any.
    pub fn resolve_kind(&self, kind: CallbackKind) -> Option<ResolutionResult<CallbackDescriptor>> {
        self.table
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, callback)| self.resolve(callback))
    }

    /// Resolves every registered callback, in priority order.
    pub fn resolve_all(&self) -> ResolutionResult<Vec<CallbackDescriptor>> {
        self.table
            .iter()
            .map(|(_, callback)| self.resolve(callback))
            .collect()
    }

    fn descriptor(&self, kind: CallbackKind, callback: CallbackFn) -> ResolutionResult<CallbackDescriptor> {
        let callback_model =
            self.model
                .callback(kind)
                .ok_or_else(|| ResolutionError::MissingCallbackModel {
                    source_name: self.model.name.clone(),
                    kind,
                })?;

        let groups: Vec<_> = self
            .model
            .groups
            .iter()
            .chain(callback_model.groups.iter())
            .cloned()
            .collect();

        debug!(
            source = %self.model.name,
            kind = %kind,
            groups = groups.len(),
            is_async = callback.is_async(),
            "Resolved source callback"
        );

        Ok(CallbackDescriptor::new(&self.model.name, kind, groups, callback))
    }
}

/// Resolves a single callback against a source declaration.
pub fn resolve(
    model: &SourceModel,
    callbacks: &SourceCallbacks,
    candidate: &CallbackFn,
) -> ResolutionResult<CallbackDescriptor> {
    CallbackResolver::new(model, callbacks)?.resolve(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CallbackModel, ParameterGroup};

    fn noop() -> CallbackFn {
        CallbackFn::sync(|_| Ok(()))
    }

    fn model() -> SourceModel {
        SourceModel::new("listener")
            .with_group(ParameterGroup::new("General"))
            .with_group(ParameterGroup::new("Connection"))
            .with_callback(
                CallbackKind::Success,
                CallbackModel::new().with_group(ParameterGroup::new("Response")),
            )
            .with_callback(
                CallbackKind::Error,
                CallbackModel::new().with_group(ParameterGroup::new("Error Response")),
            )
            .with_callback(
                CallbackKind::Terminate,
                CallbackModel::new().with_group(ParameterGroup::new("Cleanup")),
            )
    }

    fn group_names(descriptor: &CallbackDescriptor) -> Vec<&str> {
        descriptor.groups().iter().map(|g| g.name.as_str()).collect()
    }

    #[test]
    fn concatenates_source_and_callback_groups_in_order() {
        let success = noop();
        let callbacks = SourceCallbacks::new().on_success(success.clone());

        let descriptor = resolve(&model(), &callbacks, &success).unwrap();
        assert_eq!(descriptor.kind(), CallbackKind::Success);
        assert_eq!(group_names(&descriptor), vec!["General", "Connection", "Response"]);
        assert!(!descriptor.is_async());
    }

    #[test]
    fn success_wins_over_error_for_the_same_callback() {
        let shared = noop();
        let callbacks = SourceCallbacks::new()
            .on_error(shared.clone())
            .on_success(shared.clone());

        let descriptor = resolve(&model(), &callbacks, &shared).unwrap();
        assert_eq!(descriptor.kind(), CallbackKind::Success);
    }

    #[test]
    fn unmatched_callback_falls_back_to_terminate() {
        let terminate = noop();
        let callbacks = SourceCallbacks::new()
            .on_success(noop())
            .on_terminate(terminate.clone());

        let descriptor = resolve(&model(), &callbacks, &terminate).unwrap();
        assert_eq!(descriptor.kind(), CallbackKind::Terminate);
        assert_eq!(group_names(&descriptor), vec!["General", "Connection", "Cleanup"]);
    }

    #[test]
    fn callback_serving_error_and_terminate_resolves_as_error() {
        let shared = noop();
        let callbacks = SourceCallbacks::new()
            .on_error(shared.clone())
            .on_terminate(shared.clone());
        let model = model();
        let resolver = CallbackResolver::new(&model, &callbacks).unwrap();

        let all = resolver.resolve_all().unwrap();
        assert_eq!(all.len(), 2);
        assert!(all.iter().all(|d| d.kind() == CallbackKind::Error));
    }

    #[test]
    fn async_flag_comes_from_registration() {
        let deferred = CallbackFn::deferred(|_, handle| {
            handle.success();
            Ok(())
        });
        let callbacks = SourceCallbacks::new().on_error(deferred.clone());

        let descriptor = resolve(&model(), &callbacks, &deferred).unwrap();
        assert_eq!(descriptor.kind(), CallbackKind::Error);
        assert!(descriptor.is_async());
    }

    #[test]
    fn no_registered_callbacks_fails_at_setup() {
        let err = resolve(&model(), &SourceCallbacks::new(), &noop()).unwrap_err();
        assert_eq!(
            err,
            ResolutionError::NoCallbacks {
                source_name: "listener".into()
            }
        );
    }

    #[test]
    fn missing_callback_model_is_a_resolution_error() {
        let success = noop();
        let callbacks = SourceCallbacks::new().on_success(success.clone());
        let model = SourceModel::new("bare").with_group(ParameterGroup::new("General"));

        let err = resolve(&model, &callbacks, &success).unwrap_err();
        assert!(matches!(
            err,
            ResolutionError::MissingCallbackModel {
                kind: CallbackKind::Success,
                ..
            }
        ));
    }

    #[test]
    fn resolve_kind_skips_unregistered_kinds() {
        let model = model();
        let callbacks = SourceCallbacks::new().on_success(noop());
        let resolver = CallbackResolver::new(&model, &callbacks).unwrap();

        assert!(resolver.resolve_kind(CallbackKind::Error).is_none());
        assert!(resolver.resolve_kind(CallbackKind::Success).unwrap().is_ok());
    }
}
