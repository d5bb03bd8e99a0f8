//! Effective configuration view
//!
//! Layers the pending edits over the active scope's resolved values:
//! pending value if present, else the camera's own value, else the default.
//! A pending value always wins, valid or not, so the user sees what they
//! typed and can correct it.

use std::collections::HashMap;

use crate::pending::PendingChanges;
use crate::snapshot::ConfigSnapshot;
use crate::types::{ParamValue, Parameter, Scope};

/// One displayed parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectiveEntry<'a> {
    pub name: &'a str,
    pub value: &'a ParamValue,
    /// The value comes from a pending edit
    pub modified: bool,
    /// Validation message for the pending edit, if it is invalid
    pub error: Option<&'a str>,
}

/// Borrowing view of what a form for `scope` should display.
///
/// Lookups are O(1); iteration visits each distinct key once.
#[derive(Debug, Clone, Copy)]
pub struct EffectiveView<'a> {
    snapshot: &'a ConfigSnapshot,
    scope: Scope,
    pending: &'a PendingChanges,
}

impl<'a> EffectiveView<'a> {
    /// Create a view over a snapshot, a scope, and the pending edits.
    pub fn new(snapshot: &'a ConfigSnapshot, scope: Scope, pending: &'a PendingChanges) -> Self {
        Self { snapshot, scope, pending }
    }

    /// Scope this view resolves against.
    pub fn scope(&self) -> Scope {
        self.scope
    }

    /// Value to display for `name`.
    pub fn get(&self, name: &str) -> Option<&'a ParamValue> {
        self.pending.get(name).or_else(|| self.resolved(name).map(|p| &p.value))
    }

    /// Value to display for `name`, or `fallback` when the daemon has none.
    pub fn value_or(&self, name: &str, fallback: impl Into<ParamValue>) -> ParamValue {
        self.get(name).cloned().unwrap_or_else(|| fallback.into())
    }

    /// The resolved scope parameter, ignoring pending edits.
    pub fn resolved(&self, name: &str) -> Option<&'a Parameter> {
        self.snapshot.resolve(self.scope, name)
    }

    /// Check if `name` is showing a pending edit.
    pub fn is_modified(&self, name: &str) -> bool {
        self.pending.get(name).is_some()
    }

    /// Validation message for `name`.
    pub fn error(&self, name: &str) -> Option<&'a str> {
        self.pending.error_for(name)
    }

    /// Full entry for `name`.
    pub fn entry(&self, name: &'a str) -> Option<EffectiveEntry<'a>> {
        let value = self.get(name)?;
        Some(EffectiveEntry {
            name,
            value,
            modified: self.is_modified(name),
            error: self.error(name),
        })
    }

    /// Every displayed parameter: resolved keys plus pending-only keys.
    pub fn iter(self) -> impl Iterator<Item = EffectiveEntry<'a>> + 'a {
        let snapshot = self.snapshot;
        let pending = self.pending;
        let view = self;

        let defaults = snapshot.defaults().keys();
        let own = match self.scope {
            Scope::Camera(id) => snapshot.overrides(id),
            Scope::Default => None,
        };
        let own_only = own
            .into_iter()
            .flat_map(|m| m.keys())
            .filter(move |k| !snapshot.defaults().contains_key(*k));
        let pending_only = pending
            .iter()
            .map(|(k, _)| k)
            .filter(move |k| view.resolved(k).is_none());

        defaults
            .map(String::as_str)
            .chain(own_only.map(String::as_str))
            .chain(pending_only)
            .filter_map(move |name| view.entry(name))
    }

    /// Materialize the view as a map of name to displayed value.
    pub fn to_map(&self) -> HashMap<String, ParamValue> {
        self.iter().map(|e| (e.name.to_string(), e.value.clone())).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn snapshot() -> ConfigSnapshot {
        ConfigSnapshot::from_parts(
            [Parameter::new("threshold", 1500), Parameter::new("movie_container", "mkv")],
            [(2, vec![Parameter::new("threshold", 3000), Parameter::new("camera_name", "back")])],
        )
    }

    #[test]
    fn pending_value_wins_even_when_invalid() {
        let snapshot = snapshot();
        let mut pending = PendingChanges::new();
        pending.set_change("threshold", "abc");

        let view = EffectiveView::new(&snapshot, Scope::Camera(2), &pending);
        assert_eq!(view.get("threshold"), Some(&ParamValue::from("abc")));
        assert_eq!(view.error("threshold"), Some("Must be a whole number"));
        assert!(view.is_modified("threshold"));
    }

    #[test]
    fn unedited_values_resolve_through_scope() {
        let snapshot = snapshot();
        let pending = PendingChanges::new();

        let camera = EffectiveView::new(&snapshot, Scope::Camera(2), &pending);
        assert_eq!(camera.get("threshold"), Some(&ParamValue::from(3000)));
        assert_eq!(camera.get("movie_container"), Some(&ParamValue::from("mkv")));

        let global = EffectiveView::new(&snapshot, Scope::Default, &pending);
        assert_eq!(global.get("threshold"), Some(&ParamValue::from(1500)));
        assert!(global.get("camera_name").is_none());
        assert_eq!(global.value_or("log_level", 6), ParamValue::from(6));
    }

    #[test]
    fn iteration_visits_each_key_once() {
        let snapshot = snapshot();
        let mut pending = PendingChanges::new();
        pending.set_change("threshold", 2500);
        pending.set_change("x_new_param", "on");

        let view = EffectiveView::new(&snapshot, Scope::Camera(2), &pending);
        let mut names: Vec<&str> = view.iter().map(|e| e.name).collect();
        names.sort_unstable();
        assert_eq!(names, vec!["camera_name", "movie_container", "threshold", "x_new_param"]);

        let map = view.to_map();
        assert_eq!(map["threshold"], ParamValue::from(2500));
    }

    proptest! {
        #[test]
        fn display_precedence(remote in 0i64..5000, edit in proptest::option::of(0i64..5000)) {
            let snapshot = ConfigSnapshot::from_parts([Parameter::new("threshold", remote)], Vec::new());
            let mut pending = PendingChanges::new();
            if let Some(edit) = edit {
                pending.set_change("threshold", edit);
            }
            let view = EffectiveView::new(&snapshot, Scope::Default, &pending);
            let expected = ParamValue::from(edit.unwrap_or(remote));
            prop_assert_eq!(view.get("threshold"), Some(&expected));
        }
    }
}
