//! Pending change store
//!
//! Holds the user's edits that have not yet been durably applied, keyed by
//! parameter name, together with the validation error for each edit that
//! currently fails its rule. The value map and the error map are always
//! updated in the same call, so an entry's error state is never stale.

use std::collections::{BTreeMap, HashMap};
use tracing::trace;

use crate::types::ParamValue;
use crate::validation::{Validation, validate};

/// A validation failure attached to a pending change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub param: String,
    pub message: String,
}

/// Edits not yet applied, with their validation state.
#[derive(Debug, Clone, Default)]
pub struct PendingChanges {
    changes: HashMap<String, ParamValue>,
    errors: HashMap<String, String>,
}

impl PendingChanges {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the edit for `name`, revalidating it.
    ///
    /// Returns the validation result for the new value.
    pub fn set_change(&mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Validation {
        let name = name.into();
        let value = value.into();
        let validation = validate(&name, &value.to_candidate());

        match &validation {
            Validation::Valid => {
                self.errors.remove(&name);
            }
            Validation::Invalid { message } => {
                self.errors.insert(name.clone(), message.clone());
            }
        }
        trace!("Pending change {} = {} ({:?})", name, value, validation);
        self.changes.insert(name, value);
        validation
    }

    /// Remove one edit and its error. Returns the removed value.
    pub fn clear_change(&mut self, name: &str) -> Option<ParamValue> {
        self.errors.remove(name);
        self.changes.remove(name)
    }

    /// Drop every edit and every error.
    pub fn clear_all(&mut self) {
        self.changes.clear();
        self.errors.clear();
    }

    /// Check if any edit is pending.
    pub fn is_dirty(&self) -> bool {
        !self.changes.is_empty()
    }

    /// Check if any pending edit currently fails validation.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Number of pending edits.
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Pending value for `name`.
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.changes.get(name)
    }

    /// Validation message for `name`, if its pending value is invalid.
    pub fn error_for(&self, name: &str) -> Option<&str> {
        self.errors.get(name).map(String::as_str)
    }

    /// All current validation errors, sorted by parameter name.
    pub fn errors(&self) -> Vec<ValidationError> {
        let mut errors: Vec<ValidationError> = self
            .errors
            .iter()
            .map(|(param, message)| ValidationError { param: param.clone(), message: message.clone() })
            .collect();
        errors.sort_by(|a, b| a.param.cmp(&b.param));
        errors
    }

    /// Iterate over pending edits in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.changes.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Owned copy of the pending edits for submission.
    pub fn snapshot(&self) -> BTreeMap<String, ParamValue> {
        self.changes.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }

    /// Remove the edits named in `succeeded`, keeping everything else verbatim.
    ///
    /// An edit is only removed if its current value still equals the value
    /// that was submitted; an edit made after submission stays pending.
    pub fn remove_applied<'a>(
        &mut self,
        succeeded: impl IntoIterator<Item = &'a str>,
        submitted: &BTreeMap<String, ParamValue>,
    ) -> usize {
        let mut removed = 0;
        for name in succeeded {
            let unchanged = match (self.changes.get(name), submitted.get(name)) {
                (Some(current), Some(sent)) => current == sent,
                _ => false,
            };
            if unchanged {
                self.clear_change(name);
                removed += 1;
            }
        }
        removed
    }

    /// Remove every edit whose value is still what was submitted.
    pub fn remove_submitted(&mut self, submitted: &BTreeMap<String, ParamValue>) -> usize {
        self.remove_applied(submitted.keys().map(String::as_str), submitted)
    }
}
