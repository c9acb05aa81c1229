//! Native constraint adapter.
//!
//! Relays native validity flags and messages from field handles. It never
//! inspects values itself.

use std::collections::HashMap;
use std::sync::Arc;

use log::trace;

use crate::field::{Constraint, FieldHandle, FieldName};
use crate::model::ErrorMap;
use crate::registry::Registration;

/// Message overrides for native errors, resolved per field.
pub struct MessageOverrides<'a> {
    registrations: &'a [Registration],
    defaults: &'a HashMap<Constraint, String>,
}

impl<'a> MessageOverrides<'a> {
    /// Create overrides from registrations (checked first, in order) and
    /// form-level defaults.
    pub fn new(
        registrations: &'a [Registration],
        defaults: &'a HashMap<Constraint, String>,
    ) -> Self {
        Self {
            registrations,
            defaults,
        }
    }

    /// Override message for `constraint` failing on `name`, if one is configured.
    pub fn get(&self, name: &str, constraint: Constraint) -> Option<&'a str> {
        self.registrations
            .iter()
            .filter(|r| r.names.iter().any(|n| n == name))
            .find_map(|r| r.messages.get(&constraint))
            .or_else(|| self.defaults.get(&constraint))
            .map(String::as_str)
    }
}

/// Collect native errors for `fields`.
///
/// Every field gets an entry; an empty string means checked and clean. A field
/// with a native error has its stale custom message cleared, or replaced by
/// the override so that a native report shows the same text.
pub fn check(
    fields: &[(FieldName, Arc<dyn FieldHandle>)],
    overrides: &MessageOverrides<'_>,
) -> ErrorMap {
    let mut errors = ErrorMap::new();
    for (name, handle) in fields {
        if !handle.has_native_error() {
            errors.insert(name.clone(), String::new());
            continue;
        }

        let constraint = handle.validity().failing();
        let message = match constraint.and_then(|c| overrides.get(name, c)) {
            Some(custom) => {
                handle.set_custom_message(custom);
                custom.to_string()
            }
            None => {
                handle.set_custom_message("");
                handle.native_message()
            }
        };
        trace!("native error on '{}' ({:?}): {}", name, constraint, message);
        errors.insert(name.clone(), message);
    }
    errors
}
