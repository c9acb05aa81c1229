//! Registry of fields and validators for one form.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::field::{Constraint, FieldHandle, FieldName, FormValues};

/// Validator closure: receives the values of its names and the names themselves.
///
/// `Ok(())` and `Err` with an empty message both mean the values are valid.
pub type ValidatorFn = Arc<dyn Fn(&FormValues, &[FieldName]) -> Result<(), String> + Send + Sync>;

/// Identity of a validator registration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidatorId(String);

impl ValidatorId {
    /// Create an id from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a unique id for bindings that don't name their validator.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Get the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ValidatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ValidatorId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ValidatorId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A validator bound to the field names it checks.
#[derive(Clone)]
pub struct Registration {
    /// Registration identity.
    pub id: ValidatorId,
    /// Fields this validator reads. More than one makes it a group validator;
    /// none makes it a form-level validator.
    pub names: Vec<FieldName>,
    /// The validator closure.
    pub validator: ValidatorFn,
    /// Native error message overrides for the fields in `names`.
    pub messages: HashMap<Constraint, String>,
}

impl Registration {
    /// Create a registration.
    pub fn new<I, N, F>(id: impl Into<ValidatorId>, names: I, validator: F) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<FieldName>,
        F: Fn(&FormValues, &[FieldName]) -> Result<(), String> + Send + Sync + 'static,
    {
        Self {
            id: id.into(),
            names: names.into_iter().map(Into::into).collect(),
            validator: Arc::new(validator),
            messages: HashMap::new(),
        }
    }

    /// Override the native message for a failing constraint on this
    /// registration's fields.
    pub fn message(mut self, constraint: Constraint, message: impl Into<String>) -> Self {
        self.messages.insert(constraint, message.into());
        self
    }

    /// Check if this registration spans more than one field, or none.
    pub fn is_global(&self) -> bool {
        self.names.len() != 1
    }

    /// Check if any of this registration's names is in `names`.
    pub fn intersects(&self, names: &[FieldName]) -> bool {
        self.names.iter().any(|n| names.contains(n))
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("id", &self.id)
            .field("names", &self.names)
            .field("messages", &self.messages)
            .finish_non_exhaustive()
    }
}

/// Outcome of a registry mutation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryChange {
    /// The registry contents changed.
    pub changed: bool,
    /// A field name appeared for the first time or disappeared.
    pub names_changed: bool,
}

impl RegistryChange {
    const NONE: Self = Self {
        changed: false,
        names_changed: false,
    };
}

/// Registry tracking field handles and validators of one form.
///
/// Both are kept in registration order; validator invocation order and
/// tie-breaking between errors follow it.
#[derive(Default)]
pub struct ValidatorRegistry {
    /// Field handles keyed by name.
    fields: IndexMap<FieldName, Arc<dyn FieldHandle>>,

    /// Validator registrations keyed by id.
    validators: IndexMap<ValidatorId, Registration>,
}

impl ValidatorRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a field handle, replacing any handle with the same name.
    pub fn register_field(
        &mut self,
        name: impl Into<FieldName>,
        handle: Arc<dyn FieldHandle>,
    ) -> RegistryChange {
        let before = self.referenced_names();
        self.fields.insert(name.into(), handle);
        self.change_since(&before)
    }

    /// Remove a field handle. Unknown names are ignored.
    pub fn unregister_field(&mut self, name: &str) -> RegistryChange {
        let before = self.referenced_names();
        if self.fields.shift_remove(name).is_none() {
            return RegistryChange::NONE;
        }
        self.change_since(&before)
    }

    /// Insert or overwrite a registration by id.
    ///
    /// An overwritten registration keeps its position in the order.
    pub fn register(&mut self, registration: Registration) -> RegistryChange {
        let before = self.referenced_names();
        self.validators
            .insert(registration.id.clone(), registration);
        self.change_since(&before)
    }

    /// Remove a registration. Unknown ids are ignored.
    pub fn unregister(&mut self, id: &ValidatorId) -> RegistryChange {
        let before = self.referenced_names();
        if self.validators.shift_remove(id).is_none() {
            return RegistryChange::NONE;
        }
        self.change_since(&before)
    }

    /// Registrations whose names intersect `targets`, or all of them when
    /// `targets` is `None`. Registration order is preserved.
    pub fn resolve(&self, targets: Option<&[FieldName]>) -> Vec<Registration> {
        self.validators
            .values()
            .filter(|r| targets.is_none_or(|t| r.intersects(t)))
            .cloned()
            .collect()
    }

    /// Get a field handle by name.
    pub fn field(&self, name: &str) -> Option<&Arc<dyn FieldHandle>> {
        self.fields.get(name)
    }

    /// Check if a field handle is registered under `name`.
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Check if a validator is registered under `id`.
    pub fn has_validator(&self, id: &ValidatorId) -> bool {
        self.validators.contains_key(id)
    }

    /// Registered field names in registration order.
    pub fn field_names(&self) -> Vec<FieldName> {
        self.fields.keys().cloned().collect()
    }

    /// Registered field handles in registration order.
    pub fn fields(&self) -> impl Iterator<Item = (&FieldName, &Arc<dyn FieldHandle>)> {
        self.fields.iter()
    }

    /// Every field name known to the registry: registered fields first, then
    /// names only referenced by validators, each in registration order.
    pub fn field_order(&self) -> Vec<FieldName> {
        let mut order: IndexMap<&FieldName, ()> =
            self.fields.keys().map(|name| (name, ())).collect();
        for registration in self.validators.values() {
            for name in &registration.names {
                order.entry(name).or_insert(());
            }
        }
        order.into_keys().cloned().collect()
    }

    /// Validator ids in registration order.
    pub fn validator_ids(&self) -> Vec<ValidatorId> {
        self.validators.keys().cloned().collect()
    }

    /// Number of validator registrations.
    pub fn len(&self) -> usize {
        self.validators.len()
    }

    /// Check if no validators are registered.
    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    fn referenced_names(&self) -> HashSet<FieldName> {
        self.fields
            .keys()
            .chain(self.validators.values().flat_map(|r| r.names.iter()))
            .cloned()
            .collect()
    }

    fn change_since(&self, before: &HashSet<FieldName>) -> RegistryChange {
        RegistryChange {
            changed: true,
            names_changed: self.referenced_names() != *before,
        }
    }
}
