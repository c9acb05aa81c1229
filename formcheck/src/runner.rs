//! Validation runner.
//!
//! A run happens in two steps. [`RunPlan::new`] captures everything it needs
//! from the registry while the engine holds its lock. [`RunPlan::execute`]
//! then calls into field handles and validators with no lock held, so a
//! validator that panics leaves the engine untouched.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use indexmap::IndexMap;
use log::{debug, trace};

use crate::error::{EngineError, Result};
use crate::field::{Constraint, FieldHandle, FieldName, ValueSource};
use crate::model::{self, ErrorMap, ErrorSnapshot, Order, ValidatorError, ValidatorErrors};
use crate::native::{self, MessageOverrides};
use crate::policy::Trigger;
use crate::registry::{Registration, ValidatorRegistry};

/// A resolved validation run, ready to execute.
pub struct RunPlan {
    trigger: Trigger,
    /// Fields to check natively, in registration order.
    scope: Vec<FieldName>,
    partial: bool,
    handles: IndexMap<FieldName, Arc<dyn FieldHandle>>,
    validators: Vec<Registration>,
    order: Order,
    messages: HashMap<Constraint, String>,
}

impl RunPlan {
    /// Resolve a run against the registry.
    ///
    /// `scope` restricts the run to the named fields; `None` runs the whole
    /// form. Naming an unregistered field, in the scope or as the trigger
    /// field, is an error.
    pub fn new(
        registry: &ValidatorRegistry,
        trigger: Trigger,
        scope: Option<&[FieldName]>,
        messages: &HashMap<Constraint, String>,
    ) -> Result<Self> {
        for name in scope.into_iter().flatten().chain(trigger.field()) {
            if !registry.has_field(name) {
                return Err(EngineError::UnknownField(name.clone()));
            }
        }

        let fields = registry.field_names();
        let scoped: Vec<FieldName> = match scope {
            Some(names) => fields.into_iter().filter(|f| names.contains(f)).collect(),
            None => fields,
        };

        let handles = registry
            .fields()
            .map(|(name, handle)| (name.clone(), Arc::clone(handle)))
            .collect();

        Ok(Self {
            validators: registry.resolve(scope.map(|_| scoped.as_slice())),
            partial: scope.is_some(),
            trigger,
            scope: scoped,
            handles,
            order: order_of(registry),
            messages: messages.clone(),
        })
    }

    /// The run's trigger.
    pub fn trigger(&self) -> &Trigger {
        &self.trigger
    }

    /// True when the run was restricted to a subset of fields.
    pub fn is_partial(&self) -> bool {
        self.partial
    }

    /// Registration order captured with the plan.
    pub fn order(&self) -> &Order {
        &self.order
    }

    /// Run native checks and validators, write custom validity messages back
    /// to the field handles, and classify the result.
    pub fn execute(&self, values: &dyn ValueSource) -> ErrorSnapshot {
        debug!(
            "validation run: trigger={:?} fields={:?} validators={}",
            self.trigger,
            self.scope,
            self.validators.len()
        );

        let fields: Vec<(FieldName, Arc<dyn FieldHandle>)> = self
            .scope
            .iter()
            .filter_map(|name| {
                self.handles
                    .get(name)
                    .map(|handle| (name.clone(), Arc::clone(handle)))
            })
            .collect();
        let overrides = MessageOverrides::new(&self.validators, &self.messages);
        let native = native::check(&fields, &overrides);

        let mut seen = HashSet::new();
        let mut errors = ValidatorErrors::new();
        let mut custom: IndexMap<FieldName, String> = self
            .scope
            .iter()
            .map(|name| (name.clone(), String::new()))
            .collect();

        for registration in &self.validators {
            if !seen.insert(&registration.id) {
                continue;
            }

            let current = values.values(&registration.names);
            let result = (registration.validator)(&current, &registration.names);
            for name in &registration.names {
                custom.entry(name.clone()).or_default();
            }
            let slot = self
                .representative(registration)
                .and_then(|name| custom.get_mut(name));

            match result {
                Err(error) if !error.is_empty() => {
                    trace!("validator '{}' failed: {}", registration.id, error);
                    if let Some(slot) = slot.filter(|slot| slot.is_empty()) {
                        slot.clone_from(&error);
                    }
                    errors.insert(
                        registration.id.clone(),
                        ValidatorError {
                            error,
                            names: registration.names.clone(),
                            global: registration.is_global(),
                        },
                    );
                }
                _ => trace!("validator '{}' passed", registration.id),
            }
        }

        self.write_custom_messages(&native, custom);

        model::classify(&self.order, native, errors, self.trigger.clone())
    }

    /// Field that carries a validator's custom validity message: the trigger
    /// field when the validator spans it, else its first name.
    fn representative<'a>(&'a self, registration: &'a Registration) -> Option<&'a FieldName> {
        self.trigger
            .field()
            .filter(|&name| registration.names.contains(name))
            .or_else(|| registration.names.first())
    }

    fn write_custom_messages(&self, native: &ErrorMap, custom: IndexMap<FieldName, String>) {
        for (name, message) in custom {
            let Some(handle) = self.handles.get(&name) else {
                continue;
            };
            let native_error = match native.get(&name) {
                Some(native_msg) => !native_msg.is_empty(),
                None => handle.has_native_error(),
            };
            if native_error {
                continue;
            }
            handle.set_custom_message(&message);
        }
    }
}

/// Current registration order of the registry.
pub fn order_of(registry: &ValidatorRegistry) -> Order {
    Order {
        fields: registry.field_order(),
        validators: registry.validator_ids(),
    }
}
