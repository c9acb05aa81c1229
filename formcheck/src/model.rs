//! Error model: snapshot shapes and the pure functions that build them.

use indexmap::IndexMap;
use serde::Serialize;

use crate::field::FieldName;
use crate::policy::Trigger;
use crate::registry::ValidatorId;

/// Field name to error message. An empty message means checked and clean.
pub type ErrorMap = IndexMap<FieldName, String>;

/// Validator id to the error it reported.
pub type ValidatorErrors = IndexMap<ValidatorId, ValidatorError>;

/// Error reported by one validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidatorError {
    /// The error message. Never empty.
    pub error: String,
    /// Fields the validator spans.
    pub names: Vec<FieldName>,
    /// True when the error is not owned by a single field.
    pub global: bool,
}

/// The error considered current for UX purposes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MainError {
    /// Field the message is attached to, if any.
    pub field: Option<FieldName>,
    /// The error message.
    pub message: String,
}

/// Registration order used to break ties deterministically.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Order {
    /// Field names in registration order.
    pub fields: Vec<FieldName>,
    /// Validator ids in registration order.
    pub validators: Vec<ValidatorId>,
}

/// Externally visible error state of a form.
///
/// Snapshots are never mutated after construction; every commit replaces
/// the previous one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ErrorSnapshot {
    /// First error per field, native errors taking precedence.
    pub all: ErrorMap,
    /// Native errors per checked field.
    pub native: ErrorMap,
    /// Errors per validator.
    pub validator: ValidatorErrors,
    /// Errors of group and form-level validators.
    pub global: IndexMap<ValidatorId, String>,
    /// The current error, if any.
    pub main: Option<MainError>,
    /// Trigger of the run that produced this snapshot.
    pub trigger: Trigger,
}

impl ErrorSnapshot {
    /// Check if no field and no global validator has an error.
    pub fn is_empty(&self) -> bool {
        self.all.values().all(String::is_empty) && self.global.values().all(String::is_empty)
    }

    /// Error message for a field, if it has one.
    pub fn error(&self, name: &str) -> Option<&str> {
        self.all
            .get(name)
            .map(String::as_str)
            .filter(|msg| !msg.is_empty())
    }

    /// Name of the first field with an error (for focusing).
    pub fn first_invalid(&self) -> Option<&str> {
        self.all
            .iter()
            .find(|(_, msg)| !msg.is_empty())
            .map(|(name, _)| name.as_str())
    }
}

/// Build a snapshot from native and validator errors.
///
/// `all` lists every field that was natively checked or is covered by a
/// validator error, in `order`. Its message is the native error when there is
/// one, else the first validator error covering the field.
pub fn classify(
    order: &Order,
    native: ErrorMap,
    validator: ValidatorErrors,
    trigger: Trigger,
) -> ErrorSnapshot {
    let mut all = ErrorMap::new();
    for name in &order.fields {
        let native_msg = native.get(name);
        let validator_msg = validator
            .values()
            .find(|err| err.names.contains(name))
            .map(|err| &err.error);

        let message = match (native_msg, validator_msg) {
            (Some(msg), _) if !msg.is_empty() => msg.clone(),
            (_, Some(msg)) => msg.clone(),
            (Some(_), None) => String::new(),
            (None, None) => continue,
        };
        all.insert(name.clone(), message);
    }

    let global: IndexMap<ValidatorId, String> = validator
        .iter()
        .filter(|(_, err)| err.global)
        .map(|(id, err)| (id.clone(), err.error.clone()))
        .collect();

    let main = pick_main(&all, &validator, &trigger);

    ErrorSnapshot {
        all,
        native,
        validator,
        global,
        main,
        trigger,
    }
}

fn pick_main(all: &ErrorMap, validator: &ValidatorErrors, trigger: &Trigger) -> Option<MainError> {
    let field_error = |name: &FieldName| {
        all.get(name)
            .filter(|msg| !msg.is_empty())
            .map(|msg| MainError {
                field: Some(name.clone()),
                message: msg.clone(),
            })
    };

    if let Some(main) = trigger.field().and_then(field_error) {
        return Some(main);
    }

    if let Some(main) = all.keys().find_map(field_error) {
        return Some(main);
    }

    if trigger.field().is_some() {
        return None;
    }

    validator
        .values()
        .find(|err| err.global)
        .map(|err| MainError {
            field: err.names.first().cloned(),
            message: err.error.clone(),
        })
}

/// Fold a partial run into a previous snapshot.
///
/// Fields checked by `next` take its values; every other field keeps its
/// value from `prev`. A previous validator error is dropped when its
/// validator spans a field `next` checked, since that validator ran again.
pub fn merge(prev: &ErrorSnapshot, next: &ErrorSnapshot, order: &Order) -> ErrorSnapshot {
    let touched: Vec<FieldName> = next.native.keys().cloned().collect();

    let mut native = prev.native.clone();
    for (name, msg) in &next.native {
        native.insert(name.clone(), msg.clone());
    }

    let mut validator: ValidatorErrors = prev
        .validator
        .iter()
        .filter(|(id, err)| {
            !next.validator.contains_key(*id) && !err.names.iter().any(|n| touched.contains(n))
        })
        .map(|(id, err)| (id.clone(), err.clone()))
        .collect();
    for (id, err) in &next.validator {
        validator.insert(id.clone(), err.clone());
    }
    sort_validators(&mut validator, order);

    classify(order, native, validator, next.trigger.clone())
}

/// Drop fields and validators that are no longer registered.
pub fn restrict(snapshot: &ErrorSnapshot, order: &Order) -> ErrorSnapshot {
    let native: ErrorMap = snapshot
        .native
        .iter()
        .filter(|(name, _)| order.fields.contains(*name))
        .map(|(name, msg)| (name.clone(), msg.clone()))
        .collect();
    let validator: ValidatorErrors = snapshot
        .validator
        .iter()
        .filter(|(id, _)| order.validators.contains(*id))
        .map(|(id, err)| (id.clone(), err.clone()))
        .collect();

    classify(order, native, validator, snapshot.trigger.clone())
}

fn sort_validators(validator: &mut ValidatorErrors, order: &Order) {
    let rank = |id: &ValidatorId| {
        order
            .validators
            .iter()
            .position(|v| v == id)
            .unwrap_or(usize::MAX)
    };
    validator.sort_by(|a, _, b, _| rank(a).cmp(&rank(b)));
}
