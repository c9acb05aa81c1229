//! Field handles and field values.
//!
//! The engine never touches a concrete DOM type. A UI binding hands it a
//! [`FieldHandle`] per input element, exposing just enough of the native
//! constraint validation API to read validity and write a custom message.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Name of one logical value slot in a form.
pub type FieldName = String;

/// Current values of a set of fields, in the order they were requested.
pub type FormValues = IndexMap<FieldName, FieldValue>;

/// Value held by a field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Text entered into the field.
    Text(String),
    /// Names of the files selected in a file input.
    Files(Vec<String>),
}

impl FieldValue {
    /// Text content, or an empty string for file inputs.
    pub fn as_text(&self) -> &str {
        match self {
            Self::Text(text) => text,
            Self::Files(_) => "",
        }
    }

    /// True when no text was entered or no file was selected.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(text) => text.is_empty(),
            Self::Files(files) => files.is_empty(),
        }
    }
}

impl Default for FieldValue {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// A native constraint that can fail.
///
/// Serialized with the names the constraint validation API uses for the
/// corresponding `ValidityState` flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Constraint {
    ValueMissing,
    TypeMismatch,
    PatternMismatch,
    TooLong,
    TooShort,
    RangeUnderflow,
    RangeOverflow,
    StepMismatch,
    BadInput,
}

/// Native validity flags of one field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidityState {
    /// The field is required and empty.
    pub value_missing: bool,
    /// The value doesn't match the input type.
    pub type_mismatch: bool,
    /// The value doesn't match the pattern attribute.
    pub pattern_mismatch: bool,
    /// The value is longer than `maxlength`.
    pub too_long: bool,
    /// The value is shorter than `minlength`.
    pub too_short: bool,
    /// The value is below `min`.
    pub range_underflow: bool,
    /// The value is above `max`.
    pub range_overflow: bool,
    /// The value doesn't fit `step`.
    pub step_mismatch: bool,
    /// The user agent could not convert the input.
    pub bad_input: bool,
    /// A custom validity message is set.
    pub custom_error: bool,
}

impl ValidityState {
    /// True if any constraint other than the custom one fails.
    pub fn has_native_error(&self) -> bool {
        self.failing().is_some()
    }

    /// The first failing native constraint, ignoring `custom_error`.
    pub fn failing(&self) -> Option<Constraint> {
        [
            (self.value_missing, Constraint::ValueMissing),
            (self.type_mismatch, Constraint::TypeMismatch),
            (self.pattern_mismatch, Constraint::PatternMismatch),
            (self.too_long, Constraint::TooLong),
            (self.too_short, Constraint::TooShort),
            (self.range_underflow, Constraint::RangeUnderflow),
            (self.range_overflow, Constraint::RangeOverflow),
            (self.step_mismatch, Constraint::StepMismatch),
            (self.bad_input, Constraint::BadInput),
        ]
        .into_iter()
        .find_map(|(failed, constraint)| failed.then_some(constraint))
    }
}

/// Capabilities the engine needs from one input element.
pub trait FieldHandle: Send + Sync {
    /// Current native validity flags.
    fn validity(&self) -> ValidityState;

    /// Check if a native (non-custom) constraint fails.
    fn has_native_error(&self) -> bool {
        self.validity().has_native_error()
    }

    /// The message the user agent would show for the current native error.
    fn native_message(&self) -> String;

    /// Set the custom validity message. An empty string clears it.
    fn set_custom_message(&self, message: &str);

    /// Show the native validity report for this field.
    fn force_report(&self);
}

/// Host capability for reading live field values.
pub trait ValueSource: Send + Sync {
    /// Current values for the named fields.
    fn values(&self, names: &[FieldName]) -> FormValues;
}

impl<F> ValueSource for F
where
    F: Fn(&[FieldName]) -> FormValues + Send + Sync,
{
    fn values(&self, names: &[FieldName]) -> FormValues {
        self(names)
    }
}
