//! Form configuration types.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::field::Constraint;

/// Per-form configuration.
///
/// Defines when validation results become visible and how native error
/// messages are worded. Deserializes from JSON such as
/// `{"mode": "blur", "revalidate_mode": "change"}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormConfig {
    /// Which triggers commit visible results before the first submit.
    pub mode: Mode,

    /// Which triggers commit visible results after the first submit.
    pub revalidate_mode: RevalidateMode,

    /// Call `force_report()` on the field carrying the main error when a
    /// submit or explicit check commits.
    pub report_native: bool,

    /// Replacement messages for native errors, keyed by failing constraint.
    /// Messages given on a registration take precedence over these.
    pub messages: HashMap<Constraint, String>,
}

impl FormConfig {
    /// Create a config with the given mode.
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }

    /// Set the pre-submit mode.
    pub fn mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the post-submit mode.
    pub fn revalidate_mode(mut self, mode: RevalidateMode) -> Self {
        self.revalidate_mode = mode;
        self
    }

    /// Enable native validity reports on submit and check.
    pub fn report_native(mut self) -> Self {
        self.report_native = true;
        self
    }

    /// Override the message shown for a failing native constraint.
    pub fn message(mut self, constraint: Constraint, message: impl Into<String>) -> Self {
        self.messages.insert(constraint, message.into());
        self
    }
}

/// Revalidation mode before the form has been submitted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Only submit and explicit checks show errors.
    #[default]
    None,
    /// Same visibility as `None`; explicit checks are the intended trigger.
    Check,
    /// Show errors as values change.
    Change,
    /// Show errors when a field loses focus.
    Blur,
    /// Stay silent until an error has been shown, then update live on change.
    Fix,
    /// Show errors on both blur and change.
    All,
}

/// Revalidation mode after the form has been submitted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RevalidateMode {
    /// Only the next submit shows new results.
    Submit,
    /// Show new results when a field loses focus.
    Blur,
    /// Show new results as values change.
    #[default]
    Change,
}
