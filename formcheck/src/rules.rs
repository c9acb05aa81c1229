//! Built-in validator rules.
//!
//! # Example
//!
//! ```ignore
//! use formcheck::rules::{self, FieldRules};
//!
//! engine.register(
//!     FieldRules::new("username")
//!         .required("Username is required")
//!         .min_length(3, "Username must be at least 3 characters")
//!         .into_registration("username-rules"),
//! );
//! engine.register(
//!     FieldRules::new("email")
//!         .email("Please enter a valid email")
//!         .into_registration("email-rules"),
//! );
//! engine.register(rules::matching(
//!     "password-confirm",
//!     ["password", "confirm"],
//!     "Passwords don't match",
//! ));
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{EngineError, Result};
use crate::field::{Constraint, FieldName, FieldValue, FormValues};
use crate::registry::{Registration, ValidatorId};

/// Single-field rule closure.
type Rule = Box<dyn Fn(&FieldValue) -> std::result::Result<(), String> + Send + Sync>;

/// Builder for a single-field validator made of ordered rules.
///
/// The first failing rule's message is the validator's error.
pub struct FieldRules {
    name: FieldName,
    rules: Vec<Rule>,
    messages: HashMap<Constraint, String>,
}

impl FieldRules {
    /// Start a rule set for `name`.
    pub fn new(name: impl Into<FieldName>) -> Self {
        Self {
            name: name.into(),
            rules: Vec::new(),
            messages: HashMap::new(),
        }
    }

    /// Add a custom rule.
    pub fn rule<F>(mut self, f: F, msg: impl Into<String>) -> Self
    where
        F: Fn(&FieldValue) -> bool + Send + Sync + 'static,
    {
        let msg = msg.into();
        self.rules
            .push(Box::new(move |v| if f(v) { Ok(()) } else { Err(msg.clone()) }));
        self
    }

    /// Require the field to be non-empty.
    pub fn required(self, msg: impl Into<String>) -> Self {
        self.rule(
            |v| match v {
                FieldValue::Text(text) => !text.trim().is_empty(),
                FieldValue::Files(files) => !files.is_empty(),
            },
            msg,
        )
    }

    /// Require minimum length (in characters).
    pub fn min_length(self, min: usize, msg: impl Into<String>) -> Self {
        self.rule(move |v| v.as_text().chars().count() >= min, msg)
    }

    /// Require maximum length (in characters).
    pub fn max_length(self, max: usize, msg: impl Into<String>) -> Self {
        self.rule(move |v| v.as_text().chars().count() <= max, msg)
    }

    /// Require the value to match a regex pattern. Empty values pass; use
    /// `required()` for non-empty.
    pub fn pattern(self, pattern: &str, msg: impl Into<String>) -> Result<Self> {
        let re = regex::Regex::new(pattern)
            .map_err(|e| EngineError::from((pattern.to_string(), e)))?;
        Ok(self.rule(move |v| v.is_empty() || re.is_match(v.as_text()), msg))
    }

    /// Require a valid email address. Empty values pass; use `required()`
    /// for non-empty.
    pub fn email(self, msg: impl Into<String>) -> Self {
        self.rule(
            |v| v.is_empty() || email_address::EmailAddress::is_valid(v.as_text()),
            msg,
        )
    }

    /// Require the value to equal `other`.
    pub fn equals(self, other: impl Into<String>, msg: impl Into<String>) -> Self {
        let other = other.into();
        self.rule(move |v| v.as_text() == other, msg)
    }

    /// Require the value to contain a substring.
    pub fn contains(self, substr: impl Into<String>, msg: impl Into<String>) -> Self {
        let substr = substr.into();
        self.rule(move |v| v.as_text().contains(&substr), msg)
    }

    /// Override the native message for a failing constraint on this field.
    pub fn message(mut self, constraint: Constraint, message: impl Into<String>) -> Self {
        self.messages.insert(constraint, message.into());
        self
    }

    /// Finish the rule set as a registration with the given id.
    pub fn into_registration(self, id: impl Into<ValidatorId>) -> Registration {
        let rules = Arc::new(self.rules);
        let name = self.name.clone();
        let mut registration = Registration::new(id, [self.name], move |values, _| {
            let value = values.get(&name).cloned().unwrap_or_default();
            rules.iter().try_for_each(|rule| rule(&value))
        });
        registration.messages = self.messages;
        registration
    }
}

/// Group validator requiring every named field to hold the same value.
pub fn matching<I, N>(id: impl Into<ValidatorId>, names: I, msg: impl Into<String>) -> Registration
where
    I: IntoIterator<Item = N>,
    N: Into<FieldName>,
{
    let msg = msg.into();
    Registration::new(id, names, move |values: &FormValues, names: &[FieldName]| {
        let first = names.first().map(|n| values.get(n));
        if names.iter().all(|n| Some(values.get(n)) == first) {
            Ok(())
        } else {
            Err(msg.clone())
        }
    })
}
