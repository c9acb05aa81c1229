//! Revalidation policy: when a run's result becomes visible.
//!
//! Every run refreshes native custom-validity bookkeeping and the form's
//! validity flag. Only some runs are *committed*, replacing the snapshot
//! that subscribers see. This module decides which.

use serde::Serialize;

use crate::config::{FormConfig, Mode, RevalidateMode};
use crate::field::FieldName;

/// What caused a validation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "field", rename_all = "lowercase")]
pub enum Trigger {
    /// Initial mount or registry change. Never visible.
    #[default]
    None,
    /// Explicit programmatic check.
    Check,
    /// Form submission.
    Submit,
    /// A field lost focus.
    Blur(FieldName),
    /// A field's value changed.
    Change(FieldName),
}

impl Trigger {
    /// The field that caused this run, for field-level triggers.
    pub fn field(&self) -> Option<&FieldName> {
        match self {
            Self::Blur(name) | Self::Change(name) => Some(name),
            Self::None | Self::Check | Self::Submit => None,
        }
    }
}

/// Lifecycle phase of a form.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FormPhase {
    /// Never validated by user interaction or submitted.
    #[default]
    Pristine,
    /// At least one blur or change run happened.
    Touched,
    /// At least one submit happened.
    Submitted,
}

impl FormPhase {
    /// Phase after a run with `trigger`.
    pub fn advance(self, trigger: &Trigger) -> Self {
        match (self, trigger) {
            (_, Trigger::Submit) => Self::Submitted,
            (Self::Pristine, Trigger::Blur(_) | Trigger::Change(_)) => Self::Touched,
            (phase, _) => phase,
        }
    }
}

/// Visibility rules derived from a [`FormConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Policy {
    mode: Mode,
    revalidate: RevalidateMode,
}

impl Policy {
    /// Create a policy from the form config.
    pub fn new(config: &FormConfig) -> Self {
        Self {
            mode: config.mode,
            revalidate: config.revalidate_mode,
        }
    }

    /// Decide whether a run with `trigger` is committed.
    ///
    /// `phase` is the phase before the run. `error_shown` is true once any
    /// committed snapshot has contained an error since the last reset.
    pub fn should_commit(&self, trigger: &Trigger, phase: FormPhase, error_shown: bool) -> bool {
        let submitted = phase == FormPhase::Submitted;
        match trigger {
            Trigger::Submit | Trigger::Check => true,
            Trigger::None => false,
            Trigger::Blur(_) => {
                matches!(self.mode, Mode::Blur | Mode::All)
                    || (submitted && self.revalidate == RevalidateMode::Blur)
            }
            Trigger::Change(_) => {
                matches!(self.mode, Mode::Change | Mode::All)
                    || (submitted && self.revalidate == RevalidateMode::Change)
                    || (self.mode == Mode::Fix && error_shown)
            }
        }
    }
}
