//! Form validation engine.
//!
//! Reconciles three sources of truth about a form's validity: native
//! per-field constraint validation, custom single-field and group
//! validators, and form-level validators. A [`FormEngine`] decides for each
//! trigger which validators run, merges their results into one
//! [`ErrorSnapshot`], and commits that snapshot to subscribers according to
//! the configured [`Mode`] and [`RevalidateMode`].

pub mod bus;
pub mod config;
pub mod engine;
pub mod error;
pub mod field;
pub mod model;
pub mod native;
pub mod policy;
pub mod registry;
pub mod rules;
pub mod runner;
pub mod scheduler;

pub use config::{FormConfig, Mode, RevalidateMode};
pub use engine::{FormEngine, FormState};
pub use error::{EngineError, Result};
pub use field::{
    Constraint, FieldHandle, FieldName, FieldValue, FormValues, ValidityState, ValueSource,
};
pub use model::{ErrorMap, ErrorSnapshot, MainError, ValidatorError, ValidatorErrors};
pub use policy::{FormPhase, Trigger};
pub use registry::{Registration, ValidatorFn, ValidatorId};

pub mod prelude {
    pub use crate::bus::Unsubscribe;
    pub use crate::config::{FormConfig, Mode, RevalidateMode};
    pub use crate::engine::{FormEngine, FormState};
    pub use crate::error::EngineError;
    pub use crate::field::{Constraint, FieldHandle, FieldValue, FormValues, ValidityState};
    pub use crate::model::ErrorSnapshot;
    pub use crate::policy::{FormPhase, Trigger};
    pub use crate::registry::{Registration, ValidatorId};
    pub use crate::rules::FieldRules;
}
