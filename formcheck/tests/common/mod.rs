//! In-memory field handles for engine tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use formcheck::{
    FieldHandle, FieldName, FieldValue, FormConfig, FormEngine, FormValues, Registration,
    ValidityState,
};
use indexmap::IndexMap;
use log::LevelFilter;
use simplelog::{Config, TestLogger};

pub const MISSING: &str = "Please fill out this field.";
pub const TOO_SHORT: &str = "Please lengthen this text.";

pub fn init_logging() {
    let _ = TestLogger::init(LevelFilter::Trace, Config::default());
}

#[derive(Default)]
struct FieldState {
    value: String,
    required: bool,
    min_length: Option<usize>,
    custom: String,
    reports: usize,
}

/// Field behaving like a text input with `required` and `minlength`.
#[derive(Default)]
pub struct FakeField {
    state: Mutex<FieldState>,
}

impl FakeField {
    pub fn required() -> Arc<Self> {
        let field = Self::default();
        field.state.lock().unwrap().required = true;
        Arc::new(field)
    }

    pub fn optional() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_min_length(self: Arc<Self>, min: usize) -> Arc<Self> {
        self.state.lock().unwrap().min_length = Some(min);
        self
    }

    pub fn set(&self, value: &str) {
        self.state.lock().unwrap().value = value.to_string();
    }

    pub fn value(&self) -> String {
        self.state.lock().unwrap().value.clone()
    }

    pub fn custom_message(&self) -> String {
        self.state.lock().unwrap().custom.clone()
    }

    pub fn reports(&self) -> usize {
        self.state.lock().unwrap().reports
    }
}

impl FieldHandle for FakeField {
    fn validity(&self) -> ValidityState {
        let state = self.state.lock().unwrap();
        let len = state.value.chars().count();
        ValidityState {
            value_missing: state.required && state.value.is_empty(),
            too_short: len > 0 && state.min_length.is_some_and(|min| len < min),
            custom_error: !state.custom.is_empty(),
            ..Default::default()
        }
    }

    fn native_message(&self) -> String {
        let validity = self.validity();
        if validity.value_missing {
            MISSING.to_string()
        } else if validity.too_short {
            TOO_SHORT.to_string()
        } else {
            self.custom_message()
        }
    }

    fn set_custom_message(&self, message: &str) {
        self.state.lock().unwrap().custom = message.to_string();
    }

    fn force_report(&self) {
        self.state.lock().unwrap().reports += 1;
    }
}

/// Host form owning the fake fields and serving their values.
#[derive(Clone, Default)]
pub struct FakeForm {
    fields: Arc<Mutex<IndexMap<FieldName, Arc<FakeField>>>>,
}

impl FakeForm {
    pub fn engine(&self, config: FormConfig) -> FormEngine {
        let form = self.clone();
        FormEngine::new(config, move |names: &[FieldName]| form.values(names))
    }

    pub fn add(&self, engine: &FormEngine, name: &str, field: Arc<FakeField>) -> Arc<FakeField> {
        self.fields
            .lock()
            .unwrap()
            .insert(name.to_string(), Arc::clone(&field));
        engine.register_field(name, field.clone());
        field
    }

    pub fn values(&self, names: &[FieldName]) -> FormValues {
        let fields = self.fields.lock().unwrap();
        names
            .iter()
            .filter_map(|name| {
                fields
                    .get(name)
                    .map(|f| (name.clone(), FieldValue::Text(f.value())))
            })
            .collect()
    }
}

/// Registration that counts its invocations.
pub fn counting<F>(id: &str, names: &[&str], calls: &Arc<AtomicUsize>, f: F) -> Registration
where
    F: Fn(&FormValues) -> Result<(), String> + Send + Sync + 'static,
{
    let calls = Arc::clone(calls);
    Registration::new(id, names.iter().copied(), move |values, _| {
        calls.fetch_add(1, Ordering::SeqCst);
        f(values)
    })
}

pub fn text(values: &FormValues, name: &str) -> String {
    values
        .get(name)
        .map(|v| v.as_text().to_string())
        .unwrap_or_default()
}

pub fn names(names: &[&str]) -> Vec<FieldName> {
    names.iter().map(|n| n.to_string()).collect()
}
