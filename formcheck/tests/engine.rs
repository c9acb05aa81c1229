//! Tests for the form engine.

mod common;

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, Mutex};
use std::thread;

use common::{FakeField, FakeForm, MISSING, TOO_SHORT, counting, init_logging, names, text};
use formcheck::prelude::*;
use formcheck::rules;

fn sum_is_42(values: &FormValues) -> Result<(), String> {
    let a: i64 = text(values, "a").parse().unwrap_or(0);
    let b: i64 = text(values, "b").parse().unwrap_or(0);
    if a + b == 42 {
        Ok(())
    } else {
        Err("sum must equal 42".to_string())
    }
}

// ============================================================================
// Scenario
// ============================================================================

#[test]
fn test_required_fields_with_group_validator() {
    init_logging();
    let form = FakeForm::default();
    let engine = form.engine(FormConfig::default());
    let calls = Arc::new(AtomicUsize::new(0));

    let a = form.add(&engine, "a", FakeField::required());
    let b = form.add(&engine, "b", FakeField::required());
    engine.register(counting("sum", &["a", "b"], &calls, sum_is_42));
    engine.flush().unwrap();

    let snapshot = engine.submit().unwrap();
    assert_eq!(snapshot.all["a"], MISSING);
    assert_eq!(snapshot.all["b"], MISSING);
    assert_eq!(snapshot.main.as_ref().unwrap().field.as_deref(), Some("a"));
    assert_eq!(snapshot.main.as_ref().unwrap().message, MISSING);
    assert!(snapshot.validator.contains_key(&ValidatorId::from("sum")));
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    a.set("40");
    b.set("1");
    let snapshot = engine.submit().unwrap();
    assert_eq!(snapshot.all["a"], "sum must equal 42");
    assert_eq!(snapshot.main.unwrap().message, "sum must equal 42");
    assert!(!engine.validity());

    b.set("2");
    let snapshot = engine.submit().unwrap();
    assert!(snapshot.is_empty());
    assert_eq!(snapshot.main, None);
    assert!(engine.validity());
}

// ============================================================================
// Native precedence
// ============================================================================

#[test]
fn test_native_error_wins_over_validator() {
    let form = FakeForm::default();
    let engine = form.engine(FormConfig::default());

    let name = form.add(&engine, "name", FakeField::optional().with_min_length(5));
    engine.register(
        FieldRules::new("name")
            .contains("@", "Must contain @")
            .into_registration("name-rules"),
    );

    name.set("ab");
    let snapshot = engine.submit().unwrap();
    assert_eq!(snapshot.all["name"], TOO_SHORT);
    assert_eq!(snapshot.native["name"], TOO_SHORT);
    assert_eq!(
        snapshot.validator[&ValidatorId::from("name-rules")].error,
        "Must contain @"
    );
    assert_eq!(name.custom_message(), "");

    name.set("abcdef");
    let snapshot = engine.submit().unwrap();
    assert_eq!(snapshot.all["name"], "Must contain @");
    assert_eq!(name.custom_message(), "Must contain @");

    name.set("ab@cdef");
    engine.submit().unwrap();
    assert_eq!(name.custom_message(), "");
}

#[test]
fn test_native_message_overrides() {
    let form = FakeForm::default();
    let config = FormConfig::default().message(Constraint::ValueMissing, "Required");
    let engine = form.engine(config);

    let a = form.add(&engine, "a", FakeField::required());
    form.add(&engine, "b", FakeField::required());
    engine.register(
        FieldRules::new("a")
            .message(Constraint::ValueMissing, "A is required")
            .into_registration("a-rules"),
    );

    let snapshot = engine.submit().unwrap();
    assert_eq!(snapshot.all["a"], "A is required");
    assert_eq!(snapshot.all["b"], "Required");
    assert_eq!(a.custom_message(), "A is required");
}

// ============================================================================
// Invocation
// ============================================================================

#[test]
fn test_group_validator_runs_once_per_run() {
    let form = FakeForm::default();
    let engine = form.engine(FormConfig::default());
    let calls = Arc::new(AtomicUsize::new(0));

    form.add(&engine, "a", FakeField::optional());
    form.add(&engine, "b", FakeField::optional());
    engine.register(counting("group", &["a", "b"], &calls, |_| Ok(())));
    engine.flush().unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    engine.check(Some(names(&["a", "b"]).as_slice())).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    engine.check(None).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[test]
fn test_validators_run_in_registration_order() {
    let form = FakeForm::default();
    let engine = form.engine(FormConfig::default());
    let seen = Arc::new(Mutex::new(Vec::new()));

    form.add(&engine, "a", FakeField::optional());
    for id in ["second", "first", "third"] {
        let seen = Arc::clone(&seen);
        engine.register(Registration::new(id, ["a"], move |_, _| {
            seen.lock().unwrap().push(id);
            Err(format!("{} failed", id))
        }));
    }

    let snapshot = engine.submit().unwrap();
    assert_eq!(*seen.lock().unwrap(), vec!["second", "first", "third"]);
    assert_eq!(snapshot.all["a"], "second failed");
}

#[test]
fn test_run_is_idempotent() {
    let form = FakeForm::default();
    let engine = form.engine(FormConfig::default());

    form.add(&engine, "a", FakeField::required());
    form.add(&engine, "b", FakeField::optional());
    engine.register(rules::matching("same", ["a", "b"], "must match"));

    let first = engine.run(Trigger::None, None).unwrap();
    let second = engine.run(Trigger::None, None).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_unknown_field_is_an_error() {
    let form = FakeForm::default();
    let engine = form.engine(FormConfig::default());
    form.add(&engine, "a", FakeField::optional());

    assert_eq!(
        engine.check(Some(names(&["a", "nope"]).as_slice())),
        Err(EngineError::UnknownField("nope".to_string()))
    );
    assert_eq!(
        engine.blur("nope"),
        Err(EngineError::UnknownField("nope".to_string()))
    );
}

#[test]
fn test_panicking_validator_propagates() {
    let form = FakeForm::default();
    let engine = form.engine(FormConfig::default());
    form.add(&engine, "a", FakeField::optional());
    engine.register(Registration::new("boom", ["a"], |_, _| panic!("misconfigured")));

    let result = panic::catch_unwind(AssertUnwindSafe(|| engine.submit()));
    assert!(result.is_err());

    engine.unregister(&ValidatorId::from("boom"));
    assert!(engine.submit().unwrap().is_empty());
}

#[test]
fn test_form_level_validator_is_global() {
    let form = FakeForm::default();
    let engine = form.engine(FormConfig::default());
    form.add(&engine, "a", FakeField::optional());
    engine.register(Registration::new("form", Vec::<String>::new(), |_, _| {
        Err("form rejected".to_string())
    }));

    let snapshot = engine.submit().unwrap();
    assert_eq!(snapshot.global[&ValidatorId::from("form")], "form rejected");
    assert_eq!(snapshot.main.unwrap().message, "form rejected");
    assert!(!engine.validity());

    let snapshot = engine.change("a").unwrap();
    assert!(snapshot.global.contains_key(&ValidatorId::from("form")));
}

// ============================================================================
// Visibility
// ============================================================================

#[test]
fn test_blur_mode_ignores_change() {
    let form = FakeForm::default();
    let engine = form.engine(FormConfig::new(Mode::Blur));
    form.add(&engine, "a", FakeField::required());
    engine.flush().unwrap();

    let before = engine.snapshot();
    engine.change("a").unwrap();
    assert_eq!(engine.snapshot(), before);

    engine.blur("a").unwrap();
    assert_eq!(engine.snapshot().error("a"), Some(MISSING));
}

#[test]
fn test_all_mode_commits_blur_and_change() {
    let form = FakeForm::default();
    let engine = form.engine(FormConfig::new(Mode::All));
    let a = form.add(&engine, "a", FakeField::required());

    engine.change("a").unwrap();
    assert_eq!(engine.snapshot().error("a"), Some(MISSING));

    a.set("x");
    engine.blur("a").unwrap();
    assert!(engine.snapshot().is_empty());
}

#[test]
fn test_fix_mode_goes_live_after_first_error() {
    let form = FakeForm::default();
    let config = FormConfig::new(Mode::Fix).revalidate_mode(RevalidateMode::Submit);
    let engine = form.engine(config);
    let a = form.add(&engine, "a", FakeField::required());
    engine.flush().unwrap();

    engine.change("a").unwrap();
    assert!(engine.snapshot().is_empty());

    engine.submit().unwrap();
    assert_eq!(engine.snapshot().error("a"), Some(MISSING));

    a.set("ok");
    engine.change("a").unwrap();
    assert!(engine.snapshot().is_empty());

    a.set("");
    engine.change("a").unwrap();
    assert_eq!(engine.snapshot().error("a"), Some(MISSING));
}

#[test]
fn test_mount_run_sets_validity_without_showing_errors() {
    let form = FakeForm::default();
    let engine = form.engine(FormConfig::new(Mode::All));
    form.add(&engine, "a", FakeField::required());

    let snapshot = engine.flush().unwrap().unwrap();
    assert_eq!(snapshot.error("a"), Some(MISSING));
    assert!(!engine.validity());
    assert!(engine.snapshot().is_empty());
    assert_eq!(engine.phase(), FormPhase::Pristine);
}

#[test]
fn test_revalidate_after_submit() {
    let form = FakeForm::default();
    let config = FormConfig::new(Mode::None).revalidate_mode(RevalidateMode::Change);
    let engine = form.engine(config);
    let a = form.add(&engine, "a", FakeField::required());

    engine.change("a").unwrap();
    assert!(engine.snapshot().is_empty());
    assert_eq!(engine.phase(), FormPhase::Touched);

    engine.submit().unwrap();
    assert_eq!(engine.phase(), FormPhase::Submitted);

    a.set("filled");
    engine.change("a").unwrap();
    assert!(engine.snapshot().is_empty());
    assert!(engine.validity());
}

#[test]
fn test_partial_commit_keeps_other_fields() {
    let form = FakeForm::default();
    let engine = form.engine(FormConfig::new(Mode::None));
    let a = form.add(&engine, "a", FakeField::required());
    form.add(&engine, "b", FakeField::required());

    engine.submit().unwrap();
    a.set("done");
    engine.change("a").unwrap();

    let snapshot = engine.snapshot();
    assert_eq!(snapshot.error("a"), None);
    assert_eq!(snapshot.error("b"), Some(MISSING));
    assert_eq!(snapshot.main.unwrap().field.as_deref(), Some("b"));
}

// ============================================================================
// Custom validity write-back
// ============================================================================

#[test]
fn test_group_error_attaches_to_trigger_field() {
    let form = FakeForm::default();
    let engine = form.engine(FormConfig::new(Mode::All));
    let password = form.add(&engine, "password", FakeField::optional());
    let confirm = form.add(&engine, "confirm", FakeField::optional());
    engine.register(rules::matching("match", ["password", "confirm"], "Passwords differ"));

    password.set("hunter2");
    confirm.set("hunter3");
    engine.change("confirm").unwrap();
    assert_eq!(confirm.custom_message(), "Passwords differ");
    assert_eq!(password.custom_message(), "");

    engine.submit().unwrap();
    assert_eq!(password.custom_message(), "Passwords differ");

    confirm.set("hunter2");
    engine.change("confirm").unwrap();
    assert_eq!(password.custom_message(), "");
    assert_eq!(confirm.custom_message(), "");
}

#[test]
fn test_report_native_on_submit() {
    let form = FakeForm::default();
    let engine = form.engine(FormConfig::default().report_native());
    let a = form.add(&engine, "a", FakeField::optional());
    let b = form.add(&engine, "b", FakeField::required());

    engine.flush().unwrap();
    assert_eq!(b.reports(), 0);

    engine.submit().unwrap();
    assert_eq!(a.reports(), 0);
    assert_eq!(b.reports(), 1);

    engine.blur("b").unwrap();
    assert_eq!(b.reports(), 1);
}

// ============================================================================
// Scheduling
// ============================================================================

#[test]
fn test_registrations_coalesce_into_one_run() {
    let form = FakeForm::default();
    let engine = form.engine(FormConfig::default());
    let calls = Arc::new(AtomicUsize::new(0));

    engine.register(counting("form", &[], &calls, |_| Ok(())));
    form.add(&engine, "a", FakeField::required());
    form.add(&engine, "b", FakeField::required());
    form.add(&engine, "c", FakeField::required());
    assert!(engine.is_pending());

    let snapshot = engine.flush().unwrap().unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(snapshot.native.len(), 3);
    assert!(!engine.is_pending());
    assert_eq!(engine.flush().unwrap(), None);
}

#[test]
fn test_scoped_run_executes_pending_pass_first() {
    let form = FakeForm::default();
    let engine = form.engine(FormConfig::default());
    let calls = Arc::new(AtomicUsize::new(0));

    let a = form.add(&engine, "a", FakeField::required());
    form.add(&engine, "b", FakeField::required());
    engine.register(counting("form", &[], &calls, |_| Ok(())));
    assert!(engine.is_pending());

    a.set("x");
    let snapshot = engine.change("a").unwrap();
    assert!(!engine.is_pending());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(snapshot.error("a"), None);
    assert_eq!(snapshot.error("b"), Some(MISSING));
    assert!(!engine.validity());
    assert!(engine.snapshot().is_empty());
}

#[test]
fn test_blur_before_flush_counts_unchecked_fields() {
    let form = FakeForm::default();
    let engine = form.engine(FormConfig::new(Mode::Blur));

    let a = form.add(&engine, "a", FakeField::required());
    form.add(&engine, "b", FakeField::required());

    a.set("x");
    engine.blur("a").unwrap();
    assert!(!engine.validity());
    assert_eq!(engine.snapshot().error("b"), None);
    assert_eq!(engine.flush().unwrap(), None);
}

#[test]
fn test_submit_consumes_pending_pass() {
    let form = FakeForm::default();
    let engine = form.engine(FormConfig::default());
    let calls = Arc::new(AtomicUsize::new(0));

    form.add(&engine, "a", FakeField::optional());
    engine.register(counting("form", &[], &calls, |_| Ok(())));

    engine.submit().unwrap();
    assert!(!engine.is_pending());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_stale_run_does_not_overwrite_newer_commit() {
    let form = FakeForm::default();
    let engine = form.engine(FormConfig::default());
    let hold = Arc::new(AtomicBool::new(false));
    let entered = Arc::new(Barrier::new(2));
    let release = Arc::new(Barrier::new(2));

    form.add(&engine, "a", FakeField::optional());
    {
        let hold = Arc::clone(&hold);
        let entered = Arc::clone(&entered);
        let release = Arc::clone(&release);
        engine.register(Registration::new("gate", ["a"], move |_, _| {
            if hold.swap(false, Ordering::SeqCst) {
                entered.wait();
                release.wait();
            }
            Ok(())
        }));
    }
    engine.flush().unwrap();

    hold.store(true, Ordering::SeqCst);
    let slow = {
        let engine = engine.clone();
        thread::spawn(move || engine.submit().unwrap())
    };
    entered.wait();

    form.add(&engine, "c", FakeField::required());
    let snapshot = engine.submit().unwrap();
    assert_eq!(snapshot.error("c"), Some(MISSING));
    assert!(!engine.validity());

    release.wait();
    slow.join().unwrap();

    assert_eq!(engine.snapshot().error("c"), Some(MISSING));
    assert!(!engine.validity());
}

#[test]
fn test_unregister_unknown_schedules_nothing() {
    let form = FakeForm::default();
    let engine = form.engine(FormConfig::default());

    engine.unregister(&ValidatorId::from("missing"));
    engine.unregister_field("missing");
    assert!(!engine.is_pending());
}

#[test]
fn test_unregistered_field_is_pruned_from_committed() {
    let form = FakeForm::default();
    let engine = form.engine(FormConfig::default());
    form.add(&engine, "a", FakeField::required());
    form.add(&engine, "b", FakeField::required());

    engine.submit().unwrap();
    assert_eq!(engine.snapshot().error("b"), Some(MISSING));

    engine.unregister_field("b");
    engine.flush().unwrap();
    let snapshot = engine.snapshot();
    assert!(!snapshot.all.contains_key("b"));
    assert_eq!(snapshot.error("a"), Some(MISSING));
}

// ============================================================================
// Subscriptions
// ============================================================================

#[test]
fn test_subscribers_see_commits_and_validity() {
    let form = FakeForm::default();
    let engine = form.engine(FormConfig::new(Mode::Blur));
    let states = Arc::new(Mutex::new(Vec::new()));

    let recorded = Arc::clone(&states);
    let subscription = engine.subscribe(move |state: &FormState| {
        recorded.lock().unwrap().push(state.clone());
    });

    let a = form.add(&engine, "a", FakeField::required());
    engine.flush().unwrap();
    engine.change("a").unwrap();
    engine.blur("a").unwrap();

    {
        let states = states.lock().unwrap();
        assert_eq!(states.len(), 3);
        assert!(!states[0].valid);
        assert!(states[0].snapshot.is_empty());
        assert_eq!(states[1].phase, FormPhase::Touched);
        assert_eq!(states[2].snapshot.error("a"), Some(MISSING));
    }

    subscription.unsubscribe();
    a.set("x");
    engine.blur("a").unwrap();
    assert_eq!(states.lock().unwrap().len(), 3);
}

#[test]
fn test_reset() {
    let form = FakeForm::default();
    let engine = form.engine(FormConfig::default());
    form.add(&engine, "a", FakeField::required());
    engine.submit().unwrap();
    assert_eq!(engine.phase(), FormPhase::Submitted);

    engine.reset();
    assert_eq!(engine.phase(), FormPhase::Pristine);
    assert!(engine.snapshot().is_empty());
    assert!(engine.is_pending());
    assert!(!engine.validity());

    engine.flush().unwrap();
    assert!(engine.snapshot().is_empty());
    assert!(!engine.validity());
}

#[test]
fn test_state_serializes() {
    let form = FakeForm::default();
    let engine = form.engine(FormConfig::default());
    form.add(&engine, "a", FakeField::required());
    engine.submit().unwrap();

    let json = serde_json::to_value(engine.state()).unwrap();
    assert_eq!(json["valid"], false);
    assert_eq!(json["phase"], "submitted");
    assert_eq!(json["snapshot"]["all"]["a"], MISSING);
    assert_eq!(json["snapshot"]["trigger"]["kind"], "submit");
}

#[test]
fn test_config_from_json() {
    let config: FormConfig = serde_json::from_str(
        r#"{"mode": "fix", "revalidate_mode": "blur", "messages": {"valueMissing": "Required"}}"#,
    )
    .unwrap();

    assert_eq!(config.mode, Mode::Fix);
    assert_eq!(config.revalidate_mode, RevalidateMode::Blur);
    assert_eq!(config.messages[&Constraint::ValueMissing], "Required");
    assert!(!config.report_native);
}
