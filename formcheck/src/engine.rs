//! Form engine: the per-form facade UI bindings talk to.

use std::sync::{Arc, Mutex, MutexGuard};

use log::debug;
use serde::Serialize;

use crate::bus::{SubscriptionBus, Unsubscribe};
use crate::config::FormConfig;
use crate::error::Result;
use crate::field::{FieldHandle, FieldName, ValueSource};
use crate::model::{self, ErrorSnapshot};
use crate::policy::{FormPhase, Policy, Trigger};
use crate::registry::{Registration, RegistryChange, ValidatorId, ValidatorRegistry};
use crate::runner::RunPlan;
use crate::scheduler::{Scheduler, WakeupSender};

/// Committed state published to subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormState {
    /// The committed error snapshot.
    pub snapshot: ErrorSnapshot,
    /// True iff no registered field or validator currently reports an error.
    pub valid: bool,
    /// Lifecycle phase of the form.
    pub phase: FormPhase,
}

struct EngineInner {
    config: FormConfig,
    policy: Policy,
    registry: ValidatorRegistry,
    scheduler: Scheduler,
    /// Result of the latest run, committed or not.
    internal: ErrorSnapshot,
    /// Snapshot visible to subscribers.
    committed: ErrorSnapshot,
    valid: bool,
    phase: FormPhase,
    /// A committed snapshot has contained an error since the last reset.
    error_shown: bool,
    /// Sequence number handed to the latest planned run.
    planned: u64,
    /// Sequence number of the latest applied run.
    applied: u64,
}

impl EngineInner {
    fn state(&self) -> FormState {
        FormState {
            snapshot: self.committed.clone(),
            valid: self.valid,
            phase: self.phase,
        }
    }

    fn next_seq(&mut self) -> u64 {
        self.planned += 1;
        self.planned
    }

    fn schedule(&mut self, change: RegistryChange) {
        if change.changed {
            debug!("registry changed (names changed: {})", change.names_changed);
            self.scheduler.request();
        }
    }

    /// Fold a run result into engine state.
    ///
    /// Returns whether subscribers must be notified and whether the run was
    /// committed. A run planned before the last applied one is discarded.
    fn apply(&mut self, seq: u64, plan: &RunPlan, result: ErrorSnapshot) -> (bool, bool) {
        if seq < self.applied {
            debug!(
                "discarding stale run #{} (run #{} already applied)",
                seq, self.applied
            );
            return (false, false);
        }
        self.applied = seq;

        let trigger = plan.trigger();
        let order = plan.order();

        let internal = if plan.is_partial() {
            model::merge(&self.internal, &result, order)
        } else {
            result.clone()
        };
        let valid = internal.is_empty();
        let commit = self
            .policy
            .should_commit(trigger, self.phase, self.error_shown);
        let phase = self.phase.advance(trigger);

        let mut notify = valid != self.valid || phase != self.phase;
        self.internal = internal;
        self.valid = valid;
        self.phase = phase;

        if commit {
            self.committed = if plan.is_partial() {
                model::merge(&self.committed, &result, order)
            } else {
                result
            };
            self.error_shown |= !self.committed.is_empty();
            notify = true;
            debug!(
                "committed {:?} run: valid={} main={:?}",
                trigger, valid, self.committed.main
            );
        } else if *trigger == Trigger::None {
            let pruned = model::restrict(&self.committed, order);
            if pruned != self.committed {
                self.committed = pruned;
                notify = true;
            }
        }

        (notify, commit)
    }
}

/// Validation engine for one form instance.
///
/// Cheap to clone; clones share the same form. Create one when the form
/// mounts and drop it when the form unmounts.
#[derive(Clone)]
pub struct FormEngine {
    inner: Arc<Mutex<EngineInner>>,
    values: Arc<dyn ValueSource>,
    bus: Arc<SubscriptionBus<FormState>>,
}

impl FormEngine {
    /// Create an engine reading live values from `values`.
    pub fn new(config: FormConfig, values: impl ValueSource + 'static) -> Self {
        let inner = EngineInner {
            policy: Policy::new(&config),
            config,
            registry: ValidatorRegistry::new(),
            scheduler: Scheduler::new(),
            internal: ErrorSnapshot::default(),
            committed: ErrorSnapshot::default(),
            valid: true,
            phase: FormPhase::Pristine,
            error_shown: false,
            planned: 0,
            applied: 0,
        };
        Self {
            inner: Arc::new(Mutex::new(inner)),
            values: Arc::new(values),
            bus: Arc::new(SubscriptionBus::new()),
        }
    }

    /// Register a field handle and schedule a revalidation pass.
    pub fn register_field(&self, name: impl Into<FieldName>, handle: Arc<dyn FieldHandle>) {
        let mut inner = self.lock();
        let change = inner.registry.register_field(name, handle);
        inner.schedule(change);
    }

    /// Remove a field handle. Unknown names are ignored.
    pub fn unregister_field(&self, name: &str) {
        let mut inner = self.lock();
        let change = inner.registry.unregister_field(name);
        inner.schedule(change);
    }

    /// Register or replace a validator and schedule a revalidation pass.
    pub fn register(&self, registration: Registration) {
        let mut inner = self.lock();
        let change = inner.registry.register(registration);
        inner.schedule(change);
    }

    /// Remove a validator. Unknown ids are ignored.
    pub fn unregister(&self, id: &ValidatorId) {
        let mut inner = self.lock();
        let change = inner.registry.unregister(id);
        inner.schedule(change);
    }

    /// Run validation for `trigger`, restricted to `scope` when given.
    ///
    /// A pending revalidation pass is consumed first: an unscoped run covers
    /// it, a scoped run executes it beforehand so fields outside the scope
    /// still count towards validity. Returns the latest snapshot with this
    /// run folded in, whether or not the policy committed it. A panicking
    /// validator propagates to the caller.
    pub fn run(&self, trigger: Trigger, scope: Option<&[FieldName]>) -> Result<ErrorSnapshot> {
        let plans = {
            let mut inner = self.lock();
            let requested = RunPlan::new(&inner.registry, trigger, scope, &inner.config.messages)?;
            let mut plans = Vec::with_capacity(2);
            if inner.scheduler.take() && scope.is_some() {
                debug!("running pending revalidation before scoped run");
                let pending =
                    RunPlan::new(&inner.registry, Trigger::None, None, &inner.config.messages)?;
                plans.push((inner.next_seq(), pending));
            }
            plans.push((inner.next_seq(), requested));
            plans
        };

        let mut internal = ErrorSnapshot::default();
        for (seq, plan) in &plans {
            internal = self.finish(*seq, plan);
        }
        Ok(internal)
    }

    /// Execute `plan` with no lock held and fold the result into the engine.
    fn finish(&self, seq: u64, plan: &RunPlan) -> ErrorSnapshot {
        let result = plan.execute(self.values.as_ref());

        let (state, notify, report, internal) = {
            let mut inner = self.lock();
            let (notify, commit) = inner.apply(seq, plan, result);
            let report = commit
                && inner.config.report_native
                && matches!(plan.trigger(), Trigger::Submit | Trigger::Check);
            (inner.state(), notify, report, inner.internal.clone())
        };

        if report {
            self.report(&state.snapshot);
        }
        if notify {
            self.bus.publish(&state);
        }
        internal
    }

    /// Validate the whole form as a submission.
    pub fn submit(&self) -> Result<ErrorSnapshot> {
        self.run(Trigger::Submit, None)
    }

    /// Explicitly validate `scope`, or the whole form.
    pub fn check(&self, scope: Option<&[FieldName]>) -> Result<ErrorSnapshot> {
        self.run(Trigger::Check, scope)
    }

    /// Validate a field that lost focus.
    pub fn blur(&self, name: &str) -> Result<ErrorSnapshot> {
        let scope = [name.to_string()];
        self.run(Trigger::Blur(name.to_string()), Some(scope.as_slice()))
    }

    /// Validate a field whose value changed.
    pub fn change(&self, name: &str) -> Result<ErrorSnapshot> {
        let scope = [name.to_string()];
        self.run(Trigger::Change(name.to_string()), Some(scope.as_slice()))
    }

    /// Execute the pending coalesced revalidation pass, if any.
    ///
    /// Returns the resulting snapshot, or `None` when nothing was pending.
    pub fn flush(&self) -> Result<Option<ErrorSnapshot>> {
        if !self.lock().scheduler.take() {
            return Ok(None);
        }
        self.run(Trigger::None, None).map(Some)
    }

    /// Check if a revalidation pass is waiting for [`FormEngine::flush`].
    pub fn is_pending(&self) -> bool {
        self.lock().scheduler.is_pending()
    }

    /// Return the form to pristine: clear the committed snapshot and schedule
    /// a revalidation pass for the reset values.
    ///
    /// Validity and the custom messages written to field handles keep the
    /// last run's results until that pass executes.
    pub fn reset(&self) {
        let state = {
            let mut inner = self.lock();
            inner.committed = ErrorSnapshot::default();
            inner.phase = FormPhase::Pristine;
            inner.error_shown = false;
            inner.scheduler.request();
            inner.state()
        };
        debug!("form reset");
        self.bus.publish(&state);
    }

    /// The committed snapshot.
    pub fn snapshot(&self) -> ErrorSnapshot {
        self.lock().committed.clone()
    }

    /// Whether the form is currently valid.
    pub fn validity(&self) -> bool {
        self.lock().valid
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> FormPhase {
        self.lock().phase
    }

    /// Current committed state.
    pub fn state(&self) -> FormState {
        self.lock().state()
    }

    /// Subscribe to committed state changes.
    pub fn subscribe<F>(&self, listener: F) -> Unsubscribe<FormState>
    where
        F: Fn(&FormState) + Send + Sync + 'static,
    {
        self.bus.subscribe(listener)
    }

    /// Signal `sender` whenever a revalidation pass is scheduled.
    pub fn install_wakeup(&self, sender: WakeupSender) {
        self.lock().scheduler.install(sender);
    }

    /// Drop the wakeup sender so a driver loop can finish.
    pub fn close(&self) {
        self.lock().scheduler.uninstall();
    }

    fn report(&self, snapshot: &ErrorSnapshot) {
        let Some(field) = snapshot.main.as_ref().and_then(|main| main.field.as_ref()) else {
            return;
        };
        let handle = self.lock().registry.field(field).cloned();
        if let Some(handle) = handle {
            debug!("forcing native report on '{}'", field);
            handle.force_report();
        }
    }

    fn lock(&self) -> MutexGuard<'_, EngineInner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
