//! Coalescing scheduler for revalidation passes.
//!
//! Registrations happening in the same tick must produce exactly one
//! validation pass that sees the settled registry. Scheduling is split in two
//! phases: [`Scheduler::request`] is synchronous and cheap, execution happens
//! later when the owner calls [`FormEngine::flush`], or earlier when the next
//! [`FormEngine::run`] consumes it. An optional wakeup channel lets an async
//! [`drive`] loop perform the flush.

use log::{debug, error, trace};
use tokio::sync::mpsc;

use crate::engine::FormEngine;

/// Notifies a [`drive`] loop that a revalidation pass is pending.
#[derive(Clone, Debug)]
pub struct WakeupSender {
    tx: mpsc::Sender<()>,
}

impl WakeupSender {
    /// Signal the driver. A full buffer already means a flush is due, so a
    /// failed send loses nothing.
    pub fn send(&self) {
        if self.tx.try_send(()).is_err() {
            trace!("flush already signalled");
        }
    }
}

/// Driver side of the wakeup channel.
#[derive(Debug)]
pub struct WakeupReceiver {
    rx: mpsc::Receiver<()>,
}

impl WakeupReceiver {
    /// Wait until a pass is pending. `None` once every sender is gone.
    pub async fn recv(&mut self) -> Option<()> {
        self.rx.recv().await
    }

    /// Discard signals that arrived before the flush about to run, since
    /// that flush covers them.
    pub fn drain(&mut self) {
        while self.rx.try_recv().is_ok() {}
    }
}

/// Create a wakeup channel holding at most one undelivered signal.
pub fn channel() -> (WakeupSender, WakeupReceiver) {
    let (tx, rx) = mpsc::channel(1);
    (WakeupSender { tx }, WakeupReceiver { rx })
}

/// Pending-run flag with an optional wakeup sender.
#[derive(Debug, Default)]
pub struct Scheduler {
    pending: bool,
    wakeup: Option<WakeupSender>,
}

impl Scheduler {
    /// Create an idle scheduler with no wakeup channel.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a deferred run.
    ///
    /// Returns true if this call scheduled the run, false if one was already
    /// pending.
    pub fn request(&mut self) -> bool {
        if self.pending {
            trace!("revalidation already pending");
            return false;
        }
        self.pending = true;
        debug!("revalidation scheduled");
        if let Some(wakeup) = &self.wakeup {
            wakeup.send();
        }
        true
    }

    /// Consume the pending request. Returns true if a run should execute.
    pub fn take(&mut self) -> bool {
        std::mem::take(&mut self.pending)
    }

    /// Check if a run is pending.
    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Install a wakeup sender. A run already pending signals it immediately.
    pub fn install(&mut self, sender: WakeupSender) {
        if self.pending {
            sender.send();
        }
        self.wakeup = Some(sender);
    }

    /// Drop the wakeup sender, letting a [`drive`] loop finish.
    pub fn uninstall(&mut self) {
        self.wakeup = None;
    }
}

/// Flush `engine` every time a wakeup arrives.
///
/// Returns once the engine is closed and every wakeup sender is dropped.
pub async fn drive(engine: FormEngine, mut receiver: WakeupReceiver) {
    while receiver.recv().await.is_some() {
        receiver.drain();
        if let Err(e) = engine.flush() {
            error!("scheduled revalidation failed: {}", e);
        }
    }
    debug!("scheduler driver stopped");
}
