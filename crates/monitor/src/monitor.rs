// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The monitored-object tree.
//!
//! Parents own children by handle; a child subtree shares the tree's
//! change-notification channel but never holds a reference back to the
//! parent. All mutation goes through these methods, which guard the
//! internal state; external code must not reach into child sets.

use crate::IDLE_REVERT_DELAY;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tcs_core::{ChildSummary, Clock, MetricMap, Status, StatusReport, SystemClock};
use thiserror::Error;
use tokio::sync::mpsc;

/// Periodic health probe. `None` means "no opinion" and never
/// downgrades the current status.
pub type HealthcheckFn = Arc<dyn Fn() -> Option<Status> + Send + Sync>;

/// Metric collector, invoked at publish time.
pub type MetricFn = Arc<dyn Fn() -> MetricMap + Send + Sync>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MonitorError {
    #[error("duplicate child monitor: {0}")]
    DuplicateChild(String),
}

struct MonitorInner<C: Clock> {
    parent_name: Option<String>,
    status: Status,
    message: String,
    children: BTreeMap<String, Monitor<C>>,
    healthchecks: Vec<HealthcheckFn>,
    metric_cbs: Vec<MetricFn>,
    heartbeat_sequence: u64,
    start_time: Instant,
    active_tasks: u32,
    task_tracking: bool,
    /// Bumped on every task entry; pending idle reverts check it.
    idle_epoch: u64,
    changed_tx: Option<mpsc::UnboundedSender<()>>,
}

/// One node in the monitored hierarchy. Cheap to clone; clones share
/// state.
#[derive(Clone)]
pub struct Monitor<C: Clock = SystemClock> {
    name: String,
    clock: C,
    inner: Arc<Mutex<MonitorInner<C>>>,
}

impl<C: Clock + 'static> Monitor<C> {
    pub fn new(name: impl Into<String>, clock: C) -> Self {
        let start_time = clock.now();
        Self {
            name: name.into(),
            clock,
            inner: Arc::new(Mutex::new(MonitorInner {
                parent_name: None,
                status: Status::Unknown,
                message: String::new(),
                children: BTreeMap::new(),
                healthchecks: Vec::new(),
                metric_cbs: Vec::new(),
                heartbeat_sequence: 0,
                start_time,
                active_tasks: 0,
                task_tracking: false,
                idle_epoch: 0,
                changed_tx: None,
            })),
        }
    }

    /// Display-only parent hint.
    pub fn with_parent_name(self, parent_name: impl Into<String>) -> Self {
        self.inner.lock().parent_name = Some(parent_name.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent_name(&self) -> Option<String> {
        self.inner.lock().parent_name.clone()
    }

    /// Replace the own status component. Children are untouched.
    pub fn set_status(&self, status: Status, message: impl Into<String>) {
        {
            let mut inner = self.inner.lock();
            inner.status = status;
            inner.message = message.into();
        }
        self.notify_changed();
    }

    pub fn own_status(&self) -> Status {
        self.inner.lock().status
    }

    pub fn message(&self) -> String {
        self.inner.lock().message.clone()
    }

    /// Manual recovery: clear an error-band own status.
    ///
    /// No-op unless the own status is `Error`, `Degraded` or `Failed`;
    /// otherwise reverts to `Ok`, or to `Idle`/`Busy` when task
    /// tracking is active.
    pub fn cancel_error_status(&self) {
        let changed = {
            let mut inner = self.inner.lock();
            if !inner.status.is_error() {
                false
            } else {
                inner.status = if inner.task_tracking {
                    if inner.active_tasks > 0 {
                        Status::Busy
                    } else {
                        Status::Idle
                    }
                } else {
                    Status::Ok
                };
                inner.message = "Error resolved".to_string();
                true
            }
        };
        if changed {
            self.notify_changed();
        }
    }

    /// Attach a child. Child names are unique within a parent; the
    /// subtree joins this tree's notification channel.
    pub fn add_child(&self, child: Monitor<C>) -> Result<(), MonitorError> {
        let tx = {
            let mut inner = self.inner.lock();
            if inner.children.contains_key(child.name()) {
                return Err(MonitorError::DuplicateChild(child.name().to_string()));
            }
            let tx = inner.changed_tx.clone();
            inner.children.insert(child.name().to_string(), child.clone());
            tx
        };
        if let Some(tx) = tx {
            child.install_notifier(tx);
        }
        self.notify_changed();
        Ok(())
    }

    pub fn remove_child(&self, name: &str) -> Option<Monitor<C>> {
        let removed = self.inner.lock().children.remove(name);
        if removed.is_some() {
            self.notify_changed();
        }
        removed
    }

    pub fn child(&self, name: &str) -> Option<Monitor<C>> {
        self.inner.lock().children.get(name).cloned()
    }

    pub fn add_healthcheck_cb(&self, f: HealthcheckFn) {
        self.inner.lock().healthchecks.push(f);
    }

    pub fn add_metric_cb(&self, f: MetricFn) {
        self.inner.lock().metric_cbs.push(f);
    }

    /// Worst-wins aggregate of the own status and every descendant.
    pub fn effective_status(&self) -> Status {
        let (own, children) = {
            let inner = self.inner.lock();
            (inner.status, inner.children.values().cloned().collect::<Vec<_>>())
        };
        Status::aggregate(
            std::iter::once(own).chain(children.iter().map(Monitor::effective_status)),
        )
    }

    /// One-line summaries of direct children, by effective status.
    pub fn child_summaries(&self) -> Vec<ChildSummary> {
        let children: Vec<Monitor<C>> =
            self.inner.lock().children.values().cloned().collect();
        children
            .iter()
            .map(|child| ChildSummary {
                name: child.name().to_string(),
                status: child.effective_status(),
                message: child.message(),
            })
            .collect()
    }

    /// Current effective report plus child summaries and merged metric
    /// callbacks.
    pub fn snapshot(&self) -> (StatusReport, Vec<ChildSummary>) {
        let (message, metric_cbs) = {
            let inner = self.inner.lock();
            (inner.message.clone(), inner.metric_cbs.clone())
        };
        let mut report =
            StatusReport::new(self.effective_status(), message, self.clock.wall());
        for cb in metric_cbs {
            report.metrics.extend(cb());
        }
        (report, self.child_summaries())
    }

    /// Run the healthcheck callbacks once and fold any opinions into
    /// the own status, worst-wins.
    pub fn run_healthchecks(&self) {
        let (own, checks) = {
            let inner = self.inner.lock();
            (inner.status, inner.healthchecks.clone())
        };
        let opinions: Vec<Status> = checks.iter().filter_map(|cb| cb()).collect();
        if opinions.is_empty() {
            return;
        }
        let folded = Status::aggregate(std::iter::once(own).chain(opinions));
        if folded != own {
            let mut inner = self.inner.lock();
            inner.status = folded;
            drop(inner);
            self.notify_changed();
        }
    }

    /// Next heartbeat sequence number, strictly increasing.
    pub fn bump_heartbeat(&self) -> u64 {
        let mut inner = self.inner.lock();
        inner.heartbeat_sequence += 1;
        inner.heartbeat_sequence
    }

    pub fn heartbeat_sequence(&self) -> u64 {
        self.inner.lock().heartbeat_sequence
    }

    /// Reset the sequence and the uptime base for a fresh `start`.
    pub fn mark_started(&self) {
        let mut inner = self.inner.lock();
        inner.heartbeat_sequence = 0;
        inner.start_time = self.clock.now();
    }

    pub fn uptime_s(&self) -> f64 {
        let start = self.inner.lock().start_time;
        self.clock.now().duration_since(start).as_secs_f64()
    }

    /// Scoped activity tracking: `Idle → Busy` on the first entry,
    /// `Busy → Idle` only after the last guard has been gone for
    /// [`IDLE_REVERT_DELAY`]. Re-entrant; nested guards coalesce.
    pub fn track_task(&self) -> TaskGuard<C> {
        let became_busy = {
            let mut inner = self.inner.lock();
            inner.task_tracking = true;
            inner.active_tasks += 1;
            inner.idle_epoch += 1;
            if matches!(inner.status, Status::Ok | Status::Idle) {
                inner.status = Status::Busy;
                true
            } else {
                false
            }
        };
        if became_busy {
            self.notify_changed();
        }
        TaskGuard { monitor: self.clone() }
    }

    /// Subscribe the whole tree to change notifications. Returns the
    /// receiving end; one subscriber per tree.
    pub fn subscribe_changes(&self) -> mpsc::UnboundedReceiver<()> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.install_notifier(tx);
        rx
    }

    fn install_notifier(&self, tx: mpsc::UnboundedSender<()>) {
        let children: Vec<Monitor<C>> = {
            let mut inner = self.inner.lock();
            inner.changed_tx = Some(tx.clone());
            inner.children.values().cloned().collect()
        };
        for child in children {
            child.install_notifier(tx.clone());
        }
    }

    fn notify_changed(&self) {
        let tx = self.inner.lock().changed_tx.clone();
        if let Some(tx) = tx {
            let _ = tx.send(());
        }
    }

    fn finish_task(&self) {
        let revert_epoch = {
            let mut inner = self.inner.lock();
            inner.active_tasks = inner.active_tasks.saturating_sub(1);
            if inner.active_tasks > 0 {
                return;
            }
            inner.idle_epoch
        };

        let monitor = self.clone();
        if tokio::runtime::Handle::try_current().is_ok() {
            tokio::spawn(async move {
                tokio::time::sleep(IDLE_REVERT_DELAY).await;
                monitor.revert_to_idle(revert_epoch);
            });
        } else {
            // No runtime to delay on (e.g. teardown); revert in place.
            monitor.revert_to_idle(revert_epoch);
        }
    }

    fn revert_to_idle(&self, revert_epoch: u64) {
        let reverted = {
            let mut inner = self.inner.lock();
            if inner.idle_epoch == revert_epoch
                && inner.active_tasks == 0
                && inner.status == Status::Busy
            {
                inner.status = Status::Idle;
                true
            } else {
                false
            }
        };
        if reverted {
            self.notify_changed();
        }
    }
}

/// Guard returned by [`Monitor::track_task`]. Release happens on every
/// exit path via `Drop`.
pub struct TaskGuard<C: Clock + 'static> {
    monitor: Monitor<C>,
}

impl<C: Clock + 'static> Drop for TaskGuard<C> {
    fn drop(&mut self) {
        self.monitor.finish_task();
    }
}

#[cfg(test)]
#[path = "monitor_tests.rs"]
mod tests;
