// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The discovery client: warm-start from registry history, then
//! follow live traffic.

use crate::view::ServiceView;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tcs_bus::{BusError, BusHandle, Message};
use tcs_core::{Clock, ServiceId, SystemClock};
use tcs_wire::{
    HeartbeatEvent, RegistryEvent, StatusEvent, HEARTBEAT_WILDCARD, REGISTRY_WILDCARD,
    STATUS_WILDCARD,
};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Streaming update callback.
pub type UpdateFn = Arc<dyn Fn(&ServiceView) + Send + Sync>;

/// How often the zombie scan compares the clock against expected
/// heartbeats.
const ZOMBIE_SCAN_PERIOD: Duration = Duration::from_secs(1);

type Table = Arc<Mutex<BTreeMap<ServiceId, ServiceView>>>;

/// Maintains a `service_id → view` table from the three streams.
pub struct DiscoveryClient<C: Clock = SystemClock> {
    table: Table,
    observers: Arc<Mutex<Vec<UpdateFn>>>,
    clock: C,
    /// Extra slack past `next_heartbeat_expected`; zero means "one
    /// missed heartbeat marks the service".
    grace: Duration,
    cancel: CancellationToken,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl<C: Clock + 'static> DiscoveryClient<C> {
    /// Subscribe to live traffic, replay registry history for a warm
    /// start, and begin following.
    ///
    /// Live subscriptions are opened before the replay so no event can
    /// fall between history and the live feed; the projection is
    /// idempotent against the overlap re-delivering.
    pub async fn connect(bus: BusHandle, clock: C) -> Result<Arc<Self>, BusError> {
        Self::connect_with_grace(bus, clock, Duration::ZERO).await
    }

    pub async fn connect_with_grace(
        bus: BusHandle,
        clock: C,
        grace: Duration,
    ) -> Result<Arc<Self>, BusError> {
        let mut registry_sub = bus.subscribe(REGISTRY_WILDCARD).await?;
        let mut status_sub = bus.subscribe(STATUS_WILDCARD).await?;
        let mut heartbeat_sub = bus.subscribe(HEARTBEAT_WILDCARD).await?;

        let client = Arc::new(Self {
            table: Arc::new(Mutex::new(BTreeMap::new())),
            observers: Arc::new(Mutex::new(Vec::new())),
            clock,
            grace,
            cancel: CancellationToken::new(),
            tasks: Mutex::new(Vec::new()),
        });

        for message in bus.replay(REGISTRY_WILDCARD).await? {
            client.apply_message(&message);
        }

        let pump = {
            let client = Arc::clone(&client);
            let cancel = client.cancel.clone();
            tokio::spawn(async move {
                loop {
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        msg = registry_sub.recv() => match msg {
                            Some(msg) => client.apply_message(&msg),
                            None => break,
                        },
                        msg = status_sub.recv() => match msg {
                            Some(msg) => client.apply_message(&msg),
                            None => break,
                        },
                        msg = heartbeat_sub.recv() => match msg {
                            Some(msg) => client.apply_message(&msg),
                            None => break,
                        },
                    }
                }
            })
        };

        let zombie_scan = {
            let client = Arc::clone(&client);
            let cancel = client.cancel.clone();
            tokio::spawn(async move {
                loop {
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(ZOMBIE_SCAN_PERIOD) => client.scan_for_zombies(),
                    }
                }
            })
        };

        client.tasks.lock().extend([pump, zombie_scan]);
        Ok(client)
    }

    /// One-shot copy of the current table.
    pub fn snapshot(&self) -> Vec<ServiceView> {
        self.table.lock().values().cloned().collect()
    }

    pub fn view(&self, service_id: &ServiceId) -> Option<ServiceView> {
        self.table.lock().get(service_id).cloned()
    }

    /// Streaming mode: invoke the callback with each updated view.
    pub fn follow(&self, on_update: UpdateFn) {
        self.observers.lock().push(on_update);
    }

    pub fn stop(&self) {
        self.cancel.cancel();
    }

    fn apply_message(&self, message: &Message) {
        let updated = if tcs_wire::subject_matches(REGISTRY_WILDCARD, &message.subject) {
            tcs_wire::decode::<RegistryEvent>(&message.payload)
                .map(|event| self.with_view(event.service_id.clone(), |v| v.apply_registry(&event)))
        } else if tcs_wire::subject_matches(STATUS_WILDCARD, &message.subject) {
            tcs_wire::decode::<StatusEvent>(&message.payload)
                .map(|event| self.with_view(event.service_id.clone(), |v| v.apply_status(&event)))
        } else if tcs_wire::subject_matches(HEARTBEAT_WILDCARD, &message.subject) {
            tcs_wire::decode::<HeartbeatEvent>(&message.payload).map(|event| {
                self.with_view(event.service_id.clone(), |v| v.apply_heartbeat(&event))
            })
        } else {
            return;
        };

        match updated {
            Ok(view) => self.notify(&view),
            Err(e) => {
                tracing::warn!(subject = message.subject, error = %e, "undecodable event skipped");
            }
        }
    }

    fn with_view(&self, service_id: ServiceId, apply: impl FnOnce(&mut ServiceView)) -> ServiceView {
        let mut table = self.table.lock();
        let view = table
            .entry(service_id.clone())
            .or_insert_with(|| ServiceView::new(service_id));
        apply(view);
        view.clone()
    }

    fn scan_for_zombies(&self) {
        let now_ms = self.clock.wall().epoch_ms();
        let grace_ms = self.grace.as_millis() as u64;
        let flipped: Vec<ServiceView> = {
            let mut table = self.table.lock();
            let mut flipped = Vec::new();
            for view in table.values_mut() {
                if view.check_zombie(now_ms, grace_ms) {
                    flipped.push(view.clone());
                }
            }
            flipped
        };
        for view in &flipped {
            tracing::warn!(service_id = %view.service_id, "heartbeat lapsed, marking zombie");
            self.notify(view);
        }
    }

    fn notify(&self, view: &ServiceView) {
        let observers = self.observers.lock().clone();
        for observer in observers {
            observer(view);
        }
    }
}

impl<C: Clock> Drop for DiscoveryClient<C> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
