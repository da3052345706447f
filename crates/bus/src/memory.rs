// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process bus with the same retention semantics as a persistent
//! broker. Backs the in-process launcher mode and every test.

use crate::{Bus, BusError, Message, RequestStream, ServedRequest, Subscription};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;
use tcs_core::{Clock, SystemClock};
use tcs_wire::{subject_matches, RetentionClass, RetentionConfig};
use tokio::sync::{mpsc, oneshot};

struct StoredMessage {
    subject: String,
    payload: Vec<u8>,
    published_ms: u64,
}

struct SubscriberEntry {
    filter: String,
    tx: mpsc::UnboundedSender<Message>,
}

struct ResponderEntry {
    filter: String,
    tx: mpsc::UnboundedSender<ServedRequest>,
}

#[derive(Default)]
struct Inner {
    retained: HashMap<RetentionClass, Vec<StoredMessage>>,
    subscribers: Vec<SubscriberEntry>,
    responders: Vec<ResponderEntry>,
}

/// In-memory [`Bus`] implementation.
///
/// Retention follows [`RetentionConfig`]: registry subjects keep the
/// last N messages per subject, status and heartbeat subjects are
/// age-bounded against the injected clock.
pub struct InMemoryBus<C: Clock = SystemClock> {
    clock: C,
    retention: RetentionConfig,
    inner: Mutex<Inner>,
}

impl InMemoryBus {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for InMemoryBus {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> InMemoryBus<C> {
    pub fn with_clock(clock: C) -> Self {
        Self { clock, retention: RetentionConfig::default(), inner: Mutex::new(Inner::default()) }
    }

    pub fn with_retention(clock: C, retention: RetentionConfig) -> Self {
        Self { clock, retention, inner: Mutex::new(Inner::default()) }
    }

    /// Retained message count for one tier. Test observability.
    pub fn retained_len(&self, class: RetentionClass) -> usize {
        self.inner.lock().retained.get(&class).map_or(0, Vec::len)
    }

    fn prune(&self, inner: &mut Inner, class: RetentionClass) {
        let Some(stored) = inner.retained.get_mut(&class) else {
            return;
        };

        if let Some(max_age) = self.retention.max_age(class) {
            let cutoff =
                self.clock.wall().epoch_ms().saturating_sub(max_age.as_millis() as u64);
            stored.retain(|m| m.published_ms >= cutoff);
        }

        if class == RetentionClass::Registry {
            let cap = self.retention.registry_max_msgs as usize;
            let mut per_subject: HashMap<String, usize> = HashMap::new();
            for m in stored.iter() {
                *per_subject.entry(m.subject.clone()).or_default() += 1;
            }
            // Drop oldest entries of any subject over its cap.
            let mut over: HashMap<&str, usize> = HashMap::new();
            for (subject, count) in &per_subject {
                if *count > cap {
                    over.insert(subject.as_str(), count - cap);
                }
            }
            if !over.is_empty() {
                let mut kept = Vec::with_capacity(stored.len());
                for m in stored.drain(..) {
                    match over.get_mut(m.subject.as_str()) {
                        Some(excess) if *excess > 0 => *excess -= 1,
                        _ => kept.push(m),
                    }
                }
                *stored = kept;
            }
        }
    }
}

#[async_trait]
impl<C: Clock + 'static> Bus for InMemoryBus<C> {
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> Result<(), BusError> {
        let mut inner = self.inner.lock();

        if let Some(class) = RetentionClass::classify(subject) {
            inner.retained.entry(class).or_default().push(StoredMessage {
                subject: subject.to_string(),
                payload: payload.clone(),
                published_ms: self.clock.wall().epoch_ms(),
            });
            self.prune(&mut inner, class);
        }

        inner.subscribers.retain(|entry| !entry.tx.is_closed());
        for entry in &inner.subscribers {
            if subject_matches(&entry.filter, subject) {
                let _ = entry
                    .tx
                    .send(Message { subject: subject.to_string(), payload: payload.clone() });
            }
        }
        Ok(())
    }

    async fn subscribe(&self, filter: &str) -> Result<Subscription, BusError> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.lock().subscribers.push(SubscriberEntry { filter: filter.to_string(), tx });
        Ok(Subscription::new(rx))
    }

    async fn replay(&self, filter: &str) -> Result<Vec<Message>, BusError> {
        let mut inner = self.inner.lock();
        for class in
            [RetentionClass::Registry, RetentionClass::Status, RetentionClass::Heartbeat]
        {
            self.prune(&mut inner, class);
        }

        let mut matches: Vec<(u64, Message)> = inner
            .retained
            .values()
            .flatten()
            .filter(|m| subject_matches(filter, &m.subject))
            .map(|m| {
                (
                    m.published_ms,
                    Message { subject: m.subject.clone(), payload: m.payload.clone() },
                )
            })
            .collect();
        matches.sort_by_key(|(ms, _)| *ms);
        Ok(matches.into_iter().map(|(_, m)| m).collect())
    }

    async fn request(
        &self,
        subject: &str,
        payload: Vec<u8>,
        timeout: Duration,
    ) -> Result<Vec<u8>, BusError> {
        let responder = {
            let mut inner = self.inner.lock();
            inner.responders.retain(|entry| !entry.tx.is_closed());
            inner
                .responders
                .iter()
                .find(|entry| subject_matches(&entry.filter, subject))
                .map(|entry| entry.tx.clone())
        };
        let Some(responder) = responder else {
            return Err(BusError::NoResponder(subject.to_string()));
        };

        let (reply_tx, reply_rx) = oneshot::channel();
        responder
            .send(ServedRequest::new(subject.to_string(), payload, reply_tx))
            .map_err(|_| BusError::NoResponder(subject.to_string()))?;

        match tokio::time::timeout(timeout, reply_rx).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(_)) => Err(BusError::NoResponder(subject.to_string())),
            Err(_) => Err(BusError::Timeout(subject.to_string())),
        }
    }

    async fn serve(&self, filter: &str) -> Result<RequestStream, BusError> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.lock().responders.push(ResponderEntry { filter: filter.to_string(), tx });
        Ok(RequestStream::new(rx))
    }

    async fn flush(&self) -> Result<(), BusError> {
        // Publishes are applied synchronously.
        Ok(())
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
