// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Abstract message-bus capability.
//!
//! The framework never talks to a concrete broker; everything goes
//! through the [`Bus`] trait. Persistent subjects fall into the three
//! retention tiers declared in `tcs-wire`; `replay` serves their
//! history for warm starts. Request/response is core messaging and is
//! never retained.
//!
//! Implementations must handle reconnection and backoff internally and
//! surface transient failures as [`BusError`] values, never panics.

pub mod memory;

pub use memory::InMemoryBus;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

/// Shared bus connection, one per process context.
pub type BusHandle = Arc<dyn Bus>;

/// Transport failures. Publishing callers treat every variant as
/// non-fatal.
#[derive(Debug, Error)]
pub enum BusError {
    #[error("bus connection closed")]
    Closed,

    #[error("no responder for subject: {0}")]
    NoResponder(String),

    #[error("request timed out on subject: {0}")]
    Timeout(String),

    #[error("transport error: {0}")]
    Transport(String),
}

/// A published message as seen by subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub subject: String,
    pub payload: Vec<u8>,
}

/// Live subscription feed.
pub struct Subscription {
    rx: mpsc::UnboundedReceiver<Message>,
}

impl Subscription {
    pub fn new(rx: mpsc::UnboundedReceiver<Message>) -> Self {
        Self { rx }
    }

    /// Next message; `None` once the bus side is gone.
    pub async fn recv(&mut self) -> Option<Message> {
        self.rx.recv().await
    }

    /// Drain without waiting.
    pub fn try_recv(&mut self) -> Option<Message> {
        self.rx.try_recv().ok()
    }
}

/// An inbound request handed to a server loop.
pub struct ServedRequest {
    pub subject: String,
    pub payload: Vec<u8>,
    reply: oneshot::Sender<Vec<u8>>,
}

impl ServedRequest {
    pub fn new(subject: String, payload: Vec<u8>, reply: oneshot::Sender<Vec<u8>>) -> Self {
        Self { subject, payload, reply }
    }

    /// Send the response. Errors are ignored: the requester may have
    /// timed out and dropped its receiver.
    pub fn respond(self, payload: Vec<u8>) {
        let _ = self.reply.send(payload);
    }
}

/// Inbound request feed for one served filter.
pub struct RequestStream {
    rx: mpsc::UnboundedReceiver<ServedRequest>,
}

impl RequestStream {
    pub fn new(rx: mpsc::UnboundedReceiver<ServedRequest>) -> Self {
        Self { rx }
    }

    pub async fn next(&mut self) -> Option<ServedRequest> {
        self.rx.recv().await
    }
}

/// The bus capability consumed by monitors, the launcher and the
/// discovery client.
#[async_trait]
pub trait Bus: Send + Sync {
    /// Publish to a subject. Retained when the subject belongs to a
    /// persistence tier.
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> Result<(), BusError>;

    /// Subscribe to live traffic matching a filter (`*`/`>` wildcards).
    async fn subscribe(&self, filter: &str) -> Result<Subscription, BusError>;

    /// Fetch retained history matching a filter, oldest first.
    async fn replay(&self, filter: &str) -> Result<Vec<Message>, BusError>;

    /// Core request/response round trip.
    async fn request(
        &self,
        subject: &str,
        payload: Vec<u8>,
        timeout: Duration,
    ) -> Result<Vec<u8>, BusError>;

    /// Register as the responder for a filter.
    async fn serve(&self, filter: &str) -> Result<RequestStream, BusError>;

    /// Wait until pending publishes are on the wire.
    async fn flush(&self) -> Result<(), BusError>;
}
