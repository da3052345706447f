// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The three service execution shapes.
//!
//! Permanent services implement [`Service`] directly and own their
//! concurrency. Blocking-loop services implement [`LoopService`] and
//! are driven by [`LoopDriver`]; single-shot services implement
//! [`ShotService`] and are driven by [`ShotDriver`]. The drivers own
//! the `Service` impl, so a loop or shot service structurally cannot
//! supply its own `start`/`stop`.
//!
//! Everything here is cooperative on one scheduler: blocking
//! synchronous I/O inside a hook stalls every service in the process
//! and is a bug in the service.

use crate::error::ServiceError;
use async_trait::async_trait;
use tcs_config::JsonMap;
use tcs_core::{Clock, ServiceId, SystemClock};
use tcs_monitor::Monitor;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// What a service run ended with, reported to the controller when the
/// service finishes of its own accord.
#[derive(Debug, Clone)]
pub struct ServiceExit {
    pub result: Result<(), ServiceError>,
}

/// Everything a service sees from the framework.
#[derive(Clone)]
pub struct ServiceContext<C: Clock = SystemClock> {
    pub service_id: ServiceId,
    /// Resolved, schema-typed configuration.
    pub config: JsonMap,
    /// This instance's monitor node; services report through it.
    pub monitor: Monitor<C>,
    /// Cancelled when the controller stops the service.
    pub cancel: CancellationToken,
    exit_tx: mpsc::UnboundedSender<ServiceExit>,
}

impl<C: Clock + 'static> ServiceContext<C> {
    pub fn new(
        service_id: ServiceId,
        config: JsonMap,
        monitor: Monitor<C>,
    ) -> (Self, mpsc::UnboundedReceiver<ServiceExit>) {
        let (exit_tx, exit_rx) = mpsc::unbounded_channel();
        let ctx = Self {
            service_id,
            config,
            monitor,
            cancel: CancellationToken::new(),
            exit_tx,
        };
        (ctx, exit_rx)
    }

    /// Report that the service finished on its own. Drivers call this;
    /// permanent services may call it from their own tasks.
    pub fn notify_exit(&self, result: Result<(), ServiceError>) {
        let _ = self.exit_tx.send(ServiceExit { result });
    }

    /// Typed config field access.
    pub fn config_str(&self, key: &str) -> Option<&str> {
        self.config.get(key).and_then(serde_json::Value::as_str)
    }

    pub fn config_i64(&self, key: &str) -> Option<i64> {
        self.config.get(key).and_then(serde_json::Value::as_i64)
    }

    pub fn config_f64(&self, key: &str) -> Option<f64> {
        self.config.get(key).and_then(serde_json::Value::as_f64)
    }

    pub fn config_bool(&self, key: &str) -> Option<bool> {
        self.config.get(key).and_then(serde_json::Value::as_bool)
    }
}

/// The capability set the controller drives: permanent services
/// implement this directly.
#[async_trait]
pub trait Service<C: Clock>: Send {
    async fn start(&mut self, ctx: &ServiceContext<C>) -> Result<(), ServiceError>;
    async fn stop(&mut self) -> Result<(), ServiceError>;
}

pub type BoxedService<C> = Box<dyn Service<C>>;

/// Blocking-loop shape: a main loop with optional start/stop hooks.
#[async_trait]
pub trait LoopService<C: Clock>: Send + 'static {
    async fn on_start(&mut self, _ctx: &ServiceContext<C>) -> Result<(), ServiceError> {
        Ok(())
    }

    /// The main loop. Cancellation of the driver propagates here via
    /// `ctx.cancel` and is expected to unwind cleanly.
    async fn run(&mut self, ctx: &ServiceContext<C>) -> Result<(), ServiceError>;

    async fn on_stop(&mut self) -> Result<(), ServiceError> {
        Ok(())
    }
}

/// Framework driver for [`LoopService`]: `on_start`, then `run` until
/// completion or cancellation, then `on_stop`.
pub struct LoopDriver<S> {
    service: Option<S>,
    handle: Option<JoinHandle<Result<(), ServiceError>>>,
}

impl<S> LoopDriver<S> {
    pub fn new(service: S) -> Self {
        Self { service: Some(service), handle: None }
    }
}

#[async_trait]
impl<S, C> Service<C> for LoopDriver<S>
where
    S: LoopService<C>,
    C: Clock + 'static,
{
    async fn start(&mut self, ctx: &ServiceContext<C>) -> Result<(), ServiceError> {
        let mut service = self
            .service
            .take()
            .ok_or_else(|| ServiceError::new("loop service already started"))?;
        service.on_start(ctx).await?;

        let ctx = ctx.clone();
        self.handle = Some(tokio::spawn(async move {
            let run_result = tokio::select! {
                _ = ctx.cancel.cancelled() => Ok(()),
                result = service.run(&ctx) => result,
            };
            let stop_result = service.on_stop().await;
            let result = run_result.and(stop_result);
            if !ctx.cancel.is_cancelled() {
                ctx.notify_exit(result.clone());
            }
            result
        }));
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), ServiceError> {
        match self.handle.take() {
            Some(handle) => handle
                .await
                .map_err(|e| ServiceError::new(format!("loop driver task died: {e}")))?,
            None => Ok(()),
        }
    }
}

/// Single-shot shape: one `execute`, then a terminal state.
#[async_trait]
pub trait ShotService<C: Clock>: Send + 'static {
    async fn execute(&mut self, ctx: &ServiceContext<C>) -> Result<(), ServiceError>;
}

/// Framework driver for [`ShotService`].
pub struct ShotDriver<S> {
    service: Option<S>,
    handle: Option<JoinHandle<Result<(), ServiceError>>>,
}

impl<S> ShotDriver<S> {
    pub fn new(service: S) -> Self {
        Self { service: Some(service), handle: None }
    }
}

#[async_trait]
impl<S, C> Service<C> for ShotDriver<S>
where
    S: ShotService<C>,
    C: Clock + 'static,
{
    async fn start(&mut self, ctx: &ServiceContext<C>) -> Result<(), ServiceError> {
        let mut service = self
            .service
            .take()
            .ok_or_else(|| ServiceError::new("single-shot service already started"))?;

        let ctx = ctx.clone();
        self.handle = Some(tokio::spawn(async move {
            let result = tokio::select! {
                _ = ctx.cancel.cancelled() => Ok(()),
                result = service.execute(&ctx) => result,
            };
            if !ctx.cancel.is_cancelled() {
                ctx.notify_exit(result.clone());
            }
            result
        }));
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), ServiceError> {
        match self.handle.take() {
            Some(handle) => handle
                .await
                .map_err(|e| ServiceError::new(format!("single-shot task died: {e}")))?,
            None => Ok(()),
        }
    }
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
