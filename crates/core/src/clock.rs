// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Time sources.
//!
//! Two readings, two purposes: `now()` is monotonic and feeds uptime
//! and restart-window accounting; `wall()` is the UTC stamp that goes
//! on the wire. Components take a `Clock` so tests can steer both.

use crate::stamp::UtcStamp;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A source of monotonic and wall-clock time.
pub trait Clock: Clone + Send + Sync {
    fn now(&self) -> Instant;
    fn wall(&self) -> UtcStamp;
}

/// The real clocks of the host.
#[derive(Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn wall(&self) -> UtcStamp {
        UtcStamp::now()
    }
}

/// Both readings frozen at construction, moved only by `advance`.
struct FakeNow {
    base: Instant,
    elapsed: Duration,
    wall_ms: u64,
}

/// Steerable clock for tests. Clones share the same readings.
#[derive(Clone)]
pub struct FakeClock {
    inner: Arc<Mutex<FakeNow>>,
}

impl FakeClock {
    /// A clock whose wall time starts at the UNIX epoch.
    pub fn new() -> Self {
        Self::at_epoch_ms(0)
    }

    /// A clock whose wall time starts at the given epoch offset.
    pub fn at_epoch_ms(wall_ms: u64) -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeNow {
                base: Instant::now(),
                elapsed: Duration::ZERO,
                wall_ms,
            })),
        }
    }

    /// Move both readings forward.
    pub fn advance(&self, by: Duration) {
        let mut inner = self.inner.lock();
        inner.elapsed += by;
        inner.wall_ms += by.as_millis() as u64;
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        let inner = self.inner.lock();
        inner.base + inner.elapsed
    }

    fn wall(&self) -> UtcStamp {
        UtcStamp::from_epoch_ms(self.inner.lock().wall_ms)
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
