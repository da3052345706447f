// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! UTC wall-clock timestamps in the wire representation.
//!
//! Every timestamp on the bus is a 7-tuple `[Y, M, D, h, m, s, µs]` in
//! UTC. The tuple form keeps payloads language-neutral and trivially
//! comparable.

use chrono::{DateTime, Datelike, TimeZone, Timelike, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// UTC timestamp, serialized as a 7-element array.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UtcStamp {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
    pub micros: u32,
}

impl UtcStamp {
    /// The UNIX epoch, used as the fallback for out-of-range inputs.
    pub const EPOCH: UtcStamp =
        UtcStamp { year: 1970, month: 1, day: 1, hour: 0, minute: 0, second: 0, micros: 0 };

    /// Current UTC time.
    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self {
            year: dt.year(),
            month: dt.month(),
            day: dt.day(),
            hour: dt.hour(),
            minute: dt.minute(),
            second: dt.second(),
            micros: dt.timestamp_subsec_micros(),
        }
    }

    /// Build from milliseconds since the UNIX epoch.
    pub fn from_epoch_ms(ms: u64) -> Self {
        DateTime::<Utc>::from_timestamp_millis(ms as i64)
            .map(Self::from_datetime)
            .unwrap_or(Self::EPOCH)
    }

    /// Convert back to a `DateTime`. `None` when the fields do not name
    /// a real calendar instant (possible for hand-built stamps).
    pub fn to_datetime(self) -> Option<DateTime<Utc>> {
        Utc.with_ymd_and_hms(self.year, self.month, self.day, self.hour, self.minute, self.second)
            .single()
            .map(|dt| dt + chrono::Duration::microseconds(i64::from(self.micros)))
    }

    /// Milliseconds since the UNIX epoch; 0 for invalid stamps.
    pub fn epoch_ms(self) -> u64 {
        self.to_datetime().map(|dt| dt.timestamp_millis().max(0) as u64).unwrap_or(0)
    }
}

impl Serialize for UtcStamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (self.year, self.month, self.day, self.hour, self.minute, self.second, self.micros)
            .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for UtcStamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let (year, month, day, hour, minute, second, micros) =
            <(i32, u32, u32, u32, u32, u32, u32)>::deserialize(deserializer)?;
        Ok(UtcStamp { year, month, day, hour, minute, second, micros })
    }
}

#[cfg(test)]
#[path = "stamp_tests.rs"]
mod tests;
