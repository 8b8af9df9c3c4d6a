//! Configuration of the sync engine.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use vigil_primitives::BlockNumber;

/// Default delay between two validation passes.
pub const DEFAULT_POLLING_INTERVAL: Duration = Duration::from_secs(7);

/// Default number of most recent blocks re-checked on every validation pass.
pub const DEFAULT_VALIDATION_WINDOW: u64 = 15;

/// Configuration consumed by the [`SyncLoop`](crate::SyncLoop).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Lowest block number that is indexed. Nothing below it is fetched or validated.
    pub starting_block_number: BlockNumber,
    /// Delay between two validation passes.
    #[serde(rename = "polling_interval_secs", with = "duration_secs")]
    pub polling_interval: Duration,
    /// Number of most recent blocks re-checked on every validation pass.
    pub validation_window: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            starting_block_number: 0,
            polling_interval: DEFAULT_POLLING_INTERVAL,
            validation_window: DEFAULT_VALIDATION_WINDOW,
        }
    }
}

impl SyncConfig {
    /// Sets the starting block number.
    pub const fn with_starting_block_number(mut self, number: BlockNumber) -> Self {
        self.starting_block_number = number;
        self
    }

    /// Sets the polling interval.
    pub const fn with_polling_interval(mut self, interval: Duration) -> Self {
        self.polling_interval = interval;
        self
    }

    /// Sets the validation window size.
    pub const fn with_validation_window(mut self, window: u64) -> Self {
        self.validation_window = window;
        self
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub(super) fn serialize<S: Serializer>(value: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(value.as_secs())
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_secs)
    }
}
