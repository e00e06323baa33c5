//! Input clock configuration.

use std::time::Duration;

use crate::Ticks;

/// Clock driving a device.
///
/// The host scheduler hands out time slices; the clock converts them into
/// the cycle budget the CPU runs for, and back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MasterClock {
    /// Clock frequency in Hz (e.g. `7_833_600` for a Macintosh 68000).
    pub frequency_hz: u64,
}

impl MasterClock {
    #[must_use]
    pub const fn new(frequency_hz: u64) -> Self {
        Self { frequency_hz }
    }

    /// Ticks per frame at the given frame rate (integer division).
    #[must_use]
    pub const fn ticks_per_frame(&self, frames_per_second: u64) -> Ticks {
        Ticks::new(self.frequency_hz / frames_per_second)
    }

    /// Number of whole cycles that elapse in `duration`.
    #[must_use]
    pub fn cycles_in(&self, duration: Duration) -> Ticks {
        let nanos = duration.as_nanos() * u128::from(self.frequency_hz) / 1_000_000_000;
        Ticks::new(u64::try_from(nanos).unwrap_or(u64::MAX))
    }

    /// Wall time taken by `ticks` cycles.
    #[must_use]
    pub fn duration_of(&self, ticks: Ticks) -> Duration {
        if self.frequency_hz == 0 {
            return Duration::ZERO;
        }
        let nanos = u128::from(ticks.get()) * 1_000_000_000 / u128::from(self.frequency_hz);
        Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }
}
