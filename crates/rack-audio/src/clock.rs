use std::time::{Duration, Instant};

/// Deadline of one block.
#[derive(Debug, Copy, Clone)]
pub struct BlockTime {
    /// Monotonic block counter.
    pub index: u64,
    /// When the block is due to be handed to the output.
    pub due: Instant,
}

/// Schedules block deadlines at a fixed sample rate.
///
/// Deadlines are derived from a baseline plus `index * period`, so rounding
/// does not accumulate. If the caller falls more than `max_lag` behind, the
/// baseline is moved to "now" instead of bursting to catch up.
#[derive(Debug, Clone)]
pub struct BlockClock {
    start: Instant,
    period: Duration,
    index: u64,
    max_lag: Duration,
}

impl BlockClock {
    /// Clock for `block` samples at `sample_rate` Hz. Lag is capped at four
    /// periods.
    pub fn new(sample_rate: u32, block: usize) -> Self {
        let period = block_period(sample_rate, block);
        Self::with_max_lag(period, period * 4)
    }

    pub fn with_max_lag(period: Duration, max_lag: Duration) -> Self {
        debug_assert!(!period.is_zero());
        Self {
            start: Instant::now(),
            period,
            index: 0,
            max_lag,
        }
    }

    #[inline]
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Moves the baseline to now. Call after a long pause.
    pub fn reset(&mut self) {
        self.reset_at(Instant::now());
    }

    pub fn reset_at(&mut self, now: Instant) {
        self.start = now;
        self.index = 0;
    }

    /// Advances to the next block.
    pub fn tick(&mut self) -> BlockTime {
        self.tick_at(Instant::now())
    }

    pub fn tick_at(&mut self, now: Instant) -> BlockTime {
        let mut due = self.deadline(self.index);
        if now.saturating_duration_since(due) > self.max_lag {
            log::trace!("block clock resynced after {:?} lag", now - due);
            self.reset_at(now);
            due = now;
        }

        let bt = BlockTime {
            index: self.index,
            due,
        };
        self.index = self.index.wrapping_add(1);
        bt
    }

    fn deadline(&self, index: u64) -> Instant {
        let nanos = (self.period.as_nanos() as u64).saturating_mul(index);
        self.start + Duration::from_nanos(nanos)
    }
}

/// Wall-clock length of one block.
pub fn block_period(sample_rate: u32, block: usize) -> Duration {
    Duration::from_secs_f64(block as f64 / sample_rate.max(1) as f64)
}
