use core::time::Duration;

/// Fixed-interval ping timer driven by a millisecond uptime counter.
///
/// The last-ping mark starts at zero, so the first ping fires one full
/// interval after boot. Each ping resets the mark to the time it was
/// observed; late ticks are not compensated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PingSchedule {
    interval_ms: u64,
    last_ping_ms: u64,
}

impl PingSchedule {
    pub fn new(interval: Duration) -> Self {
        Self::from_millis(u64::try_from(interval.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn from_millis(interval_ms: u64) -> Self {
        Self {
            interval_ms,
            last_ping_ms: 0,
        }
    }

    pub fn interval_ms(&self) -> u64 {
        self.interval_ms
    }

    pub fn last_ping_ms(&self) -> u64 {
        self.last_ping_ms
    }

    /// Returns true and re-arms the timer when a ping is owed at `now_ms`.
    pub fn due(&mut self, now_ms: u64) -> bool {
        if now_ms.wrapping_sub(self.last_ping_ms) >= self.interval_ms {
            self.last_ping_ms = now_ms;
            true
        } else {
            false
        }
    }
}

impl Default for PingSchedule {
    fn default() -> Self {
        Self::from_millis(60_000)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn first_ping_one_interval_after_boot() {
        let mut schedule = PingSchedule::default();
        assert!(!schedule.due(0));
        assert!(!schedule.due(59_999));
        assert!(schedule.due(60_000));
        assert_eq!(schedule.last_ping_ms(), 60_000);
    }

    #[test]
    fn never_fires_more_often_than_interval() {
        let mut schedule = PingSchedule::new(Duration::from_secs(60));
        let mut fired = Vec::new();

        // 1s loop with occasional slow iterations.
        let mut now = 0_u64;
        for step in 0..600 {
            now += if step % 17 == 0 { 2_700 } else { 1_000 };
            if schedule.due(now) {
                fired.push(now);
            }
        }

        assert!(fired.len() > 5);
        for pair in fired.windows(2) {
            assert!(pair[1] - pair[0] >= 60_000, "pinged too soon: {pair:?}");
        }
    }

    #[test]
    fn late_tick_does_not_accumulate_drift() {
        let mut schedule = PingSchedule::from_millis(60_000);
        assert!(schedule.due(61_500));
        // Next deadline counts from the late tick, not from 60 000.
        assert!(!schedule.due(120_000));
        assert!(schedule.due(121_500));
    }

    #[test]
    fn survives_counter_wraparound() {
        let mut schedule = PingSchedule::from_millis(60_000);
        assert!(schedule.due(u64::MAX - 10_000));
        assert!(!schedule.due(u64::MAX));
        assert!(schedule.due(49_999));
    }
}
