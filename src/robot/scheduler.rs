//! Telemetry cadence

use std::time::{Duration, Instant};

/// Shortest telemetry interval the sensor loop supports
pub const MIN_SAMPLE_INTERVAL_US: u32 = 5_000;

/// Telemetry interval used until the host asks for another one
pub const DEFAULT_SAMPLE_INTERVAL_US: u32 = 5_000_000;

/// Apply the interval floor
pub fn clamp_sample_interval(interval_us: u32) -> u32 {
    interval_us.max(MIN_SAMPLE_INTERVAL_US)
}

/// Decides when the next sensor sample should be sent
///
/// The first poll is always due; each due poll schedules the next one a
/// full interval later. Changing the interval takes effect after the
/// currently scheduled tick.
#[derive(Debug, Clone)]
pub struct TelemetryScheduler {
    interval: Duration,
    next_due: Option<Instant>,
}

impl TelemetryScheduler {
    pub fn new(interval_us: u32) -> Self {
        Self {
            interval: interval_from_us(interval_us),
            next_due: None,
        }
    }

    /// Set the interval, raising it to the floor if needed
    ///
    /// # Returns
    ///
    /// * `u32` - The interval actually applied
    pub fn set_interval_us(&mut self, interval_us: u32) -> u32 {
        self.interval = interval_from_us(interval_us);
        self.interval_us()
    }

    pub fn interval_us(&self) -> u32 {
        self.interval.as_micros() as u32
    }

    /// Whether a sample is due at `now`
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.next_due {
            Some(due) if now < due => false,
            _ => {
                self.next_due = Some(now + self.interval);
                true
            }
        }
    }
}

impl Default for TelemetryScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_INTERVAL_US)
    }
}

fn interval_from_us(interval_us: u32) -> Duration {
    Duration::from_micros(u64::from(clamp_sample_interval(interval_us)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_sample_interval() {
        assert_eq!(clamp_sample_interval(0), 5_000);
        assert_eq!(clamp_sample_interval(4_999), 5_000);
        assert_eq!(clamp_sample_interval(5_000), 5_000);
        assert_eq!(clamp_sample_interval(u32::MAX), u32::MAX);
    }

    #[test]
    fn test_initial_interval_is_clamped() {
        assert_eq!(TelemetryScheduler::new(1).interval_us(), MIN_SAMPLE_INTERVAL_US);
        assert_eq!(TelemetryScheduler::default().interval_us(), DEFAULT_SAMPLE_INTERVAL_US);
    }

    #[test]
    fn test_set_interval_reports_applied_value() {
        let mut scheduler = TelemetryScheduler::default();

        assert_eq!(scheduler.set_interval_us(1_000), 5_000);
        assert_eq!(scheduler.set_interval_us(20_000), 20_000);
    }

    #[test]
    fn test_poll_schedule() {
        let mut scheduler = TelemetryScheduler::new(10_000);
        let start = Instant::now();

        assert!(scheduler.poll(start));
        assert!(!scheduler.poll(start + Duration::from_micros(9_999)));
        assert!(scheduler.poll(start + Duration::from_micros(10_000)));
        assert!(!scheduler.poll(start + Duration::from_micros(15_000)));
        assert!(scheduler.poll(start + Duration::from_micros(20_000)));
    }

    #[test]
    fn test_late_poll_does_not_burst() {
        let mut scheduler = TelemetryScheduler::new(10_000);
        let start = Instant::now();

        assert!(scheduler.poll(start));
        assert!(scheduler.poll(start + Duration::from_millis(100)));
        assert!(!scheduler.poll(start + Duration::from_millis(105)));
    }
}
