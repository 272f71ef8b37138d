//! Output throughput measurement

use std::time::Duration;

use tokio::time::Instant;

/// Counts output frames and reports the rate once per interval
#[derive(Debug)]
pub struct ThroughputMeter {
    interval: Duration,
    frames: u32,
    window_start: Instant,
}

impl ThroughputMeter {
    pub fn new(interval: Duration, now: Instant) -> Self {
        Self {
            interval,
            frames: 0,
            window_start: now,
        }
    }

    /// Count one frame. Returns frames per second when an interval has passed.
    pub fn record(&mut self, now: Instant) -> Option<f64> {
        self.frames += 1;

        let elapsed = now.saturating_duration_since(self.window_start);
        if elapsed < self.interval {
            return None;
        }

        let fps = self.frames as f64 / elapsed.as_secs_f64();
        self.frames = 0;
        self.window_start = now;
        Some(fps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reports_once_per_interval() {
        let start = Instant::now();
        let mut meter = ThroughputMeter::new(Duration::from_secs(1), start);

        for i in 1..30 {
            assert!(meter.record(start + Duration::from_millis(i * 33)).is_none());
        }
        let fps = meter.record(start + Duration::from_millis(1000)).unwrap();
        assert!((fps - 30.0).abs() < f64::EPSILON);

        // Window restarted
        assert!(meter.record(start + Duration::from_millis(1100)).is_none());
    }

    #[test]
    fn test_uses_actual_elapsed_time() {
        let start = Instant::now();
        let mut meter = ThroughputMeter::new(Duration::from_millis(500), start);

        assert!(meter.record(start + Duration::from_millis(100)).is_none());
        let fps = meter.record(start + Duration::from_secs(2)).unwrap();
        assert!((fps - 1.0).abs() < f64::EPSILON);
    }
}
