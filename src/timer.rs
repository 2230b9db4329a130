use std::time::{SystemTime, UNIX_EPOCH};

/// Cumulative filter-on time. Mirrors the persisted `startTime`/`elapsedTime`
/// pair: a wall-clock anchor while running plus a folded total.
///
/// Every method takes `now` explicitly (epoch millis) so the arithmetic stays
/// deterministic under test; production callers pass [`now_millis`]. The
/// anchor is wall-clock rather than monotonic because it is persisted: a
/// filter left on across sessions keeps counting from the same moment.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterTimer {
    /// Epoch millis of the moment the timer last started, while running.
    started_at: Option<u64>,
    /// Total accumulated across completed start/stop cycles.
    accumulated_ms: u64,
}

impl FilterTimer {
    pub fn new(started_at: Option<u64>, accumulated_ms: u64) -> Self {
        Self {
            started_at,
            accumulated_ms,
        }
    }

    pub fn is_running(&self) -> bool {
        self.started_at.is_some()
    }

    /// Anchor the running clock at `now`. A timer that is already running
    /// keeps its original anchor; starting twice must not lose time.
    pub fn start(&mut self, now: u64) {
        if self.started_at.is_none() {
            self.started_at = Some(now);
        }
    }

    /// Fold the running stretch into the total and clear the anchor.
    /// Stopping an already-stopped timer changes nothing.
    pub fn stop(&mut self, now: u64) {
        if let Some(started) = self.started_at.take() {
            // Clocks can jump backwards; never let the delta underflow.
            self.accumulated_ms += now.saturating_sub(started);
        }
    }

    /// Total millis including the currently running stretch, if any.
    pub fn elapsed(&self, now: u64) -> u64 {
        let running = self
            .started_at
            .map(|started| now.saturating_sub(started))
            .unwrap_or(0);
        self.accumulated_ms + running
    }

    pub fn started_at(&self) -> Option<u64> {
        self.started_at
    }

    pub fn accumulated_ms(&self) -> u64 {
        self.accumulated_ms
    }
}

/// Wall-clock now in epoch millis.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// `MM:SS` display; minutes keep growing past two digits.
pub fn format_elapsed(ms: u64) -> String {
    let total_seconds = ms / 1000;
    let minutes = total_seconds / 60;
    let seconds = total_seconds % 60;
    format!("{:02}:{:02}", minutes, seconds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accumulates_across_cycles() {
        let mut timer = FilterTimer::default();
        timer.start(1_000);
        timer.stop(4_500);
        timer.start(10_000);
        timer.stop(12_000);
        // (4500-1000) + (12000-10000); the gap in between does not count
        assert_eq!(timer.elapsed(99_999), 5_500);
    }

    #[test]
    fn test_running_elapsed_includes_delta() {
        let mut timer = FilterTimer::new(None, 2_000);
        timer.start(10_000);
        assert!(timer.is_running());
        assert_eq!(timer.elapsed(13_000), 5_000);
    }

    #[test]
    fn test_start_twice_keeps_first_anchor() {
        let mut timer = FilterTimer::default();
        timer.start(1_000);
        timer.start(8_000);
        timer.stop(9_000);
        assert_eq!(timer.elapsed(9_000), 8_000);
    }

    #[test]
    fn test_stop_twice_is_noop() {
        let mut timer = FilterTimer::default();
        timer.start(1_000);
        timer.stop(2_000);
        timer.stop(50_000);
        assert_eq!(timer.elapsed(50_000), 1_000);
    }

    #[test]
    fn test_backwards_clock_clamps_to_zero() {
        let mut timer = FilterTimer::default();
        timer.start(10_000);
        timer.stop(3_000);
        assert_eq!(timer.elapsed(3_000), 0);
    }

    #[test]
    fn test_resumes_from_persisted_anchor() {
        // a session that ended while running picks up the same anchor
        let timer = FilterTimer::new(Some(1_000), 30_000);
        assert!(timer.is_running());
        assert_eq!(timer.elapsed(11_000), 40_000);
    }

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(0), "00:00");
        assert_eq!(format_elapsed(999), "00:00");
        assert_eq!(format_elapsed(65_000), "01:05");
        assert_eq!(format_elapsed(600_000), "10:00");
        assert_eq!(format_elapsed(6_165_000), "102:45");
    }
}
