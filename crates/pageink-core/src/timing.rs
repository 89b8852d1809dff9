//! Clock types and rate limiting for layout recomputation.

// Use web-time on WASM, std::time otherwise
#[cfg(target_arch = "wasm32")]
pub use web_time::{Duration, Instant};
#[cfg(not(target_arch = "wasm32"))]
pub use std::time::{Duration, Instant};

/// Coalesces bursts of requests into at most one run per interval.
///
/// Requests only mark work as pending; the owner polls [`Debouncer::ready`]
/// from its tick and calls [`Debouncer::mark_run`] once the work is done.
/// A request arriving inside the interval is kept and runs on the first
/// poll after the interval elapses.
#[derive(Debug, Clone)]
pub struct Debouncer {
    interval: Duration,
    last_run: Option<Instant>,
    pending: bool,
}

impl Debouncer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_run: None,
            pending: false,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Ask for a run.
    pub fn request(&mut self) {
        self.pending = true;
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Whether a pending request may run at `now`.
    pub fn ready(&self, now: Instant) -> bool {
        if !self.pending {
            return false;
        }
        match self.last_run {
            Some(last) => now.saturating_duration_since(last) >= self.interval,
            None => true,
        }
    }

    /// Record a run at `now`, satisfying any pending request.
    pub fn mark_run(&mut self, now: Instant) {
        self.last_run = Some(now);
        self.pending = false;
    }

    /// Drop a pending request without running it.
    pub fn cancel(&mut self) {
        self.pending = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle_debouncer_is_not_ready() {
        let debouncer = Debouncer::new(Duration::from_millis(50));
        assert!(!debouncer.ready(Instant::now()));
    }

    #[test]
    fn test_first_request_runs_immediately() {
        let mut debouncer = Debouncer::new(Duration::from_millis(50));
        debouncer.request();
        assert!(debouncer.ready(Instant::now()));
    }

    #[test]
    fn test_burst_is_coalesced() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(Duration::from_millis(50));
        debouncer.request();
        debouncer.mark_run(start);

        let mut runs = 0;
        for ms in 1..=120 {
            let now = start + Duration::from_millis(ms);
            debouncer.request();
            if debouncer.ready(now) {
                debouncer.mark_run(now);
                runs += 1;
            }
        }
        // Runs at 50ms and 100ms only.
        assert_eq!(runs, 2);
        assert!(debouncer.is_pending());
    }

    #[test]
    fn test_trailing_request_runs_after_interval() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(Duration::from_millis(50));
        debouncer.mark_run(start);
        debouncer.request();

        assert!(!debouncer.ready(start + Duration::from_millis(20)));
        assert!(debouncer.ready(start + Duration::from_millis(50)));
    }

    #[test]
    fn test_cancel() {
        let mut debouncer = Debouncer::new(Duration::from_millis(50));
        debouncer.request();
        debouncer.cancel();
        assert!(!debouncer.ready(Instant::now()));
    }
}
