use crate::util::time::current_time_secs;

/// Default minimum time between two repaints, in milliseconds
pub const DEFAULT_REDRAW_INTERVAL_MS: u64 = 16;

/// Coalesces redraw requests during continuous gestures.
///
/// A request arriving sooner than the interval after the last accepted one is
/// remembered as pending; [`RedrawThrottle::flush`] lets the host pick it up
/// on its next tick so the final state is always painted.
#[derive(Debug, Clone)]
pub struct RedrawThrottle {
    interval_secs: f64,
    last_redraw: Option<f64>,
    pending: bool,
}

impl Default for RedrawThrottle {
    fn default() -> Self {
        Self::new(DEFAULT_REDRAW_INTERVAL_MS)
    }
}

impl RedrawThrottle {
    pub fn new(interval_ms: u64) -> Self {
        Self {
            interval_secs: interval_ms as f64 / 1000.0,
            last_redraw: None,
            pending: false,
        }
    }

    pub fn interval_secs(&self) -> f64 {
        self.interval_secs
    }

    /// Whether a redraw requested at `now` (seconds) should go out.
    pub fn should_redraw(&mut self, now: f64) -> bool {
        let due = self
            .last_redraw
            .is_none_or(|last| now - last >= self.interval_secs || now < last);
        if due {
            self.last_redraw = Some(now);
            self.pending = false;
        } else {
            self.pending = true;
        }
        due
    }

    /// [`RedrawThrottle::should_redraw`] against the wall clock
    pub fn request(&mut self) -> bool {
        self.should_redraw(current_time_secs())
    }

    pub fn has_pending(&self) -> bool {
        self.pending
    }

    /// Release a pending request once the interval has passed.
    pub fn flush(&mut self, now: f64) -> bool {
        self.pending && self.should_redraw(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requests_inside_interval_are_coalesced() {
        let mut throttle = RedrawThrottle::new(16);
        assert!(throttle.should_redraw(1.0));
        assert!(!throttle.should_redraw(1.005));
        assert!(!throttle.should_redraw(1.010));
        assert!(throttle.has_pending());
        assert!(throttle.should_redraw(1.020));
        assert!(!throttle.has_pending());
    }

    #[test]
    fn test_flush_releases_pending_request() {
        let mut throttle = RedrawThrottle::new(16);
        assert!(throttle.should_redraw(0.0));
        assert!(!throttle.flush(0.001));
        assert!(!throttle.should_redraw(0.002));
        assert!(!throttle.flush(0.010));
        assert!(throttle.flush(0.020));
        assert!(!throttle.flush(0.100));
    }
}
