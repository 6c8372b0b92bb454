//! Depth-one "latest request wins" queue with a minimum run interval.
//!
//! Input (pointer moves) can be submitted at any rate; only the most recent
//! pending value is kept, and [`LatestRequest::poll`] hands it out at most
//! once per interval. Callers pass `now` explicitly so behaviour is
//! deterministic under test.

use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct LatestRequest<T> {
    interval: Duration,
    pending: Option<T>,
    last_run: Option<Instant>,
}

impl<T> LatestRequest<T> {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            pending: None,
            last_run: None,
        }
    }

    /// Queue `value`, replacing any pending one. Returns `true` if a pending
    /// value was dropped.
    pub fn submit(&mut self, value: T) -> bool {
        self.pending.replace(value).is_some()
    }

    /// Take the pending value if one exists and the interval has elapsed.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        let due = self
            .last_run
            .map_or(true, |last| now.saturating_duration_since(last) >= self.interval);
        if !due {
            return None;
        }
        let value = self.pending.take()?;
        self.last_run = Some(now);
        Some(value)
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn clear(&mut self) {
        self.pending = None;
        self.last_run = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latest_submission_wins() {
        let mut queue = LatestRequest::new(Duration::from_millis(16));
        assert!(!queue.submit(1));
        assert!(queue.submit(2));
        assert!(queue.submit(3));
        assert_eq!(queue.poll(Instant::now()), Some(3));
        assert!(!queue.has_pending());
    }

    #[test]
    fn poll_respects_interval() {
        let start = Instant::now();
        let mut queue = LatestRequest::new(Duration::from_millis(16));

        queue.submit("a");
        assert_eq!(queue.poll(start), Some("a"));

        queue.submit("b");
        assert_eq!(queue.poll(start + Duration::from_millis(5)), None);
        assert!(queue.has_pending());
        assert_eq!(queue.poll(start + Duration::from_millis(16)), Some("b"));
    }

    #[test]
    fn clear_drops_pending_and_resets_interval() {
        let start = Instant::now();
        let mut queue = LatestRequest::new(Duration::from_secs(60));
        queue.submit(1);
        queue.poll(start);
        queue.submit(2);
        queue.clear();
        assert!(!queue.has_pending());

        queue.submit(3);
        assert_eq!(queue.poll(start), Some(3));
    }
}
