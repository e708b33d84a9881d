//! Bounded-wait helpers: exponential backoff for verification polls.

use std::time::Duration;

/// Exponential backoff with a cap. First delay is the base, doubling per
/// call until the cap.
#[derive(Debug, Clone)]
pub struct Backoff {
    current: Duration,
    cap: Duration,
}

impl Backoff {
    /// Default verification backoff: 500 ms base, 8 s cap.
    #[inline]
    #[must_use]
    pub fn verification() -> Self {
        Self::new(Duration::from_millis(500), Duration::from_secs(8))
    }

    /// Create a backoff from base and cap.
    #[inline]
    #[must_use]
    pub fn new(base: Duration, cap: Duration) -> Self {
        Self { current: base, cap }
    }

    /// Return the next delay and advance.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = std::cmp::min(self.current.saturating_mul(2), self.cap);
        delay
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_until_cap() {
        let mut backoff = Backoff::new(Duration::from_millis(500), Duration::from_secs(2));
        assert_eq!(backoff.next_delay(), Duration::from_millis(500));
        assert_eq!(backoff.next_delay(), Duration::from_millis(1000));
        assert_eq!(backoff.next_delay(), Duration::from_millis(2000));
        assert_eq!(backoff.next_delay(), Duration::from_millis(2000));
    }
}
