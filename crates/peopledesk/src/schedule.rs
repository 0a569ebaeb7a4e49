//! Time sources and delayed work.
//!
//! Everything time-dependent in the client (search debounce, notice expiry)
//! reads the time from a [`Clock`] instead of calling `Instant::now()`
//! directly, so tests can drive it by hand with [`ManualClock`]. Instants are
//! `tokio::time::Instant`, which also follows a paused tokio clock.

use std::cell::Cell;
use std::fmt;
use std::time::Duration;

use tokio::time::Instant;
use tracing::trace;

/// A source of the current instant.
pub trait Clock: fmt::Debug {
    /// The current instant.
    fn now(&self) -> Instant;
}

/// The runtime clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Cell<Instant>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    /// Start at the current runtime instant.
    #[must_use]
    pub fn new() -> Self {
        Self {
            now: Cell::new(Instant::now()),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.now.get()
    }
}

/// A cancellable, restartable delayed value.
///
/// Scheduling while a value is pending replaces it and restarts the quiet
/// period; [`Debouncer::tick`] hands the value out once the period has passed.
///
/// ```
/// use std::time::Duration;
/// use peopledesk::schedule::{Clock, Debouncer, ManualClock};
///
/// let clock = ManualClock::new();
/// let mut search = Debouncer::new(Duration::from_millis(200));
///
/// search.schedule("an".to_string(), clock.now());
/// clock.advance(Duration::from_millis(150));
/// search.schedule("ana".to_string(), clock.now());
/// clock.advance(Duration::from_millis(150));
/// assert_eq!(search.tick(clock.now()), None);
/// clock.advance(Duration::from_millis(50));
/// assert_eq!(search.tick(clock.now()), Some("ana".to_string()));
/// ```
#[derive(Debug, Clone)]
pub struct Debouncer<T> {
    delay: Duration,
    pending: Option<(T, Instant)>,
}

impl<T> Debouncer<T> {
    /// Create a debouncer with the given quiet period.
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    /// The quiet period.
    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Schedule `value`, replacing anything pending and restarting the timer.
    pub fn schedule(&mut self, value: T, now: Instant) {
        self.pending = Some((value, now + self.delay));
        trace!(delay_ms = self.delay.as_millis(), "Debounce scheduled");
    }

    /// Drop the pending value, if any.
    pub fn cancel(&mut self) {
        if self.pending.take().is_some() {
            trace!("Debounce cancelled");
        }
    }

    /// Whether a value is waiting.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// When the pending value becomes due.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, at)| *at)
    }

    /// Take the pending value if its quiet period has elapsed at `now`.
    pub fn tick(&mut self, now: Instant) -> Option<T> {
        let due = matches!(&self.pending, Some((_, at)) if now >= *at);
        if due {
            self.pending.take().map(|(value, _)| value)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_nothing_fires_before_delay() {
        let clock = ManualClock::new();
        let mut debouncer = Debouncer::new(Duration::from_millis(200));

        debouncer.schedule("a", clock.now());
        clock.advance(Duration::from_millis(199));
        assert_eq!(debouncer.tick(clock.now()), None);
        assert!(debouncer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_once_after_delay() {
        let clock = ManualClock::new();
        let mut debouncer = Debouncer::new(Duration::from_millis(200));

        debouncer.schedule("a", clock.now());
        clock.advance(Duration::from_millis(200));
        assert_eq!(debouncer.tick(clock.now()), Some("a"));
        assert_eq!(debouncer.tick(clock.now()), None);
        assert!(!debouncer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reschedule_restarts_quiet_period() {
        let clock = ManualClock::new();
        let mut debouncer = Debouncer::new(Duration::from_millis(200));

        debouncer.schedule("a", clock.now());
        clock.advance(Duration::from_millis(150));
        debouncer.schedule("ab", clock.now());
        clock.advance(Duration::from_millis(150));
        assert_eq!(debouncer.tick(clock.now()), None);

        clock.advance(Duration::from_millis(50));
        assert_eq!(debouncer.tick(clock.now()), Some("ab"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel() {
        let clock = ManualClock::new();
        let mut debouncer = Debouncer::new(Duration::from_millis(10));

        debouncer.schedule(1, clock.now());
        debouncer.cancel();
        clock.advance(Duration::from_millis(100));
        assert_eq!(debouncer.tick(clock.now()), None);
        assert_eq!(debouncer.deadline(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline() {
        let clock = ManualClock::new();
        let start = clock.now();
        let mut debouncer = Debouncer::new(Duration::from_millis(200));

        debouncer.schedule((), start);
        assert_eq!(debouncer.deadline(), Some(start + Duration::from_millis(200)));
        assert_eq!(debouncer.delay(), Duration::from_millis(200));
    }

    #[tokio::test(start_paused = true)]
    async fn test_system_clock_follows_paused_runtime() {
        let clock = SystemClock;
        let before = clock.now();
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(clock.now() - before, Duration::from_secs(5));
    }
}
