//! Time sources
//!
//! Token expiry and key-set age are both measured against a [`Clock`], so
//! tests can substitute a [`TestClock`] for the system clock.

use std::{
    ops::Add,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::{Duration, SystemTime},
};

use serde::{Deserialize, Serialize};

/// Seconds elapsed since 1970-01-01T00:00:00Z
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
#[repr(transparent)]
pub struct UnixTime(pub u64);

impl UnixTime {
    /// Time elapsed since `earlier`, or zero if `earlier` is in the future
    #[inline]
    #[must_use]
    pub fn duration_since(self, earlier: UnixTime) -> Duration {
        Duration::from_secs(self.0.saturating_sub(earlier.0))
    }
}

impl From<SystemTime> for UnixTime {
    #[inline]
    fn from(t: SystemTime) -> Self {
        let secs = t
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();

        UnixTime(secs)
    }
}

impl Add<Duration> for UnixTime {
    type Output = UnixTime;

    #[inline]
    fn add(self, rhs: Duration) -> Self::Output {
        UnixTime(self.0.saturating_add(rhs.as_secs()))
    }
}

/// Something that can tell the current time
pub trait Clock: Send + Sync {
    /// The current time according to this clock
    fn now(&self) -> UnixTime;
}

impl<C: Clock + ?Sized> Clock for &'_ C {
    #[inline]
    fn now(&self) -> UnixTime {
        C::now(self)
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    #[inline]
    fn now(&self) -> UnixTime {
        C::now(self)
    }
}

/// The system clock, backed by [`SystemTime`]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct System;

impl Clock for System {
    #[inline]
    fn now(&self) -> UnixTime {
        UnixTime::from(SystemTime::now())
    }
}

/// A manually driven clock
///
/// The time is held atomically so that a shared `Arc<TestClock>` can be
/// advanced while components holding the same handle observe the change.
#[derive(Debug, Default)]
pub struct TestClock(AtomicU64);

impl TestClock {
    /// Creates a clock frozen at `time`
    #[must_use]
    pub const fn new(time: UnixTime) -> Self {
        Self(AtomicU64::new(time.0))
    }

    /// Moves the clock to `time`
    pub fn set(&self, time: UnixTime) {
        self.0.store(time.0, Ordering::SeqCst);
    }

    /// Moves the clock forward by `by`
    pub fn advance(&self, by: Duration) {
        self.0.fetch_add(by.as_secs(), Ordering::SeqCst);
    }
}

impl Clock for TestClock {
    #[inline]
    fn now(&self) -> UnixTime {
        UnixTime(self.0.load(Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_advances_through_shared_handles() {
        let clock = Arc::new(TestClock::new(UnixTime(100)));
        let observer = Arc::clone(&clock);

        clock.advance(Duration::from_secs(50));
        assert_eq!(observer.now(), UnixTime(150));

        clock.set(UnixTime(7));
        assert_eq!(observer.now(), UnixTime(7));
    }

    #[test]
    fn duration_since_saturates() {
        assert_eq!(
            UnixTime(10).duration_since(UnixTime(4)),
            Duration::from_secs(6)
        );
        assert_eq!(UnixTime(4).duration_since(UnixTime(10)), Duration::ZERO);
    }

    #[test]
    fn system_clock_is_after_epoch() {
        assert!(System.now() > UnixTime(1_600_000_000));
    }
}
