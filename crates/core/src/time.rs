use chrono::{DateTime, Duration, Utc};

/// Length of a study day in milliseconds.
///
/// Streaks count flat 24-hour periods, not calendar-date boundaries.
pub const MILLIS_PER_DAY: i64 = 86_400_000;

/// A simple clock abstraction for deterministic time in services and tests.
#[derive(Debug, Clone, Copy, Default)]
pub enum Clock {
    #[default]
    Default,
    Fixed(DateTime<Utc>),
}

impl Clock {
    /// Returns a clock that uses the current system time.
    #[must_use]
    pub fn default_clock() -> Self {
        Self::Default
    }

    /// Returns a clock fixed at the given timestamp.
    #[must_use]
    pub fn fixed(at: DateTime<Utc>) -> Self {
        Self::Fixed(at)
    }

    /// Returns the current time according to the clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Clock::Default => Utc::now(),
            Clock::Fixed(t) => *t,
        }
    }

    /// If this is a fixed clock, advance it by the given duration.
    ///
    /// Has no effect on `Clock::Default`.
    pub fn advance(&mut self, delta: Duration) {
        if let Clock::Fixed(t) = self {
            *t += delta;
        }
    }
}

/// Whole 24-hour days elapsed from `earlier` to `later`, rounded toward
/// negative infinity.
///
/// ```
/// # use chrono::Duration;
/// # use progress_core::time::{fixed_now, whole_days_between};
/// let t = fixed_now();
/// assert_eq!(whole_days_between(t, t + Duration::hours(12)), 0);
/// assert_eq!(whole_days_between(t, t + Duration::hours(50)), 2);
/// assert_eq!(whole_days_between(t, t - Duration::hours(1)), -1);
/// ```
#[must_use]
pub fn whole_days_between(earlier: DateTime<Utc>, later: DateTime<Utc>) -> i64 {
    let millis = later.signed_duration_since(earlier).num_milliseconds();
    millis.div_euclid(MILLIS_PER_DAY)
}

/// Deterministic timestamp for tests and examples (2023-11-14T22:13:20Z).
pub const FIXED_TEST_TIMESTAMP: i64 = 1_700_000_000;

/// Returns a deterministic `DateTime<Utc>` for tests and doc examples.
///
/// # Panics
///
/// Panics if the fixed timestamp cannot be represented.
#[must_use]
pub fn fixed_now() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(FIXED_TEST_TIMESTAMP, 0)
        .expect("fixed timestamp should be valid")
}

/// Returns a `Clock` fixed at the deterministic test timestamp.
#[must_use]
pub fn fixed_clock() -> Clock {
    Clock::fixed(fixed_now())
}
