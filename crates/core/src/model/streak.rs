use chrono::{DateTime, Utc};

use crate::time::whole_days_between;

//
// ─── STUDY STREAK ─────────────────────────────────────────────────────────────
//

/// Consecutive-day study counter.
///
/// Days are flat 24-hour periods measured from the last study event, so a
/// study at 23:00 followed by one at 01:00 two nights later still counts as
/// "one day later".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StudyStreak {
    pub current: u32,
    pub last_study_at: Option<DateTime<Utc>>,
}

/// How a study event changed the streak.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreakChange {
    /// First recorded study for this identity.
    Started,
    /// Studied again within a day of the previous event.
    Extended,
    /// More than a day passed; the count restarted at one.
    Reset,
}

impl StudyStreak {
    #[must_use]
    pub fn new(current: u32, last_study_at: Option<DateTime<Utc>>) -> Self {
        Self {
            current,
            last_study_at,
        }
    }

    /// Apply a study event at `now`.
    ///
    /// - no prior event: the streak starts at 1
    /// - 0 or 1 whole days since the last event: the streak grows by one
    /// - more than 1 day: the streak restarts at 1
    ///
    /// Events dated before the last one (clock skew) count as same-day.
    #[must_use]
    pub fn record_study(&self, now: DateTime<Utc>) -> (Self, StreakChange) {
        let (current, change) = match self.last_study_at {
            None => (1, StreakChange::Started),
            Some(last) if whole_days_between(last, now) <= 1 => {
                (self.current.saturating_add(1), StreakChange::Extended)
            }
            Some(_) => (1, StreakChange::Reset),
        };

        (
            Self {
                current,
                last_study_at: Some(now),
            },
            change,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;
    use chrono::Duration;

    #[test]
    fn first_study_starts_at_one() {
        let (streak, change) = StudyStreak::default().record_study(fixed_now());
        assert_eq!(streak.current, 1);
        assert_eq!(streak.last_study_at, Some(fixed_now()));
        assert_eq!(change, StreakChange::Started);
    }

    #[test]
    fn first_study_ignores_stale_counter() {
        let (streak, _) = StudyStreak::new(6, None).record_study(fixed_now());
        assert_eq!(streak.current, 1);
    }

    #[test]
    fn same_day_study_increments() {
        let t = fixed_now();
        let (streak, change) = StudyStreak::new(3, Some(t)).record_study(t + Duration::hours(12));
        assert_eq!(streak.current, 4);
        assert_eq!(change, StreakChange::Extended);
    }

    #[test]
    fn next_day_study_increments() {
        let t = fixed_now();
        let (streak, _) = StudyStreak::new(3, Some(t)).record_study(t + Duration::hours(47));
        assert_eq!(streak.current, 4);
    }

    #[test]
    fn gap_over_a_day_resets() {
        let t = fixed_now();
        let (streak, change) = StudyStreak::new(9, Some(t)).record_study(t + Duration::hours(50));
        assert_eq!(streak.current, 1);
        assert_eq!(change, StreakChange::Reset);
        assert_eq!(streak.last_study_at, Some(t + Duration::hours(50)));
    }

    #[test]
    fn backdated_study_counts_as_same_day() {
        let t = fixed_now();
        let (streak, _) = StudyStreak::new(2, Some(t)).record_study(t - Duration::hours(30));
        assert_eq!(streak.current, 3);
    }

    #[test]
    fn every_event_moves_timestamp() {
        let t = fixed_now();
        let before = StudyStreak::new(1, Some(t));
        let (after, _) = before.record_study(t);
        assert_ne!(before, after);
    }
}
