use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::NotificationPreferences;

/// Notification channel shared by all study reminders.
pub const REMINDER_CHANNEL_ID: &str = "study-reminders";

/// Default local wall-clock hour for reminders (8 PM).
pub const DEFAULT_REMINDER_HOUR: u32 = 20;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReminderError {
    #[error("reminder hour must be in 0..=23, got {0}")]
    InvalidHour(u32),
}

//
// ─── REMINDER TIME ─────────────────────────────────────────────────────────────
//

/// Local wall-clock hour at which reminders fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReminderTime {
    hour: u32,
}

impl ReminderTime {
    /// # Errors
    ///
    /// Returns `ReminderError::InvalidHour` for hours outside `0..=23`.
    pub fn new(hour: u32) -> Result<Self, ReminderError> {
        if hour > 23 {
            return Err(ReminderError::InvalidHour(hour));
        }
        Ok(Self { hour })
    }

    #[must_use]
    pub fn hour(&self) -> u32 {
        self.hour
    }
}

impl Default for ReminderTime {
    fn default() -> Self {
        Self {
            hour: DEFAULT_REMINDER_HOUR,
        }
    }
}

//
// ─── PLANS ─────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReminderKind {
    Daily,
    Streak,
}

impl ReminderKind {
    #[must_use]
    pub fn title(self) -> &'static str {
        match self {
            ReminderKind::Daily => "Time to Study!",
            ReminderKind::Streak => "Don't Break Your Streak!",
        }
    }

    #[must_use]
    pub fn body(self) -> &'static str {
        match self {
            ReminderKind::Daily => "Keep your streak going by studying today.",
            ReminderKind::Streak => {
                "You're close to breaking your study streak. Study now to keep it going!"
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Repeat {
    Daily,
}

/// A single reminder to hand to the device scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderPlan {
    pub kind: ReminderKind,
    pub fire_at: DateTime<Utc>,
    pub repeat: Option<Repeat>,
}

/// Compute the reminders implied by `prefs`.
///
/// - daily: today at the reminder hour, or tomorrow if that has passed; repeats daily
/// - streak: the day after `last_study_at` at the reminder hour, or the next
///   occurrence of that hour if it has passed; fires once and is skipped when
///   there is no recorded study
///
/// ```
/// # use chrono::{TimeZone, Utc};
/// # use progress_core::model::NotificationPreferences;
/// # use progress_core::reminders::{plan_reminders, ReminderKind, ReminderTime};
/// let now = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
/// let plans = plan_reminders(
///     NotificationPreferences::new(true, false),
///     None,
///     now,
///     &Utc,
///     ReminderTime::default(),
/// );
/// assert_eq!(plans.len(), 1);
/// assert_eq!(plans[0].kind, ReminderKind::Daily);
/// assert_eq!(plans[0].fire_at, Utc.with_ymd_and_hms(2024, 3, 1, 20, 0, 0).unwrap());
/// ```
#[must_use]
pub fn plan_reminders<Tz: TimeZone>(
    prefs: NotificationPreferences,
    last_study_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    tz: &Tz,
    time: ReminderTime,
) -> Vec<ReminderPlan> {
    let mut plans = Vec::with_capacity(2);

    if prefs.daily_reminder {
        plans.push(ReminderPlan {
            kind: ReminderKind::Daily,
            fire_at: next_occurrence(now, tz, time),
            repeat: Some(Repeat::Daily),
        });
    }

    if prefs.streak_reminder {
        if let Some(last) = last_study_at {
            let day_after = last.with_timezone(tz).date_naive() + Duration::days(1);
            let fire_at = local_at(tz, day_after, time)
                .filter(|at| *at > now)
                .unwrap_or_else(|| next_occurrence(now, tz, time));
            plans.push(ReminderPlan {
                kind: ReminderKind::Streak,
                fire_at,
                repeat: None,
            });
        }
    }

    plans
}

/// First instant strictly after `now` at the reminder hour.
fn next_occurrence<Tz: TimeZone>(now: DateTime<Utc>, tz: &Tz, time: ReminderTime) -> DateTime<Utc> {
    let today = now.with_timezone(tz).date_naive();
    let mut date = today;
    // Two days always suffice; a third covers a skipped DST hour on day two.
    for _ in 0..3 {
        if let Some(at) = local_at(tz, date, time).filter(|at| *at > now) {
            return at;
        }
        date += Duration::days(1);
    }
    now + Duration::days(1)
}

/// The reminder hour on `date` in `tz`, shifted forward an hour when DST skips it.
fn local_at<Tz: TimeZone>(tz: &Tz, date: NaiveDate, time: ReminderTime) -> Option<DateTime<Utc>> {
    let naive = date.and_hms_opt(time.hour(), 0, 0)?;
    tz.from_local_datetime(&naive)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(naive + Duration::hours(1))).earliest())
        .map(|at| at.with_timezone(&Utc))
}
