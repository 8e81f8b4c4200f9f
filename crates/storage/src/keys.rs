//! Names of the persisted progress keys.
//!
//! `completedLessons` and `notificationPermissionRequested` are global;
//! `completedLessons` is overwritten by whichever identity is active. The rest
//! are scoped by identity id.

use progress_core::model::UserId;

pub const COMPLETED_LESSONS: &str = "completedLessons";
pub const NOTIFICATION_PERMISSION_REQUESTED: &str = "notificationPermissionRequested";

const NOTIFICATION_PREFERENCES_PREFIX: &str = "notificationPreferences_";
const LAST_STUDY_TIME_PREFIX: &str = "lastStudyTime_";
const CURRENT_STREAK_PREFIX: &str = "currentStreak_";

#[must_use]
pub fn notification_preferences(user: &UserId) -> String {
    format!("{NOTIFICATION_PREFERENCES_PREFIX}{user}")
}

#[must_use]
pub fn last_study_time(user: &UserId) -> String {
    format!("{LAST_STUDY_TIME_PREFIX}{user}")
}

#[must_use]
pub fn current_streak(user: &UserId) -> String {
    format!("{CURRENT_STREAK_PREFIX}{user}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scoped_keys_append_user_id() {
        let user = UserId::new("guest-1");
        assert_eq!(notification_preferences(&user), "notificationPreferences_guest-1");
        assert_eq!(last_study_time(&user), "lastStudyTime_guest-1");
        assert_eq!(current_streak(&user), "currentStreak_guest-1");
    }
}
