mod identity;
mod ids;
mod lessons;
mod preferences;
mod streak;
mod sync_settings;

pub use identity::{GUEST_ID_PREFIX, Identity};
pub use ids::{LessonIndex, ParseIdError, UserId};
pub use lessons::{CompletedLessons, LessonStatus, MAX_LESSONS, ProgressSummary};
pub use preferences::NotificationPreferences;
pub use streak::{StreakChange, StudyStreak};
pub use sync_settings::{SyncSettings, SyncSettingsDraft, SyncSettingsError};
