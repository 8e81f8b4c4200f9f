use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use progress_core::model::{
    CompletedLessons, LessonIndex, NotificationPreferences, StudyStreak, UserId,
};

use crate::keys;
use crate::repository::{KeyValueStore, StorageError};

fn ser<E: core::fmt::Display>(key: &str, e: E) -> StorageError {
    StorageError::Serialization {
        key: key.to_owned(),
        message: e.to_string(),
    }
}

/// Typed reads and writes of the progress keys over any `KeyValueStore`.
///
/// Missing keys read as defaults; malformed values are errors.
#[derive(Clone)]
pub struct LocalProgress {
    kv: Arc<dyn KeyValueStore>,
}

impl LocalProgress {
    #[must_use]
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// # Errors
    ///
    /// Returns `StorageError` if the key cannot be read or is not a JSON array of indices.
    pub async fn completed_lessons(&self) -> Result<CompletedLessons, StorageError> {
        let Some(raw) = self.kv.get(keys::COMPLETED_LESSONS).await? else {
            return Ok(CompletedLessons::new());
        };
        let indices: Vec<LessonIndex> =
            serde_json::from_str(&raw).map_err(|e| ser(keys::COMPLETED_LESSONS, e))?;
        Ok(CompletedLessons::from_indices(indices))
    }

    /// # Errors
    ///
    /// Returns `StorageError` if the value cannot be stored.
    pub async fn save_completed_lessons(
        &self,
        lessons: &CompletedLessons,
    ) -> Result<(), StorageError> {
        let raw =
            serde_json::to_string(&lessons.to_vec()).map_err(|e| ser(keys::COMPLETED_LESSONS, e))?;
        self.kv.set(keys::COMPLETED_LESSONS, &raw).await
    }

    /// # Errors
    ///
    /// Returns `StorageError` if the key cannot be deleted.
    pub async fn clear_completed_lessons(&self) -> Result<(), StorageError> {
        self.kv.remove(keys::COMPLETED_LESSONS).await
    }

    /// # Errors
    ///
    /// Returns `StorageError` if the key cannot be read or decoded.
    pub async fn preferences(
        &self,
        user: &UserId,
    ) -> Result<NotificationPreferences, StorageError> {
        let key = keys::notification_preferences(user);
        match self.kv.get(&key).await? {
            Some(raw) => serde_json::from_str(&raw).map_err(|e| ser(&key, e)),
            None => Ok(NotificationPreferences::default()),
        }
    }

    /// # Errors
    ///
    /// Returns `StorageError` if the value cannot be stored.
    pub async fn save_preferences(
        &self,
        user: &UserId,
        prefs: NotificationPreferences,
    ) -> Result<(), StorageError> {
        let key = keys::notification_preferences(user);
        let raw = serde_json::to_string(&prefs).map_err(|e| ser(&key, e))?;
        self.kv.set(&key, &raw).await
    }

    /// Whether the notification permission prompt has been shown on this device.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the key cannot be read.
    pub async fn permission_requested(&self) -> Result<bool, StorageError> {
        let raw = self.kv.get(keys::NOTIFICATION_PERMISSION_REQUESTED).await?;
        Ok(raw.is_some_and(|value| value.trim() == "true"))
    }

    /// # Errors
    ///
    /// Returns `StorageError` if the flag cannot be stored.
    pub async fn mark_permission_requested(&self) -> Result<(), StorageError> {
        self.kv
            .set(keys::NOTIFICATION_PERMISSION_REQUESTED, "true")
            .await
    }

    /// Read the streak counter and last study time.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if either key cannot be read or decoded.
    pub async fn study_streak(&self, user: &UserId) -> Result<StudyStreak, StorageError> {
        let time_key = keys::last_study_time(user);
        let last_study_at = match self.kv.get(&time_key).await? {
            Some(raw) => Some(
                DateTime::parse_from_rfc3339(raw.trim())
                    .map_err(|e| ser(&time_key, e))?
                    .with_timezone(&Utc),
            ),
            None => None,
        };

        let streak_key = keys::current_streak(user);
        let current = match self.kv.get(&streak_key).await? {
            Some(raw) => raw.trim().parse::<u32>().map_err(|e| ser(&streak_key, e))?,
            None => 0,
        };

        Ok(StudyStreak::new(current, last_study_at))
    }

    /// Persist both streak fields. A missing timestamp deletes its key.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if either write fails.
    pub async fn save_study_streak(
        &self,
        user: &UserId,
        streak: &StudyStreak,
    ) -> Result<(), StorageError> {
        let time_key = keys::last_study_time(user);
        match streak.last_study_at {
            Some(at) => {
                self.kv
                    .set(&time_key, &at.to_rfc3339_opts(SecondsFormat::Millis, true))
                    .await?;
            }
            None => self.kv.remove(&time_key).await?,
        }
        self.kv
            .set(&keys::current_streak(user), &streak.current.to_string())
            .await
    }

    /// # Errors
    ///
    /// Returns `StorageError` if either key cannot be deleted.
    pub async fn clear_study_streak(&self, user: &UserId) -> Result<(), StorageError> {
        self.kv.remove(&keys::last_study_time(user)).await?;
        self.kv.remove(&keys::current_streak(user)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryKeyValueStore;
    use progress_core::time::fixed_now;

    fn local() -> (InMemoryKeyValueStore, LocalProgress) {
        let kv = InMemoryKeyValueStore::new();
        let local = LocalProgress::new(Arc::new(kv.clone()));
        (kv, local)
    }

    #[tokio::test]
    async fn missing_keys_read_as_defaults() {
        let (_, local) = local();
        let user = UserId::new("u1");
        assert!(local.completed_lessons().await.unwrap().is_empty());
        assert_eq!(
            local.preferences(&user).await.unwrap(),
            NotificationPreferences::default()
        );
        assert_eq!(local.study_streak(&user).await.unwrap(), StudyStreak::default());
    }

    #[tokio::test]
    async fn lessons_stored_as_json_array() {
        let (kv, local) = local();
        let lessons = CompletedLessons::from_indices([LessonIndex::new(2)]);
        local.save_completed_lessons(&lessons).await.unwrap();
        assert_eq!(
            kv.get(keys::COMPLETED_LESSONS).await.unwrap().as_deref(),
            Some("[0,1,2]")
        );
        assert_eq!(local.completed_lessons().await.unwrap(), lessons);
    }

    #[tokio::test]
    async fn permission_flag_is_stored_as_text() {
        let (kv, local) = local();
        assert!(!local.permission_requested().await.unwrap());

        local.mark_permission_requested().await.unwrap();
        assert!(local.permission_requested().await.unwrap());
        assert_eq!(
            kv.get("notificationPermissionRequested").await.unwrap().as_deref(),
            Some("true")
        );
    }

    #[tokio::test]
    async fn sparse_stored_lessons_are_expanded_on_read() {
        let (kv, local) = local();
        kv.set(keys::COMPLETED_LESSONS, "[3]").await.unwrap();
        assert_eq!(local.completed_lessons().await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn malformed_lessons_are_an_error() {
        let (kv, local) = local();
        kv.set(keys::COMPLETED_LESSONS, "[-1]").await.unwrap();
        let err = local.completed_lessons().await.unwrap_err();
        assert!(matches!(err, StorageError::Serialization { .. }));
    }

    #[tokio::test]
    async fn streak_uses_iso_timestamp_and_decimal_counter() {
        let (kv, local) = local();
        let user = UserId::new("u1");
        let streak = StudyStreak::new(4, Some(fixed_now()));
        local.save_study_streak(&user, &streak).await.unwrap();

        assert_eq!(
            kv.get("lastStudyTime_u1").await.unwrap().as_deref(),
            Some("2023-11-14T22:13:20.000Z")
        );
        assert_eq!(kv.get("currentStreak_u1").await.unwrap().as_deref(), Some("4"));
        assert_eq!(local.study_streak(&user).await.unwrap(), streak);

        local.clear_study_streak(&user).await.unwrap();
        assert_eq!(local.study_streak(&user).await.unwrap(), StudyStreak::default());
    }

    #[tokio::test]
    async fn preferences_are_scoped_per_user() {
        let (_, local) = local();
        let a = UserId::new("a");
        let b = UserId::new("b");
        local
            .save_preferences(&a, NotificationPreferences::new(true, true))
            .await
            .unwrap();
        assert_eq!(
            local.preferences(&a).await.unwrap(),
            NotificationPreferences::new(true, true)
        );
        assert_eq!(
            local.preferences(&b).await.unwrap(),
            NotificationPreferences::default()
        );
    }
}
