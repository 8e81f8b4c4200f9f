use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;

use progress_core::model::SyncSettings;
use progress_core::reminders::ReminderTime;
use storage::repository::Storage;

use crate::Clock;
use crate::connectivity::{Connectivity, ConnectivityFlag, HttpProbe};
use crate::error::AppServicesError;
use crate::notifications::{NotificationScheduler, RecordingScheduler};
use crate::progress_store::{ProgressStore, ReminderZone};
use crate::remote::{GraphqlProgressClient, RemoteProgressService};

const REMOTE_TIMEOUT: Duration = Duration::from_secs(15);

/// Knobs for assembling the services.
#[derive(Clone, Debug, Default)]
pub struct AppServicesConfig {
    pub sync: SyncSettings,
    pub reminder_time: ReminderTime,
    pub reminder_zone: ReminderZone,
    /// Curriculum size; `None` keeps the model's upper bound.
    pub lesson_count: Option<u32>,
    /// Treat the device as offline regardless of the network.
    pub force_offline: bool,
}

/// Assembles the progress store and its collaborators once per process.
#[derive(Clone)]
pub struct AppServices {
    progress: Arc<ProgressStore>,
    scheduler: Arc<RecordingScheduler>,
    sync_enabled: bool,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization or the HTTP client setup fails.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        config: AppServicesConfig,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Self::assemble(storage, clock, config)
    }

    /// Build services over in-memory storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if the HTTP client cannot be built.
    pub fn in_memory(clock: Clock, config: AppServicesConfig) -> Result<Self, AppServicesError> {
        Self::assemble(Storage::in_memory(), clock, config)
    }

    fn assemble(
        storage: Storage,
        clock: Clock,
        config: AppServicesConfig,
    ) -> Result<Self, AppServicesError> {
        let client = Client::builder().timeout(REMOTE_TIMEOUT).build()?;
        let remote = GraphqlProgressClient::from_settings(client.clone(), &config.sync).ok();

        let connectivity: Arc<dyn Connectivity> = match (&remote, config.force_offline) {
            (_, true) => Arc::new(ConnectivityFlag::new(false)),
            (Some(remote), false) => Arc::new(HttpProbe::new(client, remote.endpoint().clone())),
            (None, false) => Arc::new(ConnectivityFlag::new(true)),
        };

        let scheduler = Arc::new(RecordingScheduler::new());
        let notifications: Arc<dyn NotificationScheduler> = scheduler.clone();
        let sync_enabled = remote.is_some();

        let mut progress =
            ProgressStore::new(clock, storage.local_progress(), connectivity, notifications)
                .with_reminder_time(config.reminder_time)
                .with_reminder_zone(config.reminder_zone);
        if let Some(count) = config.lesson_count {
            progress = progress.with_lesson_count(count);
        }
        if let Some(remote) = remote {
            let remote: Arc<dyn RemoteProgressService> = Arc::new(remote);
            progress = progress.with_remote(remote);
        }

        Ok(Self {
            progress: Arc::new(progress),
            scheduler,
            sync_enabled,
        })
    }

    #[must_use]
    pub fn progress(&self) -> Arc<ProgressStore> {
        Arc::clone(&self.progress)
    }

    #[must_use]
    pub fn scheduler(&self) -> Arc<RecordingScheduler> {
        Arc::clone(&self.scheduler)
    }

    /// True when a remote endpoint is configured.
    #[must_use]
    pub fn sync_enabled(&self) -> bool {
        self.sync_enabled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress_store::CompletionOutcome;
    use progress_core::model::{Identity, LessonIndex, SyncSettingsDraft};
    use progress_core::time::fixed_clock;

    #[tokio::test]
    async fn in_memory_services_work_without_sync() {
        let services = AppServices::in_memory(fixed_clock(), AppServicesConfig::default()).unwrap();
        assert!(!services.sync_enabled());

        let identity = Identity::user("u-1");
        let progress = services.progress();
        progress.load(Some(&identity)).await.unwrap();
        progress
            .record_completion(Some(&identity), Some(LessonIndex::new(1)))
            .await
            .unwrap();
        assert_eq!(progress.next_lesson(), LessonIndex::new(2));
    }

    #[tokio::test]
    async fn lesson_count_bounds_completions() {
        let services = AppServices::in_memory(
            fixed_clock(),
            AppServicesConfig {
                lesson_count: Some(10),
                ..AppServicesConfig::default()
            },
        )
        .unwrap();

        let identity = Identity::user("u-1");
        let progress = services.progress();
        progress.load(Some(&identity)).await.unwrap();
        let outcome = progress
            .record_completion(Some(&identity), Some(LessonIndex::new(10)))
            .await
            .unwrap();
        assert_eq!(outcome, CompletionOutcome::OutOfRange);
        assert!(progress.snapshot().completed.is_empty());
    }

    #[tokio::test]
    async fn configured_endpoint_enables_sync() {
        let sync = SyncSettingsDraft {
            endpoint: Some("https://sync.example.com/graphql".into()),
            api_key: None,
        }
        .validate()
        .unwrap();
        let services = AppServices::in_memory(
            fixed_clock(),
            AppServicesConfig {
                sync,
                force_offline: true,
                ..AppServicesConfig::default()
            },
        )
        .unwrap();
        assert!(services.sync_enabled());

        // Forced offline: loading never touches the network.
        let snapshot = services
            .progress()
            .load(Some(&Identity::user("u-1")))
            .await
            .unwrap();
        assert!(snapshot.completed.is_empty());
    }
}
