use std::sync::Arc;

use chrono::{FixedOffset, Local};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use progress_core::model::{
    CompletedLessons, Identity, LessonIndex, MAX_LESSONS, NotificationPreferences,
    ProgressSummary, StreakChange, StudyStreak,
};
use progress_core::reminders::{ReminderPlan, ReminderTime, plan_reminders};
use progress_core::time::Clock;
use storage::LocalProgress;

use crate::connectivity::Connectivity;
use crate::error::ProgressError;
use crate::notifications::NotificationScheduler;
use crate::remote::RemoteProgressService;

//
// ─── STATE ─────────────────────────────────────────────────────────────────────
//

/// Lifecycle of the published progress.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoadState {
    /// Nothing loaded since start-up.
    #[default]
    Uninitialized,
    /// An identity was set and its progress is being reconciled.
    Loading,
    /// Progress reflects the current identity (or the signed-out defaults).
    Ready,
}

/// Everything the store publishes to observers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressSnapshot {
    pub identity: Option<Identity>,
    pub state: LoadState,
    pub completed: CompletedLessons,
    pub streak: StudyStreak,
    pub preferences: NotificationPreferences,
}

/// Result of `ProgressStore::record_completion`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionOutcome {
    /// No lesson index was given.
    Ignored,
    /// The lesson was already completed; nothing changed.
    AlreadyCompleted,
    /// The index lies outside the curriculum; nothing changed.
    OutOfRange,
    Recorded {
        completed: CompletedLessons,
        streak: StudyStreak,
        change: StreakChange,
    },
}

/// Time zone used to place reminders on the local wall clock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReminderZone {
    #[default]
    Local,
    Fixed(FixedOffset),
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Owns completed lessons, streak, and reminder preferences for the current identity.
///
/// Local storage is the source of durability: every change is written locally
/// before any remote attempt, and remote failures are logged and dropped.
/// Operations for one identity are expected to run one at a time.
pub struct ProgressStore {
    clock: Clock,
    local: LocalProgress,
    remote: Option<Arc<dyn RemoteProgressService>>,
    connectivity: Arc<dyn Connectivity>,
    scheduler: Arc<dyn NotificationScheduler>,
    reminder_time: ReminderTime,
    reminder_zone: ReminderZone,
    lesson_count: u32,
    state: watch::Sender<ProgressSnapshot>,
}

impl ProgressStore {
    #[must_use]
    pub fn new(
        clock: Clock,
        local: LocalProgress,
        connectivity: Arc<dyn Connectivity>,
        scheduler: Arc<dyn NotificationScheduler>,
    ) -> Self {
        let (state, _) = watch::channel(ProgressSnapshot::default());
        Self {
            clock,
            local,
            remote: None,
            connectivity,
            scheduler,
            reminder_time: ReminderTime::default(),
            reminder_zone: ReminderZone::default(),
            lesson_count: MAX_LESSONS,
            state,
        }
    }

    /// Enable syncing with a remote progress service.
    #[must_use]
    pub fn with_remote(mut self, remote: Arc<dyn RemoteProgressService>) -> Self {
        self.remote = Some(remote);
        self
    }

    #[must_use]
    pub fn with_reminder_time(mut self, time: ReminderTime) -> Self {
        self.reminder_time = time;
        self
    }

    #[must_use]
    pub fn with_reminder_zone(mut self, zone: ReminderZone) -> Self {
        self.reminder_zone = zone;
        self
    }

    /// Number of lessons in the curriculum, capped at [`MAX_LESSONS`].
    ///
    /// Completions and remote indices at or above it are ignored.
    #[must_use]
    pub fn with_lesson_count(mut self, count: u32) -> Self {
        self.lesson_count = count.min(MAX_LESSONS);
        self
    }

    fn in_curriculum(&self, lesson: LessonIndex) -> bool {
        lesson.value() < self.lesson_count
    }

    /// Current published state.
    #[must_use]
    pub fn snapshot(&self) -> ProgressSnapshot {
        self.state.borrow().clone()
    }

    /// Receive every published state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ProgressSnapshot> {
        self.state.subscribe()
    }

    /// The lowest lesson not yet completed.
    #[must_use]
    pub fn next_lesson(&self) -> LessonIndex {
        self.state.borrow().completed.next_lesson()
    }

    #[must_use]
    pub fn summary(&self, total_lessons: u32) -> ProgressSummary {
        ProgressSummary::new(&self.state.borrow().completed, total_lessons)
    }

    // ─── Identity lifecycle ────────────────────────────────────────────────────

    /// Reconcile progress for `identity`.
    ///
    /// Signed out (`None`) resets to defaults without I/O. Otherwise the local
    /// list is merged with the remote one (when online and syncing is allowed),
    /// expanded to be prefix-dense, written back locally, and published along
    /// with the identity's preferences and streak.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Storage` if local storage fails. Remote failures
    /// are logged and the local list is used.
    pub async fn load(
        &self,
        identity: Option<&Identity>,
    ) -> Result<ProgressSnapshot, ProgressError> {
        let Some(identity) = identity else {
            info!("signed out, clearing in-memory progress");
            let snapshot = ProgressSnapshot {
                state: LoadState::Ready,
                ..ProgressSnapshot::default()
            };
            self.state.send_replace(snapshot.clone());
            return Ok(snapshot);
        };

        self.state.send_modify(|s| {
            s.identity = Some(identity.clone());
            s.state = LoadState::Loading;
        });

        match self.reconcile(identity).await {
            Ok(snapshot) => Ok(snapshot),
            Err(err) => {
                self.state.send_modify(|s| s.state = LoadState::Uninitialized);
                Err(err)
            }
        }
    }

    async fn reconcile(&self, identity: &Identity) -> Result<ProgressSnapshot, ProgressError> {
        let local = self.local.completed_lessons().await?;
        debug!(user = %identity.id(), local = local.len(), "loaded local progress");

        let merged = match self.fetch_remote(identity).await {
            Some(remote) => {
                debug!(user = %identity.id(), remote = remote.len(), "merging remote progress");
                local.merged_with(&remote)
            }
            None => local,
        };

        self.local.save_completed_lessons(&merged).await?;
        self.state.send_modify(|s| s.completed = merged.clone());

        let preferences = self.local.preferences(identity.id()).await?;
        let streak = self.local.study_streak(identity.id()).await?;

        let snapshot = ProgressSnapshot {
            identity: Some(identity.clone()),
            state: LoadState::Ready,
            completed: merged,
            streak,
            preferences,
        };
        info!(
            user = %identity.id(),
            completed = snapshot.completed.len(),
            streak = streak.current,
            "progress loaded"
        );
        self.state.send_replace(snapshot.clone());
        Ok(snapshot)
    }

    /// Event handler for identity changes: marks the store loading and reloads.
    ///
    /// # Errors
    ///
    /// See [`ProgressStore::load`].
    pub async fn handle_identity_change(
        &self,
        identity: Option<&Identity>,
    ) -> Result<ProgressSnapshot, ProgressError> {
        let previous = self.state.borrow().identity.clone();
        if previous.as_ref() != identity {
            debug!(
                from = ?previous.as_ref().map(Identity::id),
                to = ?identity.map(Identity::id),
                "identity changed"
            );
        }
        self.load(identity).await
    }

    /// Reload whenever the watched identity changes, until the sender is dropped.
    pub fn follow_identity(
        self: Arc<Self>,
        mut identities: watch::Receiver<Option<Identity>>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                let identity = identities.borrow_and_update().clone();
                if let Err(err) = self.handle_identity_change(identity.as_ref()).await {
                    error!(error = %err, "failed to load progress after identity change");
                }
                if identities.changed().await.is_err() {
                    break;
                }
            }
        })
    }

    // ─── Completion ────────────────────────────────────────────────────────────

    /// Mark a lesson completed.
    ///
    /// `None`, already-completed, and out-of-curriculum lessons are no-ops. Otherwise the set is
    /// expanded, persisted locally, published, appended remotely (best effort,
    /// original index only), and the streak is advanced.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Storage` if local persistence fails.
    pub async fn record_completion(
        &self,
        identity: Option<&Identity>,
        lesson: Option<LessonIndex>,
    ) -> Result<CompletionOutcome, ProgressError> {
        let Some(lesson) = lesson else {
            debug!("no lesson index given, ignoring completion");
            return Ok(CompletionOutcome::Ignored);
        };

        if !self.in_curriculum(lesson) {
            warn!(%lesson, lesson_count = self.lesson_count, "lesson outside the curriculum, ignoring");
            return Ok(CompletionOutcome::OutOfRange);
        }

        let mut completed = self.state.borrow().completed.clone();
        if !completed.insert_expanding(lesson) {
            debug!(%lesson, "lesson already completed");
            return Ok(CompletionOutcome::AlreadyCompleted);
        }

        self.local.save_completed_lessons(&completed).await?;
        self.state.send_modify(|s| s.completed = completed.clone());
        info!(%lesson, completed = completed.len(), "lesson completed");

        if let Some(identity) = identity {
            self.push_completion(identity, lesson).await;
        }

        let (streak, change) = self.record_study(identity).await?;

        Ok(CompletionOutcome::Recorded {
            completed,
            streak,
            change,
        })
    }

    async fn push_completion(&self, identity: &Identity, lesson: LessonIndex) {
        let Some(remote) = self.reachable_remote(identity).await else {
            return;
        };
        match remote.add_completed_lesson(identity.id(), lesson).await {
            Ok(()) => debug!(user = %identity.id(), %lesson, "lesson synced"),
            Err(err) => {
                warn!(user = %identity.id(), %lesson, error = %err, "failed to sync completed lesson");
            }
        }
    }

    async fn record_study(
        &self,
        identity: Option<&Identity>,
    ) -> Result<(StudyStreak, StreakChange), ProgressError> {
        let now = self.clock.now();
        let previous = self.state.borrow().streak;
        let (streak, change) = previous.record_study(now);

        if let Some(identity) = identity {
            self.local.save_study_streak(identity.id(), &streak).await?;
        }
        self.state.send_modify(|s| s.streak = streak);
        info!(streak = streak.current, ?change, "study streak updated");

        Ok((streak, change))
    }

    // ─── Reset ─────────────────────────────────────────────────────────────────

    /// Erase all progress for `identity`, remotely (best effort) and locally.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Storage` if local keys cannot be deleted. The
    /// in-memory state is reset even then.
    pub async fn clear_progress(&self, identity: Option<&Identity>) -> Result<(), ProgressError> {
        if let Some(identity) = identity {
            if let Some(remote) = self.reachable_remote(identity).await {
                match remote.delete_all_completed_lessons(identity.id()).await {
                    Ok(true) => info!(user = %identity.id(), "remote progress deleted"),
                    Ok(false) => warn!(user = %identity.id(), "remote refused to delete progress"),
                    Err(err) => {
                        warn!(user = %identity.id(), error = %err, "failed to delete remote progress");
                    }
                }
            }
        }

        self.state.send_modify(|s| {
            s.completed = CompletedLessons::new();
            s.streak = StudyStreak::default();
        });

        self.local.clear_completed_lessons().await?;
        if let Some(identity) = identity {
            self.local.clear_study_streak(identity.id()).await?;
        }
        info!("progress cleared");
        Ok(())
    }

    // ─── Notifications ─────────────────────────────────────────────────────────

    /// Store new reminder preferences and reschedule reminders to match.
    ///
    /// Without an identity only the in-memory preferences change.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Storage` if persisting fails and
    /// `ProgressError::Notification` if the scheduler rejects a request.
    pub async fn update_preferences(
        &self,
        identity: Option<&Identity>,
        preferences: NotificationPreferences,
    ) -> Result<Vec<ReminderPlan>, ProgressError> {
        self.state.send_modify(|s| s.preferences = preferences);
        let Some(identity) = identity else {
            return Ok(Vec::new());
        };

        self.local.save_preferences(identity.id(), preferences).await?;

        let last_study_at = self.state.borrow().streak.last_study_at;
        let plans = self.plan(preferences, last_study_at);

        self.scheduler.cancel_all().await?;
        for plan in &plans {
            self.scheduler.schedule(plan).await?;
        }
        info!(
            user = %identity.id(),
            daily = preferences.daily_reminder,
            streak = preferences.streak_reminder,
            scheduled = plans.len(),
            "reminders rescheduled"
        );
        Ok(plans)
    }

    /// Prompt for notification permission and remember that the prompt was shown.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Notification` if the prompt fails and
    /// `ProgressError::Storage` if the flag cannot be persisted.
    pub async fn request_notification_permission(&self) -> Result<bool, ProgressError> {
        let granted = self.scheduler.request_permission().await?;
        self.local.mark_permission_requested().await?;
        debug!(granted, "notification permission requested");
        Ok(granted)
    }

    /// Whether the permission prompt has already been shown on this device.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Storage` if the flag cannot be read.
    pub async fn permission_requested(&self) -> Result<bool, ProgressError> {
        Ok(self.local.permission_requested().await?)
    }

    /// # Errors
    ///
    /// Returns `ProgressError::Notification` if the status cannot be read.
    pub async fn notification_permission(&self) -> Result<bool, ProgressError> {
        Ok(self.scheduler.permission_granted().await?)
    }

    fn plan(
        &self,
        preferences: NotificationPreferences,
        last_study_at: Option<chrono::DateTime<chrono::Utc>>,
    ) -> Vec<ReminderPlan> {
        let now = self.clock.now();
        match self.reminder_zone {
            ReminderZone::Local => {
                plan_reminders(preferences, last_study_at, now, &Local, self.reminder_time)
            }
            ReminderZone::Fixed(offset) => {
                plan_reminders(preferences, last_study_at, now, &offset, self.reminder_time)
            }
        }
    }

    // ─── Remote gating ─────────────────────────────────────────────────────────

    /// The remote service, if this identity may sync and the device is online.
    async fn reachable_remote(
        &self,
        identity: &Identity,
    ) -> Option<&Arc<dyn RemoteProgressService>> {
        if !identity.may_sync() {
            debug!(user = %identity.id(), "guest identity, skipping remote");
            return None;
        }
        let remote = self.remote.as_ref()?;
        if !self.connectivity.is_online().await {
            debug!(user = %identity.id(), "offline, skipping remote");
            return None;
        }
        Some(remote)
    }

    async fn fetch_remote(&self, identity: &Identity) -> Option<Vec<LessonIndex>> {
        let remote = self.reachable_remote(identity).await?;
        match remote.completed_lessons(identity.id()).await {
            Ok(lessons) => {
                let (kept, dropped): (Vec<_>, Vec<_>) = lessons
                    .into_iter()
                    .partition(|lesson| self.in_curriculum(*lesson));
                if !dropped.is_empty() {
                    warn!(
                        user = %identity.id(),
                        dropped = dropped.len(),
                        lesson_count = self.lesson_count,
                        "ignoring remote lessons outside the curriculum"
                    );
                }
                Some(kept)
            }
            Err(err) => {
                warn!(user = %identity.id(), error = %err, "failed to fetch remote progress, using local copy");
                None
            }
        }
    }
}
