use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use progress_core::reminders::ReminderPlan;

use crate::error::NotificationError;

/// Device-local notification scheduler.
///
/// Failures propagate to the caller; nothing here retries.
#[async_trait]
pub trait NotificationScheduler: Send + Sync {
    /// Cancel every pending study reminder.
    ///
    /// # Errors
    ///
    /// Returns `NotificationError` if the scheduler rejects the request.
    async fn cancel_all(&self) -> Result<(), NotificationError>;

    /// Schedule one reminder.
    ///
    /// # Errors
    ///
    /// Returns `NotificationError` if the scheduler rejects the request.
    async fn schedule(&self, plan: &ReminderPlan) -> Result<(), NotificationError>;

    /// Ask the user for permission to post notifications.
    ///
    /// # Errors
    ///
    /// Returns `NotificationError` if the permission prompt cannot be shown.
    async fn request_permission(&self) -> Result<bool, NotificationError>;

    /// Whether notifications are currently allowed.
    ///
    /// # Errors
    ///
    /// Returns `NotificationError` if the status cannot be read.
    async fn permission_granted(&self) -> Result<bool, NotificationError>;
}

#[derive(Debug, Default)]
struct RecordingState {
    pending: Vec<ReminderPlan>,
    permission: bool,
}

/// Scheduler that keeps pending reminders in memory.
///
/// Used by the command-line front end and by tests.
#[derive(Clone, Debug, Default)]
pub struct RecordingScheduler {
    state: Arc<Mutex<RecordingState>>,
}

impl RecordingScheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reminders scheduled since the last `cancel_all`, in scheduling order.
    ///
    /// # Errors
    ///
    /// Returns `NotificationError` if the lock is poisoned.
    pub fn pending(&self) -> Result<Vec<ReminderPlan>, NotificationError> {
        let guard = self.lock()?;
        Ok(guard.pending.clone())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, RecordingState>, NotificationError> {
        self.state
            .lock()
            .map_err(|e| NotificationError::Unavailable(e.to_string()))
    }
}

#[async_trait]
impl NotificationScheduler for RecordingScheduler {
    async fn cancel_all(&self) -> Result<(), NotificationError> {
        self.lock()?.pending.clear();
        Ok(())
    }

    async fn schedule(&self, plan: &ReminderPlan) -> Result<(), NotificationError> {
        self.lock()?.pending.push(*plan);
        Ok(())
    }

    async fn request_permission(&self) -> Result<bool, NotificationError> {
        let mut guard = self.lock()?;
        guard.permission = true;
        Ok(true)
    }

    async fn permission_granted(&self) -> Result<bool, NotificationError> {
        Ok(self.lock()?.permission)
    }
}
