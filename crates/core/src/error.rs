use thiserror::Error;

use crate::model::{ParseIdError, SyncSettingsError};
use crate::reminders::ReminderError;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    SyncSettings(#[from] SyncSettingsError),
    #[error(transparent)]
    ParseId(#[from] ParseIdError),
    #[error(transparent)]
    Reminder(#[from] ReminderError),
}
