#![forbid(unsafe_code)]

pub mod app_services;
pub mod connectivity;
pub mod error;
pub mod notifications;
pub mod progress_store;
pub mod remote;

pub use progress_core::Clock;

pub use app_services::{AppServices, AppServicesConfig};
pub use connectivity::{Connectivity, ConnectivityFlag, HttpProbe};
pub use error::{AppServicesError, NotificationError, ProgressError, RemoteError};
pub use notifications::{NotificationScheduler, RecordingScheduler};
pub use progress_store::{
    CompletionOutcome, LoadState, ProgressSnapshot, ProgressStore, ReminderZone,
};
pub use remote::{GraphqlProgressClient, RemoteProgressService};
