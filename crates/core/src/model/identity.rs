use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::ids::UserId;

/// Prefix of locally generated guest ids.
pub const GUEST_ID_PREFIX: &str = "guest-";

/// The identity progress is tracked for.
///
/// Owned by the authentication layer; the progress store only reads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Identity {
    /// Authenticated account with a stable server-assigned id.
    User { id: UserId },
    /// Local-only identity. Never talks to the remote progress service.
    Guest { id: UserId },
}

impl Identity {
    #[must_use]
    pub fn user(id: impl Into<String>) -> Self {
        Self::User {
            id: UserId::new(id),
        }
    }

    /// Creates a guest with a freshly generated id.
    #[must_use]
    pub fn guest() -> Self {
        Self::Guest {
            id: UserId::new(format!("{GUEST_ID_PREFIX}{}", Uuid::new_v4().simple())),
        }
    }

    #[must_use]
    pub fn guest_with_id(id: impl Into<String>) -> Self {
        Self::Guest {
            id: UserId::new(id),
        }
    }

    #[must_use]
    pub fn id(&self) -> &UserId {
        match self {
            Identity::User { id } | Identity::Guest { id } => id,
        }
    }

    #[must_use]
    pub fn is_guest(&self) -> bool {
        matches!(self, Identity::Guest { .. })
    }

    /// True when this identity may read from and write to the remote store.
    #[must_use]
    pub fn may_sync(&self) -> bool {
        match self {
            Identity::User { id } => !id.is_empty(),
            Identity::Guest { .. } => false,
        }
    }
}
