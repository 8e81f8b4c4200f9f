use serde::{Deserialize, Serialize};

/// Which study reminders the identity wants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPreferences {
    /// Remind every evening.
    #[serde(default)]
    pub daily_reminder: bool,
    /// Remind the evening after the last study event.
    #[serde(default)]
    pub streak_reminder: bool,
}

impl NotificationPreferences {
    #[must_use]
    pub fn new(daily_reminder: bool, streak_reminder: bool) -> Self {
        Self {
            daily_reminder,
            streak_reminder,
        }
    }

    #[must_use]
    pub fn any_enabled(&self) -> bool {
        self.daily_reminder || self.streak_reminder
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uses_camel_case_keys() {
        let json = serde_json::to_string(&NotificationPreferences::new(true, false)).unwrap();
        assert_eq!(json, r#"{"dailyReminder":true,"streakReminder":false}"#);
    }

    #[test]
    fn missing_fields_default_to_off() {
        let prefs: NotificationPreferences = serde_json::from_str(r#"{"dailyReminder":true}"#).unwrap();
        assert_eq!(prefs, NotificationPreferences::new(true, false));
        assert!(prefs.any_enabled());
        assert!(!NotificationPreferences::default().any_enabled());
    }
}
