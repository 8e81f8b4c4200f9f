use thiserror::Error;
use url::Url;

/// Validated remote sync configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SyncSettings {
    endpoint: Option<Url>,
    api_key: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct SyncSettingsDraft {
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SyncSettingsError {
    #[error("invalid sync endpoint: {0}")]
    InvalidEndpoint(String),
}

impl SyncSettingsDraft {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and normalize the draft.
    ///
    /// # Errors
    ///
    /// Returns `SyncSettingsError` if the endpoint is present but not an http(s) URL.
    pub fn validate(self) -> Result<SyncSettings, SyncSettingsError> {
        let endpoint = normalize_optional(self.endpoint);
        let api_key = normalize_optional(self.api_key);

        let endpoint = match endpoint {
            Some(raw) => {
                let url = Url::parse(&raw)
                    .map_err(|_| SyncSettingsError::InvalidEndpoint(raw.clone()))?;
                if !matches!(url.scheme(), "http" | "https") {
                    return Err(SyncSettingsError::InvalidEndpoint(raw));
                }
                Some(url)
            }
            None => None,
        };

        Ok(SyncSettings { endpoint, api_key })
    }
}

impl SyncSettings {
    #[must_use]
    pub fn endpoint(&self) -> Option<&Url> {
        self.endpoint.as_ref()
    }

    #[must_use]
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    /// True when a remote endpoint is available.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.endpoint.is_some()
    }
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|val| val.trim().to_string())
        .filter(|val| !val.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_values_become_unconfigured() {
        let settings = SyncSettingsDraft {
            endpoint: Some("   ".into()),
            api_key: Some(String::new()),
        }
        .validate()
        .unwrap();
        assert!(!settings.is_configured());
        assert_eq!(settings.api_key(), None);
    }

    #[test]
    fn accepts_https_endpoint() {
        let settings = SyncSettingsDraft {
            endpoint: Some(" https://sync.example.com/graphql ".into()),
            api_key: Some("key".into()),
        }
        .validate()
        .unwrap();
        assert_eq!(
            settings.endpoint().map(Url::as_str),
            Some("https://sync.example.com/graphql")
        );
        assert_eq!(settings.api_key(), Some("key"));
    }

    #[test]
    fn rejects_non_http_endpoint() {
        for raw in ["not a url", "ftp://example.com"] {
            let err = SyncSettingsDraft {
                endpoint: Some(raw.into()),
                api_key: None,
            }
            .validate()
            .unwrap_err();
            assert!(matches!(err, SyncSettingsError::InvalidEndpoint(_)));
        }
    }
}
