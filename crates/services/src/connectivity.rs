use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};

/// Answers "can the remote service be reached right now?".
///
/// Checked before every remote attempt; an offline answer skips the remote
/// path without raising an error.
#[async_trait]
pub trait Connectivity: Send + Sync {
    async fn is_online(&self) -> bool;
}

/// Shared on/off switch, e.g. driven by OS reachability callbacks.
#[derive(Clone, Debug)]
pub struct ConnectivityFlag {
    online: Arc<AtomicBool>,
}

impl ConnectivityFlag {
    #[must_use]
    pub fn new(online: bool) -> Self {
        Self {
            online: Arc::new(AtomicBool::new(online)),
        }
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }
}

#[async_trait]
impl Connectivity for ConnectivityFlag {
    async fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }
}

/// Probes the sync endpoint with a short `HEAD` request.
///
/// Any HTTP response counts as online; transport errors and timeouts do not.
#[derive(Clone, Debug)]
pub struct HttpProbe {
    client: Client,
    target: Url,
    timeout: Duration,
}

impl HttpProbe {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

    #[must_use]
    pub fn new(client: Client, target: Url) -> Self {
        Self {
            client,
            target,
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl Connectivity for HttpProbe {
    async fn is_online(&self) -> bool {
        match self
            .client
            .head(self.target.clone())
            .timeout(self.timeout)
            .send()
            .await
        {
            Ok(_) => true,
            Err(err) => {
                tracing::debug!(target_url = %self.target, error = %err, "connectivity probe failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn flag_toggles_across_clones() {
        let flag = ConnectivityFlag::new(true);
        let shared = flag.clone();
        assert!(shared.is_online().await);
        flag.set_online(false);
        assert!(!shared.is_online().await);
    }

    #[tokio::test]
    async fn probe_of_unroutable_host_is_offline() {
        let probe = HttpProbe::new(
            Client::new(),
            Url::parse("http://127.0.0.1:9/graphql").unwrap(),
        )
        .with_timeout(Duration::from_millis(500));
        assert!(!probe.is_online().await);
    }
}
