use std::sync::Arc;

use tokio::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// Credentials for the camera-cloud service, delivered by the credential
/// event and replaced wholesale when a new event arrives.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub host: String,
    pub port: u16,
    pub token: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Atomically-swappable credential handle.
///
/// The activation gate replaces the value from its own task while the sync
/// cycle reads it from the scheduler task; the `RwLock` swap is the handoff
/// between the two contexts.
#[derive(Clone, Default)]
pub struct SharedCredentials {
    inner: Arc<RwLock<Option<Credentials>>>,
}

impl SharedCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the stored credentials wholesale.
    pub async fn replace(&self, credentials: Credentials) {
        *self.inner.write().await = Some(credentials);
    }

    /// Snapshot the current credentials, if any.
    pub async fn snapshot(&self) -> Option<Credentials> {
        self.inner.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds(token: &str) -> Credentials {
        Credentials {
            host: "cloud.example.com".into(),
            port: 443,
            token: token.into(),
        }
    }

    #[test]
    fn debug_redacts_token() {
        let rendered = format!("{:?}", creds("super-secret"));
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("<redacted>"));
        assert!(rendered.contains("cloud.example.com"));
    }

    #[tokio::test]
    async fn replace_swaps_wholesale() {
        let shared = SharedCredentials::new();
        assert!(shared.snapshot().await.is_none());

        shared.replace(creds("first")).await;
        assert_eq!(shared.snapshot().await.unwrap().token, "first");

        shared.replace(creds("second")).await;
        assert_eq!(shared.snapshot().await.unwrap().token, "second");
    }
}
