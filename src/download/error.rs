use thiserror::Error;

/// Typed download errors enabling retry classification.
///
/// `is_retryable()` separates transient failures (server errors, rate
/// limits, dropped connections) from permanent ones (client errors, disk
/// failures) so the retry loop can abort early.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("HTTP error {status} downloading {path}")]
    HttpStatus { status: u16, path: String },

    #[error("HTTP error downloading {path}: {source}")]
    Http {
        source: reqwest::Error,
        path: String,
    },

    #[error("Disk error: {0}")]
    Disk(#[from] std::io::Error),

    #[error("Download of {path} failed after {retries} retries: {last_error}")]
    RetriesExhausted {
        retries: u32,
        path: String,
        last_error: String,
    },
}

impl DownloadError {
    /// Whether this error is transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        match self {
            DownloadError::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            DownloadError::Http { .. } => true,
            DownloadError::Disk(_) => false,
            DownloadError::RetriesExhausted { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_not_retryable() {
        for status in [401, 403, 404] {
            let e = DownloadError::HttpStatus {
                status,
                path: "x".into(),
            };
            assert!(!e.is_retryable(), "status {status}");
        }
    }

    #[test]
    fn rate_limit_and_server_errors_retryable() {
        for status in [429, 500, 503] {
            let e = DownloadError::HttpStatus {
                status,
                path: "x".into(),
            };
            assert!(e.is_retryable(), "status {status}");
        }
    }

    #[test]
    fn disk_errors_not_retryable() {
        let e = DownloadError::Disk(std::io::Error::other("disk full"));
        assert!(!e.is_retryable());
    }

    #[test]
    fn connection_errors_retryable() {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let err = rt
            .block_on(reqwest::Client::new().get("http://127.0.0.1:1").send())
            .unwrap_err();
        let e = DownloadError::Http {
            source: err,
            path: "x".into(),
        };
        assert!(e.is_retryable());
    }
}
