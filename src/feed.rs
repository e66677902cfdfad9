//! Change-feed client for the camera-cloud service.
//!
//! Fetches pages of "changed since" records. A failed or malformed page is
//! reported as an explicit [`FeedEnd`] signal rather than an error: the
//! caller treats it as end-of-feed for the cycle and keeps the records
//! already collected, so a single bad page never aborts a cycle.

use std::collections::BTreeSet;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::types::Credentials;

/// Auth header carrying the service token on every request.
pub const TOKEN_AUTH_HEADER: &str = "token_auth";

const CHANGED_FEED_PATH: &str = "/api/v2/videos/changed";

/// One media item from the change feed, scoped to a single poll cycle.
///
/// Ordering is `(created_at, address)`: ascending timestamp first, address
/// as tie-breaker so records sharing a timestamp are distinct batch
/// entries instead of collapsing onto one key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ChangeRecord {
    pub created_at: String,
    pub address: String,
}

/// Records accumulated across all pages of one poll cycle. Iteration order
/// is the checkpoint-advance order.
pub type ChangeBatch = BTreeSet<ChangeRecord>;

/// Result of fetching one feed page.
#[derive(Debug)]
pub enum PageOutcome {
    /// The page held entries; pagination continues. The vector may still be
    /// empty when every entry on the page was flagged deleted.
    Page(Vec<ChangeRecord>),
    /// The feed is exhausted or terminated for this cycle.
    End(FeedEnd),
}

/// Why pagination ended.
#[derive(Debug)]
pub enum FeedEnd {
    /// The server returned a page with no entries.
    Drained,
    /// The page request failed or returned a non-success status.
    Transport(reqwest::Error),
    /// The page body did not decode as a feed document.
    Malformed(serde_json::Error),
}

impl std::fmt::Display for FeedEnd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeedEnd::Drained => write!(f, "feed drained"),
            FeedEnd::Transport(e) => write!(f, "page fetch failed: {e}"),
            FeedEnd::Malformed(e) => write!(f, "malformed feed page: {e}"),
        }
    }
}

/// Fetches one page of "changed since" records. Pages are 1-based.
#[async_trait]
pub trait ChangeFeed: Send + Sync {
    async fn fetch_page(
        &self,
        credentials: &Credentials,
        since: &str,
        page: u32,
    ) -> PageOutcome;
}

/// Raw feed entry as served by the remote endpoint.
#[derive(Debug, Deserialize)]
struct FeedEntry {
    deleted: bool,
    created_at: String,
    address: String,
}

/// Top-level feed document.
#[derive(Debug, Deserialize)]
struct FeedDocument {
    videos: Vec<FeedEntry>,
}

/// Decode a page body.
///
/// `Ok(None)` means an empty page (feed drained). `Ok(Some(records))`
/// means entries were present; deleted entries are filtered out, which can
/// leave the record list empty without ending pagination.
fn parse_page(body: &str) -> Result<Option<Vec<ChangeRecord>>, serde_json::Error> {
    let document: FeedDocument = serde_json::from_str(body)?;
    if document.videos.is_empty() {
        return Ok(None);
    }
    let records = document
        .videos
        .into_iter()
        .filter(|entry| !entry.deleted)
        .map(|entry| ChangeRecord {
            created_at: entry.created_at,
            address: entry.address,
        })
        .collect();
    Ok(Some(records))
}

/// HTTP client for the change-feed endpoint.
pub struct HttpChangeFeed {
    client: Client,
}

impl HttpChangeFeed {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }
}

impl Default for HttpChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChangeFeed for HttpChangeFeed {
    async fn fetch_page(
        &self,
        credentials: &Credentials,
        since: &str,
        page: u32,
    ) -> PageOutcome {
        let url = format!(
            "https://{}:{}{}",
            credentials.host, credentials.port, CHANGED_FEED_PATH
        );

        let page = page.to_string();
        let response = match self
            .client
            .get(&url)
            .query(&[("since", since), ("page", page.as_str())])
            .header(TOKEN_AUTH_HEADER, &credentials.token)
            .send()
            .await
            .and_then(|r| r.error_for_status())
        {
            Ok(response) => response,
            Err(e) => return PageOutcome::End(FeedEnd::Transport(e)),
        };

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return PageOutcome::End(FeedEnd::Transport(e)),
        };

        match parse_page(&body) {
            Ok(Some(records)) => PageOutcome::Page(records),
            Ok(None) => PageOutcome::End(FeedEnd::Drained),
            Err(e) => PageOutcome::End(FeedEnd::Malformed(e)),
        }
    }
}
