//! Core sync state machine.
//!
//! One `poll()` call is one complete cycle: read the checkpoint, drain the
//! paginated change feed into an ordered batch, then resolve each entry in
//! ascending timestamp order — skip if the destination already exists,
//! download otherwise — advancing the checkpoint after every resolved
//! entry. A failed download aborts the rest of the batch; the entries left
//! behind are re-fetched on the next cycle because the checkpoint stopped
//! at the last completed one.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use crate::config::SyncConfig;
use crate::download::{paths, Downloader};
use crate::feed::{ChangeBatch, ChangeFeed, ChangeRecord, FeedEnd, PageOutcome};
use crate::settings::SyncSettings;
use crate::types::{Credentials, SharedCredentials};

/// Counters for one poll cycle.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PollStats {
    /// Non-empty feed pages consumed.
    pub pages: u32,
    /// Records in the resolved batch.
    pub fetched: usize,
    /// Entries downloaded this cycle.
    pub downloaded: u32,
    /// Entries skipped because the destination already existed.
    pub skipped: u32,
    /// Whether the batch was cut short by a failure.
    pub aborted: bool,
}

pub struct SyncEngine {
    settings: SyncSettings,
    feed: Arc<dyn ChangeFeed>,
    downloader: Arc<dyn Downloader>,
    credentials: SharedCredentials,
    config: SyncConfig,
}

impl SyncEngine {
    pub fn new(
        settings: SyncSettings,
        feed: Arc<dyn ChangeFeed>,
        downloader: Arc<dyn Downloader>,
        credentials: SharedCredentials,
        config: SyncConfig,
    ) -> Self {
        Self {
            settings,
            feed,
            downloader,
            credentials,
            config,
        }
    }

    /// Handle the activation gate writes credentials through.
    pub fn credentials(&self) -> &SharedCredentials {
        &self.credentials
    }

    pub fn poll_interval(&self) -> Duration {
        self.config.poll_interval
    }

    /// Run one poll cycle. Never fails the process: feed problems end the
    /// cycle early, download problems abort the batch; only settings-store
    /// failures surface as errors, and the scheduler rearms regardless.
    pub async fn poll(&self) -> anyhow::Result<PollStats> {
        let mut stats = PollStats::default();

        let Some(credentials) = self.credentials.snapshot().await else {
            tracing::trace!("no credentials yet, skipping poll cycle");
            return Ok(stats);
        };

        let mut checkpoint = self
            .settings
            .last_update()
            .await
            .context("reading sync checkpoint")?;

        let batch = self.collect_batch(&credentials, &checkpoint, &mut stats).await;
        if batch.is_empty() {
            tracing::debug!(since = %checkpoint, "no new records");
            return Ok(stats);
        }
        tracing::info!(records = batch.len(), since = %checkpoint, "resolving change batch");

        for entry in &batch {
            let destination =
                paths::local_destination(&self.config.output_root, &entry.created_at, &entry.address);

            if self.destination_exists(&destination).await {
                self.advance_checkpoint(&mut checkpoint, &entry.created_at)
                    .await?;
                stats.skipped += 1;
                continue;
            }

            if let Err(e) = self.fetch_entry(&credentials, entry, &destination).await {
                tracing::warn!(
                    address = %entry.address,
                    error = %e,
                    "download failed, aborting remaining batch entries"
                );
                stats.aborted = true;
                break;
            }

            self.advance_checkpoint(&mut checkpoint, &entry.created_at)
                .await?;
            stats.downloaded += 1;

            // Rate limit against the remote service between downloads.
            tokio::time::sleep(self.config.inter_item_sleep).await;
        }

        Ok(stats)
    }

    /// Drain the paginated feed into one ordered batch. Any end signal —
    /// drained, transport failure, malformed page — terminates pagination
    /// for this cycle; records from earlier pages are kept.
    async fn collect_batch(
        &self,
        credentials: &Credentials,
        since: &str,
        stats: &mut PollStats,
    ) -> ChangeBatch {
        let mut batch = ChangeBatch::new();
        let mut page = 1;
        loop {
            match self.feed.fetch_page(credentials, since, page).await {
                PageOutcome::Page(records) => {
                    stats.pages += 1;
                    batch.extend(records);
                    page += 1;
                }
                PageOutcome::End(FeedEnd::Drained) => {
                    tracing::debug!(pages = stats.pages, "feed drained");
                    break;
                }
                PageOutcome::End(end) => {
                    tracing::warn!(pages = stats.pages, "{end}; treating as end of feed");
                    break;
                }
            }
        }
        stats.fetched = batch.len();
        batch
    }

    async fn destination_exists(&self, destination: &Path) -> bool {
        match tokio::fs::try_exists(destination).await {
            Ok(exists) => exists,
            Err(e) => {
                tracing::warn!(
                    path = %destination.display(),
                    error = %e,
                    "failed to check destination, assuming missing"
                );
                false
            }
        }
    }

    /// Create the destination's parents and download the clip. Directory
    /// creation failures abort the batch exactly like download failures.
    async fn fetch_entry(
        &self,
        credentials: &Credentials,
        entry: &ChangeRecord,
        destination: &Path,
    ) -> anyhow::Result<()> {
        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        self.downloader
            .download(credentials, &entry.address, destination)
            .await?;
        Ok(())
    }

    /// Persist a new checkpoint value. The checkpoint never moves backward,
    /// even if the feed serves a record older than the current one.
    async fn advance_checkpoint(
        &self,
        current: &mut String,
        candidate: &str,
    ) -> anyhow::Result<()> {
        if candidate > current.as_str() {
            self.settings
                .set_last_update(candidate)
                .await
                .context("writing sync checkpoint")?;
            *current = candidate.to_string();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::FAR_PAST_TIMESTAMP;
    use crate::sync::testing::{creds, harness, record};

    const T1: &str = "2023-04-05T06:00:00+00:00";
    const T2: &str = "2023-04-05T07:00:00+00:00";
    const T3: &str = "2023-04-05T08:00:00+00:00";

    fn three_records() -> Vec<crate::feed::ChangeRecord> {
        vec![
            record(T1, "/media/clips/a.mp4"),
            record(T2, "/media/clips/b.mp4"),
            record(T3, "/media/clips/c.mp4"),
        ]
    }

    #[tokio::test]
    async fn poll_without_credentials_is_a_noop() {
        let h = harness(three_records(), 10);
        let stats = h.engine.poll().await.unwrap();
        assert_eq!(stats, PollStats::default());
        assert_eq!(h.feed.calls(), 0);
        assert_eq!(h.settings.last_update().await.unwrap(), FAR_PAST_TIMESTAMP);
    }

    #[tokio::test]
    async fn poll_downloads_batch_and_advances_checkpoint() {
        let h = harness(three_records(), 10);
        h.engine.credentials().replace(creds("t")).await;

        let stats = h.engine.poll().await.unwrap();
        assert_eq!(stats.downloaded, 3);
        assert_eq!(stats.skipped, 0);
        assert!(!stats.aborted);
        assert_eq!(h.settings.last_update().await.unwrap(), T3);

        // Files land under {root}/{year}/{Month}/{day}/{basename}.
        assert!(h.output_root.join("2023/April/05/a.mp4").exists());
        assert!(h.output_root.join("2023/April/05/c.mp4").exists());
    }

    #[tokio::test]
    async fn repoll_with_no_new_data_is_idempotent() {
        let h = harness(three_records(), 10);
        h.engine.credentials().replace(creds("t")).await;

        h.engine.poll().await.unwrap();
        let checkpoint = h.settings.last_update().await.unwrap();
        let downloads = h.downloader.downloads().len();

        let stats = h.engine.poll().await.unwrap();
        assert_eq!(stats.downloaded, 0);
        assert_eq!(stats.fetched, 0);
        assert_eq!(h.settings.last_update().await.unwrap(), checkpoint);
        assert_eq!(h.downloader.downloads().len(), downloads);
    }

    #[tokio::test]
    async fn checkpoint_never_moves_backward() {
        let h = harness(three_records(), 10);
        h.engine.credentials().replace(creds("t")).await;
        h.settings.set_last_update(T3).await.unwrap();

        let stats = h.engine.poll().await.unwrap();
        assert_eq!(stats.fetched, 0);
        assert_eq!(h.settings.last_update().await.unwrap(), T3);
    }

    #[tokio::test]
    async fn existing_destination_is_skipped_without_download() {
        let h = harness(vec![record(T1, "/media/clips/a.mp4")], 10);
        h.engine.credentials().replace(creds("t")).await;

        let dir = h.output_root.join("2023/April/05");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("a.mp4"), b"already here").unwrap();

        let stats = h.engine.poll().await.unwrap();
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.downloaded, 0);
        assert!(h.downloader.downloads().is_empty());
        assert_eq!(h.settings.last_update().await.unwrap(), T1);
    }

    #[tokio::test]
    async fn failed_download_aborts_batch_and_freezes_checkpoint() {
        let h = harness(three_records(), 10);
        h.engine.credentials().replace(creds("t")).await;
        h.downloader.fail_on("/media/clips/b.mp4");

        let stats = h.engine.poll().await.unwrap();
        assert!(stats.aborted);
        assert_eq!(stats.downloaded, 1);
        assert_eq!(h.settings.last_update().await.unwrap(), T1);
        assert_eq!(h.downloader.downloads(), vec!["/media/clips/a.mp4"]);
    }

    #[tokio::test]
    async fn next_cycle_retries_entries_after_abort() {
        let h = harness(three_records(), 10);
        h.engine.credentials().replace(creds("t")).await;
        h.downloader.fail_on("/media/clips/b.mp4");
        h.engine.poll().await.unwrap();

        h.downloader.clear_failures();
        let stats = h.engine.poll().await.unwrap();
        assert!(!stats.aborted);
        assert_eq!(stats.downloaded, 2);
        assert_eq!(h.settings.last_update().await.unwrap(), T3);
        assert_eq!(
            h.downloader.downloads(),
            vec![
                "/media/clips/a.mp4",
                "/media/clips/b.mp4",
                "/media/clips/c.mp4"
            ]
        );
    }

    #[tokio::test]
    async fn pagination_merges_pages_until_drained() {
        // 4 records with page size 2: two full pages, then the empty page
        // that terminates the cycle.
        let records = vec![
            record(T1, "/media/clips/a.mp4"),
            record(T2, "/media/clips/b.mp4"),
            record(T3, "/media/clips/c.mp4"),
            record("2023-04-05T09:00:00+00:00", "/media/clips/d.mp4"),
        ];
        let h = harness(records, 2);
        h.engine.credentials().replace(creds("t")).await;

        let stats = h.engine.poll().await.unwrap();
        assert_eq!(stats.pages, 2);
        assert_eq!(stats.fetched, 4);
        assert_eq!(stats.downloaded, 4);
        assert_eq!(h.feed.calls(), 3);
    }

    #[tokio::test]
    async fn same_timestamp_records_are_both_processed() {
        let h = harness(
            vec![
                record(T1, "/media/clips/front.mp4"),
                record(T1, "/media/clips/yard.mp4"),
            ],
            10,
        );
        h.engine.credentials().replace(creds("t")).await;

        let stats = h.engine.poll().await.unwrap();
        assert_eq!(stats.downloaded, 2);
        assert!(h.output_root.join("2023/April/05/front.mp4").exists());
        assert!(h.output_root.join("2023/April/05/yard.mp4").exists());
    }

    #[tokio::test]
    async fn empty_feed_leaves_checkpoint_untouched() {
        let h = harness(Vec::new(), 10);
        h.engine.credentials().replace(creds("t")).await;

        let stats = h.engine.poll().await.unwrap();
        assert_eq!(stats, PollStats { pages: 0, fetched: 0, downloaded: 0, skipped: 0, aborted: false });
        assert_eq!(h.settings.last_update().await.unwrap(), FAR_PAST_TIMESTAMP);
    }
}
