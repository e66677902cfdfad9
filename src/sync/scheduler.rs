//! Self-rearming poll scheduler.
//!
//! A single spawned task loops {wait, poll, rearm}. The rearm happens only
//! after `poll()` returns, so the effective period between cycle starts is
//! `poll_interval + cycle_duration` rather than a fixed wall-clock cadence
//! — downstream tooling depends on that spacing, keep it. Cancellation is
//! observed while waiting, never mid-cycle: an in-flight cycle always runs
//! to its completion or abort point.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::SyncEngine;

pub struct Scheduler {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl Scheduler {
    /// Start the poll task. The first firing happens after `initial_delay`;
    /// each later firing `poll_interval` after the previous cycle returned.
    pub fn start(
        engine: Arc<SyncEngine>,
        poll_interval: Duration,
        initial_delay: Duration,
    ) -> Self {
        let token = CancellationToken::new();
        let task_token = token.clone();

        let handle = tokio::spawn(async move {
            let mut delay = initial_delay;
            loop {
                tokio::select! {
                    _ = task_token.cancelled() => break,
                    _ = tokio::time::sleep(delay) => {}
                }

                match engine.poll().await {
                    Ok(stats) if stats.downloaded > 0 || stats.skipped > 0 => {
                        tracing::info!(
                            downloaded = stats.downloaded,
                            skipped = stats.skipped,
                            aborted = stats.aborted,
                            "poll cycle finished"
                        );
                    }
                    Ok(_) => tracing::debug!("poll cycle finished with no work"),
                    Err(e) => tracing::warn!(error = %e, "poll cycle failed"),
                }

                delay = poll_interval;
            }
        });

        Self { token, handle }
    }

    /// Stop the scheduler. No cycle starts after this returns; an in-flight
    /// cycle completes (or aborts) first — join semantics, not an
    /// interrupt. A stopped scheduler cannot be restarted.
    pub async fn stop(self) {
        self.token.cancel();
        if let Err(e) = self.handle.await {
            tracing::warn!(error = %e, "scheduler task terminated abnormally");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::testing::{creds, engine_over, SlowFeed};

    #[tokio::test(start_paused = true)]
    async fn fires_after_initial_delay_and_rearms() {
        let feed = Arc::new(SlowFeed::new(Duration::ZERO));
        let (engine, _tmp) = engine_over(feed.clone(), Duration::from_secs(60));
        engine.credentials().replace(creds("t")).await;

        let scheduler = Scheduler::start(engine, Duration::from_secs(60), Duration::from_secs(1));
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(feed.started(), 1);

        tokio::time::sleep(Duration::from_secs(130)).await;
        assert_eq!(feed.started(), 3);

        scheduler.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn period_includes_cycle_duration() {
        // 30s cycles with a 60s interval: starts at t=1, 91, 181. A fixed
        // wall-clock cadence would have fired a fourth time by t=200.
        let feed = Arc::new(SlowFeed::new(Duration::from_secs(30)));
        let (engine, _tmp) = engine_over(feed.clone(), Duration::from_secs(60));
        engine.credentials().replace(creds("t")).await;

        let scheduler = Scheduler::start(engine, Duration::from_secs(60), Duration::from_secs(1));
        tokio::time::sleep(Duration::from_secs(200)).await;
        assert_eq!(feed.started(), 3);

        scheduler.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn stop_joins_in_flight_cycle() {
        let feed = Arc::new(SlowFeed::new(Duration::from_secs(30)));
        let (engine, _tmp) = engine_over(feed.clone(), Duration::from_secs(60));
        engine.credentials().replace(creds("t")).await;

        let scheduler = Scheduler::start(engine, Duration::from_secs(60), Duration::from_secs(1));
        // Land inside the first cycle, then stop.
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(feed.started(), 1);
        scheduler.stop().await;

        // The in-flight cycle ran to completion before stop returned.
        assert_eq!(feed.finished(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn no_cycle_starts_after_stop() {
        let feed = Arc::new(SlowFeed::new(Duration::ZERO));
        let (engine, _tmp) = engine_over(feed.clone(), Duration::from_secs(60));
        engine.credentials().replace(creds("t")).await;

        let scheduler = Scheduler::start(engine, Duration::from_secs(60), Duration::from_secs(1));
        tokio::time::sleep(Duration::from_secs(2)).await;
        scheduler.stop().await;
        let fired = feed.started();

        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(feed.started(), fired);
    }
}
