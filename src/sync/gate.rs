//! Activation gate.
//!
//! Listens on the agent bus for credential availability. The first event
//! stores the credentials and starts the scheduler exactly once; every
//! later event replaces the stored credentials wholesale and leaves the
//! running scheduler alone.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::{Scheduler, SyncEngine};
use crate::events::AgentEvent;

/// Delay before the very first poll after activation — near-zero so the
/// initial sync starts almost immediately.
const INITIAL_POLL_DELAY: Duration = Duration::from_secs(1);

pub struct ActivationGate {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl ActivationGate {
    /// Spawn the gate listener on the given bus subscription.
    pub fn spawn(
        mut events: broadcast::Receiver<AgentEvent>,
        engine: Arc<SyncEngine>,
    ) -> Self {
        let token = CancellationToken::new();
        let task_token = token.clone();

        let handle = tokio::spawn(async move {
            let mut scheduler: Option<Scheduler> = None;

            loop {
                tokio::select! {
                    _ = task_token.cancelled() => break,
                    event = events.recv() => match event {
                        Ok(AgentEvent::CredentialsAvailable(credentials)) => {
                            engine.credentials().replace(credentials).await;
                            if scheduler.is_none() {
                                tracing::info!("credentials available, starting sync scheduler");
                                scheduler = Some(Scheduler::start(
                                    engine.clone(),
                                    engine.poll_interval(),
                                    INITIAL_POLL_DELAY,
                                ));
                            } else {
                                tracing::debug!("credentials replaced");
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(missed)) => {
                            tracing::warn!(missed, "event bus lagged, continuing");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
            }

            if let Some(scheduler) = scheduler {
                scheduler.stop().await;
            }
        });

        Self { token, handle }
    }

    /// Stop listening and stop the owned scheduler (join semantics).
    pub async fn stop(self) {
        self.token.cancel();
        if let Err(e) = self.handle.await {
            tracing::warn!(error = %e, "activation gate task terminated abnormally");
        }
    }
}
