use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::LmsClient;
use crate::cache::ProgressCache;
use crate::config::SyncConfig;
use crate::errors::ApiError;
use crate::events::{EventBus, EventKind, EventPayload, NoticeSeverity, TrackerEvent};
use crate::tracker::SharedSession;

/// Reconciles locally accumulated watch-time with the server on an
/// independent timer.
///
/// Each pass reads a snapshot of the session rather than holding it over
/// the network call; a sample tick landing mid-sync just means the next
/// pass sends the newer value.
pub struct SyncAgent {
    session: SharedSession,
    api: Arc<LmsClient>,
    cache: Arc<dyn ProgressCache>,
    bus: EventBus,
    config: SyncConfig,
}

impl SyncAgent {
    pub fn new(
        session: SharedSession,
        api: Arc<LmsClient>,
        cache: Arc<dyn ProgressCache>,
        bus: EventBus,
        config: SyncConfig,
    ) -> Self {
        Self {
            session,
            api,
            cache,
            bus,
            config,
        }
    }

    /// One reconciliation pass. Failures are absorbed into session
    /// bookkeeping and notices; nothing here may take down the host.
    pub async fn sync_once(&self) {
        let snapshot = self.session.read().await.clone();

        if !snapshot.enrollment_valid {
            debug!("Enrollment known invalid, skipping watch-time sync");
            return;
        }
        if !self.api.has_credential().await {
            debug!("No credential, skipping watch-time sync");
            return;
        }
        if !snapshot.has_unsynced_progress() {
            debug!("Watch-time unchanged since last sync, skipping");
            return;
        }

        let key = snapshot.content_key.clone();
        let duration = snapshot.duration_seconds.unwrap_or(0.0);

        match self
            .api
            .record_watch_time(&key, snapshot.accumulated_seconds, duration)
            .await
        {
            Ok(()) => {
                {
                    let mut s = self.session.write().await;
                    s.last_synced_seconds = snapshot.accumulated_seconds;
                    s.consecutive_sync_failures = 0;
                }

                // Server is authoritative now; the local hedge can go.
                if let Err(e) = self.cache.remove(&key).await {
                    warn!("Failed to clear progress cache for {}: {:#}", key, e);
                }

                self.bus.publish(TrackerEvent::new(
                    EventKind::SyncSucceeded,
                    EventPayload::Sync {
                        key,
                        synced_seconds: snapshot.accumulated_seconds,
                    },
                ));
            }
            Err(e) => self.handle_failure(key, e).await,
        }
    }

    async fn handle_failure(&self, key: crate::models::ContentKey, error: ApiError) {
        // The credential can be cleared while a pass is in flight. The
        // next pass re-checks it up front, so this is a skip rather than
        // a failure worth counting.
        if matches!(error, ApiError::MissingCredential) {
            debug!("Credential cleared mid-sync for {}, skipping", key);
            return;
        }

        let failures = {
            let mut s = self.session.write().await;
            s.consecutive_sync_failures += 1;
            if matches!(error, ApiError::NotEnrolled) {
                s.enrollment_valid = false;
            }
            s.consecutive_sync_failures
        };

        self.bus.publish(TrackerEvent::new(
            EventKind::SyncFailed,
            EventPayload::SyncFailure {
                key: key.clone(),
                consecutive_failures: failures,
                error: error.to_string(),
            },
        ));

        match error {
            ApiError::NotEnrolled => {
                info!("Server reports not enrolled for {}; sync disabled", key);
                self.bus.publish(TrackerEvent::notice(
                    NoticeSeverity::Error,
                    "You are not enrolled in this course; progress won't be saved",
                ));
            }
            ApiError::Unauthorized => {
                // Keep ticking: a refreshed credential heals this without
                // restarting the session.
                self.bus.publish(TrackerEvent::notice(
                    NoticeSeverity::Error,
                    "Your session has expired; log in again to save progress",
                ));
            }
            other => {
                if failures >= self.config.failure_warn_threshold {
                    warn!(
                        "Watch-time sync for {} failing ({} consecutive): {}",
                        key, failures, other
                    );
                    self.bus.publish(TrackerEvent::notice(
                        NoticeSeverity::Warning,
                        "Having trouble saving your progress; it is kept locally for now",
                    ));
                } else {
                    debug!(
                        "Watch-time sync for {} failed ({} consecutive): {}",
                        key, failures, other
                    );
                }
            }
        }
    }

    /// Run the sync loop until the handle is stopped or dropped.
    pub fn spawn(self: Arc<Self>) -> SyncHandle {
        let token = CancellationToken::new();
        let child = token.clone();
        let agent = self.clone();

        let handle = tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(Duration::from_secs(agent.config.interval_secs));
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            interval.tick().await;

            loop {
                tokio::select! {
                    _ = child.cancelled() => break,
                    _ = interval.tick() => agent.sync_once().await,
                }
            }
        });

        SyncHandle {
            token,
            handle: Some(handle),
            agent: self,
        }
    }
}

/// Handle to a running sync loop. `stop` flushes once more before the
/// timer is released; plain drop just kills the timer.
pub struct SyncHandle {
    token: CancellationToken,
    handle: Option<JoinHandle<()>>,
    agent: Arc<SyncAgent>,
}

impl SyncHandle {
    pub async fn stop(mut self) {
        self.token.cancel();
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
        // Best-effort final flush so a clean unmount loses nothing.
        self.agent.sync_once().await;
    }
}

impl Drop for SyncHandle {
    fn drop(&mut self) {
        self.token.cancel();
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
