pub mod completion;
pub mod session;

pub use completion::{CompletionCallback, CompletionGate};
pub use session::{SessionPhase, SharedSession, WatchSession};

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, broadcast};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cache::ProgressCache;
use crate::config::TrackingConfig;
use crate::events::{EventBus, EventKind, EventPayload, NoticeSeverity, TrackerEvent};
use crate::models::ContentKey;
use crate::player::{MediaIssue, PlaybackObserver};

/// Samples the playback observer on a fixed interval, accrues quantized
/// watch-time, polices seek-ahead jumps, and raises the one-shot
/// completion event.
pub struct WatchTimeTracker {
    session: SharedSession,
    content_key: ContentKey,
    observer: Arc<dyn PlaybackObserver>,
    issues: Mutex<broadcast::Receiver<MediaIssue>>,
    cache: Arc<dyn ProgressCache>,
    gate: Arc<CompletionGate>,
    bus: EventBus,
    config: TrackingConfig,
}

impl WatchTimeTracker {
    /// Create a tracker for one content item, resuming accumulated
    /// watch-time from the progress cache when an entry exists.
    pub async fn start(
        config: TrackingConfig,
        content_key: ContentKey,
        observer: Arc<dyn PlaybackObserver>,
        cache: Arc<dyn ProgressCache>,
        gate: Arc<CompletionGate>,
        bus: EventBus,
    ) -> Result<Self> {
        let mut session = WatchSession::new(content_key.clone());

        match cache.load(&content_key).await {
            Ok(Some(cached)) => {
                info!(
                    "Resuming {} with {:.1}s of unsynced watch-time",
                    content_key, cached
                );
                session.resume_from(cached);
            }
            Ok(None) => {}
            Err(e) => warn!("Progress cache read failed for {}: {:#}", content_key, e),
        }

        let issues = Mutex::new(observer.media_issues());
        Ok(Self {
            session: session::shared(session),
            content_key,
            observer,
            issues,
            cache,
            gate,
            bus,
            config,
        })
    }

    pub fn session(&self) -> SharedSession {
        self.session.clone()
    }

    /// Process one sample. Called from the interval loop; exposed so
    /// tests can drive the state machine tick by tick.
    pub async fn tick(&self) {
        self.forward_media_issues().await;

        // Duration can show up at any point in the media lifecycle; fold
        // in whatever the observer currently reports.
        if let Some(duration) = self.observer.duration().await {
            self.session.write().await.duration_seconds = Some(duration.as_secs_f64());
        }

        if !self.observer.is_playing().await {
            return;
        }

        let Some(position) = self.observer.position().await else {
            return;
        };
        let position = position.as_secs_f64();

        let mut s = self.session.write().await;
        if s.phase == SessionPhase::Idle {
            s.phase = SessionPhase::Sampling;
        }

        let delta = position - s.last_observed_position;
        if delta > self.config.max_allowed_jump_secs && delta > 0.0 {
            let key = s.content_key.clone();
            s.reset_for_cheat();
            drop(s);
            self.punish_seek_ahead(key, delta).await;
            return;
        }

        s.last_observed_position = position;
        s.accumulated_seconds += self.config.tick_increment_secs;

        let key = s.content_key.clone();
        let accumulated = s.accumulated_seconds;
        let percent = s.percent_watched();
        let crossed = percent >= self.config.required_percent && !s.threshold_crossed;
        if crossed {
            s.threshold_crossed = true;
            s.phase = SessionPhase::ThresholdCrossed;
        }
        drop(s);

        // A failed write costs the local hedge for this tick, never the
        // threshold event or the completion call.
        if let Err(e) = self.cache.store(&key, accumulated).await {
            warn!("Failed to persist watch-time for {}: {:#}", key, e);
        }
        debug!(
            "Sampled {}: {:.1}s accumulated ({:.1}%)",
            key, accumulated, percent
        );

        if crossed {
            self.bus.publish(TrackerEvent::new(
                EventKind::ThresholdCrossed,
                EventPayload::Threshold {
                    key,
                    accumulated_seconds: accumulated,
                    percent,
                },
            ));
            self.gate.mark_complete(&self.session).await;
        }
    }

    /// Republish player issues onto the bus so subscribers get them
    /// alongside tracking events. Drained at sample granularity; issues
    /// surface even while playback is paused.
    async fn forward_media_issues(&self) {
        let mut issues = self.issues.lock().await;
        loop {
            match issues.try_recv() {
                Ok(issue) => {
                    self.bus.publish(TrackerEvent::new(
                        EventKind::MediaIssue,
                        EventPayload::Media {
                            key: self.content_key.clone(),
                            message: issue.message,
                            fallback_url: issue.fallback_url,
                            fatal: issue.fatal,
                        },
                    ));
                }
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    warn!("Dropped {} media issues for {}", skipped, self.content_key);
                }
                Err(_) => break,
            }
        }
    }

    /// Seek-ahead policy: rewind to the start, pause, and wipe the
    /// accrued time. Deliberately punitive so scrubbing to the end of
    /// required content earns nothing.
    async fn punish_seek_ahead(&self, key: ContentKey, jump_seconds: f64) {
        warn!(
            "Seek-ahead of {:.1}s detected on {}, resetting watch-time",
            jump_seconds, key
        );

        if let Err(e) = self.observer.seek(Duration::ZERO).await {
            warn!("Failed to rewind player: {:#}", e);
        }
        if let Err(e) = self.observer.pause().await {
            warn!("Failed to pause player: {:#}", e);
        }

        if let Err(e) = self.cache.store(&key, 0.0).await {
            warn!("Failed to persist the reset for {}: {:#}", key, e);
        }

        self.bus.publish(TrackerEvent::new(
            EventKind::CheatDetected,
            EventPayload::Cheat { key, jump_seconds },
        ));
        self.bus.publish(TrackerEvent::notice(
            NoticeSeverity::Warning,
            "Fast-forwarding is disabled for required content; playback was restarted",
        ));
    }

    /// Run the sampler until the handle is stopped or dropped.
    pub fn spawn(self: Arc<Self>) -> TrackerHandle {
        let token = CancellationToken::new();
        let child = token.clone();
        let interval_secs = self.config.sample_interval_secs;

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick of a tokio interval fires immediately; eat it
            // so samples start one full period after mount.
            interval.tick().await;

            loop {
                tokio::select! {
                    _ = child.cancelled() => break,
                    _ = interval.tick() => self.tick().await,
                }
            }
        });

        TrackerHandle {
            token,
            handle: Some(handle),
        }
    }
}

/// Abortable handle to a running sampler. Dropping it stops the loop;
/// timers never outlive the session they belong to.
pub struct TrackerHandle {
    token: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl TrackerHandle {
    pub async fn stop(mut self) {
        self.token.cancel();
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for TrackerHandle {
    fn drop(&mut self) {
        self.token.cancel();
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
