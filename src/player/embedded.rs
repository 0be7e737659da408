use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::time::sleep;
use tracing::warn;

use super::bridge::{HostHandle, ObserverShared, PlayerCommand};
use super::traits::{MediaIssue, PlaybackObserver, PlayerState};
use crate::constants;

/// Observer over a third-party iframe-based provider player.
///
/// Provider bridges frequently report duration late, well after the embed
/// loads. The first duration read that comes up empty waits once and
/// re-reads before giving up; after that the adapter answers immediately
/// and the tracker runs in percent-unknown mode until duration appears.
pub struct EmbeddedPlayerObserver {
    shared: Arc<ObserverShared>,
    provider_url: String,
    retry_delay: Duration,
    duration_probed: AtomicBool,
}

impl EmbeddedPlayerObserver {
    pub fn new(
        provider_url: impl Into<String>,
    ) -> (Self, HostHandle, mpsc::UnboundedReceiver<PlayerCommand>) {
        Self::with_retry_delay(
            provider_url,
            Duration::from_secs(constants::EMBED_DURATION_RETRY_SECS),
        )
    }

    pub fn with_retry_delay(
        provider_url: impl Into<String>,
        retry_delay: Duration,
    ) -> (Self, HostHandle, mpsc::UnboundedReceiver<PlayerCommand>) {
        let provider_url = provider_url.into();
        let (shared, command_rx) = ObserverShared::new();
        let handle = HostHandle::new(shared.clone(), Some(provider_url.clone()));
        (
            Self {
                shared,
                provider_url,
                retry_delay,
                duration_probed: AtomicBool::new(false),
            },
            handle,
            command_rx,
        )
    }

    async fn read_duration(&self) -> Option<Duration> {
        self.shared.snapshot.read().await.duration
    }
}

#[async_trait]
impl PlaybackObserver for EmbeddedPlayerObserver {
    async fn position(&self) -> Option<Duration> {
        self.shared.snapshot.read().await.position
    }

    async fn duration(&self) -> Option<Duration> {
        if let Some(duration) = self.read_duration().await {
            return Some(duration);
        }

        // Retry once per session; subsequent unknown reads return fast so
        // the sampler is not stalled every tick.
        if self.duration_probed.swap(true, Ordering::SeqCst) {
            return None;
        }

        sleep(self.retry_delay).await;
        let duration = self.read_duration().await;
        if duration.is_none() {
            warn!(
                "Provider player at {} did not report duration; tracking without percent",
                self.provider_url
            );
            let _ = self.shared.issues.send(MediaIssue {
                message: "duration unavailable from provider".into(),
                fallback_url: Some(self.provider_url.clone()),
                fatal: false,
            });
        }
        duration
    }

    async fn state(&self) -> PlayerState {
        self.shared.snapshot.read().await.state.clone()
    }

    async fn seek(&self, position: Duration) -> Result<()> {
        self.shared.send_command(PlayerCommand::Seek(position)).await
    }

    async fn pause(&self) -> Result<()> {
        self.shared.send_command(PlayerCommand::Pause).await
    }

    fn media_issues(&self) -> broadcast::Receiver<MediaIssue> {
        self.shared.issues.subscribe()
    }
}
