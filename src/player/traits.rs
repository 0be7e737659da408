use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::broadcast;

#[derive(Debug, Clone, PartialEq, Default)]
pub enum PlayerState {
    #[default]
    Idle,
    Loading,
    Playing,
    Paused,
    Stopped,
    Error(String),
}

/// Playback problem reported by an observer.
///
/// `fatal` distinguishes a broken player (offer the fallback URL, do not
/// retry) from degraded conditions like a missing duration, where tracking
/// continues in percent-unknown mode.
#[derive(Debug, Clone)]
pub struct MediaIssue {
    pub message: String,
    pub fallback_url: Option<String>,
    pub fatal: bool,
}

/// Read/control surface over a media source, polled by the watch-time
/// tracker. Two adapters implement it: one over third-party provider
/// embeds, one over natively embedded media elements.
#[async_trait]
pub trait PlaybackObserver: Send + Sync {
    async fn position(&self) -> Option<Duration>;

    /// May be unknown early in the media lifecycle; adapters decide how
    /// hard to try before reporting `None`.
    async fn duration(&self) -> Option<Duration>;

    async fn state(&self) -> PlayerState;

    async fn is_playing(&self) -> bool {
        matches!(self.state().await, PlayerState::Playing)
    }

    async fn seek(&self, position: Duration) -> Result<()>;

    async fn pause(&self) -> Result<()>;

    fn media_issues(&self) -> broadcast::Receiver<MediaIssue>;
}
