use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};

use super::bridge::{HostHandle, ObserverShared, PlayerCommand};
use super::traits::{MediaIssue, PlaybackObserver, PlayerState};

/// Observer over a directly embedded media element.
///
/// The host forwards element lifecycle callbacks through the returned
/// [`HostHandle`]; duration arrives with the loadedmetadata callback, so
/// no probing is needed here.
pub struct NativeElementObserver {
    shared: Arc<ObserverShared>,
}

impl NativeElementObserver {
    pub fn new(
        media_url: impl Into<String>,
    ) -> (Self, HostHandle, mpsc::UnboundedReceiver<PlayerCommand>) {
        let (shared, command_rx) = ObserverShared::new();
        let handle = HostHandle::new(shared.clone(), Some(media_url.into()));
        (Self { shared }, handle, command_rx)
    }
}

#[async_trait]
impl PlaybackObserver for NativeElementObserver {
    async fn position(&self) -> Option<Duration> {
        self.shared.snapshot.read().await.position
    }

    async fn duration(&self) -> Option<Duration> {
        self.shared.snapshot.read().await.duration
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

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reflects_host_updates() {
        let (observer, handle, _commands) = NativeElementObserver::new("https://cdn/x.mp4");

        assert_eq!(observer.state().await, PlayerState::Idle);
        assert!(observer.position().await.is_none());

        handle.set_state(PlayerState::Playing).await;
        handle.set_position(Duration::from_secs(12)).await;
        handle.set_duration(Duration::from_secs(240)).await;

        assert!(observer.is_playing().await);
        assert_eq!(observer.position().await, Some(Duration::from_secs(12)));
        assert_eq!(observer.duration().await, Some(Duration::from_secs(240)));
    }

    #[tokio::test]
    async fn seek_and_pause_reach_the_host_and_update_the_snapshot() {
        let (observer, handle, mut commands) = NativeElementObserver::new("https://cdn/x.mp4");
        handle.set_state(PlayerState::Playing).await;
        handle.set_position(Duration::from_secs(90)).await;

        observer.seek(Duration::ZERO).await.unwrap();
        observer.pause().await.unwrap();

        assert_eq!(commands.recv().await, Some(PlayerCommand::Seek(Duration::ZERO)));
        assert_eq!(commands.recv().await, Some(PlayerCommand::Pause));
        assert_eq!(observer.position().await, Some(Duration::ZERO));
        assert_eq!(observer.state().await, PlayerState::Paused);
    }

    #[tokio::test]
    async fn host_error_is_fatal_and_carries_fallback() {
        let (observer, handle, _commands) = NativeElementObserver::new("https://cdn/x.mp4");
        let mut issues = observer.media_issues();

        handle.report_error("decode failed").await;

        let issue = issues.recv().await.unwrap();
        assert!(issue.fatal);
        assert_eq!(issue.fallback_url.as_deref(), Some("https://cdn/x.mp4"));
        assert!(matches!(observer.state().await, PlayerState::Error(_)));
    }
}
