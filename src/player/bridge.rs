use anyhow::{Result, anyhow};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{RwLock, broadcast, mpsc};
use tracing::warn;

use super::traits::{MediaIssue, PlayerState};

/// Control request the hosting player must execute.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerCommand {
    Seek(Duration),
    Pause,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct PlaybackSnapshot {
    pub position: Option<Duration>,
    pub duration: Option<Duration>,
    pub state: PlayerState,
}

/// State shared between an observer and its host-facing handle.
pub(crate) struct ObserverShared {
    pub snapshot: RwLock<PlaybackSnapshot>,
    pub commands: mpsc::UnboundedSender<PlayerCommand>,
    pub issues: broadcast::Sender<MediaIssue>,
}

impl ObserverShared {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<PlayerCommand>) {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (issues, _) = broadcast::channel(16);
        let shared = Arc::new(Self {
            snapshot: RwLock::new(PlaybackSnapshot::default()),
            commands,
            issues,
        });
        (shared, command_rx)
    }

    /// Send a command to the host and optimistically fold its effect into
    /// the snapshot, so the next sample reflects it even if the host's
    /// state callback lags a tick.
    pub async fn send_command(&self, command: PlayerCommand) -> Result<()> {
        {
            let mut snapshot = self.snapshot.write().await;
            match &command {
                PlayerCommand::Seek(position) => snapshot.position = Some(*position),
                PlayerCommand::Pause => snapshot.state = PlayerState::Paused,
            }
        }
        self.commands
            .send(command)
            .map_err(|_| anyhow!("player bridge closed"))
    }
}

/// Host-facing side of an observer: the embedding UI pushes player
/// lifecycle updates through this and drains the command stream.
#[derive(Clone)]
pub struct HostHandle {
    shared: Arc<ObserverShared>,
    fallback_url: Option<String>,
}

impl HostHandle {
    pub(crate) fn new(shared: Arc<ObserverShared>, fallback_url: Option<String>) -> Self {
        Self {
            shared,
            fallback_url,
        }
    }

    pub async fn set_position(&self, position: Duration) {
        self.shared.snapshot.write().await.position = Some(position);
    }

    pub async fn set_duration(&self, duration: Duration) {
        self.shared.snapshot.write().await.duration = Some(duration);
    }

    pub async fn set_state(&self, state: PlayerState) {
        self.shared.snapshot.write().await.state = state;
    }

    /// Report that the underlying player failed to load or play.
    pub async fn report_error(&self, message: impl Into<String>) {
        let message = message.into();
        warn!("Player error reported by host: {}", message);
        {
            let mut snapshot = self.shared.snapshot.write().await;
            snapshot.state = PlayerState::Error(message.clone());
        }
        let _ = self.shared.issues.send(MediaIssue {
            message,
            fallback_url: self.fallback_url.clone(),
            fatal: true,
        });
    }
}
