use std::sync::Arc;
use tokio::sync::RwLock;

use crate::models::ContentKey;

/// Per-session lifecycle. `ThresholdCrossed` is terminal for completion
/// purposes only; sampling and sync continue past it. A cheat reset drops
/// the session back into `Sampling` in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    Sampling,
    ThresholdCrossed,
}

/// Mutable state for one mounted player instance.
///
/// Owned by the watch-time tracker; the sync agent reads cloned snapshots
/// and writes back only the sync bookkeeping fields.
#[derive(Debug, Clone)]
pub struct WatchSession {
    pub content_key: ContentKey,
    /// Quantized watch-time. Non-decreasing except for cheat resets.
    pub accumulated_seconds: f64,
    /// Unknown until the observer reports it; percent is 0 until then.
    pub duration_seconds: Option<f64>,
    pub last_observed_position: f64,
    /// Latches true once the completion threshold is reached; never
    /// resets within a session except through a cheat reset.
    pub threshold_crossed: bool,
    /// Last accumulated value the server acknowledged. May exceed
    /// `accumulated_seconds` after a cheat reset; the server keeps the
    /// maximum it ever saw.
    pub last_synced_seconds: f64,
    pub consecutive_sync_failures: u32,
    /// Cleared permanently for the session once the server answers 403.
    pub enrollment_valid: bool,
    pub phase: SessionPhase,
}

impl WatchSession {
    pub fn new(content_key: ContentKey) -> Self {
        Self {
            content_key,
            accumulated_seconds: 0.0,
            duration_seconds: None,
            last_observed_position: 0.0,
            threshold_crossed: false,
            last_synced_seconds: 0.0,
            consecutive_sync_failures: 0,
            enrollment_valid: true,
            phase: SessionPhase::Idle,
        }
    }

    /// Seed from a cached value left behind by an interrupted session.
    pub fn resume_from(&mut self, cached_seconds: f64) {
        self.accumulated_seconds = cached_seconds.max(0.0);
    }

    pub fn percent_watched(&self) -> f64 {
        match self.duration_seconds {
            Some(duration) if duration > 0.0 => self.accumulated_seconds / duration * 100.0,
            _ => 0.0,
        }
    }

    /// Punitive reset applied when a seek-ahead jump is detected.
    pub fn reset_for_cheat(&mut self) {
        self.accumulated_seconds = 0.0;
        self.last_observed_position = 0.0;
        self.threshold_crossed = false;
        self.phase = SessionPhase::Sampling;
    }

    pub fn has_unsynced_progress(&self) -> bool {
        (self.accumulated_seconds - self.last_synced_seconds).abs() > f64::EPSILON
    }
}

pub type SharedSession = Arc<RwLock<WatchSession>>;

pub fn shared(session: WatchSession) -> SharedSession {
    Arc::new(RwLock::new(session))
}
