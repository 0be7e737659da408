//! Client-side progress and watch-time tracking for course content.
//!
//! The engine samples a playback observer on a fixed interval, accrues
//! quantized watch-time, polices seek-ahead cheating, caches progress
//! locally across reloads, reconciles with the completion service with
//! retry and backoff, and marks content complete exactly once when the
//! watched percentage crosses the configured threshold.

pub mod api;
pub mod cache;
pub mod config;
pub mod constants;
pub mod errors;
pub mod events;
pub mod models;
pub mod player;
pub mod runtime;
pub mod tracker;
pub mod workers;

pub use api::{CompletionAck, LmsClient, RetryPolicy};
pub use cache::{FileProgressStore, MemoryProgressStore, ProgressCache};
pub use config::Config;
pub use errors::{ApiError, TrackError};
pub use events::{EventBus, EventFilter, EventKind, NoticeSeverity, TrackerEvent};
pub use models::{ContentDescriptor, ContentKey, ContentSource, CourseProgress};
pub use player::{
    EmbeddedPlayerObserver, HostHandle, MediaIssue, NativeElementObserver, PlaybackObserver,
    PlayerCommand, PlayerState,
};
pub use runtime::{TrackerRuntime, TrackerRuntimeBuilder};
pub use tracker::{CompletionGate, SessionPhase, WatchSession, WatchTimeTracker};
pub use workers::SyncAgent;
