use serde::{Deserialize, Serialize};

use crate::models::ContentKey;

/// Event emitted on the internal tracker bus.
///
/// Components (tracker, sync agent, completion gate) communicate through
/// these instead of holding callbacks into each other, so each can be
/// exercised headless in tests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerEvent {
    pub id: String,
    pub kind: EventKind,
    pub payload: EventPayload,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl TrackerEvent {
    pub fn new(kind: EventKind, payload: EventPayload) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind,
            payload,
            timestamp: chrono::Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum EventKind {
    ThresholdCrossed,
    CheatDetected,
    ContentCompleted,
    SyncSucceeded,
    SyncFailed,
    MediaIssue,
    UserNotice,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventPayload {
    Threshold {
        key: ContentKey,
        accumulated_seconds: f64,
        percent: f64,
    },
    Cheat {
        key: ContentKey,
        jump_seconds: f64,
    },
    Completed {
        key: ContentKey,
        course_percent: Option<f64>,
    },
    Sync {
        key: ContentKey,
        synced_seconds: f64,
    },
    SyncFailure {
        key: ContentKey,
        consecutive_failures: u32,
        error: String,
    },
    Media {
        key: ContentKey,
        message: String,
        fallback_url: Option<String>,
        fatal: bool,
    },
    Notice {
        severity: NoticeSeverity,
        message: String,
    },
}

/// Severity of a user-facing notice. Ordered so filters can express
/// "warnings and up".
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord,
)]
pub enum NoticeSeverity {
    Info,
    Warning,
    Error,
}

impl TrackerEvent {
    /// Convenience constructor for user-facing notices.
    pub fn notice(severity: NoticeSeverity, message: impl Into<String>) -> Self {
        Self::new(
            EventKind::UserNotice,
            EventPayload::Notice {
                severity,
                message: message.into(),
            },
        )
    }
}
