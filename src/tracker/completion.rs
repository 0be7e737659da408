use futures::future::BoxFuture;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use tracing::{info, warn};

use super::session::SharedSession;
use crate::api::LmsClient;
use crate::errors::ApiError;
use crate::events::{EventBus, EventKind, EventPayload, NoticeSeverity, TrackerEvent};
use crate::models::{ContentKey, CourseProgress};

pub type CompletionCallback =
    Box<dyn Fn(ContentKey, Option<f64>) -> BoxFuture<'static, ()> + Send + Sync>;

/// One-shot "mark this content item complete" action.
///
/// The server contract carries no idempotency key, so the only duplicate
/// protection is client-side: the session's threshold latch plus this
/// gate's own fired flag. A retried completion that the server already
/// processed would double-count server-side; that gap belongs to the
/// server contract, not to more client guessing.
pub struct CompletionGate {
    api: Arc<LmsClient>,
    bus: EventBus,
    progress: Option<Arc<RwLock<CourseProgress>>>,
    on_complete: Option<CompletionCallback>,
    fired: AtomicBool,
}

impl CompletionGate {
    pub fn new(api: Arc<LmsClient>, bus: EventBus) -> Self {
        Self {
            api,
            bus,
            progress: None,
            on_complete: None,
            fired: AtomicBool::new(false),
        }
    }

    /// Attach the in-memory course aggregate to update on success.
    pub fn with_progress(mut self, progress: Arc<RwLock<CourseProgress>>) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Attach a host callback invoked once on confirmed completion, e.g.
    /// to unlock the next module in the UI.
    pub fn with_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(ContentKey, Option<f64>) -> BoxFuture<'static, ()> + Send + Sync + 'static,
    {
        self.on_complete = Some(Box::new(callback));
        self
    }

    #[cfg(test)]
    pub(crate) fn has_fired(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }

    /// Attempt the completion call. At most one attempt is ever made per
    /// session; failures surface as notices and are never escalated.
    pub async fn mark_complete(&self, session: &SharedSession) {
        if self.fired.swap(true, Ordering::SeqCst) {
            return;
        }

        let (key, enrollment_valid) = {
            let s = session.read().await;
            (s.content_key.clone(), s.enrollment_valid)
        };

        if !self.api.has_credential().await {
            self.bus.publish(TrackerEvent::notice(
                NoticeSeverity::Warning,
                "Log in to track your progress",
            ));
            return;
        }

        if !enrollment_valid {
            warn!("Skipping completion for {}: not enrolled", key);
            return;
        }

        match self.api.mark_complete(&key).await {
            Ok(ack) => {
                info!(
                    "Content {} marked complete (course at {:?}%)",
                    key, ack.course_percent
                );

                if let Some(progress) = &self.progress {
                    progress
                        .write()
                        .await
                        .record_completion(&key, ack.course_percent);
                }

                self.bus.publish(TrackerEvent::new(
                    EventKind::ContentCompleted,
                    EventPayload::Completed {
                        key: key.clone(),
                        course_percent: ack.course_percent,
                    },
                ));
                self.bus.publish(TrackerEvent::notice(
                    NoticeSeverity::Info,
                    "Lesson marked complete",
                ));

                if let Some(callback) = &self.on_complete {
                    callback(key, ack.course_percent).await;
                }
            }
            Err(ApiError::NotEnrolled) => {
                session.write().await.enrollment_valid = false;
                self.bus.publish(TrackerEvent::notice(
                    NoticeSeverity::Error,
                    "You are not enrolled in this course",
                ));
            }
            Err(ApiError::Unauthorized) => {
                self.bus.publish(TrackerEvent::notice(
                    NoticeSeverity::Error,
                    "Your session has expired; log in again to save progress",
                ));
            }
            Err(e) => {
                warn!("Completion call for {} failed: {}", key, e);
                self.bus.publish(TrackerEvent::notice(
                    NoticeSeverity::Warning,
                    "Couldn't record completion; your watch-time is still being saved",
                ));
            }
        }
    }
}
