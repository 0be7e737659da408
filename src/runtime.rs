use anyhow::Result;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::api::LmsClient;
use crate::cache::ProgressCache;
use crate::config::Config;
use crate::events::{EventBus, EventFilter, EventSubscriber, NoticeSeverity, TrackerEvent};
use crate::models::{ContentKey, CourseProgress};
use crate::player::PlaybackObserver;
use crate::tracker::{
    CompletionCallback, CompletionGate, SharedSession, TrackerHandle, WatchTimeTracker,
};
use crate::workers::{SyncAgent, SyncHandle};

/// Builder for a tracking session. All cross-component wiring happens
/// here, in one place, instead of through process-wide initialization
/// flags; two runtimes in one process never share hidden state.
pub struct TrackerRuntimeBuilder {
    config: Config,
    api: Arc<LmsClient>,
    cache: Arc<dyn ProgressCache>,
    bus: EventBus,
    progress: Option<Arc<RwLock<CourseProgress>>>,
    on_complete: Option<CompletionCallback>,
}

impl TrackerRuntimeBuilder {
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn event_bus(mut self, bus: EventBus) -> Self {
        self.bus = bus;
        self
    }

    pub fn progress(mut self, progress: Arc<RwLock<CourseProgress>>) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn on_complete(mut self, callback: CompletionCallback) -> Self {
        self.on_complete = Some(callback);
        self
    }

    /// Wire up and start the sampler and sync loops for one content item.
    pub async fn start(
        self,
        content_key: ContentKey,
        observer: Arc<dyn PlaybackObserver>,
    ) -> Result<TrackerRuntime> {
        let mut gate = CompletionGate::new(self.api.clone(), self.bus.clone());
        if let Some(progress) = &self.progress {
            gate = gate.with_progress(progress.clone());
        }
        if let Some(callback) = self.on_complete {
            gate = gate.with_callback(callback);
        }

        let tracker = Arc::new(
            WatchTimeTracker::start(
                self.config.tracking.clone(),
                content_key.clone(),
                observer,
                self.cache.clone(),
                Arc::new(gate),
                self.bus.clone(),
            )
            .await?,
        );
        let session = tracker.session();

        if self.config.sync.precheck_enrollment {
            Self::precheck_enrollment(&self.api, &session, &self.bus, &content_key).await;
        }

        let agent = Arc::new(SyncAgent::new(
            session.clone(),
            self.api,
            self.cache,
            self.bus.clone(),
            self.config.sync.clone(),
        ));

        info!("Tracking session started for {}", content_key);
        Ok(TrackerRuntime {
            session,
            bus: self.bus,
            tracker_handle: tracker.spawn(),
            sync_handle: agent.spawn(),
        })
    }

    async fn precheck_enrollment(
        api: &Arc<LmsClient>,
        session: &SharedSession,
        bus: &EventBus,
        content_key: &ContentKey,
    ) {
        match api.check_enrollment(&content_key.course_id).await {
            Ok(true) => {}
            Ok(false) => {
                session.write().await.enrollment_valid = false;
                bus.publish(TrackerEvent::notice(
                    NoticeSeverity::Error,
                    "You are not enrolled in this course; progress won't be saved",
                ));
            }
            // A failed pre-check is advisory; the sync endpoints report
            // 403 themselves if enrollment truly is missing.
            Err(e) => warn!("Enrollment pre-check failed: {}", e),
        }
    }
}

/// A running tracking session: one sampler, one sync loop, one event
/// stream, scoped to a single content item.
pub struct TrackerRuntime {
    session: SharedSession,
    bus: EventBus,
    tracker_handle: TrackerHandle,
    sync_handle: SyncHandle,
}

impl TrackerRuntime {
    pub fn builder(api: Arc<LmsClient>, cache: Arc<dyn ProgressCache>) -> TrackerRuntimeBuilder {
        TrackerRuntimeBuilder {
            config: Config::default(),
            api,
            cache,
            bus: EventBus::default(),
            progress: None,
            on_complete: None,
        }
    }

    pub fn session(&self) -> SharedSession {
        self.session.clone()
    }

    pub fn events(&self) -> EventSubscriber {
        self.bus.subscribe()
    }

    pub fn events_filtered(&self, filter: EventFilter) -> EventSubscriber {
        self.bus.subscribe_filtered(filter)
    }

    /// Stop both timers deterministically, flushing unsynced watch-time
    /// once on the way out. Call on unmount or content change.
    pub async fn shutdown(self) {
        self.tracker_handle.stop().await;
        self.sync_handle.stop().await;
        info!("Tracking session shut down");
    }
}
