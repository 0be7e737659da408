#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::time::Duration;
use tokio::sync::{RwLock, broadcast};

use coursetrack::api::{LmsClient, RetryPolicy};
use coursetrack::cache::{MemoryProgressStore, ProgressCache};
use coursetrack::config::Config;
use coursetrack::events::EventBus;
use coursetrack::models::ContentKey;
use coursetrack::player::{MediaIssue, PlaybackObserver, PlayerState};
use coursetrack::tracker::{CompletionGate, WatchTimeTracker};

/// Playback observer driven directly by the test instead of a host
/// player. Records the control commands the tracker issues.
pub struct ScriptedObserver {
    position: RwLock<Option<Duration>>,
    duration: RwLock<Option<Duration>>,
    state: RwLock<PlayerState>,
    pub seeks: std::sync::Mutex<Vec<Duration>>,
    pub pauses: AtomicUsize,
    issues: broadcast::Sender<MediaIssue>,
}

impl ScriptedObserver {
    pub fn new() -> Arc<Self> {
        let (issues, _) = broadcast::channel(16);
        Arc::new(Self {
            position: RwLock::new(None),
            duration: RwLock::new(None),
            state: RwLock::new(PlayerState::Idle),
            seeks: std::sync::Mutex::new(Vec::new()),
            pauses: AtomicUsize::new(0),
            issues,
        })
    }

    pub async fn play(&self) {
        *self.state.write().await = PlayerState::Playing;
    }

    pub async fn set_position_secs(&self, secs: f64) {
        *self.position.write().await = Some(Duration::from_secs_f64(secs));
    }

    pub async fn advance_secs(&self, secs: f64) {
        let mut position = self.position.write().await;
        let current = position.unwrap_or(Duration::ZERO);
        *position = Some(current + Duration::from_secs_f64(secs));
    }

    pub async fn set_duration_secs(&self, secs: f64) {
        *self.duration.write().await = Some(Duration::from_secs_f64(secs));
    }

    pub fn report_issue(&self, message: &str) {
        let _ = self.issues.send(MediaIssue {
            message: message.into(),
            fallback_url: None,
            fatal: true,
        });
    }
}

#[async_trait]
impl PlaybackObserver for ScriptedObserver {
    async fn position(&self) -> Option<Duration> {
        *self.position.read().await
    }

    async fn duration(&self) -> Option<Duration> {
        *self.duration.read().await
    }

    async fn state(&self) -> PlayerState {
        self.state.read().await.clone()
    }

    async fn seek(&self, position: Duration) -> Result<()> {
        self.seeks.lock().unwrap().push(position);
        *self.position.write().await = Some(position);
        Ok(())
    }

    async fn pause(&self) -> Result<()> {
        self.pauses
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        *self.state.write().await = PlayerState::Paused;
        Ok(())
    }

    fn media_issues(&self) -> broadcast::Receiver<MediaIssue> {
        self.issues.subscribe()
    }
}

pub fn content_key() -> ContentKey {
    ContentKey::new("course-1", "module-1", "content-1")
}

pub const WATCH_TIME_PATH: &str =
    "/courses/course-1/modules/module-1/contents/content-1/watch-time";
pub const COMPLETE_PATH: &str = "/courses/course-1/modules/module-1/contents/content-1/complete";

/// Client with fast retry delays so failing-path tests stay quick.
pub async fn test_api(base_url: &str) -> Arc<LmsClient> {
    let api = Arc::new(LmsClient::with_settings(
        base_url,
        Duration::from_secs(5),
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(10),
        },
    ));
    api.set_token(Some("test-token".into())).await;
    api
}

pub struct TestRig {
    pub tracker: Arc<WatchTimeTracker>,
    pub observer: Arc<ScriptedObserver>,
    pub cache: Arc<dyn ProgressCache>,
    pub bus: EventBus,
}

/// Tracker wired to in-memory storage and the given API base URL, using
/// default thresholds (5 s ticks, 60 s jump tolerance, 90 percent).
pub async fn build_rig(api_base_url: &str) -> TestRig {
    build_rig_with_cache(api_base_url, Arc::new(MemoryProgressStore::new())).await
}

pub async fn build_rig_with_cache(
    api_base_url: &str,
    cache: Arc<dyn ProgressCache>,
) -> TestRig {
    let api = test_api(api_base_url).await;
    let bus = EventBus::new(64);
    let observer = ScriptedObserver::new();
    let gate = Arc::new(CompletionGate::new(api, bus.clone()));

    let tracker = Arc::new(
        WatchTimeTracker::start(
            Config::default().tracking,
            content_key(),
            observer.clone(),
            cache.clone(),
            gate,
            bus.clone(),
        )
        .await
        .expect("tracker should start"),
    );

    TestRig {
        tracker,
        observer,
        cache,
        bus,
    }
}

/// Simulate `count` normal playback ticks: the position advances by the
/// tick interval and the tracker samples once per advance.
pub async fn run_playback_ticks(rig: &TestRig, count: usize) {
    for _ in 0..count {
        rig.observer.advance_secs(5.0).await;
        rig.tracker.tick().await;
    }
}
