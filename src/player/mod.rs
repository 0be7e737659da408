pub mod bridge;
pub mod embedded;
pub mod native;
pub mod traits;

pub use bridge::{HostHandle, PlayerCommand};
pub use embedded::EmbeddedPlayerObserver;
pub use native::NativeElementObserver;
pub use traits::{MediaIssue, PlaybackObserver, PlayerState};

use crate::config::TrackingConfig;
use crate::models::{ContentDescriptor, ContentSource};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Build the observer variant matching a content descriptor's source.
pub fn observer_for(
    descriptor: &ContentDescriptor,
    config: &TrackingConfig,
) -> (
    Arc<dyn PlaybackObserver>,
    HostHandle,
    mpsc::UnboundedReceiver<PlayerCommand>,
) {
    match &descriptor.source {
        ContentSource::Embedded { provider_url } => {
            let (observer, handle, commands) = EmbeddedPlayerObserver::with_retry_delay(
                provider_url.clone(),
                Duration::from_secs(config.embed_duration_retry_secs),
            );
            (Arc::new(observer), handle, commands)
        }
        ContentSource::Native { media_url } => {
            let (observer, handle, commands) = NativeElementObserver::new(media_url.clone());
            (Arc::new(observer), handle, commands)
        }
    }
}
