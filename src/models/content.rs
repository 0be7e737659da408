use serde::Deserialize;

use crate::errors::TrackError;
use crate::models::ContentKey;

/// Where the media for a content item actually lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentSource {
    /// Third-party provider embed (iframe player). Carries the provider
    /// URL so the UI can offer "open at source" when the embed fails.
    Embedded { provider_url: String },
    /// Directly hosted media resource played through a native element.
    Native { media_url: String },
}

/// Normalized description of one content item.
///
/// Backend course documents are loosely shaped: the same field shows up
/// under different names depending on which admin tool wrote it. This is
/// the one fixed shape the tracking engine consumes; normalization happens
/// exactly once, at ingestion.
#[derive(Debug, Clone)]
pub struct ContentDescriptor {
    pub key: ContentKey,
    pub title: String,
    pub source: ContentSource,
    /// Duration as recorded in course metadata, in seconds. Advisory only;
    /// the playback observer's reported duration wins once available.
    pub duration_hint: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawContent {
    #[serde(alias = "name")]
    title: Option<String>,
    #[serde(alias = "videoUrl", alias = "video_url", alias = "embedUrl", alias = "embed_url")]
    embed_url: Option<String>,
    #[serde(alias = "mediaUrl", alias = "media_url", alias = "fileUrl", alias = "file_url")]
    media_url: Option<String>,
    #[serde(alias = "videoDuration", alias = "video_duration")]
    duration: Option<f64>,
}

impl ContentDescriptor {
    /// Validate and normalize a raw course-content document.
    ///
    /// An embed URL takes precedence over a direct media URL when a
    /// document carries both.
    pub fn normalize(key: ContentKey, raw: &serde_json::Value) -> Result<Self, TrackError> {
        let raw: RawContent = serde_json::from_value(raw.clone())?;

        let source = if let Some(url) = raw.embed_url {
            ContentSource::Embedded { provider_url: url }
        } else if let Some(url) = raw.media_url {
            ContentSource::Native { media_url: url }
        } else {
            return Err(TrackError::Configuration(format!(
                "content {key} has no playable source"
            )));
        };

        let duration_hint = raw.duration.filter(|d| *d > 0.0);

        Ok(Self {
            key,
            title: raw.title.unwrap_or_default(),
            source,
            duration_hint,
        })
    }
}
