use thiserror::Error;

/// Failures from the remote completion service.
///
/// The split matters operationally: `Transient` is the only variant worth
/// retrying. 401 and 403 are structural and repeat identically until the
/// credential or enrollment changes out-of-band.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("session expired")]
    Unauthorized,

    #[error("not enrolled in this course")]
    NotEnrolled,

    #[error("no credential available")]
    MissingCredential,

    #[error("request failed: {0}")]
    Transient(String),
}

impl ApiError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, ApiError::Transient(_))
    }

    pub fn from_status(status: reqwest::StatusCode) -> Self {
        match status.as_u16() {
            401 => ApiError::Unauthorized,
            403 => ApiError::NotEnrolled,
            other => ApiError::Transient(format!("unexpected status {other}")),
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::Transient(err.to_string())
    }
}

#[derive(Error, Debug)]
pub enum TrackError {
    #[error("playback error: {0}")]
    Playback(String),

    #[error("cache error: {0}")]
    Cache(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Api(#[from] ApiError),
}
