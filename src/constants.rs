// Tracking and sync tuning constants in one place for easy adjustment.
// Config fields default to these; hosts override via the config file.

// === Sampling ===
/// How often the tracker polls the playback observer.
pub const SAMPLE_INTERVAL_SECS: u64 = 5;
/// Watch-time credited per playing sample. Accrual is quantized to the
/// sampling interval rather than measured wall-clock time.
pub const TICK_INCREMENT_SECS: f64 = 5.0;
/// Largest forward position jump between samples that is still treated
/// as legitimate playback.
pub const MAX_ALLOWED_JUMP_SECS: f64 = 60.0;
/// Percent of the duration that must accrue before a content item is
/// automatically marked complete.
pub const REQUIRED_PERCENT: f64 = 90.0;

// === Sync ===
/// How often accumulated watch-time is reconciled with the server.
pub const SYNC_INTERVAL_SECS: u64 = 30;
/// Attempts per sync invocation, including the first.
pub const SYNC_MAX_ATTEMPTS: u32 = 3;
/// Backoff before the first retry; doubles on each subsequent retry.
pub const SYNC_BASE_BACKOFF_MS: u64 = 1000;
/// Consecutive failed sync invocations before the user sees a warning.
pub const SYNC_FAILURE_WARN_THRESHOLD: u32 = 3;

// === Playback observers ===
/// Provider embeds often report duration late; wait this long before
/// re-reading it once.
pub const EMBED_DURATION_RETRY_SECS: u64 = 2;

// === Network ===
pub const HTTP_TIMEOUT_SECS: u64 = 30;

// === Events ===
/// Broadcast channel capacity for the internal event bus.
pub const EVENT_BUS_CAPACITY: usize = 64;
