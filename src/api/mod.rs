pub mod client;
pub mod retry;


pub use client::{CompletionAck, LmsClient};
pub use retry::{RetryPolicy, retry_with_backoff};
