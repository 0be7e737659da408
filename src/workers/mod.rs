pub mod sync_agent;

pub use sync_agent::{SyncAgent, SyncHandle};
