use serde::{Deserialize, Serialize};

/// Single-instance pid lock events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LockEvent {
    Acquired {
        path: String,
        pid: u32,
    },

    /// Another live instance holds the lock
    Waiting {
        holder: i32,
        attempt: u32,
        attempts: u32,
    },

    Released {
        path: String,
    },
}
