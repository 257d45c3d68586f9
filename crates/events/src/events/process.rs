use serde::{Deserialize, Serialize};

/// External shell command events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProcessEvent {
    Started {
        command: String,
    },

    Completed {
        command: String,
        exit_code: Option<i32>,
        duration_ms: u64,
    },

    /// Captured output of a finished command
    Output {
        command: String,
        stdout: String,
        stderr: String,
    },

    /// The command could not be spawned at all
    Failed {
        command: String,
        error: String,
    },
}
