use serde::{Deserialize, Serialize};

use super::FailureContext;

/// Notification delivery events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotificationEvent {
    Sent {
        recipients: Vec<String>,
        subject: String,
    },

    /// Delivery failed; the transition that triggered it stands
    Failed {
        subject: String,
        failure: FailureContext,
    },

    /// Delivery skipped: dry run or notifications disabled
    Suppressed {
        subject: String,
    },
}
