use relval_types::ValidationStatus;
use serde::{Deserialize, Serialize};

use super::FailureContext;

/// Validation queue and lifecycle events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ValidationEvent {
    Enqueued {
        tarball: String,
        validation_id: i64,
    },

    /// The dedup guard refused a second active validation
    AlreadyQueued {
        tarball: String,
    },

    NothingQueued,

    /// Package already fetched and its directory still present
    UnpackSkipped {
        tarball: String,
        destdir: String,
    },

    Unpacking {
        url: String,
        destdir: String,
    },

    Unpacked {
        destdir: String,
    },

    /// Unpack failed; the partial destination was removed
    UnpackFailed {
        destdir: String,
        failure: FailureContext,
    },

    ModuleFileWritten {
        path: String,
    },

    Started {
        validation_id: i64,
        session_tag: String,
    },

    StatusQueried {
        session_tag: String,
        exit_code: Option<i32>,
    },

    StatusUnchanged {
        session_tag: String,
    },

    Finished {
        session_tag: String,
        status: ValidationStatus,
    },

    /// Reported not running while stored as running
    Disappeared {
        session_tag: String,
    },

    /// The status command exit code is absent from the status code table
    UnknownStatusCode {
        session_tag: String,
        exit_code: Option<i32>,
    },

    /// A command template referenced variables that are not defined
    UnresolvedVariables {
        template: String,
        keys: Vec<String>,
    },
}
