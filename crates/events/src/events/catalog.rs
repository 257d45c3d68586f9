use serde::{Deserialize, Serialize};

use super::FailureContext;

/// Remote package catalog events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CatalogEvent {
    FetchStarted {
        url: String,
    },

    Fetched {
        url: String,
        packages: usize,
        skipped: usize,
    },

    /// An unparsable line was dropped from the listing
    LineSkipped {
        line_no: usize,
        reason: String,
    },

    FetchFailed {
        url: String,
        failure: FailureContext,
    },

    /// A tarball was added to the local package cache
    PackageCached {
        tarball: String,
    },
}
