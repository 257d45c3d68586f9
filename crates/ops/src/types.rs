//! Types for operation results

use relval_types::{PackageRecord, Validation, ValidationStatus};
use serde::Serialize;

/// Where a package listing comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PackageSource {
    /// Published catalog listing
    Published,
    /// Catalog listing of packages awaiting validation
    Validation,
    /// Packages cached in the queue store
    Known,
}

/// Package listing report
#[derive(Debug, Clone, Serialize)]
pub struct PackageListing {
    pub source: PackageSource,
    pub baseurl: String,
    pub packages: Vec<PackageRecord>,
    /// Catalog lines that could not be parsed
    pub skipped_lines: usize,
}

/// Validation listing report
#[derive(Debug, Clone, Serialize)]
pub struct ValidationListing {
    pub baseurl: String,
    pub validations: Vec<Validation>,
}

/// What `queue-validation` did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "validation_id", rename_all = "snake_case")]
pub enum QueueOutcome {
    Enqueued(i64),
    AlreadyQueued,
    /// Dry run: package resolved, nothing stored
    Skipped,
}

/// Queue report
#[derive(Debug, Clone, Serialize)]
pub struct QueueReport {
    pub package: PackageRecord,
    pub outcome: QueueOutcome,
}

/// Dispatch report
#[derive(Debug, Clone, Default, Serialize)]
pub struct DispatchReport {
    /// The dispatched validation; `None` when the queue was empty
    pub validation: Option<Validation>,
    pub destdir: Option<String>,
    /// Whether the unpack command ran in this dispatch
    pub unpacked: bool,
    pub module_file: Option<String>,
    /// Rendered module file, produced in dry run as well
    pub module_content: Option<String>,
    pub run_command: Option<String>,
    pub notified: bool,
    pub dry_run: bool,
}

impl DispatchReport {
    /// Report for an empty queue
    #[must_use]
    pub fn idle(dry_run: bool) -> Self {
        Self {
            dry_run,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn dispatched(&self) -> bool {
        self.validation.is_some()
    }
}

/// A terminal transition applied by reconciliation
#[derive(Debug, Clone, Serialize)]
pub struct Transition {
    pub validation_id: i64,
    pub session_tag: String,
    pub status: ValidationStatus,
    pub results_url: String,
    pub notified: bool,
}

/// A running validation whose status could not be mapped
#[derive(Debug, Clone, Serialize)]
pub struct SkippedPoll {
    pub validation_id: i64,
    pub session_tag: String,
    pub exit_code: Option<i32>,
}

/// Reconciliation report
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReconcileReport {
    /// Running validations probed
    pub checked: usize,
    pub unchanged: usize,
    pub transitions: Vec<Transition>,
    pub skipped: Vec<SkippedPoll>,
    pub dry_run: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_outcome_serialization() {
        let json = serde_json::to_value(QueueOutcome::Enqueued(7)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"outcome": "enqueued", "validation_id": 7})
        );

        let json = serde_json::to_value(QueueOutcome::AlreadyQueued).unwrap();
        assert_eq!(json, serde_json::json!({"outcome": "already_queued"}));
    }

    #[test]
    fn idle_dispatch_report() {
        let report = DispatchReport::idle(true);
        assert!(!report.dispatched());
        assert!(report.dry_run);
        assert!(report.module_content.is_none());
    }
}
