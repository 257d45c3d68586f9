#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! High-level operations orchestration for relval
//!
//! This crate serves as the orchestration layer between the CLI and the
//! catalog, queue store and command runner. Every operation takes an
//! [`OpsCtx`] built once at startup and reports progress as events.

mod context;
mod dispatch;
pub mod notify;
mod query;
mod queue;
mod reconcile;
pub mod template;
mod types;

pub use context::{OpsContextBuilder, OpsCtx};
pub use notify::{MailNotifier, Notification, Notifier, NullNotifier};
pub use types::{
    DispatchReport, PackageListing, PackageSource, QueueOutcome, QueueReport, ReconcileReport,
    SkippedPoll, Transition, ValidationListing,
};

// Re-export operation functions
pub use dispatch::start_next_queued_validation;
pub use query::{list_packages, list_validations};
pub use queue::queue_validation;
pub use reconcile::refresh_validations;

use relval_errors::Error;
use serde::Serialize;

/// Operation result that can be serialized for CLI output
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum OperationResult {
    /// Catalog or cached package listing
    PackageList(PackageListing),
    /// Validation listing
    ValidationList(ValidationListing),
    /// Result of queueing a validation
    QueueReport(QueueReport),
    /// Result of starting the next queued validation
    DispatchReport(DispatchReport),
    /// Result of polling running validations
    ReconcileReport(ReconcileReport),
    /// Generic success message
    Success(String),
}

impl OperationResult {
    /// Convert to JSON string
    ///
    /// # Errors
    ///
    /// Returns an error if the result cannot be serialized.
    pub fn to_json(&self) -> Result<String, Error> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
