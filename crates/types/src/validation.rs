//! Validation jobs and their state machine

use crate::{PackageRecord, PolledStatus, Timestamp, ValidationStatus};
use relval_errors::StateError;
use serde::{Deserialize, Serialize};

/// One validation run of a package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validation {
    pub id: i64,
    pub package: PackageRecord,
    pub inserted: Timestamp,
    pub started: Option<Timestamp>,
    pub ended: Option<Timestamp>,
    pub status: ValidationStatus,
}

/// Effect of applying a poll result to a running validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "status", rename_all = "snake_case")]
pub enum PollOutcome {
    /// Still running, nothing changed
    Unchanged,
    /// Reached `DONE_OK` or `DONE_FAIL`
    Finished(ValidationStatus),
    /// Reported not running while stored as running
    Disappeared,
}

impl Validation {
    /// Dispatch: `QUEUED -> RUNNING`
    ///
    /// # Errors
    ///
    /// Returns `StateError::InvalidTransition` unless the validation is queued.
    pub fn start(&mut self, now: Timestamp) -> Result<(), StateError> {
        if self.status != ValidationStatus::Queued {
            return Err(self.invalid_transition(ValidationStatus::Running));
        }
        self.status = ValidationStatus::Running;
        self.started = Some(now);
        Ok(())
    }

    /// Apply a mapped status command result to a running validation.
    ///
    /// A validation reported as not running is marked `DISAPPEARED` rather
    /// than going back to the queue. Terminal outcomes set `ended`.
    ///
    /// # Errors
    ///
    /// Returns `StateError::InvalidTransition` unless the validation is running.
    pub fn apply_poll(
        &mut self,
        polled: PolledStatus,
        now: Timestamp,
    ) -> Result<PollOutcome, StateError> {
        if self.status != ValidationStatus::Running {
            let target = match polled {
                PolledStatus::Running => ValidationStatus::Running,
                PolledStatus::NotRunning => ValidationStatus::Disappeared,
                PolledStatus::DoneOk => ValidationStatus::DoneOk,
                PolledStatus::DoneFail => ValidationStatus::DoneFail,
            };
            return Err(self.invalid_transition(target));
        }

        let (status, outcome) = match polled {
            PolledStatus::Running => return Ok(PollOutcome::Unchanged),
            PolledStatus::NotRunning => (ValidationStatus::Disappeared, PollOutcome::Disappeared),
            PolledStatus::DoneOk => (
                ValidationStatus::DoneOk,
                PollOutcome::Finished(ValidationStatus::DoneOk),
            ),
            PolledStatus::DoneFail => (
                ValidationStatus::DoneFail,
                PollOutcome::Finished(ValidationStatus::DoneFail),
            ),
        };
        self.status = status;
        self.ended = Some(now);
        Ok(outcome)
    }

    /// Human readable run identifier: `version-platform-arch-inserted`
    #[must_use]
    pub fn session_tag(&self) -> String {
        format!(
            "{}-{}-{}-{}",
            self.package.version,
            self.package.platform.as_deref().unwrap_or("unknown"),
            self.package.arch.as_deref().unwrap_or("unknown"),
            self.inserted.format_compact()
        )
    }

    /// Multi-line description including the package
    #[must_use]
    pub fn describe(&self, baseurl: &str) -> String {
        let fmt_opt = |ts: Option<Timestamp>| ts.map_or_else(|| "-".to_string(), |t| t.to_string());
        format!(
            "Validation #{id} ({tag}):
 - Status   : {status}
 - Inserted : {inserted}
 - Started  : {started}
 - Ended    : {ended}
{package}",
            id = self.id,
            tag = self.session_tag(),
            status = self.status,
            inserted = self.inserted,
            started = fmt_opt(self.started),
            ended = fmt_opt(self.ended),
            package = self.package.describe(baseurl),
        )
    }

    fn invalid_transition(&self, to: ValidationStatus) -> StateError {
        StateError::InvalidTransition {
            from: self.status.to_string(),
            to: to.to_string(),
        }
    }
}
