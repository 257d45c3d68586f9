//! Validation status and status-code mapping

use relval_errors::{ConfigError, StateError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle status of a validation
///
/// The discriminants are the values persisted in the `validation.status`
/// column and must never be renumbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationStatus {
    /// Waiting to be dispatched (reported as not running by older tools)
    Queued = 0,
    Running = 1,
    DoneOk = 2,
    DoneFail = 3,
    /// The external run vanished without reporting a terminal status
    Disappeared = 4,
}

const STATUS_TABLE: [(ValidationStatus, &str); 5] = [
    (ValidationStatus::Queued, "QUEUED"),
    (ValidationStatus::Running, "RUNNING"),
    (ValidationStatus::DoneOk, "DONE_OK"),
    (ValidationStatus::DoneFail, "DONE_FAIL"),
    (ValidationStatus::Disappeared, "DISAPPEARED"),
];

impl ValidationStatus {
    /// Every status, in persisted value order
    pub const ALL: [ValidationStatus; 5] = [
        Self::Queued,
        Self::Running,
        Self::DoneOk,
        Self::DoneFail,
        Self::Disappeared,
    ];

    /// Stored integer value
    #[must_use]
    pub fn as_i64(self) -> i64 {
        self as i64
    }

    /// Decode a stored integer value
    ///
    /// # Errors
    ///
    /// Returns `StateError::UnknownStatus` for values outside the table.
    pub fn from_i64(value: i64) -> Result<Self, StateError> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_i64() == value)
            .ok_or_else(|| StateError::UnknownStatus {
                value: value.to_string(),
            })
    }

    /// Symbolic name, e.g. `DONE_OK`
    #[must_use]
    pub fn name(self) -> &'static str {
        STATUS_TABLE
            .iter()
            .find(|(status, _)| *status == self)
            .map_or("UNKNOWN", |(_, name)| name)
    }

    /// Queued and running validations block a new enqueue of the same package
    #[must_use]
    pub fn is_active(self) -> bool {
        matches!(self, Self::Queued | Self::Running)
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        !self.is_active()
    }
}

impl fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ValidationStatus {
    type Err = StateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase().replace('-', "_");
        if upper == "NOT_RUNNING" {
            return Ok(Self::Queued);
        }
        STATUS_TABLE
            .iter()
            .find(|(_, name)| *name == upper)
            .map(|(status, _)| *status)
            .ok_or_else(|| StateError::UnknownStatus {
                value: s.to_string(),
            })
    }
}

/// Status reported by the external status command, after exit code mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PolledStatus {
    Running,
    NotRunning,
    DoneOk,
    DoneFail,
}

impl PolledStatus {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Running => "RUNNING",
            Self::NotRunning => "NOT_RUNNING",
            Self::DoneOk => "DONE_OK",
            Self::DoneFail => "DONE_FAIL",
        }
    }
}

impl fmt::Display for PolledStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Mapping between status command exit codes and polled statuses
///
/// Construction rejects tables where two statuses share an exit code, so a
/// code always maps back to at most one status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCodeMap {
    entries: [(PolledStatus, i32); 4],
}

impl StatusCodeMap {
    /// Build the mapping
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::DuplicateStatusCode` if two statuses share a code.
    pub fn new(
        running: i32,
        not_running: i32,
        done_ok: i32,
        done_fail: i32,
    ) -> Result<Self, ConfigError> {
        let entries = [
            (PolledStatus::Running, running),
            (PolledStatus::NotRunning, not_running),
            (PolledStatus::DoneOk, done_ok),
            (PolledStatus::DoneFail, done_fail),
        ];
        for (i, (first, code)) in entries.iter().enumerate() {
            if let Some((second, _)) = entries[i + 1..].iter().find(|(_, c)| c == code) {
                return Err(ConfigError::DuplicateStatusCode {
                    code: *code,
                    first: first.name().to_string(),
                    second: second.name().to_string(),
                });
            }
        }
        Ok(Self { entries })
    }

    /// Map an exit code back to a status; `None` for unmapped codes
    #[must_use]
    pub fn lookup(&self, code: i32) -> Option<PolledStatus> {
        self.entries
            .iter()
            .find(|(_, c)| *c == code)
            .map(|(status, _)| *status)
    }

    #[must_use]
    pub fn code_for(&self, status: PolledStatus) -> i32 {
        self.entries
            .iter()
            .find(|(s, _)| *s == status)
            .map_or(-1, |(_, code)| *code)
    }
}
