//! Database models for the package cache and validation queue

use relval_errors::{Error, StateError};
use relval_types::{join_deps, split_deps, PackageRecord, Timestamp, Validation, ValidationStatus};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A cached package row
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct StoredPackage {
    pub id: i64,
    pub tarball: String,
    pub software: String,
    pub org: String,
    pub version: String,
    pub platform: Option<String>,
    pub arch: Option<String>,
    pub deps: String,
    pub fetched: bool,
}

impl StoredPackage {
    /// Column values for `record`; `id` is assigned by the database
    #[must_use]
    pub fn from_record(record: &PackageRecord) -> Self {
        Self {
            id: 0,
            tarball: record.tarball.clone(),
            software: record.software.clone(),
            org: record.org.clone(),
            version: record.version.clone(),
            platform: record.platform.clone(),
            arch: record.arch.clone(),
            deps: join_deps(&record.deps),
            fetched: record.fetched,
        }
    }

    #[must_use]
    pub fn into_record(self) -> PackageRecord {
        PackageRecord {
            tarball: self.tarball,
            software: self.software,
            version: self.version,
            org: self.org,
            platform: self.platform,
            arch: self.arch,
            deps: split_deps(&self.deps),
            fetched: self.fetched,
        }
    }
}

/// A validation row joined with its package
#[derive(Debug, Clone, FromRow)]
pub struct ValidationRow {
    pub id: i64,
    pub inserted: f64,
    pub started: Option<f64>,
    pub ended: Option<f64>,
    pub status: i64,
    pub package_id: i64,
    pub tarball: String,
    pub software: String,
    pub org: String,
    pub version: String,
    pub platform: Option<String>,
    pub arch: Option<String>,
    pub deps: String,
    pub fetched: bool,
}

impl ValidationRow {
    /// Convert into the domain type
    ///
    /// # Errors
    ///
    /// Returns an error if the stored status or a timestamp is out of range.
    pub fn into_validation(self) -> Result<Validation, Error> {
        let id = self.id;
        let timestamp = |secs: f64| {
            Timestamp::from_epoch_secs(secs).ok_or_else(|| StateError::DatabaseError {
                message: format!("validation {id} has an invalid timestamp: {secs}"),
            })
        };

        let inserted = timestamp(self.inserted)?;
        let started = self.started.map(timestamp).transpose()?;
        let ended = self.ended.map(timestamp).transpose()?;
        let status = ValidationStatus::from_i64(self.status)?;

        let package = StoredPackage {
            id: self.package_id,
            tarball: self.tarball,
            software: self.software,
            org: self.org,
            version: self.version,
            platform: self.platform,
            arch: self.arch,
            deps: self.deps,
            fetched: self.fetched,
        }
        .into_record();

        Ok(Validation {
            id,
            package,
            inserted,
            started,
            ended,
            status,
        })
    }
}

/// Result of an enqueue request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "validation_id", rename_all = "snake_case")]
pub enum EnqueueOutcome {
    /// A new queued validation was created
    Enqueued(i64),
    /// The package already has a queued or running validation
    AlreadyQueued,
}
