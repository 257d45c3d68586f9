//! Validation queue store

use crate::models::EnqueueOutcome;
use crate::queries;
use relval_errors::{Error, PackageError};
use relval_events::{AppEvent, CatalogEvent, EventEmitter, EventSender, ValidationEvent};
use relval_types::{PackageRecord, Timestamp, Validation, ValidationStatus};
use sqlx::{Pool, Sqlite};
use std::future::Future;
use std::path::Path;

/// Durable store for cached packages and their validations
///
/// Every operation runs in its own transaction, so a crash between two
/// calls leaves the queue in the state after the last committed one.
#[derive(Clone)]
pub struct ValidationStore {
    pool: Pool<Sqlite>,
    tx: EventSender,
}

impl EventEmitter for ValidationStore {
    fn event_sender(&self) -> Option<&EventSender> {
        Some(&self.tx)
    }
}

impl ValidationStore {
    /// Open (creating if needed) the database at `db_path` and migrate it
    ///
    /// # Errors
    ///
    /// Returns an error if database setup or migrations fail.
    pub async fn open(db_path: &Path, tx: EventSender) -> Result<Self, Error> {
        let pool = crate::create_pool(db_path).await?;
        crate::run_migrations(&pool).await?;
        Ok(Self { pool, tx })
    }

    /// Look up a cached package
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_package(&self, tarball: &str) -> Result<Option<PackageRecord>, Error> {
        let mut tx = self.pool.begin().await?;
        let row = queries::get_package(&mut tx, tarball).await?;
        tx.commit().await?;
        Ok(row.map(crate::StoredPackage::into_record))
    }

    /// Return the cached package for `tarball`, caching it from `candidates` on a miss
    ///
    /// `candidates` is only invoked when the tarball is not cached yet,
    /// typically to fetch a fresh catalog listing.
    ///
    /// # Errors
    ///
    /// Returns `PackageError::NotFound` if the tarball is neither cached nor
    /// among the candidates, or any error raised by `candidates`.
    pub async fn cache_package_or_lookup<F, Fut>(
        &self,
        tarball: &str,
        candidates: F,
    ) -> Result<PackageRecord, Error>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<PackageRecord>, Error>>,
    {
        if let Some(record) = self.find_package(tarball).await? {
            return Ok(record);
        }

        let listing = candidates().await?;
        let Some(candidate) = listing.into_iter().find(|p| p.tarball == tarball) else {
            return Err(PackageError::NotFound {
                tarball: tarball.to_string(),
            }
            .into());
        };

        let mut tx = self.pool.begin().await?;
        let inserted = queries::insert_package(&mut tx, &candidate).await?;
        // Another instance may have cached it in the meantime; the stored row wins
        let stored = queries::get_package(&mut tx, tarball).await?;
        tx.commit().await?;

        if inserted {
            self.emit(AppEvent::Catalog(CatalogEvent::PackageCached {
                tarball: tarball.to_string(),
            }));
        }
        Ok(stored.map_or(candidate, crate::StoredPackage::into_record))
    }

    /// All cached packages
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_packages(&self) -> Result<Vec<PackageRecord>, Error> {
        let mut tx = self.pool.begin().await?;
        let rows = queries::list_packages(&mut tx).await?;
        tx.commit().await?;
        Ok(rows
            .into_iter()
            .map(crate::StoredPackage::into_record)
            .collect())
    }

    /// Queue a validation of `package` stamped with the current time
    ///
    /// # Errors
    ///
    /// Returns an error if the package is not cached or the database fails.
    pub async fn enqueue(&self, package: &PackageRecord) -> Result<EnqueueOutcome, Error> {
        self.enqueue_at(package, Timestamp::now()).await
    }

    /// Queue a validation of `package` with an explicit insertion time
    ///
    /// The check for an active validation and the insert happen in one
    /// statement, so two handles racing on the same package create at most
    /// one queued row.
    ///
    /// # Errors
    ///
    /// Returns an error if the package is not cached or the database fails.
    pub async fn enqueue_at(
        &self,
        package: &PackageRecord,
        inserted: Timestamp,
    ) -> Result<EnqueueOutcome, Error> {
        let mut tx = self.pool.begin().await?;
        let package_id = queries::package_id(&mut tx, &package.tarball).await?;
        let created = queries::insert_validation_if_idle(&mut tx, package_id, inserted).await?;
        tx.commit().await?;

        let outcome = match created {
            Some(validation_id) => {
                self.emit(AppEvent::Validation(ValidationEvent::Enqueued {
                    tarball: package.tarball.clone(),
                    validation_id,
                }));
                EnqueueOutcome::Enqueued(validation_id)
            }
            None => {
                self.emit(AppEvent::Validation(ValidationEvent::AlreadyQueued {
                    tarball: package.tarball.clone(),
                }));
                EnqueueOutcome::AlreadyQueued
            }
        };
        Ok(outcome)
    }

    /// The queued validation with the earliest insertion time
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn oldest_queued(&self) -> Result<Option<Validation>, Error> {
        let mut tx = self.pool.begin().await?;
        let validation = queries::oldest_queued(&mut tx).await?;
        tx.commit().await?;
        Ok(validation)
    }

    /// Validations in insertion order, optionally filtered by status
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_validations(
        &self,
        status: Option<ValidationStatus>,
    ) -> Result<Vec<Validation>, Error> {
        let mut tx = self.pool.begin().await?;
        let validations = queries::list_validations(&mut tx, status).await?;
        tx.commit().await?;
        Ok(validations)
    }

    /// Fetch one validation
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn get_validation(&self, id: i64) -> Result<Option<Validation>, Error> {
        let mut tx = self.pool.begin().await?;
        let validation = queries::get_validation(&mut tx, id).await?;
        tx.commit().await?;
        Ok(validation)
    }

    /// Persist every mutable field of `validation`
    ///
    /// # Errors
    ///
    /// Returns `StateError::NotFound` if the validation no longer exists.
    pub async fn update_validation(&self, validation: &Validation) -> Result<(), Error> {
        let mut tx = self.pool.begin().await?;
        queries::update_validation(&mut tx, validation).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Persist every field of a cached package, keyed by its tarball
    ///
    /// # Errors
    ///
    /// Returns `StateError::NotFound` if the package is not cached.
    pub async fn update_package(&self, package: &PackageRecord) -> Result<(), Error> {
        let mut tx = self.pool.begin().await?;
        queries::update_package(&mut tx, package).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Close the underlying pool, waiting for connections to finish
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
