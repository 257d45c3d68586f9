//! Runtime SQL queries for the package cache and validation queue

use crate::models::{StoredPackage, ValidationRow};
use relval_errors::{Error, StateError};
use relval_types::{PackageRecord, Timestamp, Validation, ValidationStatus};
use sqlx::{query, query_as, Row, Sqlite, Transaction};

const VALIDATION_COLUMNS: &str = "SELECT v.id, v.inserted, v.started, v.ended, v.status, \
     p.id AS package_id, p.tarball, p.software, p.org, p.version, p.platform, p.arch, \
     p.deps, p.fetched \
     FROM validation v JOIN package p ON p.id = v.package_id";

/// Look up a cached package by tarball name
pub async fn get_package(
    tx: &mut Transaction<'_, Sqlite>,
    tarball: &str,
) -> Result<Option<StoredPackage>, Error> {
    let row = query_as::<_, StoredPackage>(
        "SELECT id, tarball, software, org, version, platform, arch, deps, fetched
         FROM package WHERE tarball = ?1",
    )
    .bind(tarball)
    .fetch_optional(&mut **tx)
    .await?;

    Ok(row)
}

/// All cached packages ordered by tarball
pub async fn list_packages(tx: &mut Transaction<'_, Sqlite>) -> Result<Vec<StoredPackage>, Error> {
    let rows = query_as::<_, StoredPackage>(
        "SELECT id, tarball, software, org, version, platform, arch, deps, fetched
         FROM package ORDER BY tarball",
    )
    .fetch_all(&mut **tx)
    .await?;

    Ok(rows)
}

/// Insert a package unless its tarball is already cached
///
/// Returns whether a row was inserted.
pub async fn insert_package(
    tx: &mut Transaction<'_, Sqlite>,
    record: &PackageRecord,
) -> Result<bool, Error> {
    let stored = StoredPackage::from_record(record);
    let result = query(
        "INSERT INTO package (tarball, software, org, version, platform, arch, deps, fetched)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
         ON CONFLICT(tarball) DO NOTHING",
    )
    .bind(&stored.tarball)
    .bind(&stored.software)
    .bind(&stored.org)
    .bind(&stored.version)
    .bind(&stored.platform)
    .bind(&stored.arch)
    .bind(&stored.deps)
    .bind(stored.fetched)
    .execute(&mut **tx)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Overwrite every column of a cached package
pub async fn update_package(
    tx: &mut Transaction<'_, Sqlite>,
    record: &PackageRecord,
) -> Result<(), Error> {
    let stored = StoredPackage::from_record(record);
    let result = query(
        "UPDATE package SET software = ?2, org = ?3, version = ?4, platform = ?5,
             arch = ?6, deps = ?7, fetched = ?8
         WHERE tarball = ?1",
    )
    .bind(&stored.tarball)
    .bind(&stored.software)
    .bind(&stored.org)
    .bind(&stored.version)
    .bind(&stored.platform)
    .bind(&stored.arch)
    .bind(&stored.deps)
    .bind(stored.fetched)
    .execute(&mut **tx)
    .await?;

    if result.rows_affected() == 0 {
        return Err(StateError::NotFound {
            entity: "package".to_string(),
            id: record.tarball.clone(),
        }
        .into());
    }
    Ok(())
}

/// Insert a queued validation unless the package already has an active one
///
/// Returns the new validation id, or `None` when the guard blocked the insert.
pub async fn insert_validation_if_idle(
    tx: &mut Transaction<'_, Sqlite>,
    package_id: i64,
    inserted: Timestamp,
) -> Result<Option<i64>, Error> {
    // The partial unique index backs this check; OR IGNORE turns a lost
    // race into the same "blocked" outcome.
    let result = query(
        "INSERT OR IGNORE INTO validation (package_id, inserted, status)
         SELECT ?1, ?2, ?3
         WHERE NOT EXISTS (
             SELECT 1 FROM validation WHERE package_id = ?1 AND status IN (?3, ?4)
         )",
    )
    .bind(package_id)
    .bind(inserted.as_epoch_secs())
    .bind(ValidationStatus::Queued.as_i64())
    .bind(ValidationStatus::Running.as_i64())
    .execute(&mut **tx)
    .await?;

    if result.rows_affected() == 0 {
        Ok(None)
    } else {
        Ok(Some(result.last_insert_rowid()))
    }
}

/// Resolve the surrogate id of a cached package
pub async fn package_id(tx: &mut Transaction<'_, Sqlite>, tarball: &str) -> Result<i64, Error> {
    let row = query("SELECT id FROM package WHERE tarball = ?1")
        .bind(tarball)
        .fetch_optional(&mut **tx)
        .await?;

    match row {
        Some(r) => Ok(r.get("id")),
        None => Err(StateError::NotFound {
            entity: "package".to_string(),
            id: tarball.to_string(),
        }
        .into()),
    }
}

/// Oldest queued validation, ties broken by id
pub async fn oldest_queued(
    tx: &mut Transaction<'_, Sqlite>,
) -> Result<Option<Validation>, Error> {
    let sql = format!("{VALIDATION_COLUMNS} WHERE v.status = ?1 ORDER BY v.inserted, v.id LIMIT 1");
    let row = query_as::<_, ValidationRow>(&sql)
        .bind(ValidationStatus::Queued.as_i64())
        .fetch_optional(&mut **tx)
        .await?;

    row.map(ValidationRow::into_validation).transpose()
}

/// Validations in enqueue order, optionally restricted to one status
pub async fn list_validations(
    tx: &mut Transaction<'_, Sqlite>,
    status: Option<ValidationStatus>,
) -> Result<Vec<Validation>, Error> {
    let rows = match status {
        Some(status) => {
            let sql = format!("{VALIDATION_COLUMNS} WHERE v.status = ?1 ORDER BY v.inserted, v.id");
            query_as::<_, ValidationRow>(&sql)
                .bind(status.as_i64())
                .fetch_all(&mut **tx)
                .await?
        }
        None => {
            let sql = format!("{VALIDATION_COLUMNS} ORDER BY v.inserted, v.id");
            query_as::<_, ValidationRow>(&sql)
                .fetch_all(&mut **tx)
                .await?
        }
    };

    rows.into_iter()
        .map(ValidationRow::into_validation)
        .collect()
}

/// Fetch one validation by id
pub async fn get_validation(
    tx: &mut Transaction<'_, Sqlite>,
    id: i64,
) -> Result<Option<Validation>, Error> {
    let sql = format!("{VALIDATION_COLUMNS} WHERE v.id = ?1");
    let row = query_as::<_, ValidationRow>(&sql)
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;

    row.map(ValidationRow::into_validation).transpose()
}

/// Overwrite the mutable columns of a validation
pub async fn update_validation(
    tx: &mut Transaction<'_, Sqlite>,
    validation: &Validation,
) -> Result<(), Error> {
    let result = query(
        "UPDATE validation SET inserted = ?2, started = ?3, ended = ?4, status = ?5
         WHERE id = ?1",
    )
    .bind(validation.id)
    .bind(validation.inserted.as_epoch_secs())
    .bind(validation.started.map(|t| t.as_epoch_secs()))
    .bind(validation.ended.map(|t| t.as_epoch_secs()))
    .bind(validation.status.as_i64())
    .execute(&mut **tx)
    .await?;

    if result.rows_affected() == 0 {
        return Err(StateError::NotFound {
            entity: "validation".to_string(),
            id: validation.id.to_string(),
        }
        .into());
    }
    Ok(())
}
