//! Adding validations to the queue

use crate::{OpsCtx, QueueOutcome, QueueReport};
use relval_errors::{Error, OpsError, PackageError};
use relval_events::EventEmitter;
use relval_index::CatalogSelector;
use relval_state::EnqueueOutcome;
use relval_types::PackageRecord;

/// Queue a validation of `tarball`
///
/// Tarballs not cached yet are looked up in the validation listing of the
/// catalog and cached. A package that already has a queued or running
/// validation is reported as [`QueueOutcome::AlreadyQueued`]. A package
/// the configured unpack directory or module file path cannot be resolved
/// for is refused, since its validation could never be started.
///
/// # Errors
///
/// Returns an error if `tarball` is empty, unknown to the catalog, cannot be
/// placed by the path templates, or the catalog or database cannot be
/// reached.
pub async fn queue_validation(ctx: &OpsCtx, tarball: &str) -> Result<QueueReport, Error> {
    let tarball = tarball.trim();
    if tarball.is_empty() {
        return Err(OpsError::MissingInput {
            message: "no tarball given".to_string(),
        }
        .into());
    }

    if ctx.dry_run {
        let package = resolve_without_caching(ctx, tarball).await?;
        ctx.check_dispatchable(&package)?;
        ctx.emit_dry_run(format!("queue validation of {tarball}"));
        return Ok(QueueReport {
            package,
            outcome: QueueOutcome::Skipped,
        });
    }

    let package = ctx
        .store
        .cache_package_or_lookup(tarball, || async {
            let catalog = ctx.catalog.list_packages(CatalogSelector::Validation).await?;
            Ok(catalog.packages)
        })
        .await?;
    ctx.check_dispatchable(&package)?;

    let outcome = match ctx.store.enqueue(&package).await? {
        EnqueueOutcome::Enqueued(id) => QueueOutcome::Enqueued(id),
        EnqueueOutcome::AlreadyQueued => QueueOutcome::AlreadyQueued,
    };

    Ok(QueueReport { package, outcome })
}

async fn resolve_without_caching(ctx: &OpsCtx, tarball: &str) -> Result<PackageRecord, Error> {
    if let Some(package) = ctx.store.find_package(tarball).await? {
        return Ok(package);
    }

    let catalog = ctx.catalog.list_packages(CatalogSelector::Validation).await?;
    catalog.find(tarball).cloned().ok_or_else(|| {
        PackageError::NotFound {
            tarball: tarball.to_string(),
        }
        .into()
    })
}
