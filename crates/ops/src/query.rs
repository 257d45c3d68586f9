//! Package and validation listings

use crate::{OpsCtx, PackageListing, PackageSource, ValidationListing};
use relval_errors::Error;
use relval_index::CatalogSelector;
use relval_types::ValidationStatus;

/// List packages from a catalog listing or from the local cache
///
/// # Errors
///
/// Returns an error if the catalog cannot be fetched or the database read.
pub async fn list_packages(ctx: &OpsCtx, source: PackageSource) -> Result<PackageListing, Error> {
    let selector = match source {
        PackageSource::Published => CatalogSelector::Published,
        PackageSource::Validation => CatalogSelector::Validation,
        PackageSource::Known => {
            return Ok(PackageListing {
                source,
                baseurl: ctx.baseurl().to_string(),
                packages: ctx.store.list_packages().await?,
                skipped_lines: 0,
            });
        }
    };

    let catalog = ctx.catalog.list_packages(selector).await?;
    Ok(PackageListing {
        source,
        baseurl: catalog.baseurl,
        packages: catalog.packages,
        skipped_lines: catalog.skipped,
    })
}

/// List validations in queue order, optionally only the queued ones
///
/// # Errors
///
/// Returns an error if the database cannot be read.
pub async fn list_validations(ctx: &OpsCtx, queued_only: bool) -> Result<ValidationListing, Error> {
    let filter = queued_only.then_some(ValidationStatus::Queued);
    Ok(ValidationListing {
        baseurl: ctx.baseurl().to_string(),
        validations: ctx.store.list_validations(filter).await?,
    })
}
