#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Package catalog for relval
//!
//! This crate reads the catalog listings that name every tarball available
//! for validation. Listings are plain text, one package per line, served
//! over HTTP or read from a local directory.

mod models;

pub use models::{Catalog, CatalogSelector};

use async_trait::async_trait;
use relval_errors::Error;
use relval_events::{AppEvent, CatalogEvent, EventEmitter, EventSender, FailureContext};
use relval_net::{fetch_text, join_url, NetClient};
use std::path::PathBuf;

/// Source of catalog listings
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Base URL tarball locations are derived from
    fn baseurl(&self) -> &str;

    /// Fetch and parse the listing for `selector`
    ///
    /// # Errors
    ///
    /// Returns an error if the listing cannot be retrieved.
    async fn list_packages(&self, selector: CatalogSelector) -> Result<Catalog, Error>;
}

/// Catalog served over HTTP
pub struct HttpCatalog {
    client: NetClient,
    baseurl: String,
    tx: EventSender,
}

impl HttpCatalog {
    #[must_use]
    pub fn new(client: NetClient, baseurl: impl Into<String>, tx: EventSender) -> Self {
        Self {
            client,
            baseurl: baseurl.into(),
            tx,
        }
    }
}

impl EventEmitter for HttpCatalog {
    fn event_sender(&self) -> Option<&EventSender> {
        Some(&self.tx)
    }
}

#[async_trait]
impl CatalogSource for HttpCatalog {
    fn baseurl(&self) -> &str {
        &self.baseurl
    }

    async fn list_packages(&self, selector: CatalogSelector) -> Result<Catalog, Error> {
        let url = join_url(&self.baseurl, selector.path());
        self.emit(AppEvent::Catalog(CatalogEvent::FetchStarted { url: url.clone() }));

        let text = match fetch_text(&self.client, &url, &self.tx).await {
            Ok(text) => text,
            Err(e) => {
                self.emit(AppEvent::Catalog(CatalogEvent::FetchFailed {
                    url,
                    failure: FailureContext::from_error(&e),
                }));
                return Err(e);
            }
        };

        Ok(finish(&self.baseurl, &url, &text, &self.tx))
    }
}

/// Catalog mirrored into a local directory
///
/// Used for `file://` base URLs; the listings are files named after the
/// selector path inside the directory.
pub struct FileCatalog {
    dir: PathBuf,
    baseurl: String,
    tx: EventSender,
}

impl FileCatalog {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, tx: EventSender) -> Self {
        let dir = dir.into();
        let baseurl = format!("file://{}", dir.display());
        Self { dir, baseurl, tx }
    }
}

impl EventEmitter for FileCatalog {
    fn event_sender(&self) -> Option<&EventSender> {
        Some(&self.tx)
    }
}

#[async_trait]
impl CatalogSource for FileCatalog {
    fn baseurl(&self) -> &str {
        &self.baseurl
    }

    async fn list_packages(&self, selector: CatalogSelector) -> Result<Catalog, Error> {
        let path = self.dir.join(selector.path());
        let url = path.display().to_string();
        self.emit(AppEvent::Catalog(CatalogEvent::FetchStarted { url: url.clone() }));

        let text = match tokio::fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(e) => {
                let err = Error::io_with_path(&e, &path);
                self.emit(AppEvent::Catalog(CatalogEvent::FetchFailed {
                    url,
                    failure: FailureContext::from_error(&err),
                }));
                return Err(err);
            }
        };

        Ok(finish(&self.baseurl, &url, &text, &self.tx))
    }
}

fn finish(baseurl: &str, url: &str, text: &str, tx: &EventSender) -> Catalog {
    let catalog = Catalog::parse(baseurl, text, tx);
    tx.emit(AppEvent::Catalog(CatalogEvent::Fetched {
        url: url.to_string(),
        packages: catalog.len(),
        skipped: catalog.skipped,
    }));
    catalog
}

/// Pick the catalog implementation matching the scheme of `baseurl`
#[must_use]
pub fn catalog_for(baseurl: &str, client: NetClient, tx: EventSender) -> Box<dyn CatalogSource> {
    match baseurl.strip_prefix("file://") {
        Some(dir) => Box::new(FileCatalog::new(dir, tx)),
        None => Box::new(HttpCatalog::new(client, baseurl, tx)),
    }
}
