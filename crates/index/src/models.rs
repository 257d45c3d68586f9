//! Catalog data models

use relval_events::{AppEvent, CatalogEvent, EventEmitter, EventSender};
use relval_types::PackageRecord;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which listing of the catalog to read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogSelector {
    /// Packages published for general use
    Published,
    /// Packages offered for validation
    Validation,
}

impl CatalogSelector {
    /// Listing path relative to the catalog base URL
    #[must_use]
    pub fn path(self) -> &'static str {
        match self {
            Self::Published => "Packages",
            Self::Validation => "Packages-Validation",
        }
    }
}

impl fmt::Display for CatalogSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Published => write!(f, "published"),
            Self::Validation => write!(f, "validation"),
        }
    }
}

/// A parsed catalog listing
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    /// Base URL the listing was read from; tarball URLs hang off it
    pub baseurl: String,
    pub packages: Vec<PackageRecord>,
    /// Number of non-empty lines that could not be parsed
    pub skipped: usize,
}

impl Catalog {
    /// Parse a listing, dropping lines that are not valid records
    ///
    /// Blank lines are ignored silently; each malformed line emits a
    /// `LineSkipped` warning and is counted in `skipped`.
    #[must_use]
    pub fn parse(baseurl: &str, text: &str, tx: &EventSender) -> Self {
        let mut catalog = Self {
            baseurl: baseurl.to_string(),
            ..Self::default()
        };

        for (idx, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match PackageRecord::from_catalog_line(line) {
                Ok(record) => catalog.packages.push(record),
                Err(e) => {
                    catalog.skipped += 1;
                    tx.emit(AppEvent::Catalog(CatalogEvent::LineSkipped {
                        line_no: idx + 1,
                        reason: e.to_string(),
                    }));
                }
            }
        }

        catalog
    }

    /// Find a package by tarball name
    #[must_use]
    pub fn find(&self, tarball: &str) -> Option<&PackageRecord> {
        self.packages.iter().find(|p| p.tarball == tarball)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.packages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}
