//! Package record type definitions

use relval_errors::PackageError;
use serde::{Deserialize, Serialize};

/// A package artifact published in the catalog
///
/// The tarball name is the identity of a record: it is unique in the cache
/// and never changes once stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageRecord {
    pub tarball: String,
    pub software: String,
    pub version: String,
    /// Owning virtual organization, e.g. `VO_ALICE`
    pub org: String,
    /// Operating system family, absent when it cannot be derived
    pub platform: Option<String>,
    pub arch: Option<String>,
    pub deps: Vec<String>,
    /// Whether the tarball has been unpacked locally
    pub fetched: bool,
}

impl PackageRecord {
    /// Parse one catalog line
    ///
    /// The line holds up to six whitespace separated fields: tarball,
    /// software, version, platform, package name and an optional comma
    /// separated dependency list. Platform and arch are derived on a best
    /// effort basis: when the tarball does not carry `<platform>...<arch>.tar`
    /// both are left empty and the record is still accepted.
    ///
    /// # Errors
    ///
    /// Returns a `PackageError` if fewer than five fields are present, if the
    /// package name has no organization, or if the package name does not match
    /// the software and version fields.
    pub fn from_catalog_line(raw: &str) -> Result<Self, PackageError> {
        let line = raw.trim();
        let fields = split_fields(line, 6);
        if fields.len() < 5 {
            return Err(PackageError::TooFewFields {
                found: fields.len(),
                line: line.to_string(),
            });
        }

        let (tarball, software, version, platform_field, name_field) =
            (fields[0], fields[1], fields[2], fields[3], fields[4]);

        let org = match name_field.find('@') {
            Some(pos) => &name_field[..pos],
            None => {
                return Err(PackageError::MissingOrganization {
                    field: name_field.to_string(),
                })
            }
        };

        let mut record = Self {
            tarball: tarball.to_string(),
            software: software.to_string(),
            version: version.to_string(),
            org: org.to_string(),
            platform: None,
            arch: None,
            deps: fields.get(5).map_or_else(Vec::new, |deps| split_deps(deps)),
            fetched: false,
        };

        let expected = record.package_name();
        if expected != name_field {
            return Err(PackageError::NameMismatch {
                expected,
                found: name_field.to_string(),
            });
        }

        if let Some((platform, arch)) = derive_platform_arch(tarball, platform_field) {
            record.platform = Some(platform.to_string());
            record.arch = Some(arch.to_string());
        }

        Ok(record)
    }

    /// `org@software::version`
    #[must_use]
    pub fn package_name(&self) -> String {
        format!("{}@{}::{}", self.org, self.software, self.version)
    }

    /// Download location of the tarball under the given catalog base URL
    #[must_use]
    pub fn url(&self, baseurl: &str) -> String {
        format!("{}/{}", baseurl.trim_end_matches('/'), self.tarball)
    }

    /// Dependencies in Environment Modules form, e.g. `ROOT/v5-34-18 GEANT3/v1-15a`
    #[must_use]
    pub fn modulefile_deps(&self) -> String {
        let prefix = format!("{}@", self.org);
        self.deps
            .iter()
            .map(|dep| dep.replace(&prefix, "").replace("::", "/"))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Multi-line human readable description
    #[must_use]
    pub fn describe(&self, baseurl: &str) -> String {
        let deps = if self.deps.is_empty() {
            "<no deps>".to_string()
        } else {
            self.deps.join(", ")
        };
        format!(
            "Package {name}:
 - URL      : {url}
 - Software : {software}
 - Version  : {version}
 - Platform : {platform}
 - Arch     : {arch}
 - Org      : {org}
 - Deps     : {deps}",
            name = self.package_name(),
            url = self.url(baseurl),
            software = self.software,
            version = self.version,
            platform = self.platform.as_deref().unwrap_or("<no platform>"),
            arch = self.arch.as_deref().unwrap_or("<no arch>"),
            org = self.org,
        )
    }
}

/// Join dependencies into their stored form; no deps is the empty string
#[must_use]
pub fn join_deps(deps: &[String]) -> String {
    deps.join(",")
}

/// Split a stored or catalog dependency list; the empty string is no deps
#[must_use]
pub fn split_deps(raw: &str) -> Vec<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        Vec::new()
    } else {
        raw.split(',').map(str::to_string).collect()
    }
}

/// Split on whitespace runs into at most `max` fields, the last one keeping
/// the remainder of the line.
fn split_fields(line: &str, max: usize) -> Vec<&str> {
    let mut fields = Vec::with_capacity(max);
    let mut rest = line.trim_start();
    while !rest.is_empty() {
        if fields.len() + 1 == max {
            fields.push(rest.trim_end());
            break;
        }
        match rest.find(char::is_whitespace) {
            Some(end) => {
                fields.push(&rest[..end]);
                rest = rest[end..].trim_start();
            }
            None => {
                fields.push(rest);
                break;
            }
        }
    }
    fields
}

/// Derive `(platform, arch)` from a tarball like `x-Linux-x86_64.tar.gz` and a
/// platform field like `Linux-x86_64`. The arch is the tarball span that
/// follows the OS part of the platform field up to the first `.tar`.
fn derive_platform_arch<'a>(tarball: &'a str, platform_field: &'a str) -> Option<(&'a str, &'a str)> {
    let dash = platform_field.find('-').filter(|&pos| pos > 0)?;
    let start = tarball.find(platform_field)? + dash + 1;
    let end = tarball.find(".tar")?;
    if end > start {
        Some((&platform_field[..dash], &tarball[start..end]))
    } else {
        None
    }
}
