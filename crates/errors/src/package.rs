//! Package catalog error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

/// Errors raised while turning a catalog line into a package record
#[derive(Debug, Clone, Error)]
pub enum PackageError {
    #[error("malformed catalog line, expected at least 5 fields, got {found}: {line}")]
    TooFewFields { found: usize, line: String },

    #[error("cannot find organization in package name field: {field}")]
    MissingOrganization { field: String },

    #[error("package name mismatch: expected {expected}, found {found}")]
    NameMismatch { expected: String, found: String },

    #[error("package not found: {tarball}")]
    NotFound { tarball: String },
}

impl PackageError {
    /// True for the errors produced by catalog line parsing
    #[must_use]
    pub fn is_parse_error(&self) -> bool {
        !matches!(self, Self::NotFound { .. })
    }
}

impl UserFacingError for PackageError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::NotFound { .. } => {
                Some("Use `relval list-val-packages` to see which tarballs can be validated.")
            }
            _ => None,
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::TooFewFields { .. } => "package.too_few_fields",
            Self::MissingOrganization { .. } => "package.missing_organization",
            Self::NameMismatch { .. } => "package.name_mismatch",
            Self::NotFound { .. } => "package.not_found",
        };
        Some(code)
    }
}
