#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Core type definitions for the relval validation controller
//!
//! This crate provides the value types shared by every other crate:
//! package records parsed from the catalog, validation jobs and their
//! lifecycle status, and the timestamp representation used in storage.

pub mod package;
pub mod status;
pub mod timestamp;
pub mod validation;

// Re-export commonly used types
pub use package::{join_deps, split_deps, PackageRecord};
pub use status::{PolledStatus, StatusCodeMap, ValidationStatus};
pub use timestamp::{format_duration, Timestamp};
pub use validation::{PollOutcome, Validation};
