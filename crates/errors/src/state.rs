//! State management error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum StateError {
    #[error("invalid state transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    #[error("unknown validation status: {value}")]
    UnknownStatus { value: String },

    #[error("database error: {message}")]
    DatabaseError { message: String },

    #[error("migration failed: {message}")]
    MigrationFailed { message: String },
}

impl UserFacingError for StateError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::DatabaseError { .. } | Self::MigrationFailed { .. } => {
                Some("Check that general.db_path points to a writable SQLite database.")
            }
            _ => None,
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::InvalidTransition { .. } => "state.invalid_transition",
            Self::NotFound { .. } => "state.not_found",
            Self::UnknownStatus { .. } => "state.unknown_status",
            Self::DatabaseError { .. } => "state.database_error",
            Self::MigrationFailed { .. } => "state.migration_failed",
        };
        Some(code)
    }
}
