//! Platform-specific operation errors

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

/// Errors that can occur during platform-specific operations
#[derive(Debug, Clone, Error)]
pub enum PlatformError {
    #[error("process execution failed: {command} - {message}")]
    ProcessExecutionFailed { command: String, message: String },

    #[error("filesystem operation failed: {operation} - {message}")]
    FilesystemOperationFailed { operation: String, message: String },

    #[error("lock file {path} is unusable: {message}")]
    LockFile { path: String, message: String },
}

impl UserFacingError for PlatformError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::ProcessExecutionFailed { .. } => Some("Check that /bin/sh is available."),
            Self::LockFile { .. } => {
                Some("Remove the stale pid file if no other relval instance is running.")
            }
            Self::FilesystemOperationFailed { .. } => None,
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::ProcessExecutionFailed { .. } => "platform.process_execution_failed",
            Self::FilesystemOperationFailed { .. } => "platform.filesystem_operation_failed",
            Self::LockFile { .. } => "platform.lock_file",
        };
        Some(code)
    }
}
