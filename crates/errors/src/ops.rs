//! Operation orchestration error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum OpsError {
    #[error("command `{command}` failed with {}", exit_status(.code))]
    CommandFailed { command: String, code: Option<i32> },

    #[error("could not acquire lock {path} after {attempts} attempts (held by pid {pid})")]
    LockTimeout {
        path: String,
        pid: i32,
        attempts: u32,
    },

    #[error("unresolved variables in {template}: {}", keys.join(", "))]
    UnresolvedPlaceholders { template: String, keys: Vec<String> },

    #[error("missing input: {message}")]
    MissingInput { message: String },

    #[error("missing component: {component}")]
    MissingComponent { component: String },
}

#[allow(clippy::ref_option)]
fn exit_status(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "no exit code (killed by signal)".to_string(),
    }
}

impl UserFacingError for OpsError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::CommandFailed { .. } => {
                Some("Rerun with --debug to see the command output.")
            }
            Self::LockTimeout { .. } => {
                Some("Another relval instance is running; wait for it to finish.")
            }
            Self::UnresolvedPlaceholders { .. } => {
                Some("Only $PLATFORM, $ARCH, $VERSION, $URL, $DESTDIR, $MODULEFILE_DEPS, $SESSIONTAG and $RESULTS_URL are defined.")
            }
            Self::MissingInput { .. } => Some("Pass a tarball name or pipe one on stdin."),
            Self::MissingComponent { .. } => None,
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(self, Self::LockTimeout { .. })
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::CommandFailed { .. } => "ops.command_failed",
            Self::LockTimeout { .. } => "ops.lock_timeout",
            Self::UnresolvedPlaceholders { .. } => "ops.unresolved_placeholders",
            Self::MissingInput { .. } => "ops.missing_input",
            Self::MissingComponent { .. } => "ops.missing_component",
        };
        Some(code)
    }
}
