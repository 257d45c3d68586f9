use serde::{Deserialize, Serialize};

use crate::{EventLevel, EventSource};
use relval_errors::UserFacingError;

/// Structured failure information shared across domains.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Short user-facing message.
    pub message: String,
    /// Optional remediation hint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    /// Whether retrying the operation might succeed.
    pub retryable: bool,
}

impl FailureContext {
    /// Construct a new failure context.
    #[must_use]
    pub fn new(
        code: Option<impl Into<String>>,
        message: impl Into<String>,
        hint: Option<impl Into<String>>,
        retryable: bool,
    ) -> Self {
        Self {
            code: code.map(Into::into),
            message: message.into(),
            hint: hint.map(Into::into),
            retryable,
        }
    }

    /// Build failure context from a `UserFacingError` implementation.
    #[must_use]
    pub fn from_error<E: UserFacingError + ?Sized>(error: &E) -> Self {
        Self::new(
            error.user_code(),
            error.user_message().into_owned(),
            error.user_hint(),
            error.is_retryable(),
        )
    }
}

pub mod catalog;
pub mod general;
pub mod lock;
pub mod notification;
pub mod process;
pub mod validation;

pub use catalog::*;
pub use general::*;
pub use lock::*;
pub use notification::*;
pub use process::*;
pub use validation::*;

/// Top-level application event enum that aggregates all domain-specific events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "domain", content = "event", rename_all = "snake_case")]
pub enum AppEvent {
    /// General utility events (warnings, errors, operations)
    General(GeneralEvent),

    /// Remote package listing
    Catalog(CatalogEvent),

    /// Queue, dispatch and reconciliation of validations
    Validation(ValidationEvent),

    /// External shell commands
    Process(ProcessEvent),

    /// Notification delivery
    Notification(NotificationEvent),

    /// Single-instance lock
    Lock(LockEvent),
}

impl AppEvent {
    /// Identify the source domain for this event (used for metadata/logging).
    #[must_use]
    pub fn event_source(&self) -> EventSource {
        match self {
            Self::General(_) => EventSource::GENERAL,
            Self::Catalog(_) => EventSource::CATALOG,
            Self::Validation(event) => match event {
                ValidationEvent::Enqueued { .. } | ValidationEvent::AlreadyQueued { .. } => {
                    EventSource::QUEUE
                }
                ValidationEvent::StatusQueried { .. }
                | ValidationEvent::StatusUnchanged { .. }
                | ValidationEvent::Finished { .. }
                | ValidationEvent::Disappeared { .. }
                | ValidationEvent::UnknownStatusCode { .. } => EventSource::RECONCILE,
                _ => EventSource::DISPATCH,
            },
            Self::Process(_) => EventSource::PROCESS,
            Self::Notification(_) => EventSource::NOTIFY,
            Self::Lock(_) => EventSource::LOCK,
        }
    }

    /// Determine the severity this event is logged at
    #[must_use]
    pub fn log_level(&self) -> EventLevel {
        match self {
            // Error-level events
            Self::General(GeneralEvent::OperationFailed { .. })
            | Self::Catalog(CatalogEvent::FetchFailed { .. })
            | Self::Validation(
                ValidationEvent::UnpackFailed { .. } | ValidationEvent::Disappeared { .. },
            )
            | Self::Process(ProcessEvent::Failed { .. })
            | Self::Notification(NotificationEvent::Failed { .. }) => EventLevel::Error,

            // Warning-level events
            Self::General(GeneralEvent::Warning { .. })
            | Self::Catalog(CatalogEvent::LineSkipped { .. })
            | Self::Validation(
                ValidationEvent::AlreadyQueued { .. }
                | ValidationEvent::UnknownStatusCode { .. }
                | ValidationEvent::UnresolvedVariables { .. },
            )
            | Self::Lock(LockEvent::Waiting { .. }) => EventLevel::Warn,

            // Debug-level events
            Self::General(GeneralEvent::DebugLog { .. })
            | Self::Catalog(CatalogEvent::FetchStarted { .. })
            | Self::Validation(
                ValidationEvent::StatusQueried { .. } | ValidationEvent::StatusUnchanged { .. },
            )
            | Self::Process(_)
            | Self::Notification(NotificationEvent::Suppressed { .. })
            | Self::Lock(LockEvent::Acquired { .. } | LockEvent::Released { .. }) => {
                EventLevel::Debug
            }

            // Default to INFO for most events
            _ => EventLevel::Info,
        }
    }

    /// Correlation identifier derived from the event payload, when it has one
    #[must_use]
    pub fn correlation_id(&self) -> Option<&str> {
        match self {
            Self::Validation(
                ValidationEvent::Enqueued { tarball, .. }
                | ValidationEvent::AlreadyQueued { tarball }
                | ValidationEvent::UnpackSkipped { tarball, .. },
            )
            | Self::Catalog(CatalogEvent::PackageCached { tarball }) => Some(tarball.as_str()),
            Self::Validation(
                ValidationEvent::Started { session_tag, .. }
                | ValidationEvent::StatusQueried { session_tag, .. }
                | ValidationEvent::StatusUnchanged { session_tag }
                | ValidationEvent::Finished { session_tag, .. }
                | ValidationEvent::Disappeared { session_tag }
                | ValidationEvent::UnknownStatusCode { session_tag, .. },
            ) => Some(session_tag.as_str()),
            _ => None,
        }
    }
}
