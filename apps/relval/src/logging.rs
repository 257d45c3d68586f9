//! Structured logging integration for events
//!
//! Converts domain events into tracing records with structured fields so
//! the debug log file carries the same information the console shows.

use relval_events::{AppEvent, EventMessage};
use tracing::{debug, error, info, trace, warn};

/// Log an `AppEvent` using the tracing infrastructure with structured fields
#[allow(clippy::too_many_lines)]
pub fn log_event_with_tracing(message: &EventMessage) {
    let event = &message.event;
    let meta = &message.meta;
    let level = meta.tracing_level();

    match event {
        // Catalog domain events
        AppEvent::Catalog(catalog_event) => {
            use relval_events::CatalogEvent;
            match catalog_event {
                CatalogEvent::FetchStarted { url } => {
                    debug!(
                        source = meta.source.as_str(),
                        event_id = %meta.event_id,
                        url = %url,
                        "Catalog fetch started"
                    );
                }
                CatalogEvent::Fetched {
                    url,
                    packages,
                    skipped,
                } => {
                    info!(
                        source = meta.source.as_str(),
                        event_id = %meta.event_id,
                        url = %url,
                        packages = packages,
                        skipped = skipped,
                        "Catalog fetched"
                    );
                }
                CatalogEvent::LineSkipped { line_no, reason } => {
                    warn!(
                        source = meta.source.as_str(),
                        event_id = %meta.event_id,
                        line_no = line_no,
                        reason = %reason,
                        "Catalog line skipped"
                    );
                }
                CatalogEvent::FetchFailed { url, failure } => {
                    error!(
                        source = meta.source.as_str(),
                        event_id = %meta.event_id,
                        url = %url,
                        retryable = failure.retryable,
                        code = ?failure.code,
                        message = %failure.message,
                        hint = ?failure.hint,
                        "Catalog fetch failed"
                    );
                }
                CatalogEvent::PackageCached { tarball } => {
                    info!(
                        source = meta.source.as_str(),
                        event_id = %meta.event_id,
                        tarball = %tarball,
                        "Package cached"
                    );
                }
            }
        }

        // Validation domain events
        AppEvent::Validation(validation_event) => {
            use relval_events::ValidationEvent;
            match validation_event {
                ValidationEvent::Enqueued {
                    tarball,
                    validation_id,
                } => {
                    info!(
                        source = meta.source.as_str(),
                        event_id = %meta.event_id,
                        correlation = ?meta.correlation_id,
                        tarball = %tarball,
                        validation_id = validation_id,
                        "Validation queued"
                    );
                }
                ValidationEvent::AlreadyQueued { tarball } => {
                    warn!(
                        source = meta.source.as_str(),
                        event_id = %meta.event_id,
                        tarball = %tarball,
                        "Validation already queued or running"
                    );
                }
                ValidationEvent::UnpackFailed { destdir, failure } => {
                    error!(
                        source = meta.source.as_str(),
                        event_id = %meta.event_id,
                        correlation = ?meta.correlation_id,
                        destdir = %destdir,
                        retryable = failure.retryable,
                        code = ?failure.code,
                        message = %failure.message,
                        hint = ?failure.hint,
                        "Unpack failed"
                    );
                }
                ValidationEvent::Started {
                    validation_id,
                    session_tag,
                } => {
                    info!(
                        source = meta.source.as_str(),
                        event_id = %meta.event_id,
                        correlation = ?meta.correlation_id,
                        validation_id = validation_id,
                        session_tag = %session_tag,
                        "Validation started"
                    );
                }
                ValidationEvent::Finished {
                    session_tag,
                    status,
                } => {
                    info!(
                        source = meta.source.as_str(),
                        event_id = %meta.event_id,
                        correlation = ?meta.correlation_id,
                        session_tag = %session_tag,
                        status = %status,
                        "Validation finished"
                    );
                }
                ValidationEvent::Disappeared { session_tag } => {
                    error!(
                        source = meta.source.as_str(),
                        event_id = %meta.event_id,
                        correlation = ?meta.correlation_id,
                        session_tag = %session_tag,
                        "Validation disappeared"
                    );
                }
                ValidationEvent::UnknownStatusCode {
                    session_tag,
                    exit_code,
                } => {
                    warn!(
                        source = meta.source.as_str(),
                        event_id = %meta.event_id,
                        session_tag = %session_tag,
                        exit_code = ?exit_code,
                        "Status command returned an unmapped exit code"
                    );
                }
                ValidationEvent::UnresolvedVariables { template, keys } => {
                    warn!(
                        source = meta.source.as_str(),
                        event_id = %meta.event_id,
                        template = %template,
                        keys = ?keys,
                        "Template left variables unresolved"
                    );
                }
                _ => log_at_level(level, meta, event, "Validation event"),
            }
        }

        // Process domain events
        AppEvent::Process(process_event) => {
            use relval_events::ProcessEvent;
            match process_event {
                ProcessEvent::Started { command } => {
                    debug!(
                        source = meta.source.as_str(),
                        event_id = %meta.event_id,
                        command = %command,
                        "Command started"
                    );
                }
                ProcessEvent::Completed {
                    command,
                    exit_code,
                    duration_ms,
                } => {
                    debug!(
                        source = meta.source.as_str(),
                        event_id = %meta.event_id,
                        command = %command,
                        exit_code = ?exit_code,
                        duration_ms = duration_ms,
                        "Command completed"
                    );
                }
                ProcessEvent::Output {
                    command,
                    stdout,
                    stderr,
                } => {
                    debug!(
                        source = meta.source.as_str(),
                        event_id = %meta.event_id,
                        command = %command,
                        stdout = %stdout,
                        stderr = %stderr,
                        "Command output"
                    );
                }
                ProcessEvent::Failed { command, error } => {
                    error!(
                        source = meta.source.as_str(),
                        event_id = %meta.event_id,
                        command = %command,
                        error = %error,
                        "Command could not be run"
                    );
                }
            }
        }

        // Notification domain events
        AppEvent::Notification(notification_event) => {
            use relval_events::NotificationEvent;
            match notification_event {
                NotificationEvent::Sent {
                    recipients,
                    subject,
                } => {
                    info!(
                        source = meta.source.as_str(),
                        event_id = %meta.event_id,
                        recipients = ?recipients,
                        subject = %subject,
                        "Notification sent"
                    );
                }
                NotificationEvent::Failed { subject, failure } => {
                    error!(
                        source = meta.source.as_str(),
                        event_id = %meta.event_id,
                        subject = %subject,
                        retryable = failure.retryable,
                        code = ?failure.code,
                        message = %failure.message,
                        hint = ?failure.hint,
                        "Notification failed"
                    );
                }
                NotificationEvent::Suppressed { subject } => {
                    debug!(
                        source = meta.source.as_str(),
                        event_id = %meta.event_id,
                        subject = %subject,
                        "Notification suppressed"
                    );
                }
            }
        }

        // Lock domain events
        AppEvent::Lock(lock_event) => {
            use relval_events::LockEvent;
            match lock_event {
                LockEvent::Acquired { path, pid } => {
                    debug!(
                        source = meta.source.as_str(),
                        event_id = %meta.event_id,
                        path = %path,
                        pid = pid,
                        "Lock acquired"
                    );
                }
                LockEvent::Waiting {
                    holder,
                    attempt,
                    attempts,
                } => {
                    warn!(
                        source = meta.source.as_str(),
                        event_id = %meta.event_id,
                        holder = holder,
                        attempt = attempt,
                        attempts = attempts,
                        "Waiting for lock"
                    );
                }
                LockEvent::Released { path } => {
                    debug!(
                        source = meta.source.as_str(),
                        event_id = %meta.event_id,
                        path = %path,
                        "Lock released"
                    );
                }
            }
        }

        // General domain events
        AppEvent::General(general_event) => {
            use relval_events::GeneralEvent;
            match general_event {
                GeneralEvent::OperationStarted { operation } => {
                    info!(
                        source = meta.source.as_str(),
                        event_id = %meta.event_id,
                        correlation = ?meta.correlation_id,
                        operation = %operation,
                        "Operation started"
                    );
                }
                GeneralEvent::OperationFailed { operation, error } => {
                    error!(
                        source = meta.source.as_str(),
                        event_id = %meta.event_id,
                        correlation = ?meta.correlation_id,
                        operation = %operation,
                        error = %error,
                        "Operation failed"
                    );
                }
                GeneralEvent::Warning { message, context } => {
                    warn!(
                        source = meta.source.as_str(),
                        event_id = %meta.event_id,
                        message = %message,
                        context = ?context,
                        "Warning"
                    );
                }
                GeneralEvent::DebugLog { message } => {
                    debug!(
                        source = meta.source.as_str(),
                        event_id = %meta.event_id,
                        message = %message,
                        "Debug log"
                    );
                }
                GeneralEvent::DryRun { action } => {
                    info!(
                        source = meta.source.as_str(),
                        event_id = %meta.event_id,
                        action = %action,
                        "Dry run: skipped"
                    );
                }
                _ => log_at_level(level, meta, event, "General event"),
            }
        }
    }
}

fn log_at_level(
    level: tracing::Level,
    meta: &relval_events::EventMeta,
    event: &AppEvent,
    label: &str,
) {
    match level {
        tracing::Level::ERROR => {
            error!(source = meta.source.as_str(), event_id = %meta.event_id, correlation = ?meta.correlation_id, event = ?event, "{label}");
        }
        tracing::Level::WARN => {
            warn!(source = meta.source.as_str(), event_id = %meta.event_id, correlation = ?meta.correlation_id, event = ?event, "{label}");
        }
        tracing::Level::INFO => {
            info!(source = meta.source.as_str(), event_id = %meta.event_id, correlation = ?meta.correlation_id, event = ?event, "{label}");
        }
        tracing::Level::DEBUG => {
            debug!(source = meta.source.as_str(), event_id = %meta.event_id, correlation = ?meta.correlation_id, event = ?event, "{label}");
        }
        tracing::Level::TRACE => {
            trace!(source = meta.source.as_str(), event_id = %meta.event_id, correlation = ?meta.correlation_id, event = ?event, "{label}");
        }
    }
}
