//! Event handling and user feedback

use crate::logging::log_event_with_tracing;
use relval_events::{
    AppEvent, EventMessage, GeneralEvent, NotificationEvent, ProcessEvent, ValidationEvent,
};

/// Event handler for status display and logging
pub struct EventHandler {
    /// Console status lines are suppressed in JSON mode
    json_mode: bool,
    /// Show command output
    debug_enabled: bool,
}

impl EventHandler {
    /// Create new event handler
    pub fn new(json_mode: bool, debug_enabled: bool) -> Self {
        Self {
            json_mode,
            debug_enabled,
        }
    }

    /// Handle incoming event
    pub fn handle_event(&mut self, message: EventMessage) {
        log_event_with_tracing(&message);

        if self.json_mode {
            return;
        }
        if let Some(line) = self.status_line(&message.event) {
            eprintln!("{line}");
        }
    }

    /// Console line for an event, if it is shown at all
    ///
    /// Warnings and errors are left to the tracing subscriber.
    fn status_line(&self, event: &AppEvent) -> Option<String> {
        match event {
            AppEvent::General(GeneralEvent::DryRun { action }) => {
                Some(format!("[dry-run] would {action}"))
            }
            AppEvent::Validation(event) => match event {
                ValidationEvent::Enqueued {
                    tarball,
                    validation_id,
                } => Some(format!("Queued {tarball} as validation {validation_id}")),
                ValidationEvent::NothingQueued => Some("No queued validations".to_string()),
                ValidationEvent::UnpackSkipped { destdir, .. } => {
                    Some(format!("Already unpacked in {destdir}"))
                }
                ValidationEvent::Unpacking { url, destdir } => {
                    Some(format!("Unpacking {url} into {destdir}"))
                }
                ValidationEvent::ModuleFileWritten { path } => {
                    Some(format!("Wrote module file {path}"))
                }
                ValidationEvent::Started { session_tag, .. } => {
                    Some(format!("Started validation {session_tag}"))
                }
                ValidationEvent::Finished {
                    session_tag,
                    status,
                } => Some(format!("Validation {session_tag} finished: {status}")),
                _ => None,
            },
            AppEvent::Notification(NotificationEvent::Sent {
                recipients,
                subject,
            }) => Some(format!(
                "Mailed \"{subject}\" to {}",
                recipients.join(", ")
            )),
            AppEvent::Process(ProcessEvent::Output {
                command,
                stdout,
                stderr,
            }) if self.debug_enabled => {
                let mut text = format!("> {command}");
                for line in stdout.lines().chain(stderr.lines()) {
                    text.push_str("\n  ");
                    text.push_str(line);
                }
                Some(text)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relval_types::ValidationStatus;

    #[test]
    fn test_status_lines_for_lifecycle_events() {
        let handler = EventHandler::new(false, false);

        let line = handler
            .status_line(&AppEvent::Validation(ValidationEvent::Finished {
                session_tag: "v5-34-08-slc6-x86_64-20131021120000".to_string(),
                status: ValidationStatus::DoneOk,
            }))
            .unwrap();
        assert_eq!(
            line,
            "Validation v5-34-08-slc6-x86_64-20131021120000 finished: DONE_OK"
        );

        let line = handler
            .status_line(&AppEvent::General(GeneralEvent::DryRun {
                action: "run echo hi".to_string(),
            }))
            .unwrap();
        assert_eq!(line, "[dry-run] would run echo hi");

        // Warnings go through tracing only
        assert!(handler
            .status_line(&AppEvent::General(GeneralEvent::Warning {
                message: "careful".to_string(),
                context: None,
            }))
            .is_none());
    }

    #[test]
    fn test_process_output_shown_only_in_debug() {
        let event = AppEvent::Process(ProcessEvent::Output {
            command: "echo hi".to_string(),
            stdout: "hi\n".to_string(),
            stderr: String::new(),
        });

        assert!(EventHandler::new(false, false).status_line(&event).is_none());
        assert_eq!(
            EventHandler::new(false, true).status_line(&event).unwrap(),
            "> echo hi\n  hi"
        );
    }

    #[test]
    fn test_handle_event_in_json_mode_does_not_panic() {
        let mut handler = EventHandler::new(true, true);
        handler.handle_event(EventMessage::from_event(AppEvent::Validation(
            ValidationEvent::NothingQueued,
        )));
    }
}
