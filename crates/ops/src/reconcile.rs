//! Polling running validations for completion

use crate::notify::{deliver, Notification};
use crate::template::{self, render, Vars};
use crate::{OpsCtx, ReconcileReport, SkippedPoll, Transition};
use relval_errors::Error;
use relval_events::{AppEvent, EventEmitter, ValidationEvent};
use relval_platform::ShellCommand;
use relval_types::{PollOutcome, Timestamp, Validation, ValidationStatus};

/// Probe every running validation and record those that ended
///
/// The status command's exit code is mapped through the configured status
/// code table. Unmapped codes are reported and the validation is left
/// alone; a validation reported as not running is marked disappeared.
/// Running this again without external changes has no further effect.
///
/// Status probes run in dry run too, but nothing is persisted or notified.
///
/// # Errors
///
/// Returns an error if the status command cannot be spawned or the
/// database cannot be read or updated.
pub async fn refresh_validations(ctx: &OpsCtx) -> Result<ReconcileReport, Error> {
    let running = ctx
        .store
        .list_validations(Some(ValidationStatus::Running))
        .await?;

    let mut report = ReconcileReport {
        dry_run: ctx.dry_run,
        ..ReconcileReport::default()
    };

    for mut validation in running {
        report.checked += 1;
        let session_tag = validation.session_tag();
        let vars = ctx.template_vars(&validation);

        let command = ctx.render_command(
            "validation.status_cmd",
            &ctx.config.validation.status_cmd,
            &vars,
        );
        let output = ctx.runner.run(&ShellCommand::new(command)).await?;
        ctx.emit(AppEvent::Validation(ValidationEvent::StatusQueried {
            session_tag: session_tag.clone(),
            exit_code: output.code,
        }));

        let Some(polled) = output.code.and_then(|code| ctx.status_codes.lookup(code)) else {
            ctx.emit(AppEvent::Validation(ValidationEvent::UnknownStatusCode {
                session_tag: session_tag.clone(),
                exit_code: output.code,
            }));
            report.skipped.push(SkippedPoll {
                validation_id: validation.id,
                session_tag,
                exit_code: output.code,
            });
            continue;
        };

        let status = match validation.apply_poll(polled, Timestamp::now())? {
            PollOutcome::Unchanged => {
                ctx.emit(AppEvent::Validation(ValidationEvent::StatusUnchanged {
                    session_tag,
                }));
                report.unchanged += 1;
                continue;
            }
            PollOutcome::Finished(status) => status,
            PollOutcome::Disappeared => ValidationStatus::Disappeared,
        };

        if ctx.dry_run {
            ctx.emit_dry_run(format!("mark {session_tag} {status}"));
        } else {
            ctx.store.update_validation(&validation).await?;
        }

        if status == ValidationStatus::Disappeared {
            ctx.emit(AppEvent::Validation(ValidationEvent::Disappeared {
                session_tag: session_tag.clone(),
            }));
        } else {
            ctx.emit(AppEvent::Validation(ValidationEvent::Finished {
                session_tag: session_tag.clone(),
                status,
            }));
        }

        let notification = finished_notification(ctx, &validation, &vars);
        let notified = deliver(ctx, ctx.notifier.as_ref(), &notification, ctx.dry_run).await;

        report.transitions.push(Transition {
            validation_id: validation.id,
            session_tag,
            status,
            results_url: vars
                .get(template::RESULTS_URL)
                .unwrap_or_default()
                .to_string(),
            notified,
        });
    }

    Ok(report)
}

fn finished_notification(ctx: &OpsCtx, validation: &Validation, vars: &Vars) -> Notification {
    let mut vars = vars.clone();
    vars.set(template::STATUS_STR, validation.status.name())
        .set(template::VALIDATION_STR, validation.describe(ctx.baseurl()));

    Notification {
        recipients: ctx.config.mail.recipients.clone(),
        subject: render(template::FINISHED_SUBJECT, &vars).text,
        body: render(template::FINISHED_BODY, &vars).text,
    }
}
