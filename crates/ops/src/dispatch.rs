//! Starting the oldest queued validation

use crate::notify::{deliver, Notification};
use crate::template::{self, render, Vars};
use crate::{DispatchReport, OpsCtx};
use relval_errors::{Error, OpsError};
use relval_events::{AppEvent, EventEmitter, FailureContext, ValidationEvent};
use relval_platform::{fs, ShellCommand};
use relval_types::{Timestamp, Validation};
use std::path::Path;

/// Start the oldest queued validation
///
/// Unpacks the package unless it is already present, installs its module
/// file, runs the configured start command and marks the validation
/// running. An empty queue is a successful no-op.
///
/// A failing unpack or start command leaves the validation queued, so the
/// next dispatch picks the same one. In dry run nothing is executed,
/// written or persisted, but the rendered module file is still produced.
///
/// # Errors
///
/// Returns an error if a path template cannot be resolved, a command fails,
/// or the database cannot be updated.
pub async fn start_next_queued_validation(ctx: &OpsCtx) -> Result<DispatchReport, Error> {
    let Some(mut validation) = ctx.store.oldest_queued().await? else {
        ctx.emit(AppEvent::Validation(ValidationEvent::NothingQueued));
        return Ok(DispatchReport::idle(ctx.dry_run));
    };

    let session_tag = validation.session_tag();
    let mut vars = ctx.template_vars(&validation);
    let settings = &ctx.config.validation;
    let (destdir, module_file) = ctx.resolve_paths(&mut vars)?;

    let unpacked = unpack(ctx, &mut validation, &vars, Path::new(&destdir)).await?;

    let module_content = render(template::MODULE_FILE_TEMPLATE, &vars).text;
    if ctx.dry_run {
        ctx.emit_dry_run(format!("write module file {module_file}"));
    } else {
        fs::write_file(Path::new(&module_file), &module_content).await?;
        ctx.emit(AppEvent::Validation(ValidationEvent::ModuleFileWritten {
            path: module_file.clone(),
        }));
    }

    let run_command = ctx.render_command("validation.run_cmd", &settings.run_cmd, &vars);
    if ctx.dry_run {
        ctx.emit_dry_run(format!("run {run_command}"));
    } else {
        let output = ctx.runner.run(&ShellCommand::new(&run_command)).await?;
        if !output.success() {
            return Err(OpsError::CommandFailed {
                command: run_command,
                code: output.code,
            }
            .into());
        }
    }

    validation.start(Timestamp::now())?;
    if ctx.dry_run {
        ctx.emit_dry_run(format!("mark {session_tag} running"));
    } else {
        ctx.store.update_validation(&validation).await?;
    }
    ctx.emit(AppEvent::Validation(ValidationEvent::Started {
        validation_id: validation.id,
        session_tag,
    }));

    let notification = started_notification(ctx, &validation, &vars);
    let notified = deliver(ctx, ctx.notifier.as_ref(), &notification, ctx.dry_run).await;

    Ok(DispatchReport {
        validation: Some(validation),
        destdir: Some(destdir),
        unpacked,
        module_file: Some(module_file),
        module_content: Some(module_content),
        run_command: Some(run_command),
        notified,
        dry_run: ctx.dry_run,
    })
}

/// Make sure the package is unpacked under `destdir`
///
/// Returns whether the unpack command ran.
async fn unpack(
    ctx: &OpsCtx,
    validation: &mut Validation,
    vars: &Vars,
    destdir: &Path,
) -> Result<bool, Error> {
    let package = &mut validation.package;
    let destdir_str = destdir.display().to_string();

    if package.fetched && fs::is_dir(destdir).await {
        ctx.emit(AppEvent::Validation(ValidationEvent::UnpackSkipped {
            tarball: package.tarball.clone(),
            destdir: destdir_str,
        }));
        return Ok(false);
    }

    let command = ctx.render_command(
        "validation.unpack_cmd",
        &ctx.config.validation.unpack_cmd,
        vars,
    );
    if ctx.dry_run {
        ctx.emit_dry_run(format!("create {destdir_str} and run {command}"));
        return Ok(false);
    }

    fs::create_dir_all(destdir).await?;
    ctx.emit(AppEvent::Validation(ValidationEvent::Unpacking {
        url: package.url(ctx.baseurl()),
        destdir: destdir_str.clone(),
    }));

    let failure = match ctx.runner.run(&ShellCommand::new(&command)).await {
        Ok(output) if output.success() => None,
        Ok(output) => Some(Error::from(OpsError::CommandFailed {
            command,
            code: output.code,
        })),
        Err(e) => Some(e),
    };

    if let Some(err) = failure {
        // Drop whatever was partially unpacked
        if let Err(cleanup) = fs::remove_dir_all(destdir).await {
            ctx.emit_warning_with_context(
                format!("could not remove {destdir_str}"),
                cleanup.to_string(),
            );
        }
        ctx.emit(AppEvent::Validation(ValidationEvent::UnpackFailed {
            destdir: destdir_str,
            failure: FailureContext::from_error(&err),
        }));
        return Err(err);
    }

    ctx.emit(AppEvent::Validation(ValidationEvent::Unpacked {
        destdir: destdir_str,
    }));
    package.fetched = true;
    ctx.store.update_package(package).await?;
    Ok(true)
}

fn started_notification(ctx: &OpsCtx, validation: &Validation, vars: &Vars) -> Notification {
    let mut vars = vars.clone();
    vars.set(template::VALIDATION_STR, validation.describe(ctx.baseurl()));

    Notification {
        recipients: ctx.config.mail.recipients.clone(),
        subject: render(template::STARTED_SUBJECT, &vars).text,
        body: render(template::STARTED_BODY, &vars).text,
    }
}
