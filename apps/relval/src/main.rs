//! relval - Release validation queue controller
//!
//! Queues validations of release packages from a remote catalog, starts
//! them one at a time and polls running ones until they finish. Every
//! operation goes through the ops crate; this binary wires up the
//! components, drains events into the log and renders results.

mod cli;
mod display;
mod error;
mod events;
mod logging;
mod setup;

use crate::cli::{Cli, Commands};
use crate::display::OutputRenderer;
use crate::error::CliError;
use crate::events::EventHandler;
use crate::setup::SystemSetup;
use clap::Parser;
use relval_config::Config;
use relval_events::{EventEmitter, EventReceiver, EventSender};
use relval_ops::{OperationResult, OpsContextBuilder, PackageSource};
use std::path::Path;
use std::process;
use tokio::io::AsyncReadExt;
use tokio::select;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    // Parse command line arguments first to check for JSON mode
    let cli = Cli::parse();
    let json_mode = cli.global.json;

    if matches!(cli.command, Commands::Version) {
        println!("relval {}", env!("CARGO_PKG_VERSION"));
        return;
    }

    // The log directory comes from the configuration, so it is loaded
    // before tracing is initialized
    let first_run = cli.global.config.is_none()
        && Config::default_path().is_ok_and(|path| !path.exists());
    let config = match load_config(&cli).await {
        Ok(config) => config,
        Err(e) => {
            init_tracing(json_mode, cli.global.debug, None);
            report_error(&e, json_mode);
        }
    };
    init_tracing(json_mode, cli.global.debug, config.log_dir().ok().as_deref());

    if first_run {
        if let Ok(path) = Config::default_path() {
            warn!(
                path = %path.display(),
                "No configuration found; wrote a default template. Edit it before queueing validations."
            );
        }
    }

    // Run the application and handle errors
    if let Err(e) = run(cli, config).await {
        report_error(&e, json_mode);
    }
}

fn report_error(e: &CliError, json_mode: bool) -> ! {
    error!(code = ?e.code(), "Application error: {}", e);
    if json_mode {
        let body = serde_json::json!({
            "type": "Error",
            "data": { "code": e.code(), "message": e.to_string() },
        });
        println!("{body}");
    } else {
        eprintln!("Error: {e}");
    }
    process::exit(1);
}

/// Load configuration with proper precedence: file (or generated
/// defaults), then environment, then command line flags
async fn load_config(cli: &Cli) -> Result<Config, CliError> {
    let mut config = Config::load_or_create(cli.global.config.as_deref()).await?;
    config.merge_env()?;
    if cli.global.dry_run {
        config.general.dry_run = true;
    }
    config.validate()?;
    Ok(config)
}

/// Main application logic
async fn run(cli: Cli, config: Config) -> Result<(), CliError> {
    info!("Starting relval v{}", env!("CARGO_PKG_VERSION"));

    // Read the tarball before taking the lock so an interactive prompt
    // does not hold it
    let command = resolve_stdin(cli.command).await?;

    // Create event channel
    let (event_sender, event_receiver) = relval_events::channel();

    // Initialize system setup
    let mut setup = SystemSetup::new(config.clone(), event_sender.clone());
    setup.initialize().await?;

    // Build operations context
    let ops_ctx = build_ops_context(&setup, event_sender.clone(), config)?;

    let renderer = OutputRenderer::new(cli.global.json, cli.global.extended);
    let mut event_handler = EventHandler::new(cli.global.json, cli.global.debug);

    let operation = command.name();
    event_sender.emit_operation_started(operation);

    // Execute command with event handling
    let result = execute_command_with_events(
        command,
        ops_ctx,
        &event_sender,
        event_receiver,
        &mut event_handler,
    )
    .await;

    setup.shutdown().await;
    let result = result?;

    // Render final result
    renderer.render_result(&result)?;

    info!(operation, "Command completed successfully");
    Ok(())
}

/// Fill in the tarball of `queue-validation` from stdin when not given
async fn resolve_stdin(command: Commands) -> Result<Commands, CliError> {
    match command {
        Commands::QueueValidation {
            tarball_opt: None,
            tarball: None,
        } => {
            let mut input = String::new();
            tokio::io::stdin().read_to_string(&mut input).await?;
            Ok(Commands::QueueValidation {
                tarball_opt: None,
                tarball: Some(input.trim().to_string()),
            })
        }
        other => Ok(other),
    }
}

/// Execute command with concurrent event handling
async fn execute_command_with_events(
    command: Commands,
    ops_ctx: relval_ops::OpsCtx,
    event_sender: &EventSender,
    mut event_receiver: EventReceiver,
    event_handler: &mut EventHandler,
) -> Result<OperationResult, CliError> {
    let operation = command.name();
    let mut command_future = Box::pin(execute_command(command, ops_ctx));

    // Handle events concurrently with command execution
    loop {
        select! {
            // Command completed
            result = &mut command_future => {
                match &result {
                    Ok(_) => event_sender.emit_operation_completed(operation, true),
                    Err(e) => event_sender.emit_operation_failed(operation, e.to_string()),
                }
                // Drain any remaining events
                while let Ok(event) = event_receiver.try_recv() {
                    event_handler.handle_event(event);
                }
                return result;
            }

            // Event received
            event = event_receiver.recv() => {
                match event {
                    Some(event) => event_handler.handle_event(event),
                    None => { /* Channel closed: keep waiting for command to finish */ }
                }
            }
        }
    }
}

/// Execute the specified command
async fn execute_command(
    command: Commands,
    ctx: relval_ops::OpsCtx,
) -> Result<OperationResult, CliError> {
    match command {
        Commands::ListPubPackages => {
            let listing = relval_ops::list_packages(&ctx, PackageSource::Published).await?;
            Ok(OperationResult::PackageList(listing))
        }

        Commands::ListValPackages => {
            let listing = relval_ops::list_packages(&ctx, PackageSource::Validation).await?;
            Ok(OperationResult::PackageList(listing))
        }

        Commands::ListKnownPackages => {
            let listing = relval_ops::list_packages(&ctx, PackageSource::Known).await?;
            Ok(OperationResult::PackageList(listing))
        }

        Commands::ListValidations => {
            let listing = relval_ops::list_validations(&ctx, false).await?;
            Ok(OperationResult::ValidationList(listing))
        }

        Commands::ListQueuedValidations => {
            let listing = relval_ops::list_validations(&ctx, true).await?;
            Ok(OperationResult::ValidationList(listing))
        }

        Commands::QueueValidation {
            tarball_opt,
            tarball,
        } => {
            let Some(tarball) = tarball_opt.or(tarball) else {
                return Err(CliError::InvalidArguments(
                    "no tarball given".to_string(),
                ));
            };
            let report = relval_ops::queue_validation(&ctx, &tarball).await?;
            Ok(OperationResult::QueueReport(report))
        }

        Commands::StartNextQueuedValidation => {
            let report = relval_ops::start_next_queued_validation(&ctx).await?;
            Ok(OperationResult::DispatchReport(report))
        }

        Commands::RefreshValidations => {
            let report = relval_ops::refresh_validations(&ctx).await?;
            Ok(OperationResult::ReconcileReport(report))
        }

        Commands::Version => Ok(OperationResult::Success(format!(
            "relval {}",
            env!("CARGO_PKG_VERSION")
        ))),
    }
}

/// Build operations context with all required components
fn build_ops_context(
    setup: &SystemSetup,
    event_sender: EventSender,
    config: Config,
) -> Result<relval_ops::OpsCtx, CliError> {
    let dry_run = config.general.dry_run;
    let ctx = OpsContextBuilder::new()
        .with_store(setup.store()?.clone())
        .with_catalog(setup.catalog()?)
        .with_runner(setup.runner()?)
        .with_notifier(setup.notifier()?)
        .with_event_sender(event_sender)
        .with_config(config)
        .with_dry_run(dry_run)
        .build()?;

    Ok(ctx)
}

/// Initialize tracing/logging
///
/// Debug mode writes structured JSON records to a timestamped file in the
/// log directory. JSON output mode keeps the console free of log lines.
fn init_tracing(json_mode: bool, debug_enabled_flag: bool, log_dir: Option<&Path>) {
    // Check if debug logging is enabled
    let debug_enabled = std::env::var("RUST_LOG").is_ok() || debug_enabled_flag;
    let debug_filter = || {
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            tracing_subscriber::EnvFilter::new("info,relval=debug,relval_ops=debug")
        })
    };

    if debug_enabled {
        if let Some(file) = log_dir.and_then(|dir| open_log_file(dir, json_mode)) {
            tracing_subscriber::fmt()
                .json()
                .with_writer(file)
                .with_env_filter(debug_filter())
                .init();
            return;
        }
    }

    if json_mode {
        // JSON mode: suppress all console output to avoid contaminating JSON
        tracing_subscriber::fmt()
            .with_writer(std::io::sink)
            .with_env_filter("off")
            .init();
    } else if debug_enabled {
        // No log file could be opened: fall back to stderr
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(debug_filter())
            .init();
    } else {
        // Normal mode: warnings and errors on stderr
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .init();
    }
}

fn open_log_file(log_dir: &Path, quiet: bool) -> Option<std::fs::File> {
    if let Err(e) = std::fs::create_dir_all(log_dir) {
        if !quiet {
            eprintln!("Warning: Failed to create log directory: {e}");
        }
        return None;
    }

    let log_file = log_dir.join(format!(
        "relval-{}.log",
        chrono::Utc::now().format("%Y%m%d-%H%M%S")
    ));
    match std::fs::File::create(&log_file) {
        Ok(file) => {
            if !quiet {
                eprintln!("Debug logging enabled: {}", log_file.display());
            }
            Some(file)
        }
        Err(e) => {
            if !quiet {
                eprintln!("Warning: Failed to create log file: {e}");
            }
            None
        }
    }
}
