//! Command line interface definition

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// relval - Release validation queue controller
#[derive(Parser)]
#[command(name = "relval")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Release validation queue controller")]
#[command(long_about = None)]
#[command(infer_subcommands = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Global arguments available for all commands
#[derive(Parser)]
pub struct GlobalArgs {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable debug logging, also written to the configured log directory
    #[arg(long, global = true)]
    pub debug: bool,

    /// Use alternate config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Report what would be done without changing anything
    #[arg(long, alias = "dryrun", global = true)]
    pub dry_run: bool,

    /// Print full descriptions instead of tables
    #[arg(long, global = true)]
    pub extended: bool,
}

/// Available commands
///
/// Any unique prefix of a command name or alias selects it.
#[derive(Subcommand)]
pub enum Commands {
    /// List packages in the published catalog
    #[command(alias = "show-pub-packages")]
    ListPubPackages,

    /// List packages in the catalog awaiting validation
    #[command(alias = "show-val-packages")]
    ListValPackages,

    /// List packages cached locally
    #[command(aliases = ["show-known-packages", "list-cached-packages", "show-cached-packages"])]
    ListKnownPackages,

    /// List all validations
    #[command(aliases = ["list", "show-validations"])]
    ListValidations,

    /// List queued validations
    #[command(alias = "show-queued-validations")]
    ListQueuedValidations,

    /// Queue a validation of a tarball from the validation catalog
    #[command(alias = "add-validation")]
    QueueValidation {
        /// Tarball name; read from stdin when omitted
        #[arg(long = "tarball", value_name = "TARBALL")]
        tarball_opt: Option<String>,

        /// Tarball name; read from stdin when omitted
        #[arg(conflicts_with = "tarball_opt")]
        tarball: Option<String>,
    },

    /// Unpack and start the oldest queued validation
    #[command(alias = "run-next")]
    StartNextQueuedValidation,

    /// Poll running validations and record the finished ones
    #[command(aliases = ["update", "update-validations"])]
    RefreshValidations,

    /// Show version information
    Version,
}

impl Commands {
    /// Canonical operation name, used in log records
    pub fn name(&self) -> &'static str {
        match self {
            Self::ListPubPackages => "list-pub-packages",
            Self::ListValPackages => "list-val-packages",
            Self::ListKnownPackages => "list-known-packages",
            Self::ListValidations => "list-validations",
            Self::ListQueuedValidations => "list-queued-validations",
            Self::QueueValidation { .. } => "queue-validation",
            Self::StartNextQueuedValidation => "start-next-queued-validation",
            Self::RefreshValidations => "refresh-validations",
            Self::Version => "version",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("relval").chain(args.iter().copied()))
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn aliases_and_prefixes_select_commands() {
        let cli = parse(&["run-next"]).unwrap();
        assert!(matches!(cli.command, Commands::StartNextQueuedValidation));

        let cli = parse(&["update"]).unwrap();
        assert!(matches!(cli.command, Commands::RefreshValidations));

        let cli = parse(&["start"]).unwrap();
        assert!(matches!(cli.command, Commands::StartNextQueuedValidation));

        let cli = parse(&["list"]).unwrap();
        assert!(matches!(cli.command, Commands::ListValidations));
    }

    #[test]
    fn ambiguous_and_unknown_operations_are_usage_errors() {
        assert!(parse(&["list-"]).is_err());
        assert!(parse(&["frobnicate"]).is_err());
    }

    #[test]
    fn queue_validation_takes_positional_or_option() {
        let cli = parse(&["queue-validation", "a.tar.gz", "--dry-run"]).unwrap();
        assert!(cli.global.dry_run);
        assert!(matches!(
            cli.command,
            Commands::QueueValidation { tarball: Some(ref t), tarball_opt: None } if t == "a.tar.gz"
        ));

        let cli = parse(&["queue", "--tarball", "b.tar.gz"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::QueueValidation { tarball_opt: Some(ref t), .. } if t == "b.tar.gz"
        ));
    }
}
