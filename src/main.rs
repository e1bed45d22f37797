//! mcp-federation - safe installer for MCP server registrations
//!
//! Merges a catalog of MCP servers into the desktop app's `mcpServers`
//! registry without overwriting anything, backs the document up before every
//! change and records which entries it added so uninstall removes exactly
//! those.

use clap::Parser;

mod backup;
mod cancel;
mod catalog;
mod cli;
mod commands;
mod config;
mod error;
mod git;
mod manifest;
mod merge;
mod operations;
mod prereq;
mod runner;
mod store;
mod transaction;
mod ui;

use catalog::Catalog;
use cli::{Cli, Commands, InstallArgs};
use config::Settings;
use error::{FederationError, Result};

fn setup_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("mcp_federation=debug,warn")
        } else {
            EnvFilter::new("warn")
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: &Cli) -> Result<i32> {
    let overrides = cli.overrides();
    let settings = || {
        let settings = Settings::resolve(&overrides)?;
        tracing::debug!(?settings, "resolved settings");
        Ok::<_, FederationError>(settings)
    };
    let catalog = || Catalog::load_or_builtin(cli.catalog.as_deref());

    match &cli.command {
        None => commands::install::run(&settings()?, &catalog()?, &InstallArgs::default()),
        Some(Commands::Install(args)) => commands::install::run(&settings()?, &catalog()?, args),
        Some(Commands::Uninstall(args)) => {
            commands::uninstall::run(&settings()?, &catalog()?, args)
        }
        Some(Commands::Restore(args)) => commands::restore::run(&settings()?, args),
        Some(Commands::Backups(args)) => commands::backups::run(&settings()?, &args.command),
        Some(Commands::Status) => commands::status::run(&settings()?),
        Some(Commands::Validate) => commands::validate::run(&settings()?, &catalog()?),
        Some(Commands::Version) => commands::version::run(),
        Some(Commands::Completions(args)) => commands::completions::run(args),
    }
}

fn report(error: FederationError) -> i32 {
    let code = error.exit_code();
    let phase = error.phase();
    let statement = error.registry_statement();
    eprintln!("{:?}", miette::Report::new(error));
    eprintln!("Failed during {phase}. {statement}");
    code
}

fn main() {
    let cli = Cli::parse();
    setup_tracing(cli.verbose);

    let code = match run(&cli) {
        Ok(code) => code,
        Err(e) => report(e),
    };
    std::process::exit(code);
}
