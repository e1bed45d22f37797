//! CLI definitions using clap derive API

use clap::builder::{Styles, styling::AnsiColor};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::SettingsOverrides;

/// mcp-federation - safe installer for MCP server registrations
///
/// Adds a catalog of MCP servers to the desktop app's configuration without
/// touching entries it did not add, and remembers which ones it added.
#[derive(Parser, Debug)]
#[command(
    name = "mcp-federation",
    author,
    version,
    color = clap::ColorChoice::Auto,
    styles = Styles::styled()
        .header(AnsiColor::Green.on_default().bold())
        .usage(AnsiColor::Green.on_default().bold())
        .literal(AnsiColor::Cyan.on_default().bold())
        .placeholder(AnsiColor::Cyan.on_default()),
    about = "Install and remove MCP server registrations with provenance tracking",
    long_about = "mcp-federation merges a catalog of MCP servers into the `mcpServers` registry \
                  of the desktop app's configuration file. Existing entries are never overwritten; \
                  every change is preceded by a backup, and an installation manifest records \
                  exactly which entries were added so uninstall removes only those.",
    after_help = "\x1b[1m\x1b[32mExamples:\x1b[0m\n    \
                  mcp-federation install\n    \
                  mcp-federation install --dry-run\n    \
                  mcp-federation uninstall\n    \
                  mcp-federation restore\n    \
                  mcp-federation backups list\n\n\
                  \x1b[1m\x1b[32mExit codes:\x1b[0m\n    \
                  0 success, 1 some entries failed, 2 aborted before any change,\n    \
                  3 could not persist, 4 internal error, 130 interrupted"
)]
pub struct Cli {
    /// Registry document to edit (defaults to the desktop app's config file)
    #[arg(long, short = 'c', global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory for the manifest and backups (defaults to ~/.mcp-federation)
    #[arg(long, global = true, value_name = "DIR")]
    pub state_dir: Option<PathBuf>,

    /// Directory for fetched and generated servers (defaults to ~/mcp-servers)
    #[arg(long, global = true, value_name = "DIR")]
    pub servers_dir: Option<PathBuf>,

    /// Catalog file to use instead of the builtin one
    #[arg(long, global = true, value_name = "FILE")]
    pub catalog: Option<PathBuf>,

    /// Enable verbose output
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Defaults to `install`
    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Settings given on the command line
    pub fn overrides(&self) -> SettingsOverrides {
        let mut overrides = SettingsOverrides {
            config: self.config.clone(),
            state_dir: self.state_dir.clone(),
            servers_dir: self.servers_dir.clone(),
            ..SettingsOverrides::default()
        };
        if let Some(Commands::Install(args)) = &self.command {
            overrides.max_attempts = args.max_attempts;
            overrides.retry_delay_secs = args.retry_delay;
            overrides.timeout_secs = args.timeout;
            overrides.jobs = args.jobs;
        }
        overrides
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Install the catalog's servers (the default command)
    Install(InstallArgs),

    /// Remove the servers recorded in the installation manifest
    Uninstall(UninstallArgs),

    /// Restore the registry document from a backup
    Restore(RestoreArgs),

    /// List or clean up backups
    Backups(BackupsArgs),

    /// Show what is installed
    Status,

    /// Check that every catalog entry is registered and runnable
    Validate,

    /// Show version information
    Version,

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Arguments for the install command
#[derive(Args, Debug, Default)]
#[command(after_help = "EXAMPLES:\n  \
                   Install the builtin catalog:\n    mcp-federation install\n\n\
                   Preview without changing anything:\n    mcp-federation install --dry-run\n\n\
                   Use a custom catalog:\n    mcp-federation --catalog ./servers.yaml install\n\n\
                   Retry harder on a flaky network:\n    mcp-federation install --max-attempts 5 --retry-delay 5")]
pub struct InstallArgs {
    /// Show what would be added without running anything
    #[arg(long)]
    pub dry_run: bool,

    /// Parallel acquisition workers
    #[arg(long, short = 'j', value_name = "N")]
    pub jobs: Option<usize>,

    /// Attempts per acquisition action
    #[arg(long, value_name = "N")]
    pub max_attempts: Option<u32>,

    /// Base retry delay in seconds, doubled after each failure
    #[arg(long, value_name = "SECS")]
    pub retry_delay: Option<u64>,
    /// Timeout for each acquisition command in seconds, at least 1
    /// Timeout for each acquisition command in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
}

/// Arguments for the uninstall command
#[derive(Args, Debug)]
#[command(after_help = "EXAMPLES:\n  \
                  Remove what install added:\n    mcp-federation uninstall\n\n\
                  Without confirmation:\n    mcp-federation uninstall -y\n\n\
                  No manifest, remove every catalog entry anyway:\n    mcp-federation uninstall --force")]
pub struct UninstallArgs {
    /// Without a manifest, remove every registered catalog entry
    #[arg(long)]
    pub force: bool,

    /// Skip confirmation prompt
    #[arg(long, short = 'y')]
    pub yes: bool,
}

/// Arguments for the restore command
#[derive(Args, Debug)]
pub struct RestoreArgs {
    /// Backup file name (defaults to the latest backup)
    pub backup: Option<String>,

    /// Skip confirmation prompt
    #[arg(long, short = 'y')]
    pub yes: bool,
}

#[derive(Args, Debug)]
pub struct BackupsArgs {
    #[command(subcommand)]
    pub command: BackupsCommand,
}

#[derive(Subcommand, Debug)]
pub enum BackupsCommand {
    /// List backups, newest first
    List,

    /// Delete old backups, keeping the newest ones and the baseline
    Clean {
        /// Timestamped backups to keep
        #[arg(long, default_value_t = 5)]
        keep: usize,

        /// Skip confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,
    },
}

/// Arguments for completions command
#[derive(Args, Debug)]
#[command(after_help = "EXAMPLES:\n  \
                  Generate bash completions:\n    mcp-federation completions bash > ~/.bash_completion.d/mcp-federation\n\n\
                  Generate zsh completions:\n    mcp-federation completions zsh > ~/.zfunc/_mcp-federation")]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum, ignore_case = true)]
    pub shell: clap_complete::Shell,
}
