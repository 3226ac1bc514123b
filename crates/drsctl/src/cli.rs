//! Clap derive structures for the `drsctl` CLI.
//!
//! Defines the command tree, global flags, and shared types.

use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// drsctl -- idempotent per-VM DRS overrides for vCenter clusters
#[derive(Debug, Parser)]
#[command(
    name = "drsctl",
    version,
    about = "Reconcile per-VM DRS overrides in vCenter clusters",
    long_about = "Compare a VM's DRS override with the desired automation level and \
        apply at most one change.\n\n\
        Safe to run repeatedly: when the override already matches, nothing is \
        submitted and the result reports changed = false.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Config profile to use
    #[arg(long, short = 'p', env = "DRSCTL_PROFILE", global = true)]
    pub profile: Option<String>,

    /// vCenter hostname, IP, or URL (overrides profile)
    #[arg(long, short = 'H', env = "DRSCTL_HOSTNAME", global = true)]
    pub hostname: Option<String>,

    /// vCenter HTTPS port
    #[arg(long, env = "DRSCTL_PORT", global = true)]
    pub port: Option<u16>,

    /// vCenter username
    #[arg(long, short = 'u', env = "DRSCTL_USERNAME", global = true)]
    pub username: Option<String>,

    /// vCenter password
    #[arg(long, env = "DRSCTL_PASSWORD", global = true, hide_env_values = true)]
    pub password: Option<String>,

    /// Verify the server TLS certificate
    #[arg(long, env = "DRSCTL_VALIDATE_CERTS", global = true)]
    pub validate_certs: bool,

    /// HTTP request timeout in seconds
    #[arg(long, env = "DRSCTL_TIMEOUT", global = true)]
    pub timeout: Option<u64>,

    /// Output format [default: json]
    #[arg(long, short = 'o', env = "DRSCTL_OUTPUT", global = true)]
    pub output: Option<OutputFormat>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Human-readable table
    Table,
}

// ── Commands ─────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Bring a VM's DRS override to the desired behavior
    #[command(alias = "set")]
    Apply(ApplyArgs),

    /// Show a VM's current DRS override
    #[command(alias = "show")]
    Get(GetArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Debug, Args)]
pub struct ApplyArgs {
    /// VM name (unique within its cluster)
    pub vm: String,

    /// Desired DRS behavior: manual, partiallyAutomated, fullyAutomated
    #[arg(long, short = 'b', default_value = "manual")]
    pub behavior: String,

    /// How long to wait for the reconfiguration task (e.g. 30s, 2m)
    #[arg(long, short = 'w', value_parser = humantime::parse_duration)]
    pub wait: Option<Duration>,

    /// Delay between task status checks
    #[arg(long, default_value = "1s", value_parser = humantime::parse_duration)]
    pub poll_interval: Duration,

    /// Upper bound for the delay between checks; enables doubling backoff
    #[arg(long, value_parser = humantime::parse_duration)]
    pub max_poll_interval: Option<Duration>,

    /// Report what would change without submitting anything
    #[arg(long)]
    pub check: bool,
}

#[derive(Debug, Args)]
pub struct GetArgs {
    /// VM name
    pub vm: String,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display the configuration with secrets masked
    Show,

    /// Print the config file location
    Path,

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name to set as default
        name: String,
    },

    /// Store a profile's password in the system keyring
    SetPassword {
        /// Profile to update (defaults to the active profile)
        #[arg(long)]
        profile: Option<String>,
    },
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
