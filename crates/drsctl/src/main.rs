mod cli;
mod commands;
mod config;
mod error;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use drsctl_core::CancellationToken;

use crate::cli::{Cli, Command};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.global.verbose);

    // Ctrl-C cancels the in-flight reconcile; the result still gets printed.
    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::debug!("interrupt received, cancelling");
                cancel.cancel();
            }
        }
    });

    if let Err(err) = run(cli, cancel).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

/// Logs go to stderr so stdout stays machine-readable.
fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli, cancel: CancellationToken) -> Result<(), CliError> {
    match cli.command {
        // Config commands don't need a vCenter connection
        Command::Config(args) => commands::config_cmd::handle(args, &cli.global),

        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "drsctl", &mut std::io::stdout());
            Ok(())
        }

        Command::Apply(args) => {
            let cfg = config::load_config()?;
            commands::apply::handle(args, &cli.global, &cfg, cancel).await
        }

        Command::Get(args) => {
            let cfg = config::load_config()?;
            commands::get::handle(args, &cli.global, &cfg).await
        }
    }
}
