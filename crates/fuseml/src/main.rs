//! FuseML CLI
//!
//! Installs, upgrades and removes the FuseML platform and its extensions on
//! the configured Kubernetes cluster.

mod cli;
mod commands;
mod options;
mod output;

use anyhow::{Context, Result};
use clap::FromArgMatches;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::{Cli, Commands};
use commands::Session;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize rustls crypto provider (required for rustls 0.23+)
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

    // Option flags are generated from the option registries, so parse
    // through the built command rather than `Cli::parse`
    let matches = cli::build_command()?.get_matches();
    let cli = Cli::from_arg_matches(&matches)?;
    let (_, sub_matches) = matches.subcommand().context("no command given")?;

    init_tracing(cli.verbose, cli.quiet);

    let session = || Session::open(cli.config_file.as_deref(), cli.kubeconfig.clone());

    match cli.command {
        Commands::Install(args) => commands::install::run(args, sub_matches, session()?).await,
        Commands::Uninstall => commands::uninstall::run(sub_matches, session()?).await,
        Commands::Upgrade => commands::upgrade::run(sub_matches, session()?).await,
        Commands::Extensions(args) => {
            commands::extensions::run(args, sub_matches, session()?).await
        }
        Commands::Info => commands::info::run(session()?).await,
        Commands::Version(args) => commands::version::run(args),
        Commands::Completion(args) => commands::completion::run(args),
    }
}

/// Initialize tracing with appropriate verbosity
fn init_tracing(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("info"),
            1 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();
}
