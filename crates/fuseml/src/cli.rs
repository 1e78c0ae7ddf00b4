//! CLI argument parsing with clap

use anyhow::Result;
use camino::Utf8PathBuf;
use clap::{Args, Command, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use fuseml_core::config::DEFAULT_EXTENSIONS_REPOSITORY;
use fuseml_deployments::options::{
    extensions_options, install_options, uninstall_options, upgrade_options,
};

use crate::options::add_option_flags;

/// FuseML - machine learning orchestration on Kubernetes
#[derive(Parser, Debug)]
#[command(name = "fuseml")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the FuseML config file
    #[arg(long, global = true, env = "FUSEML_CONFIG_FILE")]
    pub config_file: Option<Utf8PathBuf>,

    /// Kubeconfig used by kubectl and helm
    #[arg(long, global = true)]
    pub kubeconfig: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Install FuseML in your configured kubernetes cluster
    Install(InstallArgs),

    /// Uninstall FuseML from your configured kubernetes cluster
    Uninstall,

    /// Upgrade FuseML in your configured kubernetes cluster
    Upgrade,

    /// Add, remove or list FuseML extensions
    Extensions(ExtensionsArgs),

    /// Show information about the FuseML environment
    Info,

    /// Show version information
    Version(VersionArgs),

    /// Generate shell completion scripts
    Completion(CompletionArgs),
}

#[derive(Args, Debug)]
pub struct InstallArgs {
    /// Ask for option values instead of using the defaults
    #[arg(short, long)]
    pub interactive: bool,
}

#[derive(Args, Debug)]
pub struct ExtensionsArgs {
    /// Extensions to install into the existing deployment (comma separated)
    #[arg(long, value_delimiter = ',')]
    pub add: Vec<String>,

    /// Extensions to remove from the deployment (comma separated)
    #[arg(long, value_delimiter = ',')]
    pub remove: Vec<String>,

    /// When removing an extension, remove also all its required extensions
    #[arg(long)]
    pub with_dependencies: bool,

    /// List registered extensions
    #[arg(long)]
    pub list: bool,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct CompletionArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

/// The full command line, with one flag per installation option
pub fn build_command() -> Result<Command> {
    let repository = DEFAULT_EXTENSIONS_REPOSITORY;
    let install = install_options(repository)?;
    let uninstall = uninstall_options(repository)?;
    let upgrade = upgrade_options()?;
    let extensions = extensions_options(repository)?;

    Ok(Cli::command()
        .mut_subcommand("install", |cmd| add_option_flags(cmd, &install))
        .mut_subcommand("uninstall", |cmd| add_option_flags(cmd, &uninstall))
        .mut_subcommand("upgrade", |cmd| add_option_flags(cmd, &upgrade))
        .mut_subcommand("extensions", |cmd| add_option_flags(cmd, &extensions)))
}
