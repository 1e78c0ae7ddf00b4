//! Install command

use anyhow::Result;
use clap::ArgMatches;
use dialoguer::Confirm;
use fuseml_core::options::InstallationOptions;
use fuseml_deployments::options::{install_options, EXTENSIONS, EXTENSION_REPOSITORY, SYSTEM_DOMAIN};
use fuseml_deployments::{PlatformConfig, Sequencer};

use super::extensions::install_extensions;
use super::Session;
use crate::cli::InstallArgs;
use crate::options::resolve;
use crate::output;

pub async fn run(args: InstallArgs, matches: &ArgMatches, mut session: Session) -> Result<()> {
    output::header("Installing FuseML");

    let mut options = install_options(&session.config.extensions_repository)?;
    resolve(&mut options, matches, args.interactive)?;
    session.fill_domain(&mut options)?;
    show_configuration(&options);

    if args.interactive
        && !Confirm::new()
            .with_prompt("Proceed with the installation?")
            .default(true)
            .interact()?
    {
        output::warning("Installation aborted");
        return Ok(());
    }

    let sequencer = Sequencer::platform(PlatformConfig::from_config(&session.config));
    sequencer.install(&session.ctx, &mut options).await?;

    let domain = options.get_string(SYSTEM_DOMAIN, "")?;
    session.remember_domain(&domain)?;

    let extensions = options.get_list(EXTENSIONS, "")?;
    let repository = options.get_string(EXTENSION_REPOSITORY, "")?;
    install_extensions(&session, &extensions, &repository, &options, &domain).await?;

    output::success("FuseML installed.");
    output::kv("System domain", &domain);
    Ok(())
}

/// Print the values the command is about to use
pub fn show_configuration(options: &InstallationOptions) {
    output::info("Configuration");
    for option in options.iter() {
        let value = option.effective().to_string();
        let shown = if value.is_empty() { "(empty)" } else { &value };
        output::kv(&option.key(), shown);
    }
}
