//! Upgrade command

use anyhow::Result;
use clap::ArgMatches;
use fuseml_deployments::options::{upgrade_options, SYSTEM_DOMAIN};
use fuseml_deployments::{PlatformConfig, Sequencer};

use super::install::show_configuration;
use super::Session;
use crate::options::resolve;
use crate::output;

pub async fn run(matches: &ArgMatches, mut session: Session) -> Result<()> {
    output::header("Upgrading FuseML");

    let mut options = upgrade_options()?;
    resolve(&mut options, matches, false)?;
    session.fill_domain(&mut options)?;
    show_configuration(&options);

    let sequencer = Sequencer::platform(PlatformConfig::from_config(&session.config));
    sequencer.upgrade(&session.ctx, &mut options).await?;

    let domain = options.get_string(SYSTEM_DOMAIN, "")?;
    session.remember_domain(&domain)?;

    output::success("FuseML upgraded.");
    Ok(())
}
