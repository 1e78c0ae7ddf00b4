//! Uninstall command

use anyhow::Result;
use clap::ArgMatches;
use fuseml_deployments::options::{uninstall_options, EXTENSIONS, EXTENSION_REPOSITORY};
use fuseml_deployments::{PlatformConfig, Sequencer};

use super::extensions::{discover_domain, uninstall_extensions};
use super::Session;
use crate::options::resolve;
use crate::output;

pub async fn run(matches: &ArgMatches, session: Session) -> Result<()> {
    output::header("Uninstalling FuseML");

    let mut options = uninstall_options(&session.config.extensions_repository)?;
    resolve(&mut options, matches, false)?;
    session.fill_domain(&mut options)?;

    // Extensions go first, while the registry is still reachable
    let extensions = options.get_list(EXTENSIONS, "")?;
    if !extensions.is_empty() {
        let domain = discover_domain(&session, &mut options).await?;
        let repository = options.get_string(EXTENSION_REPOSITORY, "")?;
        uninstall_extensions(&session, &extensions, &repository, true, &domain).await?;
    }

    Sequencer::platform(PlatformConfig::from_config(&session.config))
        .uninstall(&session.ctx)
        .await?;

    output::success("FuseML uninstalled.");
    Ok(())
}
