//! Extensions command and the extension steps shared with install/uninstall

use anyhow::{bail, Result};
use clap::ArgMatches;
use fuseml_core::options::InstallationOptions;
use fuseml_deployments::domain::ensure_system_domain;
use fuseml_deployments::options::{extensions_options, EXTENSION_REPOSITORY};
use fuseml_extensions::{ExtensionManager, RegisteredExtension, RegistryClient};
use tabled::{settings::Style, Table, Tabled};
use tracing::debug;

use super::Session;
use crate::cli::ExtensionsArgs;
use crate::options::resolve;
use crate::output;

pub async fn run(args: ExtensionsArgs, matches: &ArgMatches, mut session: Session) -> Result<()> {
    if args.add.is_empty() && args.remove.is_empty() && !args.list {
        bail!("Nothing to do: use --add, --remove or --list");
    }

    if args.with_dependencies && args.remove.is_empty() {
        output::warning("--with-dependencies only applies to --remove");
    }

    let mut options = extensions_options(&session.config.extensions_repository)?;
    resolve(&mut options, matches, false)?;
    session.fill_domain(&mut options)?;
    let domain = discover_domain(&session, &mut options).await?;
    session.remember_domain(&domain)?;
    let repository = options.get_string(EXTENSION_REPOSITORY, "")?;

    if !args.remove.is_empty() {
        output::header("Removing extensions");
        uninstall_extensions(
            &session,
            &args.remove,
            &repository,
            args.with_dependencies,
            &domain,
        )
        .await?;
    }

    if !args.add.is_empty() {
        output::header("Adding extensions");
        install_extensions(&session, &args.add, &repository, &options, &domain).await?;
    }

    if args.list {
        list_extensions(&domain).await?;
    }

    Ok(())
}

/// Install `names` and everything they require, registering each one
pub async fn install_extensions(
    session: &Session,
    names: &[String],
    repository: &str,
    options: &InstallationOptions,
    domain: &str,
) -> Result<()> {
    if names.is_empty() {
        return Ok(());
    }

    let loader = session.extension_loader(repository);
    let client = RegistryClient::for_domain(domain)?;
    let manager = ExtensionManager::new(&session.ctx, &loader, &client);

    let pb = output::progress_bar(0, "Resolving extensions");
    let result = manager
        .install(
            names,
            options,
            Some(&|current, total, name| {
                pb.set_length(total as u64);
                pb.set_position(current as u64 - 1);
                pb.set_message(format!("Installing {}", name));
            }),
        )
        .await;
    pb.finish_and_clear();

    let installed = result?;
    output::success(&format!("Extensions installed: {}", installed.join(", ")));
    Ok(())
}

/// Unregister and remove `names`, plus their requirements when asked
pub async fn uninstall_extensions(
    session: &Session,
    names: &[String],
    repository: &str,
    with_dependencies: bool,
    domain: &str,
) -> Result<()> {
    if names.is_empty() {
        return Ok(());
    }

    let loader = session.extension_loader(repository);
    let client = RegistryClient::for_domain(domain)?;
    let manager = ExtensionManager::new(&session.ctx, &loader, &client);

    let pb = output::progress_bar(0, "Resolving extensions");
    let result = manager
        .uninstall(
            names,
            with_dependencies,
            Some(&|current, total, name| {
                pb.set_length(total as u64);
                pb.set_position(current as u64 - 1);
                pb.set_message(format!("Removing {}", name));
            }),
        )
        .await;
    pb.finish_and_clear();

    let removed = result?;
    output::success(&format!("Extensions removed: {}", removed.join(", ")));
    Ok(())
}

/// Resolve the system domain, showing a spinner while the cluster is queried
pub async fn discover_domain(
    session: &Session,
    options: &mut InstallationOptions,
) -> Result<String> {
    let spinner = output::spinner("Discovering the system domain");
    let result = ensure_system_domain(&session.ctx, options).await;
    spinner.finish_and_clear();
    result
}

#[derive(Tabled)]
struct ExtensionRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "PRODUCT")]
    product: String,
    #[tabled(rename = "VERSION")]
    version: String,
    #[tabled(rename = "ZONE")]
    zone: String,
    #[tabled(rename = "SERVICES")]
    services: String,
}

impl From<&RegisteredExtension> for ExtensionRow {
    fn from(ext: &RegisteredExtension) -> Self {
        Self {
            id: ext.id.clone(),
            product: ext.product.clone(),
            version: ext.version.clone(),
            zone: ext.zone.clone(),
            services: ext
                .services
                .iter()
                .map(|s| s.id.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

async fn list_extensions(domain: &str) -> Result<()> {
    let client = RegistryClient::for_domain(domain)?;
    debug!("Listing extensions from {}", client.base_url());
    let extensions = client.list().await?;

    if extensions.is_empty() {
        output::info("No extensions registered");
        return Ok(());
    }

    let rows: Vec<ExtensionRow> = extensions.iter().map(ExtensionRow::from).collect();
    let mut table = Table::new(rows);
    table.with(Style::sharp());
    println!("{}", table);
    Ok(())
}
