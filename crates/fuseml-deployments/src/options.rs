//! Installation options declared by the platform commands

use fuseml_core::options::{InstallationOption, InstallationOptions};
use fuseml_core::Result;

pub const SYSTEM_DOMAIN: &str = "system_domain";
pub const EXTENSIONS: &str = "extensions";
pub const EXTENSION_REPOSITORY: &str = "extension_repository";

fn system_domain(description: &str) -> InstallationOption {
    InstallationOption::new(SYSTEM_DOMAIN, description, "")
}

fn extension_repository(default_repository: &str) -> InstallationOption {
    InstallationOption::new(
        EXTENSION_REPOSITORY,
        "Path to extensions repository. Could be local directory or URL",
        default_repository,
    )
}

/// Options of `fuseml install`
pub fn install_options(default_repository: &str) -> Result<InstallationOptions> {
    InstallationOptions::new(vec![
        system_domain(
            "The domain you are planning to use for FuseML. Should be pointing to the load \
             balancer public IP (Leave empty to use a nip.io domain).",
        ),
        InstallationOption::new(
            EXTENSIONS,
            "ML extensions to install together with FuseML",
            Vec::<String>::new(),
        ),
        extension_repository(default_repository),
    ])
}

/// Options of `fuseml uninstall`
pub fn uninstall_options(default_repository: &str) -> Result<InstallationOptions> {
    InstallationOptions::new(vec![
        system_domain("The domain used by FuseML."),
        InstallationOption::new(
            EXTENSIONS,
            "ML extensions to uninstall when uninstalling FuseML",
            Vec::<String>::new(),
        ),
        extension_repository(default_repository),
    ])
}

/// Options of `fuseml extensions`
pub fn extensions_options(default_repository: &str) -> Result<InstallationOptions> {
    InstallationOptions::new(vec![
        system_domain("The domain used by FuseML."),
        extension_repository(default_repository),
    ])
}

/// Options of `fuseml upgrade`
pub fn upgrade_options() -> Result<InstallationOptions> {
    InstallationOptions::new(vec![system_domain(
        "The domain used by FuseML. Should be pointing to the load balancer public IP.",
    )])
}
