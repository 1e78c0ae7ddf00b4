//! Embedded manifests and templates
//!
//! Static manifests are applied as-is. Files under `templates/` are Tera
//! templates rendered with per-install values (domain, credentials, hosts).

use anyhow::{anyhow, Context, Result};
use fuseml_core::WORKLOADS_NAMESPACE;
use rust_embed::RustEmbed;
use tera::Tera;

#[derive(RustEmbed)]
#[folder = "$CARGO_MANIFEST_DIR/assets/"]
struct Assets;

const TEMPLATE_PREFIX: &str = "templates/";

/// Text of a static embedded manifest
pub fn manifest(path: &str) -> Result<String> {
    let file = Assets::get(path).ok_or_else(|| anyhow!("embedded file {} not found", path))?;
    let content = std::str::from_utf8(file.data.as_ref())
        .context(format!("Invalid UTF-8 in embedded file: {}", path))?;
    Ok(content.to_string())
}

/// Static manifest moved from the default workloads namespace to `namespace`
pub fn workloads_manifest(path: &str, namespace: &str) -> Result<String> {
    Ok(manifest(path)?.replace(
        &format!("namespace: {}", WORKLOADS_NAMESPACE),
        &format!("namespace: {}", namespace),
    ))
}

/// Renders the embedded Tera templates
pub struct Templates {
    tera: Tera,
}

impl Templates {
    /// Load every file under `templates/`, keyed by its name without the prefix
    pub fn new() -> Result<Self> {
        let mut tera = Tera::default();

        for file in Assets::iter() {
            let Some(name) = file.strip_prefix(TEMPLATE_PREFIX) else {
                continue;
            };
            let content = manifest(&file)?;
            tera.add_raw_template(name, &content)
                .context(format!("Failed to add template: {}", file))?;
        }

        Ok(Self { tera })
    }

    pub fn render(&self, template_name: &str, context: &tera::Context) -> Result<String> {
        self.tera
            .render(template_name, context)
            .context(format!("Failed to render template: {}", template_name))
    }
}
