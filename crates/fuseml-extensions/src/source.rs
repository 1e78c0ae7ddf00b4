//! Where extension files come from
//!
//! An extension repository is either a URL (scheme and host) or a local
//! directory. Each extension lives in `<repository>/<name>/`. Locations in a
//! description are resolved in this order:
//! 1. Absolute local path: used as is
//! 2. Absolute URL: downloaded
//! 3. Relative path with a URL repository: resolved against the extension URL and downloaded
//! 4. Relative path with a local repository: joined onto the extension directory

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use tracing::debug;
use url::Url;

/// A repository of extension descriptions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Repository {
    Remote(Url),
    Local(PathBuf),
}

impl Repository {
    /// Classify a repository location; a URL needs both scheme and host
    pub fn parse(location: &str) -> Self {
        match Url::parse(location) {
            Ok(url) if url.has_host() => Repository::Remote(url),
            _ => Repository::Local(PathBuf::from(location)),
        }
    }
}

/// Files of one extension within a repository
#[derive(Debug, Clone)]
pub struct ExtensionSource {
    name: String,
    repository: Repository,
    client: reqwest::Client,
}

impl ExtensionSource {
    pub fn new(name: impl Into<String>, repository: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self {
            name: name.into(),
            repository: Repository::parse(repository),
            client,
        })
    }

    pub fn repository(&self) -> &Repository {
        &self.repository
    }

    /// URL of the extension directory, for remote repositories
    fn extension_url(&self, base: &Url) -> Result<Url> {
        // the trailing slash keeps the last path segment when joining
        base.join(&format!("{}/", self.name))
            .with_context(|| format!("invalid extension URL for {}", self.name))
    }

    fn extension_dir(&self, base: &Path) -> PathBuf {
        base.join(&self.name)
    }

    /// Local copy of `file` from the extension directory, downloaded into `dir` if remote
    pub async fn fetch_description(&self, dir: &Path) -> Result<PathBuf> {
        match &self.repository {
            Repository::Remote(base) => {
                let url = self.extension_url(base)?.join(crate::DESCRIPTION_FILE)?;
                download(&self.client, &url, dir).await
            }
            Repository::Local(base) => {
                if !base.is_dir() {
                    bail!(
                        "Provided path to extension repository is neither URL nor a directory: {}",
                        base.display()
                    );
                }
                Ok(self.extension_dir(base).join(crate::DESCRIPTION_FILE))
            }
        }
    }

    /// Local path of a file referenced by the description, downloading into `dir` if needed
    pub async fn fetch_file(&self, location: &str, dir: &Path) -> Result<PathBuf> {
        if Path::new(location).is_absolute() {
            return Ok(PathBuf::from(location));
        }

        if let Ok(url) = Url::parse(location) {
            if url.has_host() {
                return download(&self.client, &url, dir).await;
            }
        }

        match &self.repository {
            Repository::Remote(base) => {
                let url = self
                    .extension_url(base)?
                    .join(location)
                    .with_context(|| format!("invalid location {}", location))?;
                download(&self.client, &url, dir).await
            }
            Repository::Local(base) => Ok(self.extension_dir(base).join(location)),
        }
    }

    /// Path or URL of a kustomize directory
    ///
    /// Directories relative to a remote repository are not supported: they
    /// resolve against the local layout.
    pub fn directory_path(&self, location: &str) -> String {
        if Path::new(location).is_absolute() {
            return location.to_string();
        }
        if let Ok(url) = Url::parse(location) {
            if url.has_host() {
                return location.to_string();
            }
        }
        let base = match &self.repository {
            Repository::Local(base) => base.clone(),
            Repository::Remote(url) => PathBuf::from(url.as_str()),
        };
        self.extension_dir(&base)
            .join(location)
            .to_string_lossy()
            .into_owned()
    }
}

/// Download `url` into `dir`, keeping the last path segment as the file name
pub async fn download(client: &reqwest::Client, url: &Url, dir: &Path) -> Result<PathBuf> {
    let name = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|name| !name.is_empty())
        .ok_or_else(|| anyhow!("cannot derive a file name from {}", url))?;
    let target = dir.join(name);

    debug!("Downloading {} to {}", url, target.display());
    let response = client
        .get(url.clone())
        .send()
        .await
        .context(format!("Failed to download from: {}", url))?;
    if !response.status().is_success() {
        bail!("Download of {} failed with status: {}", url, response.status());
    }
    let data = response
        .bytes()
        .await
        .context("Failed to read response bytes")?;

    tokio::fs::write(&target, &data)
        .await
        .with_context(|| format!("Failed to write {}", target.display()))?;
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_classification() {
        assert!(matches!(
            Repository::parse("https://raw.githubusercontent.com/fuseml/extensions/main/installer/"),
            Repository::Remote(_)
        ));
        assert_eq!(
            Repository::parse("/srv/extensions"),
            Repository::Local(PathBuf::from("/srv/extensions"))
        );
        // a scheme without host is not a remote repository
        assert!(matches!(
            Repository::parse("file:relative/dir"),
            Repository::Local(_)
        ));
    }

    #[test]
    fn test_directory_path_resolution() {
        let source = ExtensionSource::new("kfserving", "/srv/extensions").unwrap();

        assert_eq!(source.directory_path("/opt/kfs"), "/opt/kfs");
        assert_eq!(
            source.directory_path("github.com/kubeflow/kfserving/config/default"),
            "/srv/extensions/kfserving/github.com/kubeflow/kfserving/config/default"
        );
        assert_eq!(
            source.directory_path("https://github.com/kubeflow/kfserving//config/default"),
            "https://github.com/kubeflow/kfserving//config/default"
        );
        assert_eq!(source.directory_path("overlay"), "/srv/extensions/kfserving/overlay");
    }

    #[tokio::test]
    async fn test_fetch_file_local_repository() {
        let source = ExtensionSource::new("mlflow", "/srv/extensions").unwrap();
        let dir = tempfile::tempdir().unwrap();

        let path = source.fetch_file("values.yaml", dir.path()).await.unwrap();
        assert_eq!(path, PathBuf::from("/srv/extensions/mlflow/values.yaml"));

        let path = source.fetch_file("/etc/values.yaml", dir.path()).await.unwrap();
        assert_eq!(path, PathBuf::from("/etc/values.yaml"));
    }

    #[tokio::test]
    async fn test_description_requires_directory() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let source = ExtensionSource::new("mlflow", &missing.to_string_lossy()).unwrap();

        let err = source.fetch_description(dir.path()).await.unwrap_err();
        assert!(err.to_string().contains("neither URL nor a directory"));
    }
}
