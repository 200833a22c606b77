//! Workspace packages and their state on the npm registry.

mod publish;

pub use publish::{PublishOutcome, check_publish, dist_tag_dir, npm_program};

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{debug, warn};
use serde::Deserialize;
use std::path::Path;

use crate::http::HttpClient;
use crate::runtime::Runtime;

/// The part of a `package.json` (or registry manifest) we care about.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PackageManifest {
    pub name: String,
    pub version: String,
}

impl PackageManifest {
    /// `name@version`.
    pub fn spec(&self) -> String {
        format!("{}@{}", self.name, self.version)
    }
}

/// Every `packages/<dir>/package.json` of the workspace at `repo`, sorted by
/// directory name. Directories without a manifest are skipped.
#[tracing::instrument(skip(runtime))]
pub fn discover_packages<R: Runtime + ?Sized>(
    runtime: &R,
    repo: &Path,
) -> Result<Vec<PackageManifest>> {
    let packages_dir = repo.join("packages");
    let mut dirs: Vec<_> = runtime
        .read_dir(&packages_dir)
        .with_context(|| format!("Cannot list {}", packages_dir.display()))?
        .into_iter()
        .filter(|path| runtime.is_dir(path))
        .collect();
    dirs.sort();

    let mut manifests = Vec::new();
    for dir in dirs {
        let manifest_path = dir.join("package.json");
        if !runtime.exists(&manifest_path) {
            debug!("{} has no package.json, skipping", dir.display());
            continue;
        }
        let content = runtime.read_to_string(&manifest_path)?;
        let manifest: PackageManifest = serde_json::from_str(&content)
            .with_context(|| format!("Invalid {}", manifest_path.display()))?;
        manifests.push(manifest);
    }
    Ok(manifests)
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Registry: Send + Sync {
    /// Whether `name@version` can be fetched from the registry.
    async fn is_published(&self, name: &str, version: &str) -> Result<bool>;

    /// Version currently carrying the `latest` dist-tag.
    async fn latest_version(&self, name: &str) -> Result<Option<String>>;
}

pub struct NpmRegistry {
    http: HttpClient,
    registry_url: String,
}

impl NpmRegistry {
    pub fn new(http: HttpClient, registry_url: &str) -> Self {
        Self {
            http,
            registry_url: registry_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl Registry for NpmRegistry {
    #[tracing::instrument(skip(self))]
    async fn is_published(&self, name: &str, version: &str) -> Result<bool> {
        let url = format!("{}/{}/{}", self.registry_url, name, version);
        match self.http.get_json_if_exists::<PackageManifest>(&url).await {
            Ok(found) => Ok(found.is_some()),
            Err(e) => {
                warn!("Cannot confirm {}@{} on the registry: {:#}", name, version, e);
                Ok(false)
            }
        }
    }

    #[tracing::instrument(skip(self))]
    async fn latest_version(&self, name: &str) -> Result<Option<String>> {
        let url = format!("{}/{}/latest", self.registry_url, name);
        let manifest = self.http.get_json_if_exists::<PackageManifest>(&url).await?;
        Ok(manifest.map(|m| m.version))
    }
}
