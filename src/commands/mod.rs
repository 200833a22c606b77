//! The four operations behind the native exports, on plain Rust types.

use anyhow::{Context, Result};
use log::{debug, info};
use std::path::{Path, PathBuf};

use crate::{
    changelog::{Changelogs, DEFAULT_PACKAGES},
    config::ToolConfig,
    git::{Git, GitCli},
    github::GitHubApi,
    npm::{self, PublishOutcome},
    routes::{self, RouteIssue},
    runtime::Runtime,
};

mod services;

pub use services::{build_github, build_registry};

/// Directory under the repository that receives `components.md`.
pub const DEFAULT_CHANGELOG_DIR: &str = ".changelogs";
pub const CHANGELOG_FILE: &str = "components.md";

/// Writes the changelog of the newest release of every package.
#[tracing::instrument(skip(runtime, config))]
pub async fn gen_changelogs<R: Runtime>(
    runtime: &R,
    repo: &Path,
    changelog_path: Option<&Path>,
    config: &ToolConfig,
) -> Result<PathBuf> {
    let git = GitCli::new(runtime, repo);
    let github = build_github(config)?;
    write_changelogs(runtime, repo, changelog_path, &git, &github, false).await
}

/// Writes the changelog of every release of every package.
#[tracing::instrument(skip(runtime, config))]
pub async fn gen_all_changelogs<R: Runtime>(
    runtime: &R,
    repo: &Path,
    changelog_path: Option<&Path>,
    config: &ToolConfig,
) -> Result<PathBuf> {
    let git = GitCli::new(runtime, repo);
    let github = build_github(config)?;
    write_changelogs(runtime, repo, changelog_path, &git, &github, true).await
}

/// Recreates the changelog directory and writes `components.md` into it.
/// Returns the path of the written file.
pub async fn write_changelogs<R, G, H>(
    runtime: &R,
    repo: &Path,
    changelog_path: Option<&Path>,
    git: &G,
    github: &H,
    all: bool,
) -> Result<PathBuf>
where
    R: Runtime + ?Sized,
    G: Git,
    H: GitHubApi,
{
    let dir = repo.join(changelog_path.unwrap_or(Path::new(DEFAULT_CHANGELOG_DIR)));
    if runtime.exists(&dir) {
        debug!("Removing {}", dir.display());
        runtime
            .remove_dir_all(&dir)
            .with_context(|| format!("Failed to remove {}", dir.display()))?;
    }
    runtime
        .create_dir_all(&dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;

    let mut changelogs = Changelogs::new(git, github, &DEFAULT_PACKAGES).await?;
    let packages = if all {
        changelogs.all().await?
    } else {
        changelogs.latest().await?
    };

    let mut content = String::new();
    for package in &packages {
        println!("-> Generating changelog for {}", package.package);
        content.push_str(&package.content);
    }

    let file = dir.join(CHANGELOG_FILE);
    runtime.write(&file, content.as_bytes())?;
    println!("Changelog written to {}", file.display());
    Ok(file)
}

/// Retags the workspace packages as `latest` once all of them are published.
#[tracing::instrument(skip(runtime, config))]
pub async fn check_publish<R: Runtime>(
    runtime: &R,
    repo: &Path,
    config: &ToolConfig,
) -> Result<PublishOutcome> {
    let registry = build_registry(config)?;
    let outcome = npm::check_publish(runtime, &registry, repo).await?;
    info!("Publish check finished: {:?}", outcome);
    Ok(outcome)
}

/// Checks the route table of the project at `repo`.
#[tracing::instrument(skip(runtime))]
pub fn check_routers<R: Runtime>(
    runtime: &R,
    repo: &Path,
    routes_file: Option<&Path>,
) -> Result<Vec<RouteIssue>> {
    routes::check_routers(runtime, repo, routes_file)
}
