//! Promote freshly published packages to the `latest` dist-tag.

use anyhow::Result;
use log::{debug, info, warn};
use std::path::{Path, PathBuf};

use super::{Registry, discover_packages};
use crate::runtime::{CommandSpec, Runtime};

const OTP_PROMPT: &str = "Enter OTP (leave blank if none):";
const OTP_ENV: &str = "NPM_CONFIG_OTP";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    /// Every package was on the registry. `failed` lists the specs whose
    /// `npm dist-tag add` did not succeed.
    Retagged {
        tagged: Vec<String>,
        failed: Vec<String>,
    },
    /// Nothing was retagged; these specs are not on the registry yet.
    Unpublished(Vec<String>),
}

impl PublishOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Retagged { failed, .. } if failed.is_empty())
    }
}

pub fn npm_program() -> &'static str {
    if cfg!(windows) { "npm.cmd" } else { "npm" }
}

/// Where `npm` runs: the repository, or on Windows the `nodejs` directory
/// listed in `PATH` when there is one.
pub fn dist_tag_dir<R: Runtime + ?Sized>(runtime: &R, repo: &Path, windows: bool) -> PathBuf {
    if windows {
        let node_dir = runtime
            .env_var("PATH")
            .ok()
            .and_then(|path| {
                path.split(';')
                    .find(|entry| entry.contains("nodejs"))
                    .map(PathBuf::from)
            });
        if let Some(dir) = node_dir {
            return dir;
        }
        warn!("No nodejs directory in PATH, running npm from {}", repo.display());
    }
    repo.to_path_buf()
}

/// Checks that every workspace package is on the registry, then moves
/// `latest` to each of them. Prompts once per package for a one-time password.
#[tracing::instrument(skip(runtime, registry))]
pub async fn check_publish<R, G>(runtime: &R, registry: &G, repo: &Path) -> Result<PublishOutcome>
where
    R: Runtime + ?Sized,
    G: Registry + ?Sized,
{
    let packages = discover_packages(runtime, repo)?;
    println!("Found {} packages:", packages.len());
    for package in &packages {
        println!("  {}", package.spec());
    }

    let mut unpublished = Vec::new();
    for package in &packages {
        if !registry.is_published(&package.name, &package.version).await? {
            println!("{} is not on the registry", package.spec());
            unpublished.push(package.spec());
        }
    }
    if !unpublished.is_empty() {
        println!("Not every package is published yet; leaving dist-tags untouched.");
        return Ok(PublishOutcome::Unpublished(unpublished));
    }

    println!("All packages are published.");
    let work_dir = dist_tag_dir(runtime, repo, cfg!(windows));
    let mut tagged = Vec::new();
    let mut failed = Vec::new();

    for package in &packages {
        let spec = package.spec();
        match registry.latest_version(&package.name).await {
            Ok(Some(current)) => println!("{}: latest is {}", package.name, current),
            Ok(None) => debug!("{} has no latest tag yet", package.name),
            Err(e) => debug!("Cannot read latest of {}: {:#}", package.name, e),
        }

        println!("About to run: npm dist-tag add {} latest", spec);
        let otp = runtime.prompt(OTP_PROMPT)?;

        let command = CommandSpec::new(npm_program())
            .args(["dist-tag", "add", spec.as_str(), "latest"])
            .current_dir(&work_dir)
            .env(OTP_ENV, otp);
        let output = runtime.run(&command)?;

        for stream in [&output.stderr, &output.stdout] {
            if !stream.trim().is_empty() {
                println!("{}", stream.trim_end());
            }
        }

        if output.success {
            info!("Tagged {} as latest", spec);
            tagged.push(spec);
        } else {
            warn!("npm dist-tag add {} latest failed", spec);
            failed.push(spec);
        }
    }

    Ok(PublishOutcome::Retagged { tagged, failed })
}
