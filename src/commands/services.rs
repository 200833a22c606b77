//! Builds the network-facing services from configuration.

use anyhow::Result;
use log::debug;

use crate::{config::ToolConfig, github::GitHub, http::HttpClient, npm::NpmRegistry};

/// GitHub API client, authenticated when `GITHUB_TOKEN` is set.
pub fn build_github(config: &ToolConfig) -> Result<GitHub> {
    let http = HttpClient::new(config.github_client()?);
    debug!("GitHub API at {}", config.github_api);
    Ok(GitHub::new(http, &config.github_api))
}

/// npm registry client.
pub fn build_registry(config: &ToolConfig) -> Result<NpmRegistry> {
    let http = HttpClient::new(config.registry_client()?);
    debug!("npm registry at {}", config.npm_registry);
    Ok(NpmRegistry::new(http, &config.npm_registry))
}
