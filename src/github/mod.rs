//! GitHub lookups used when rendering changelogs.

mod repo;

pub use repo::RepoSlug;

use anyhow::Result;
use async_trait::async_trait;
use log::debug;
use serde::Deserialize;

use crate::http::HttpClient;

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct RepoInfo {
    pub html_url: String,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct User {
    pub login: String,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct PullRequest {
    pub user: User,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GitHubApi: Send + Sync {
    /// Browser URL of the repository, e.g. `https://github.com/owner/repo`.
    async fn repo_html_url(&self, slug: &RepoSlug) -> Result<String>;

    /// Login of the user who opened pull request `number`.
    async fn pull_author(&self, slug: &RepoSlug, number: u64) -> Result<String>;
}

pub struct GitHub {
    http: HttpClient,
    api_url: String,
}

impl GitHub {
    pub fn new(http: HttpClient, api_url: &str) -> Self {
        Self {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl GitHubApi for GitHub {
    #[tracing::instrument(skip(self))]
    async fn repo_html_url(&self, slug: &RepoSlug) -> Result<String> {
        let url = format!("{}/repos/{}", self.api_url, slug);
        debug!("Fetching repo info from {}...", url);
        let info: RepoInfo = self.http.get_json(&url).await?;
        Ok(info.html_url)
    }

    #[tracing::instrument(skip(self))]
    async fn pull_author(&self, slug: &RepoSlug, number: u64) -> Result<String> {
        let url = format!("{}/repos/{}/pulls/{}", self.api_url, slug, number);
        debug!("Fetching pull request from {}...", url);
        let pull: PullRequest = self.http.get_json(&url).await?;
        Ok(pull.user.login)
    }
}
