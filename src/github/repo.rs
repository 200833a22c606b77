use anyhow::{Result, anyhow};
use std::fmt;
use std::str::FromStr;

/// `owner/repo` of a GitHub repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoSlug {
    pub owner: String,
    pub repo: String,
}

impl fmt::Display for RepoSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

impl FromStr for RepoSlug {
    type Err = anyhow::Error;

    /// Accepts `owner/repo` as well as remote URLs:
    /// `git@github.com:owner/repo.git`, `https://github.com/owner/repo(.git)`
    /// and `ssh://git@github.com/owner/repo.git`.
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim().trim_end_matches('/');
        let trimmed = trimmed.strip_suffix(".git").unwrap_or(trimmed);

        let mut parts = trimmed.rsplit(['/', ':']);
        let repo = parts.next().filter(|p| !p.is_empty());
        let owner = parts.next().filter(|p| !p.is_empty());

        match (owner, repo) {
            // A host (`github.com`, `git@github.com`) is never an owner.
            (Some(owner), Some(repo)) if !owner.contains(['@', '.']) => Ok(Self {
                owner: owner.to_string(),
                repo: repo.to_string(),
            }),
            _ => Err(anyhow!("Cannot find owner/repo in {:?}", s)),
        }
    }
}
