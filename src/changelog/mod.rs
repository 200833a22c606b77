//! Markdown changelogs for the pro-components packages, built from release
//! tags and `fix(<package>)` / `feat(<package>)` commits.

mod markdown;
mod tags;

pub use tags::{PackageTag, TagRange, all_ranges, latest_range, package_tags};

use anyhow::{Context, Result};
use chrono::DateTime;
use log::{debug, info, warn};
use std::collections::{HashMap, HashSet};

use crate::git::{Commit, Git};
use crate::github::{GitHubApi, RepoSlug};

/// Short names of the packages that get a changelog.
pub const DEFAULT_PACKAGES: [&str; 8] = [
    "utils",
    "layout",
    "form",
    "list",
    "table",
    "field",
    "card",
    "descriptions",
];

/// Prefix turning a short name into the npm package name.
pub const PACKAGE_PREFIX: &str = "@ant-design/pro-";

const ORIGIN: &str = "origin";
/// Login used when neither the PR author nor the commit author is known.
const UNKNOWN_LOGIN: &str = "ghost";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageChangelog {
    /// Short name, e.g. `form`.
    pub package: String,
    pub content: String,
}

pub struct Changelogs<'a, G: Git, H: GitHubApi> {
    git: &'a G,
    github: &'a H,
    slug: RepoSlug,
    html_url: String,
    packages: Vec<String>,
    /// Commit author name -> GitHub login.
    logins: HashMap<String, String>,
}

impl<'a, G: Git, H: GitHubApi> Changelogs<'a, G, H> {
    /// Resolves the GitHub repository behind the `origin` remote.
    #[tracing::instrument(skip(git, github))]
    pub async fn new(git: &'a G, github: &'a H, packages: &[&str]) -> Result<Self> {
        let remote = git.remote_url(ORIGIN)?;
        let slug: RepoSlug = remote.parse()?;
        debug!("origin {} -> {}", remote, slug);

        let html_url = github
            .repo_html_url(&slug)
            .await
            .with_context(|| format!("Failed to fetch repository info for {}", slug))?;

        Ok(Self {
            git,
            github,
            slug,
            html_url: html_url.trim_end_matches('/').to_string(),
            packages: packages.iter().map(|p| p.to_string()).collect(),
            logins: HashMap::new(),
        })
    }

    /// The newest release of every package. Packages without tags or without
    /// matching commits are left out.
    #[tracing::instrument(skip(self))]
    pub async fn latest(&mut self) -> Result<Vec<PackageChangelog>> {
        let all_tags = self.git.tag_names()?;
        let mut changelogs = Vec::new();

        for package in self.packages.clone() {
            let sorted = package_tags(&all_tags, &full_name(&package));
            let Some(range) = latest_range(&sorted) else {
                warn!("No release tags for {}, skipping", full_name(&package));
                continue;
            };

            let entries = self.entries(&range, &package).await?;
            if entries.is_empty() {
                debug!("No changes for {} in {}", package, range.tag.name);
                continue;
            }

            info!("Generated changelog for {}", package);
            changelogs.push(PackageChangelog {
                content: self.section(&range, &entries)?,
                package,
            });
        }

        Ok(changelogs)
    }

    /// Every release of every package, newest first.
    #[tracing::instrument(skip(self))]
    pub async fn all(&mut self) -> Result<Vec<PackageChangelog>> {
        let all_tags = self.git.tag_names()?;
        let mut changelogs = Vec::new();

        for package in self.packages.clone() {
            let sorted = package_tags(&all_tags, &full_name(&package));
            if sorted.is_empty() {
                warn!("No release tags for {}, skipping", full_name(&package));
                continue;
            }

            let mut sections = Vec::new();
            for range in all_ranges(&sorted) {
                let entries = self.entries(&range, &package).await?;
                sections.push(self.section(&range, &entries)?);
            }

            info!("Generated {} sections for {}", sections.len(), package);
            changelogs.push(PackageChangelog {
                package,
                content: sections.join("\n\n"),
            });
        }

        Ok(changelogs)
    }

    /// Rendered lines for the commits of `range` scoped to `package`.
    async fn entries(&mut self, range: &TagRange, package: &str) -> Result<Vec<String>> {
        let commits = self.git.log(&range.rev_range())?;
        let mut seen = HashSet::new();
        let mut entries = Vec::new();

        for commit in commits {
            if change_scope_matches(&commit, package) && seen.insert(commit.hash.clone()) {
                entries.push(self.render(&commit).await);
            }
        }
        Ok(entries)
    }

    async fn render(&mut self, commit: &Commit) -> String {
        let summary = commit.summary();
        match markdown::pull_number(summary) {
            Some(number) => {
                let login = self.login(commit, number).await;
                markdown::pull_line(summary, &self.html_url, number, &login)
            }
            None => markdown::commit_line(summary, &self.html_url, commit.short_hash()),
        }
    }

    /// GitHub login for the author of `commit`, looked up once per author
    /// through the pull request that merged it.
    async fn login(&mut self, commit: &Commit, number: u64) -> String {
        let author = commit.author.clone().unwrap_or_default();
        if let Some(login) = self.logins.get(&author) {
            return login.clone();
        }

        let login = match self.github.pull_author(&self.slug, number).await {
            Ok(login) => login,
            Err(e) => {
                warn!("Cannot resolve author of #{}: {:#}", number, e);
                if author.is_empty() {
                    UNKNOWN_LOGIN.to_string()
                } else {
                    author.clone()
                }
            }
        };
        self.logins.insert(author, login.clone());
        login
    }

    fn section(&self, range: &TagRange, entries: &[String]) -> Result<String> {
        let seconds = self.git.commit_time(&range.tag.name)?;
        let date = DateTime::from_timestamp(seconds, 0)
            .with_context(|| format!("Invalid commit time for {}", range.tag.name))?
            .format("%Y-%m-%d")
            .to_string();
        Ok(markdown::section(&range.tag.name, &date, entries))
    }
}

pub fn full_name(package: &str) -> String {
    format!("{}{}", PACKAGE_PREFIX, package)
}

fn change_scope_matches(commit: &Commit, package: &str) -> bool {
    markdown::change_scope(commit.summary()).is_some_and(|scope| scope == package)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::MockGit;
    use crate::github::MockGitHubApi;
    use mockall::predicate::*;

    const HTML_URL: &str = "https://github.com/ant-design/pro-components";
    // 2024-01-02T03:04:05Z
    const TAG_TIME: i64 = 1_704_164_645;

    fn commit(hash: &str, author: &str, message: &str) -> Commit {
        Commit {
            message: message.to_string(),
            hash: hash.to_string(),
            author: Some(author.to_string()),
            datetime: DateTime::from_timestamp(TAG_TIME, 0).unwrap(),
        }
    }

    fn git_with_tags(tags: &[&str]) -> MockGit {
        let tags: Vec<String> = tags.iter().map(|s| s.to_string()).collect();
        let mut git = MockGit::new();
        git.expect_remote_url()
            .with(eq("origin"))
            .returning(|_| Ok("git@github.com:ant-design/pro-components.git".into()));
        git.expect_tag_names().returning(move || Ok(tags.clone()));
        git.expect_commit_time().returning(|_| Ok(TAG_TIME));
        git
    }

    fn github() -> MockGitHubApi {
        let mut github = MockGitHubApi::new();
        github
            .expect_repo_html_url()
            .withf(|slug| slug.to_string() == "ant-design/pro-components")
            .returning(|_| Ok(HTML_URL.to_string()));
        github
    }

    #[tokio::test]
    async fn test_latest_renders_scoped_commits() {
        let mut git = git_with_tags(&[
            "@ant-design/pro-form@2.0.0",
            "@ant-design/pro-form@2.1.0",
        ]);
        git.expect_log()
            .with(eq("@ant-design/pro-form@2.0.0..@ant-design/pro-form@2.1.0"))
            .returning(|_| {
                Ok(vec![
                    commit("aaaaaaa111", "Alice", "feat(form): add dependencies (#100)\n\nbody"),
                    commit("bbbbbbb222", "Bob", "fix(Form): reset fields"),
                    commit("ccccccc333", "Bob", "fix(table): unrelated"),
                    commit("ddddddd444", "Carol", "chore: release"),
                    commit("bbbbbbb222", "Bob", "fix(Form): reset fields"),
                ])
            });

        let mut github = github();
        github
            .expect_pull_author()
            .with(always(), eq(100))
            .times(1)
            .returning(|_, _| Ok("alice-gh".into()));

        let mut changelogs = Changelogs::new(&git, &github, &["form"]).await.unwrap();
        let result = changelogs.latest().await.unwrap();

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].package, "form");
        assert_eq!(
            result[0].content,
            format!(
                "## @ant-design/pro-form@2.1.0\n\n`2024-01-02`\n\n\
                 * feat(form): add dependencies (#100). [#100]({HTML_URL}/pull/100) \
                 [@alice-gh](https://github.com/alice-gh)\n\
                 * fix(Form): reset fields. [bbbbbbb]({HTML_URL}/commit/bbbbbbb)\n"
            )
        );
    }

    #[tokio::test]
    async fn test_latest_skips_packages_without_tags_or_changes() {
        let mut git = git_with_tags(&["@ant-design/pro-form@2.0.0"]);
        git.expect_log()
            .with(eq("@ant-design/pro-form@2.0.0"))
            .returning(|_| Ok(vec![commit("aaaaaaa111", "Alice", "docs: readme")]));
        let github = github();

        let mut changelogs = Changelogs::new(&git, &github, &["form", "layout"])
            .await
            .unwrap();
        assert!(changelogs.latest().await.unwrap().is_empty());
    }

    #[test_log::test(tokio::test)]
    async fn test_author_login_is_cached_and_falls_back() {
        let mut git = git_with_tags(&["@ant-design/pro-card@1.0.0"]);
        git.expect_log().returning(|_| {
            Ok(vec![
                commit("aaaaaaa111", "Alice", "feat(card): one (#1)"),
                commit("bbbbbbb222", "Alice", "feat(card): two (#2)"),
                commit("ccccccc333", "Bob", "fix(card): three (#3)"),
            ])
        });

        let mut github = github();
        github
            .expect_pull_author()
            .with(always(), eq(1))
            .times(1)
            .returning(|_, _| Ok("alice-gh".into()));
        github
            .expect_pull_author()
            .with(always(), eq(3))
            .times(1)
            .returning(|_, _| Err(anyhow::anyhow!("rate limited")));

        let mut changelogs = Changelogs::new(&git, &github, &["card"]).await.unwrap();
        let content = &changelogs.latest().await.unwrap()[0].content;

        assert!(content.contains("feat(card): two (#2). [#2]"));
        assert_eq!(content.matches("[@alice-gh]").count(), 2);
        assert!(content.contains("[@Bob](https://github.com/Bob)"));
    }

    #[tokio::test]
    async fn test_all_sections_newest_first() {
        let mut git = git_with_tags(&[
            "@ant-design/pro-list@1.0.0",
            "@ant-design/pro-list@1.1.0",
            "@ant-design/pro-list@1.2.0",
        ]);
        git.expect_log()
            .with(eq("@ant-design/pro-list@1.1.0..@ant-design/pro-list@1.2.0"))
            .returning(|_| Ok(vec![commit("aaaaaaa111", "Alice", "fix(list): newer")]));
        git.expect_log()
            .with(eq("@ant-design/pro-list@1.0.0..@ant-design/pro-list@1.1.0"))
            .returning(|_| Ok(vec![]));

        let github = github();
        let mut changelogs = Changelogs::new(&git, &github, &["list"]).await.unwrap();
        let result = changelogs.all().await.unwrap();

        assert_eq!(result.len(), 1);
        assert_eq!(
            result[0].content,
            format!(
                "## @ant-design/pro-list@1.2.0\n\n`2024-01-02`\n\n\
                 * fix(list): newer. [aaaaaaa]({HTML_URL}/commit/aaaaaaa)\n\
                 \n\n\
                 ## @ant-design/pro-list@1.1.0\n\n`2024-01-02`\n\n\
                 * 相关依赖更新\n"
            )
        );
    }

    #[tokio::test]
    async fn test_new_fails_on_unparsable_origin() {
        let mut git = MockGit::new();
        git.expect_remote_url()
            .returning(|_| Ok("local-only".into()));
        let github = MockGitHubApi::new();

        let result = Changelogs::new(&git, &github, &DEFAULT_PACKAGES).await;
        assert!(result.is_err());
    }

    #[test]
    fn test_full_name() {
        assert_eq!(full_name("descriptions"), "@ant-design/pro-descriptions");
    }
}
