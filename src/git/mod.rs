//! Read-only access to a git repository through the `git` CLI.

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

use crate::runtime::{CommandSpec, Runtime};

const FIELD_SEP: char = '\u{1f}';
const RECORD_SEP: char = '\u{1e}';

/// A git commit.
#[derive(Clone, Debug, PartialEq)]
pub struct Commit {
    pub message: String,
    pub hash: String,
    pub author: Option<String>,
    pub datetime: DateTime<Utc>,
}

impl Commit {
    /// First line of the message, trimmed.
    pub fn summary(&self) -> &str {
        self.message.lines().next().unwrap_or("").trim()
    }

    /// Seven-character abbreviated hash.
    pub fn short_hash(&self) -> &str {
        let hash = self.hash.trim();
        hash.get(..7).unwrap_or(hash)
    }
}

#[cfg_attr(test, mockall::automock)]
pub trait Git {
    /// All tag names.
    fn tag_names(&self) -> Result<Vec<String>>;

    /// Commit time of `rev`, in seconds since the epoch.
    fn commit_time(&self, rev: &str) -> Result<i64>;

    /// Commits in a revision range (see [`rev_range`]), newest first.
    fn log(&self, range: &str) -> Result<Vec<Commit>>;

    /// URL of the named remote.
    fn remote_url(&self, name: &str) -> Result<String>;
}

/// Commits reachable from `start`; with `end`, minus those reachable from `end`.
pub fn rev_range(start: &str, end: Option<&str>) -> String {
    match end {
        Some(end) => format!("{}..{}", end, start),
        None => start.to_string(),
    }
}

/// [`Git`] backed by the `git` executable.
pub struct GitCli<'a, R: Runtime> {
    runtime: &'a R,
    repo: PathBuf,
}

impl<'a, R: Runtime> GitCli<'a, R> {
    pub fn new(runtime: &'a R, repo: &Path) -> Self {
        Self {
            runtime,
            repo: repo.to_path_buf(),
        }
    }

    fn git<I, S>(&self, args: I) -> Result<String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let spec = CommandSpec::new("git").args(args).current_dir(&self.repo);
        let output = self.runtime.run(&spec)?;
        if !output.success {
            bail!(
                "git {} failed: {}",
                spec.args.join(" "),
                output.stderr.trim()
            );
        }
        Ok(output.stdout)
    }
}

impl<R: Runtime> Git for GitCli<'_, R> {
    #[tracing::instrument(skip(self))]
    fn tag_names(&self) -> Result<Vec<String>> {
        let stdout = self.git(["tag", "--list"])?;
        Ok(stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(String::from)
            .collect())
    }

    #[tracing::instrument(skip(self))]
    fn commit_time(&self, rev: &str) -> Result<i64> {
        let stdout = self.git(["log", "-1", "--format=%ct", rev])?;
        stdout
            .trim()
            .parse()
            .with_context(|| format!("Unexpected commit time for {}: {:?}", rev, stdout))
    }

    #[tracing::instrument(skip(self))]
    fn log(&self, range: &str) -> Result<Vec<Commit>> {
        let format = format!(
            "--format=%H{sep}%an{sep}%ct{sep}%B{rec}",
            sep = "%x1f",
            rec = "%x1e"
        );
        let stdout = self.git(["log".to_string(), format, range.to_string()])?;
        parse_log(&stdout)
    }

    #[tracing::instrument(skip(self))]
    fn remote_url(&self, name: &str) -> Result<String> {
        Ok(self.git(["remote", "get-url", name])?.trim().to_string())
    }
}

fn parse_log(stdout: &str) -> Result<Vec<Commit>> {
    stdout
        .split(RECORD_SEP)
        .map(str::trim_start)
        .filter(|record| !record.is_empty())
        .map(|record| {
            let mut fields = record.splitn(4, FIELD_SEP);
            let (Some(hash), Some(author), Some(time), Some(message)) =
                (fields.next(), fields.next(), fields.next(), fields.next())
            else {
                bail!("Malformed git log record: {:?}", record);
            };

            let seconds: i64 = time
                .trim()
                .parse()
                .with_context(|| format!("Malformed commit time {:?}", time))?;
            let datetime = DateTime::from_timestamp(seconds, 0)
                .with_context(|| format!("Commit time out of range: {}", seconds))?;

            Ok(Commit {
                message: message.trim_end().to_string(),
                hash: hash.trim().to_string(),
                author: Some(author.trim().to_string()).filter(|a| !a.is_empty()),
                datetime,
            })
        })
        .collect()
}
