use regex::Regex;
use std::sync::LazyLock;

/// `fix(scope)` / `feat(scope)` at the start of the line; group 1 is the scope.
static SCOPED_CHANGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:fix|feat)\(([0-9a-zA-Z_]*)\)").unwrap());

/// `(#1234)` as appended by GitHub squash merges.
static PULL_REF: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\(#([0-9]+)\)").unwrap());

const NO_ENTRIES: &str = "相关依赖更新";

/// Scope of a `fix(..)`/`feat(..)` summary line, lowercased.
pub fn change_scope(summary: &str) -> Option<String> {
    SCOPED_CHANGE
        .captures(summary)
        .map(|caps| caps[1].to_lowercase())
}

pub fn pull_number(summary: &str) -> Option<u64> {
    PULL_REF
        .captures(summary)
        .and_then(|caps| caps[1].parse().ok())
}

pub fn pull_line(summary: &str, html_url: &str, number: u64, login: &str) -> String {
    format!(
        "{summary}. [#{number}]({html_url}/pull/{number}) [@{login}](https://github.com/{login})"
    )
}

pub fn commit_line(summary: &str, html_url: &str, short_hash: &str) -> String {
    format!("{summary}. [{short_hash}]({html_url}/commit/{short_hash})")
}

/// A `## <tag>` section. An empty `entries` renders a placeholder bullet.
pub fn section(tag: &str, date: &str, entries: &[String]) -> String {
    let mut out = format!("## {tag}\n\n`{date}`\n\n");
    if entries.is_empty() {
        out.push_str(&format!("* {NO_ENTRIES}\n"));
    }
    for entry in entries {
        out.push_str(&format!("* {entry}\n"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_scope() {
        assert_eq!(change_scope("feat(Layout): add footer").as_deref(), Some("layout"));
        assert_eq!(change_scope("fix(form): reset (#12)").as_deref(), Some("form"));
        assert_eq!(change_scope("chore(form): bump"), None);
        assert_eq!(change_scope("docs: fix typo"), None);
        // The keyword must be spelled out.
        assert_eq!(change_scope("x(form): nope"), None);
        assert_eq!(change_scope("hotfix(form): x"), None);
        assert_eq!(change_scope("prefix(form): y"), None);
        assert_eq!(change_scope("revert fix(form): y"), None);
    }

    #[test]
    fn test_pull_number() {
        assert_eq!(pull_number("fix(table): sort (#4242)"), Some(4242));
        assert_eq!(pull_number("fix(table): sort #4242"), None);
        assert_eq!(pull_number("fix(table): sort (#)"), None);
    }

    #[test]
    fn test_pull_line() {
        assert_eq!(
            pull_line(
                "feat(layout): mix support headerContent render (#42)",
                "https://github.com/ant-design/pro-components",
                42,
                "chenshuai2144"
            ),
            "feat(layout): mix support headerContent render (#42). \
             [#42](https://github.com/ant-design/pro-components/pull/42) \
             [@chenshuai2144](https://github.com/chenshuai2144)"
        );
    }

    #[test]
    fn test_commit_line() {
        assert_eq!(
            commit_line("fix(form): reset", "https://github.com/o/r", "0123456"),
            "fix(form): reset. [0123456](https://github.com/o/r/commit/0123456)"
        );
    }

    #[test]
    fn test_section() {
        let entries = vec!["one".to_string(), "two".to_string()];
        assert_eq!(
            section("a@1.0.0", "2024-01-02", &entries),
            "## a@1.0.0\n\n`2024-01-02`\n\n* one\n* two\n"
        );
        assert_eq!(
            section("a@1.0.0", "2024-01-02", &[]),
            "## a@1.0.0\n\n`2024-01-02`\n\n* 相关依赖更新\n"
        );
    }
}
