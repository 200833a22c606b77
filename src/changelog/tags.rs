//! Release tags of the form `<package>@<semver>`.

use semver::Version;

use crate::git::rev_range;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageTag {
    pub name: String,
    pub package: String,
    pub version: Version,
}

impl PackageTag {
    /// Parses `@ant-design/pro-form@2.1.0`. The package part may itself start
    /// with `@`, so the split happens at the last one.
    pub fn parse(tag: &str) -> Option<Self> {
        let (package, version) = tag.rsplit_once('@')?;
        if package.is_empty() {
            return None;
        }
        let version = Version::parse(version).ok()?;
        Some(Self {
            name: tag.to_string(),
            package: package.to_string(),
            version,
        })
    }
}

/// Tags of `package`, oldest version first. Tags of other packages sharing a
/// prefix (`pro-form` vs `pro-form-item`) and non-semver tags are ignored.
pub fn package_tags(tags: &[String], package: &str) -> Vec<PackageTag> {
    let mut matched: Vec<PackageTag> = tags
        .iter()
        .filter_map(|tag| PackageTag::parse(tag))
        .filter(|tag| tag.package == package)
        .collect();
    matched.sort_by(|a, b| a.version.cmp(&b.version));
    matched
}

/// Commits released by `tag`: everything after `since`, or its whole history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagRange {
    pub tag: PackageTag,
    pub since: Option<PackageTag>,
}

impl TagRange {
    pub fn rev_range(&self) -> String {
        rev_range(&self.tag.name, self.since.as_ref().map(|t| t.name.as_str()))
    }
}

/// The newest release. `None` when there are no tags.
pub fn latest_range(sorted: &[PackageTag]) -> Option<TagRange> {
    let (tag, older) = sorted.split_last()?;
    Some(TagRange {
        tag: tag.clone(),
        since: older.last().cloned(),
    })
}

/// One range per consecutive pair, newest first. The first tag closes no range.
pub fn all_ranges(sorted: &[PackageTag]) -> Vec<TagRange> {
    sorted
        .windows(2)
        .rev()
        .map(|pair| TagRange {
            tag: pair[1].clone(),
            since: Some(pair[0].clone()),
        })
        .collect()
}
