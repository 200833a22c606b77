//! Locating the platform package that ships a binding.
//!
//! Lookup follows the node_modules convention: starting at a directory and
//! walking up through every ancestor, the first
//! `node_modules/<package>/package.json` found wins. Its `main` field names
//! the artifact inside the package.

use anyhow::{Context, Result, bail};
use log::debug;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::runtime::Runtime;

#[derive(Debug, Deserialize)]
struct PackageManifest {
    main: Option<String>,
}

/// Directory `package` would be installed at under `node_modules`.
fn package_dir(node_modules: &Path, package: &str) -> PathBuf {
    package
        .split('/')
        .fold(node_modules.to_path_buf(), |dir, part| dir.join(part))
}

/// Resolve the artifact of `package`, searching from `start_dir` upwards.
///
/// `default_main` is used when the manifest has no `main`.
#[tracing::instrument(skip(runtime))]
pub fn resolve_package<R: Runtime + ?Sized>(
    runtime: &R,
    start_dir: &Path,
    package: &str,
    default_main: &str,
) -> Result<PathBuf> {
    for dir in start_dir.ancestors() {
        if dir.file_name().is_some_and(|name| name == "node_modules") {
            continue;
        }

        let root = package_dir(&dir.join("node_modules"), package);
        let manifest_path = root.join("package.json");
        if !runtime.is_file(&manifest_path) {
            continue;
        }

        debug!("Found {} at {}", package, root.display());

        let content = runtime.read_to_string(&manifest_path)?;
        let manifest: PackageManifest = serde_json::from_str(&content)
            .with_context(|| format!("Invalid manifest {}", manifest_path.display()))?;

        let main = manifest.main.as_deref().unwrap_or(default_main);
        return Ok(root.join(main));
    }

    bail!("Cannot find module '{}'", package)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::RealRuntime;
    use tempfile::tempdir;

    const PACKAGE: &str = "@ant-design/pro-tools-linux-x64-gnu";
    const MAIN: &str = "pro-tools.linux-x64-gnu.node";

    fn install(root: &Path, manifest: &str) -> PathBuf {
        let dir = root
            .join("node_modules")
            .join("@ant-design")
            .join("pro-tools-linux-x64-gnu");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("package.json"), manifest).unwrap();
        dir
    }

    #[test]
    fn test_resolves_from_start_dir() {
        let tmp = tempdir().unwrap();
        let dir = install(tmp.path(), r#"{"name": "x", "main": "binding.node"}"#);

        let path = resolve_package(&RealRuntime, tmp.path(), PACKAGE, MAIN).unwrap();
        assert_eq!(path, dir.join("binding.node"));
    }

    #[test]
    fn test_walks_up_to_ancestor() {
        let tmp = tempdir().unwrap();
        let dir = install(tmp.path(), r#"{"name": "x"}"#);
        let nested = tmp.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();

        let path = resolve_package(&RealRuntime, &nested, PACKAGE, MAIN).unwrap();
        assert_eq!(path, dir.join(MAIN));
    }

    #[test]
    fn test_nearest_install_wins() {
        let tmp = tempdir().unwrap();
        install(tmp.path(), r#"{"main": "outer.node"}"#);
        let inner_root = tmp.path().join("inner");
        let inner = install(&inner_root, r#"{"main": "inner.node"}"#);

        let path = resolve_package(&RealRuntime, &inner_root, PACKAGE, MAIN).unwrap();
        assert_eq!(path, inner.join("inner.node"));
    }

    #[test]
    fn test_missing_package() {
        let tmp = tempdir().unwrap();
        let err = resolve_package(&RealRuntime, tmp.path(), PACKAGE, MAIN).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Cannot find module '@ant-design/pro-tools-linux-x64-gnu'"
        );
    }

    #[test]
    fn test_invalid_manifest() {
        let tmp = tempdir().unwrap();
        install(tmp.path(), "not json");
        let err = resolve_package(&RealRuntime, tmp.path(), PACKAGE, MAIN).unwrap_err();
        assert!(err.to_string().contains("Invalid manifest"));
    }
}
