//! File system operations (read, write, directory).

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use super::RealRuntime;

impl RealRuntime {
    #[tracing::instrument(skip(self, contents))]
    pub(crate) fn write_impl(&self, path: &Path, contents: &[u8]) -> Result<()> {
        fs::write(path, contents).context("Failed to write to file")?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn read_impl(&self, path: &Path) -> Result<Vec<u8>> {
        fs::read(path).with_context(|| format!("Failed to read {}", path.display()))
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn read_to_string_impl(&self, path: &Path) -> Result<String> {
        fs::read_to_string(path)
            .with_context(|| format!("Failed to read {} to string", path.display()))
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn exists_impl(&self, path: &Path) -> bool {
        path.exists()
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn is_dir_impl(&self, path: &Path) -> bool {
        path.is_dir()
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn is_file_impl(&self, path: &Path) -> bool {
        path.is_file()
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn read_dir_impl(&self, path: &Path) -> Result<Vec<PathBuf>> {
        fs::read_dir(path)?.map(|entry| Ok(entry?.path())).collect()
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn create_dir_all_impl(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path).context("Failed to create directory")?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn remove_dir_all_impl(&self, path: &Path) -> Result<()> {
        fs::remove_dir_all(path).context("Failed to remove directory and its contents")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::runtime::{RealRuntime, Runtime};
    use tempfile::tempdir;

    #[test]
    fn test_real_runtime_file_ops() {
        let runtime = RealRuntime;
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("test.txt");

        runtime.write(&file_path, b"hello world").unwrap();
        assert!(runtime.exists(&file_path));
        assert!(runtime.is_file(&file_path));
        assert!(!runtime.is_dir(&file_path));

        assert_eq!(runtime.read_to_string(&file_path).unwrap(), "hello world");
        assert_eq!(runtime.read(&file_path).unwrap(), b"hello world");
    }

    #[test]
    fn test_real_runtime_dir_ops() {
        let runtime = RealRuntime;
        let dir = tempdir().unwrap();
        let sub_dir = dir.path().join("sub/nested");

        runtime.create_dir_all(&sub_dir).unwrap();
        assert!(runtime.is_dir(&sub_dir));

        let parent = dir.path().join("sub");
        let entries = runtime.read_dir(&parent).unwrap();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].ends_with("nested"));

        runtime.remove_dir_all(&parent).unwrap();
        assert!(!runtime.exists(&parent));
    }

    #[test]
    fn test_real_runtime_errors() {
        let runtime = RealRuntime;
        let missing = std::path::Path::new("/nonexistent/path/file.txt");

        assert!(runtime.read_to_string(missing).is_err());
        assert!(runtime.read(missing).is_err());
        assert!(runtime.read_dir(missing).is_err());
    }
}
