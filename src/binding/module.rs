//! The loaded native module and its four exports.
//!
//! Exports are looked up when they are called, not when the library is
//! opened: a binding missing one export still loads, and only callers of
//! that export see [`LoaderError::MissingExport`].

use libloading::{Library, Symbol};
use std::ffi::{CString, c_char};
use std::fmt;
use std::path::{Path, PathBuf};
use std::ptr;
use std::sync::Arc;

use crate::error::{LoaderError, Result};

pub const CHECK_ROUTERS: &str = "checkRouters";
pub const GEN_CHANGELOGS: &str = "genChangelogs";
pub const GEN_ALL_CHANGELOGS: &str = "genAllChangelogs";
pub const CHECK_PUBLISH: &str = "checkPublish";

/// Names of the four exports, in the order they are documented.
pub const EXPORTS: [&str; 4] = [CHECK_ROUTERS, GEN_CHANGELOGS, GEN_ALL_CHANGELOGS, CHECK_PUBLISH];

/// `(repo, optional path) -> status` exports.
pub type RepoWithPathFn = unsafe extern "C" fn(*const c_char, *const c_char) -> i32;

/// `(repo) -> status` exports.
pub type RepoFn = unsafe extern "C" fn(*const c_char) -> i32;

/// Where a module was loaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingOrigin {
    Local,
    Package(String),
}

/// Handle to a loaded native binding. Clones share the library.
#[derive(Clone)]
pub struct NativeModule {
    path: PathBuf,
    origin: BindingOrigin,
    library: Arc<Library>,
}

impl NativeModule {
    /// Open the shared library at `path`.
    ///
    /// Running the library's initialisers is inherent to loading it; the
    /// file must be a binding built from this crate.
    pub fn open(
        path: &Path,
        origin: BindingOrigin,
    ) -> std::result::Result<Self, libloading::Error> {
        let library = unsafe { Library::new(path)? };
        Ok(Self {
            path: path.to_path_buf(),
            origin,
            library: Arc::new(library),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn origin(&self) -> &BindingOrigin {
        &self.origin
    }

    pub fn check_routers(&self, repo: &str, routes_file: Option<&str>) -> Result<i32> {
        self.call_with_path(CHECK_ROUTERS, repo, routes_file)
    }

    pub fn gen_changelogs(&self, repo: &str, changelog_path: Option<&str>) -> Result<i32> {
        self.call_with_path(GEN_CHANGELOGS, repo, changelog_path)
    }

    pub fn gen_all_changelogs(&self, repo: &str, changelog_path: Option<&str>) -> Result<i32> {
        self.call_with_path(GEN_ALL_CHANGELOGS, repo, changelog_path)
    }

    pub fn check_publish(&self, repo: &str) -> Result<i32> {
        let repo = to_c_string(CHECK_PUBLISH, repo)?;
        let func: Symbol<RepoFn> = self.symbol(CHECK_PUBLISH)?;
        Ok(unsafe { func(repo.as_ptr()) })
    }

    fn call_with_path(&self, export: &str, repo: &str, path: Option<&str>) -> Result<i32> {
        let repo = to_c_string(export, repo)?;
        let path = path.map(|p| to_c_string(export, p)).transpose()?;
        let func: Symbol<RepoWithPathFn> = self.symbol(export)?;
        let path_ptr = path.as_ref().map_or(ptr::null(), |p| p.as_ptr());
        Ok(unsafe { func(repo.as_ptr(), path_ptr) })
    }

    fn symbol<T>(&self, export: &str) -> Result<Symbol<'_, T>> {
        unsafe { self.library.get::<T>(export.as_bytes()) }.map_err(|_| LoaderError::MissingExport {
            path: self.path.clone(),
            export: export.to_string(),
        })
    }
}

impl fmt::Debug for NativeModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeModule")
            .field("path", &self.path)
            .field("origin", &self.origin)
            .finish()
    }
}

fn to_c_string(export: &str, value: &str) -> Result<CString> {
    CString::new(value).map_err(|_| LoaderError::InvalidArgument {
        export: export.to_string(),
        message: "argument contains a NUL byte".to_string(),
    })
}
