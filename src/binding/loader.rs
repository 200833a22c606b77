//! Loading a resolved candidate: the local artifact first, then the
//! platform package.

use log::{debug, warn};
use std::path::{Path, PathBuf};

use super::candidate::BindingCandidate;
use super::module::{BindingOrigin, NativeModule};
use super::package::resolve_package;
use crate::error::{LoaderError, Result};
use crate::runtime::Runtime;

/// The effectful half of binding resolution.
///
/// Both load methods may return `Ok(None)`: the attempt ran but produced no
/// handle and no error.
#[cfg_attr(test, mockall::automock(type Handle = String;))]
pub trait NativeLoader {
    type Handle;

    fn exists(&self, path: &Path) -> bool;
    fn load_file(&self, path: &Path) -> Result<Option<Self::Handle>>;
    fn load_package(&self, package: &str, main: &str) -> Result<Option<Self::Handle>>;
}

/// Load `candidate` from `binding_dir`, falling back to its package.
///
/// Errors of both attempts are captured; the last one is returned when
/// neither attempt produced a handle.
#[tracing::instrument(skip(loader))]
pub fn load_candidate<L: NativeLoader>(
    loader: &L,
    binding_dir: &Path,
    candidate: &BindingCandidate,
) -> Result<L::Handle> {
    let local_path = binding_dir.join(&candidate.local_file);
    let mut handle = None;
    let mut load_error = None;

    if loader.exists(&local_path) {
        debug!("Loading local binding {}", local_path.display());
        match loader.load_file(&local_path) {
            Ok(loaded) => handle = loaded,
            Err(e) => {
                warn!("{}", e);
                load_error = Some(e);
            }
        }
    } else {
        debug!("No local binding at {}", local_path.display());
    }

    if handle.is_none() {
        debug!("Loading binding package {}", candidate.package);
        match loader.load_package(&candidate.package, &candidate.local_file) {
            Ok(loaded) => handle = loaded,
            Err(e) => {
                debug!("{}", e);
                load_error = Some(e);
            }
        }
    }

    match (handle, load_error) {
        (Some(handle), _) => Ok(handle),
        (None, Some(e)) => Err(e),
        (None, None) => Err(LoaderError::TotalLoadFailure),
    }
}

/// Loads bindings from disk with `libloading`.
pub struct LibraryLoader<R: Runtime> {
    runtime: R,
    binding_dir: PathBuf,
}

impl<R: Runtime> LibraryLoader<R> {
    pub fn new(runtime: R, binding_dir: PathBuf) -> Self {
        Self {
            runtime,
            binding_dir,
        }
    }

    /// Open `path` after checking it is an object file at all; a truncated
    /// download or an HTML error page is reported here rather than by the
    /// dynamic linker.
    fn open(
        &self,
        path: &Path,
        origin: BindingOrigin,
    ) -> std::result::Result<NativeModule, String> {
        let bytes = self.runtime.read(path).map_err(|e| e.to_string())?;
        match goblin::Object::parse(&bytes) {
            Ok(goblin::Object::Elf(_))
            | Ok(goblin::Object::Mach(_))
            | Ok(goblin::Object::PE(_)) => {}
            Ok(_) => return Err("not a native shared library".to_string()),
            Err(e) => return Err(format!("not a native shared library ({})", e)),
        }

        NativeModule::open(path, origin).map_err(|e| e.to_string())
    }
}

impl<R: Runtime> NativeLoader for LibraryLoader<R> {
    type Handle = NativeModule;

    fn exists(&self, path: &Path) -> bool {
        self.runtime.exists(path)
    }

    #[tracing::instrument(skip(self))]
    fn load_file(&self, path: &Path) -> Result<Option<NativeModule>> {
        self.open(path, BindingOrigin::Local)
            .map(Some)
            .map_err(|message| LoaderError::LocalLoadFailure {
                path: path.to_path_buf(),
                message,
            })
    }

    #[tracing::instrument(skip(self))]
    fn load_package(&self, package: &str, main: &str) -> Result<Option<NativeModule>> {
        let fallback_error = |message: String| LoaderError::FallbackLoadFailure {
            package: package.to_string(),
            message,
        };

        let path = resolve_package(&self.runtime, &self.binding_dir, package, main)
            .map_err(|e| fallback_error(e.to_string()))?;

        self.open(&path, BindingOrigin::Package(package.to_string()))
            .map(Some)
            .map_err(fallback_error)
    }
}
