//! Native binding resolution and loading.
//!
//! Resolution is split in two: [`resolve_candidate`] is a pure function from
//! `(os, arch, is_musl)` to the one artifact this platform uses, and
//! [`load_candidate`] performs the local-then-package load. The process-wide
//! handle lives in a [`BindingCell`] that is initialised on first use and
//! never changes afterwards; a failed initialisation is memoized too.
//!
//! # Lifecycle
//!
//! The first call to [`init`] or [`binding`] resolves and loads. Every later
//! call, from any thread, returns the same outcome. The library stays loaded
//! until the process exits.

mod candidate;
mod loader;
mod module;
mod package;

pub use candidate::{BindingCandidate, BindingNames, SUPPORTED_MATRIX, resolve_candidate};
pub use loader::{LibraryLoader, NativeLoader, load_candidate};
pub use module::{
    BindingOrigin, CHECK_PUBLISH, CHECK_ROUTERS, EXPORTS, GEN_ALL_CHANGELOGS, GEN_CHANGELOGS,
    NativeModule, RepoFn, RepoWithPathFn,
};
pub use package::resolve_package;

use log::debug;
use std::sync::OnceLock;

use crate::config::LoaderConfig;
use crate::error::Result;
use crate::platform::{DefaultPlatformDetector, PlatformDetector, is_musl};
use crate::runtime::{RealRuntime, Runtime};

/// Init-once holder for a loaded binding.
pub struct BindingCell<H> {
    cell: OnceLock<Result<H>>,
}

impl<H> BindingCell<H> {
    pub const fn new() -> Self {
        Self {
            cell: OnceLock::new(),
        }
    }

    /// Return the stored outcome, running `load` if nothing is stored yet.
    /// `load` runs at most once per cell.
    pub fn get_or_load<F>(&self, load: F) -> Result<&H>
    where
        F: FnOnce() -> Result<H>,
    {
        self.cell.get_or_init(load).as_ref().map_err(Clone::clone)
    }
}

impl<H> Default for BindingCell<H> {
    fn default() -> Self {
        Self::new()
    }
}

static BINDING: BindingCell<NativeModule> = BindingCell::new();

/// Resolve the candidate for the platform reported by `detector`.
#[tracing::instrument(skip(runtime, detector))]
pub fn resolve<R: Runtime, D: PlatformDetector>(
    runtime: &R,
    detector: &D,
    names: &BindingNames,
) -> Result<BindingCandidate> {
    let platform = detector.detect();
    debug!("Detected platform {}/{}", platform.os, platform.arch);
    resolve_candidate(names, &platform.os, &platform.arch, || is_musl(runtime))
}

/// Resolve and load without touching the process-wide handle.
#[tracing::instrument(skip(runtime, detector))]
pub fn resolve_and_load<R: Runtime, D: PlatformDetector>(
    runtime: R,
    detector: &D,
    config: &LoaderConfig,
) -> Result<NativeModule> {
    let candidate = resolve(&runtime, detector, &config.names)?;
    let loader = LibraryLoader::new(runtime, config.binding_dir.clone());
    let module = load_candidate(&loader, &config.binding_dir, &candidate)?;
    debug!(
        "Loaded {:?} native binding from {}",
        module.origin(),
        module.path().display()
    );
    Ok(module)
}

/// Initialise the process-wide binding with `config`.
///
/// Only the first call's configuration is used.
pub fn init(config: LoaderConfig) -> Result<&'static NativeModule> {
    BINDING.get_or_load(|| resolve_and_load(RealRuntime, &DefaultPlatformDetector, &config))
}

/// The process-wide binding, configured from the environment on first use.
pub fn binding() -> Result<&'static NativeModule> {
    BINDING.get_or_load(|| {
        let config = LoaderConfig::from_env(&RealRuntime);
        resolve_and_load(RealRuntime, &DefaultPlatformDetector, &config)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LoaderError;
    use crate::platform::{LDD_PATH, Platform};
    use crate::runtime::MockRuntime;
    use mockall::predicate::eq;
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedDetector(&'static str, &'static str);

    impl PlatformDetector for FixedDetector {
        fn detect(&self) -> Platform {
            Platform {
                os: self.0.to_string(),
                arch: self.1.to_string(),
            }
        }
    }

    #[test]
    fn test_cell_loads_once_and_returns_same_handle() {
        let cell: BindingCell<Arc<String>> = BindingCell::new();
        let loads = AtomicUsize::new(0);
        let load = || {
            loads.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new("handle".to_string()))
        };

        let first = cell.get_or_load(load).unwrap();
        let second = cell
            .get_or_load(|| panic!("second load must not run"))
            .unwrap();

        assert!(Arc::ptr_eq(first, second));
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_cell_memoizes_failure() {
        let cell: BindingCell<String> = BindingCell::new();
        let err = cell
            .get_or_load(|| Err(LoaderError::TotalLoadFailure))
            .unwrap_err();
        assert_eq!(err, LoaderError::TotalLoadFailure);

        let err = cell
            .get_or_load(|| Ok("late".to_string()))
            .unwrap_err();
        assert_eq!(err, LoaderError::TotalLoadFailure);
    }

    #[test]
    fn test_cell_shared_across_threads() {
        let cell: Arc<BindingCell<Arc<u32>>> = Arc::new(BindingCell::new());
        let loads = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cell = Arc::clone(&cell);
                let loads = Arc::clone(&loads);
                std::thread::spawn(move || {
                    let value = cell
                        .get_or_load(|| {
                            loads.fetch_add(1, Ordering::SeqCst);
                            Ok(Arc::new(7))
                        })
                        .unwrap();
                    Arc::as_ptr(value) as usize
                })
            })
            .collect();

        let ptrs: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(ptrs.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_resolve_reads_ldd_on_linux_x64() {
        let mut runtime = MockRuntime::new();
        runtime
            .expect_read()
            .with(eq(PathBuf::from(LDD_PATH)))
            .times(1)
            .returning(|_| Ok(b"musl libc".to_vec()));

        let candidate = resolve(&runtime, &FixedDetector("linux", "x64"), &BindingNames::default())
            .unwrap();
        assert_eq!(candidate.local_file, "pro-tools.linux-x64-musl.node");
    }

    #[test]
    fn test_resolve_unsupported_touches_no_filesystem() {
        // MockRuntime without expectations panics on any call
        let runtime = MockRuntime::new();

        let err = resolve(&runtime, &FixedDetector("haiku", "x64"), &BindingNames::default())
            .unwrap_err();
        assert!(matches!(err, LoaderError::UnsupportedPlatform { .. }));

        let err = resolve(&runtime, &FixedDetector("linux", "mips"), &BindingNames::default())
            .unwrap_err();
        assert!(matches!(err, LoaderError::UnsupportedArchitecture { .. }));
    }

    #[test]
    fn test_resolve_and_load_unsupported_does_not_load() {
        let runtime = MockRuntime::new();
        let config = LoaderConfig {
            names: BindingNames::default(),
            binding_dir: PathBuf::from("/opt/pro-tools"),
        };

        let err = resolve_and_load(runtime, &FixedDetector("win32", "arm"), &config).unwrap_err();
        assert_eq!(
            err,
            LoaderError::UnsupportedArchitecture {
                os: "win32".into(),
                arch: "arm".into()
            }
        );
    }

    #[test]
    fn test_resolve_and_load_nothing_installed() {
        let mut runtime = MockRuntime::new();
        runtime.expect_exists().return_const(false);
        runtime.expect_is_file().return_const(false);
        let config = LoaderConfig {
            names: BindingNames::default(),
            binding_dir: PathBuf::from("/opt/pro-tools"),
        };

        let err =
            resolve_and_load(runtime, &FixedDetector("darwin", "arm64"), &config).unwrap_err();
        assert_eq!(
            err,
            LoaderError::FallbackLoadFailure {
                package: "@ant-design/pro-tools-darwin-arm64".into(),
                message: "Cannot find module '@ant-design/pro-tools-darwin-arm64'".into(),
            }
        );
    }
}
