use std::path::PathBuf;

use thiserror::Error;

/// Failures of the native binding loader.
///
/// Every variant is `Clone` so the memoized outcome of the process-wide
/// binding can be handed to each caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoaderError {
    #[error("Unsupported OS: {os}")]
    UnsupportedPlatform { os: String },

    #[error("Unsupported architecture on {os}: {arch}")]
    UnsupportedArchitecture { os: String, arch: String },

    #[error("Failed to load native binding {}: {message}", path.display())]
    LocalLoadFailure { path: PathBuf, message: String },

    #[error("Failed to load native binding package {package}: {message}")]
    FallbackLoadFailure { package: String, message: String },

    #[error("Failed to load native binding")]
    TotalLoadFailure,

    #[error("Native binding {} does not export {export}", path.display())]
    MissingExport { path: PathBuf, export: String },

    #[error("Invalid argument for {export}: {message}")]
    InvalidArgument { export: String, message: String },
}

pub type Result<T> = std::result::Result<T, LoaderError>;
