/// The running platform, as raw identifiers
///
/// Values use Node.js spelling when the platform is one Node knows about
/// and fall back to what Rust reports otherwise, so an unsupported host
/// still produces a readable error.
#[derive(Debug, Clone, PartialEq)]
pub struct Platform {
    pub os: String,
    pub arch: String,
}

impl Platform {
    /// Detect the current platform
    pub fn detect() -> Self {
        Self {
            os: Self::detect_os(),
            arch: Self::detect_arch(),
        }
    }

    fn detect_os() -> String {
        #[cfg(target_os = "macos")]
        {
            "darwin".to_string()
        }
        #[cfg(target_os = "windows")]
        {
            "win32".to_string()
        }
        #[cfg(not(any(target_os = "macos", target_os = "windows")))]
        {
            std::env::consts::OS.to_string()
        }
    }

    fn detect_arch() -> String {
        #[cfg(target_arch = "x86_64")]
        {
            "x64".to_string()
        }
        #[cfg(target_arch = "aarch64")]
        {
            "arm64".to_string()
        }
        #[cfg(target_arch = "x86")]
        {
            "ia32".to_string()
        }
        #[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64", target_arch = "x86")))]
        {
            std::env::consts::ARCH.to_string()
        }
    }
}

/// Trait for platform detection (useful for testing)
pub trait PlatformDetector: Send + Sync {
    fn detect(&self) -> Platform;
}

/// Detects the platform the binary was compiled for
pub struct DefaultPlatformDetector;

impl PlatformDetector for DefaultPlatformDetector {
    fn detect(&self) -> Platform {
        Platform::detect()
    }
}
