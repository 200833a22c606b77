//! Platform detection
//!
//! This module names the closed set of operating systems, architectures
//! and ABIs native bindings are built for, detects the running platform,
//! and tells glibc from musl on Linux.

mod detection;
mod libc;

pub use detection::{DefaultPlatformDetector, Platform, PlatformDetector};
pub use libc::{LDD_PATH, MUSL_MARKER, is_musl};

use std::fmt;

/// Operating systems with published bindings, named the way Node.js names them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Os {
    Android,
    Win32,
    Darwin,
    FreeBsd,
    Linux,
}

impl Os {
    pub const ALL: [Os; 5] = [Os::Android, Os::Win32, Os::Darwin, Os::FreeBsd, Os::Linux];

    /// Parse an OS identifier. Accepts Node.js names (`win32`, `darwin`) as
    /// well as the names Rust reports (`windows`, `macos`).
    pub fn parse(os: &str) -> Option<Self> {
        match os {
            "android" => Some(Os::Android),
            "win32" | "windows" => Some(Os::Win32),
            "darwin" | "macos" => Some(Os::Darwin),
            "freebsd" => Some(Os::FreeBsd),
            "linux" => Some(Os::Linux),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Os::Android => "android",
            Os::Win32 => "win32",
            Os::Darwin => "darwin",
            Os::FreeBsd => "freebsd",
            Os::Linux => "linux",
        }
    }
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// CPU architectures, named the way Node.js names them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arch {
    Arm64,
    X64,
    Ia32,
    Arm,
}

impl Arch {
    pub const ALL: [Arch; 4] = [Arch::Arm64, Arch::X64, Arch::Ia32, Arch::Arm];

    /// Parse an architecture identifier. Accepts Node.js names (`x64`,
    /// `arm64`, `ia32`) as well as the names Rust reports (`x86_64`,
    /// `aarch64`, `x86`).
    pub fn parse(arch: &str) -> Option<Self> {
        match arch {
            "arm64" | "aarch64" => Some(Arch::Arm64),
            "x64" | "x86_64" => Some(Arch::X64),
            "ia32" | "x86" => Some(Arch::Ia32),
            "arm" => Some(Arch::Arm),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Arch::Arm64 => "arm64",
            Arch::X64 => "x64",
            Arch::Ia32 => "ia32",
            Arch::Arm => "arm",
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The ABI suffix carried by some artifact names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Abi {
    Gnu,
    Musl,
    Msvc,
    GnuEabiHf,
}

impl Abi {
    pub fn as_str(&self) -> &'static str {
        match self {
            Abi::Gnu => "gnu",
            Abi::Musl => "musl",
            Abi::Msvc => "msvc",
            Abi::GnuEabiHf => "gnueabihf",
        }
    }
}

impl fmt::Display for Abi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One cell of the supported matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlatformKey {
    pub os: Os,
    pub arch: Arch,
    pub abi: Option<Abi>,
}

impl PlatformKey {
    pub const fn new(os: Os, arch: Arch, abi: Option<Abi>) -> Self {
        Self { os, arch, abi }
    }

    /// `<os>-<arch>[-<abi>]`, the fragment shared by file and package names.
    pub fn triple(&self) -> String {
        match self.abi {
            Some(abi) => format!("{}-{}-{}", self.os, self.arch, abi),
            None => format!("{}-{}", self.os, self.arch),
        }
    }
}

impl fmt::Display for PlatformKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.triple())
    }
}
