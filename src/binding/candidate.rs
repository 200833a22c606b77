//! Mapping a platform onto exactly one artifact name.

use crate::error::{LoaderError, Result};
use crate::platform::{Abi, Arch, Os, PlatformKey};

/// Product and npm scope the artifact names are built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingNames {
    pub product: String,
    pub scope: String,
}

impl Default for BindingNames {
    fn default() -> Self {
        Self {
            product: "pro-tools".to_string(),
            scope: "ant-design".to_string(),
        }
    }
}

/// Every platform a binding is published for.
pub const SUPPORTED_MATRIX: [PlatformKey; 12] = [
    PlatformKey::new(Os::Android, Arch::Arm64, None),
    PlatformKey::new(Os::Win32, Arch::X64, Some(Abi::Msvc)),
    PlatformKey::new(Os::Win32, Arch::Ia32, Some(Abi::Msvc)),
    PlatformKey::new(Os::Win32, Arch::Arm64, Some(Abi::Msvc)),
    PlatformKey::new(Os::Darwin, Arch::X64, None),
    PlatformKey::new(Os::Darwin, Arch::Arm64, None),
    PlatformKey::new(Os::FreeBsd, Arch::X64, None),
    PlatformKey::new(Os::Linux, Arch::X64, Some(Abi::Gnu)),
    PlatformKey::new(Os::Linux, Arch::X64, Some(Abi::Musl)),
    PlatformKey::new(Os::Linux, Arch::Arm64, Some(Abi::Gnu)),
    PlatformKey::new(Os::Linux, Arch::Arm64, Some(Abi::Musl)),
    PlatformKey::new(Os::Linux, Arch::Arm, Some(Abi::GnuEabiHf)),
];

/// The resolved artifact for one platform: a file name looked up next to
/// the binding directory and the package that ships the same file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingCandidate {
    pub key: PlatformKey,
    pub local_file: String,
    pub package: String,
}

impl BindingCandidate {
    pub fn for_key(names: &BindingNames, key: PlatformKey) -> Self {
        let triple = key.triple();
        Self {
            key,
            local_file: format!("{}.{}.node", names.product, triple),
            package: format!("@{}/{}-{}", names.scope, names.product, triple),
        }
    }
}

fn supported_arches(os: Os) -> &'static [Arch] {
    match os {
        Os::Android => &[Arch::Arm64],
        Os::Win32 => &[Arch::X64, Arch::Ia32, Arch::Arm64],
        Os::Darwin => &[Arch::X64, Arch::Arm64],
        Os::FreeBsd => &[Arch::X64],
        Os::Linux => &[Arch::X64, Arch::Arm64, Arch::Arm],
    }
}

/// Pick the binding for `(os, arch)`.
///
/// `is_musl` is consulted only for Linux on x64 and arm64, the two targets
/// published in both a glibc and a musl flavour. Unsupported combinations
/// fail before it is called.
pub fn resolve_candidate<F>(
    names: &BindingNames,
    os: &str,
    arch: &str,
    is_musl: F,
) -> Result<BindingCandidate>
where
    F: FnOnce() -> bool,
{
    let os_id = Os::parse(os).ok_or_else(|| LoaderError::UnsupportedPlatform {
        os: os.to_string(),
    })?;

    let arch_id = Arch::parse(arch)
        .filter(|a| supported_arches(os_id).contains(a))
        .ok_or_else(|| LoaderError::UnsupportedArchitecture {
            os: os_id.to_string(),
            arch: arch.to_string(),
        })?;

    let abi = match (os_id, arch_id) {
        (Os::Win32, _) => Some(Abi::Msvc),
        (Os::Linux, Arch::Arm) => Some(Abi::GnuEabiHf),
        (Os::Linux, _) => Some(if is_musl() { Abi::Musl } else { Abi::Gnu }),
        _ => None,
    };

    let key = PlatformKey::new(os_id, arch_id, abi);
    if !SUPPORTED_MATRIX.contains(&key) {
        return Err(LoaderError::UnsupportedArchitecture {
            os: os_id.to_string(),
            arch: arch.to_string(),
        });
    }

    Ok(BindingCandidate::for_key(names, key))
}
