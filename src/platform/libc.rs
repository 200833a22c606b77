//! musl detection on Linux.

use log::debug;
use std::path::Path;

use crate::runtime::Runtime;

/// Where the dynamic linker front-end lives on mainstream distributions.
///
/// Only this one path is probed; a system that keeps `ldd` elsewhere is
/// reported as glibc.
pub const LDD_PATH: &str = "/usr/bin/ldd";

/// Byte string that only appears in musl's `ldd`.
pub const MUSL_MARKER: &[u8] = b"musl";

/// Returns true if the `ldd` binary mentions musl.
///
/// A missing or unreadable `ldd` counts as glibc.
#[tracing::instrument(skip(runtime))]
pub fn is_musl<R: Runtime + ?Sized>(runtime: &R) -> bool {
    match runtime.read(Path::new(LDD_PATH)) {
        Ok(content) => contains_marker(&content),
        Err(e) => {
            debug!("Could not read {}: {}", LDD_PATH, e);
            false
        }
    }
}

fn contains_marker(content: &[u8]) -> bool {
    content
        .windows(MUSL_MARKER.len())
        .any(|window| window == MUSL_MARKER)
}
