//! CLI command implementations.

pub mod dump;
pub mod ops;
pub mod run;

use anyhow::Context;
use std::path::Path;

/// Path bytes as the VM expects them
pub(crate) fn path_bytes(path: &Path) -> anyhow::Result<&[u8]> {
    path.to_str()
        .map(str::as_bytes)
        .with_context(|| format!("Path is not valid UTF-8: {}", path.display()))
}
