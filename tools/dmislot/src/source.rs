//! Reading the firmware tables from disk.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result, ensure};

/// Reads the whole entry point file.
pub fn read_entry_point(path: &Path) -> Result<Vec<u8>> {
    log::debug!("Opening entry point at {}", path.display());
    std::fs::read(path).with_context(|| format!("failed to read entry point {}", path.display()))
}

/// Reads exactly `len` bytes of the structure table.
///
/// Trailing bytes beyond `len` are ignored. A file shorter than `len` is an
/// error.
pub fn read_table(path: &Path, len: u32) -> Result<Vec<u8>> {
    log::debug!("Opening DMI table at {}", path.display());
    let file =
        File::open(path).with_context(|| format!("failed to open DMI table {}", path.display()))?;

    let expected = usize::try_from(len).context("DMI table length exceeds address space")?;
    let mut data = Vec::with_capacity(expected);
    file.take(u64::from(len))
        .read_to_end(&mut data)
        .with_context(|| format!("failed to read DMI table {}", path.display()))?;
    ensure!(
        data.len() == expected,
        "DMI table {} is truncated: expected {len} bytes, got {}",
        path.display(),
        data.len()
    );
    Ok(data)
}
