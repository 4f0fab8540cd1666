//! Bounds-checked little-endian field readers.
//!
//! SMBIOS fields sit at fixed offsets inside firmware-supplied buffers. These
//! helpers never read past the end of the slice; they return `None` instead,
//! and the caller decides which [`SmbiosError`](crate::SmbiosError) that maps to.

/// Returns the `N` bytes at `offset`, or `None` if they are not all in `data`.
fn array_at<const N: usize>(data: &[u8], offset: usize) -> Option<[u8; N]> {
    let end = offset.checked_add(N)?;
    data.get(offset..end)?.try_into().ok()
}

/// Reads the byte at `offset`.
#[must_use]
pub fn read_u8_at(data: &[u8], offset: usize) -> Option<u8> {
    data.get(offset).copied()
}

/// Reads a little-endian `u16` at `offset`.
#[must_use]
pub fn read_u16_le_at(data: &[u8], offset: usize) -> Option<u16> {
    array_at(data, offset).map(u16::from_le_bytes)
}

/// Reads a little-endian `u32` at `offset`.
#[must_use]
pub fn read_u32_le_at(data: &[u8], offset: usize) -> Option<u32> {
    array_at(data, offset).map(u32::from_le_bytes)
}

/// Reads a little-endian `u64` at `offset`.
#[must_use]
pub fn read_u64_le_at(data: &[u8], offset: usize) -> Option<u64> {
    array_at(data, offset).map(u64::from_le_bytes)
}

/// Returns the 8-bit wrapping sum of `data`.
///
/// SMBIOS entry points, like ACPI tables, are valid when this is zero.
#[must_use]
pub fn checksum(data: &[u8]) -> u8 {
    data.iter().fold(0u8, |sum, &byte| sum.wrapping_add(byte))
}
