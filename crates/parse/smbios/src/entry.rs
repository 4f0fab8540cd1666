//! SMBIOS entry point parsing.
//!
//! The entry point is a small header that names the SMBIOS version and the
//! size and location of the structure table. Two layouts exist:
//!
//! | Offset | 32-bit (`_SM_`)      | 64-bit (`_SM3_`)        |
//! |--------|----------------------|-------------------------|
//! | 0x00   | anchor (4 bytes)     | anchor (5 bytes)        |
//! | 0x04   | checksum             | anchor                  |
//! | 0x05   | entry point length   | checksum                |
//! | 0x06   | major, minor         | entry point length      |
//! | 0x07   |                      | major, minor, docrev    |
//! | 0x0C   |                      | table maximum size (32) |
//! | 0x10   |                      | table address (64)      |
//! | 0x16   | table length (16)    |                         |
//! | 0x18   | table address (32)   |                         |
//!
//! The checksum is not validated by [`parse`]; [`parse_checked`] adds that
//! check for callers that want it.

use core::fmt;

use crate::bytes::{checksum, read_u8_at, read_u16_le_at, read_u32_le_at, read_u64_le_at};
use crate::trace::{NoTrace, ScanTrace};
use crate::SmbiosError;

/// Anchor of the 32-bit entry point.
pub const ANCHOR_32: &[u8; 4] = b"_SM_";

/// Anchor of the 64-bit entry point.
pub const ANCHOR_64: &[u8; 5] = b"_SM3_";

/// Number of bytes needed to identify the entry point format and length.
pub const MIN_PROBE_LEN: usize = 8;

/// Smallest valid 32-bit entry point length.
pub const MIN_LEN_32: u8 = 0x1E;

/// Smallest valid 64-bit entry point length.
pub const MIN_LEN_64: u8 = 0x18;

/// Entry point lengths at or above this value are rejected for both formats.
pub const MAX_LEN: u8 = 0x24;

/// Layout of an SMBIOS entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryPointFormat {
    /// SMBIOS 2.x entry point, anchored by `_SM_`.
    ThirtyTwoBit,
    /// SMBIOS 3.x entry point, anchored by `_SM3_`.
    SixtyFourBit,
}

impl EntryPointFormat {
    /// Returns the anchor string that identifies this format.
    #[must_use]
    pub fn anchor(self) -> &'static [u8] {
        match self {
            Self::ThirtyTwoBit => ANCHOR_32,
            Self::SixtyFourBit => ANCHOR_64,
        }
    }

    /// Returns the smallest entry point length this format allows.
    #[must_use]
    pub fn min_len(self) -> u8 {
        match self {
            Self::ThirtyTwoBit => MIN_LEN_32,
            Self::SixtyFourBit => MIN_LEN_64,
        }
    }

    /// Offset of the checksum byte, which directly follows the anchor.
    const fn checksum_offset(self) -> usize {
        match self {
            Self::ThirtyTwoBit => 0x04,
            Self::SixtyFourBit => 0x05,
        }
    }

    /// Offset of the entry point length byte.
    const fn length_offset(self) -> usize {
        self.checksum_offset() + 1
    }
}

impl fmt::Display for EntryPointFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ThirtyTwoBit => f.write_str("32-bit"),
            Self::SixtyFourBit => f.write_str("64-bit"),
        }
    }
}

/// SMBIOS specification version declared by the entry point.
///
/// `docrev` is only carried by 64-bit entry points and is 0 otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SmbiosVersion {
    /// Major version.
    pub major: u8,
    /// Minor version.
    pub minor: u8,
    /// Document revision.
    pub docrev: u8,
}

impl fmt::Display for SmbiosVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.docrev)
    }
}

/// What the entry point says about the structure table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableDescriptor {
    format: EntryPointFormat,
    version: SmbiosVersion,
    entry_point_len: u8,
    table_len: u32,
    table_addr: u64,
}

impl TableDescriptor {
    /// Returns the entry point format.
    #[must_use]
    pub fn format(&self) -> EntryPointFormat {
        self.format
    }

    /// Returns the declared SMBIOS version.
    #[must_use]
    pub fn version(&self) -> SmbiosVersion {
        self.version
    }

    /// Returns the declared length of the entry point itself.
    #[must_use]
    pub fn entry_point_len(&self) -> u8 {
        self.entry_point_len
    }

    /// Returns the declared byte length of the structure table.
    ///
    /// For 64-bit entry points this is the table's maximum size.
    #[must_use]
    pub fn table_len(&self) -> u32 {
        self.table_len
    }

    /// Returns the declared physical address of the structure table.
    ///
    /// Informational only; the table bytes are always supplied by the caller.
    #[must_use]
    pub fn table_addr(&self) -> u64 {
        self.table_addr
    }
}

/// Parses an SMBIOS entry point.
///
/// The checksum byte is skipped, not validated. Firmware checksum validation
/// is opt-in through [`parse_checked`].
///
/// # Errors
///
/// - [`SmbiosError::TooShort`] if fewer than 8 bytes are supplied.
/// - [`SmbiosError::BadSignature`] if the anchor is neither `_SM_` nor `_SM3_`.
/// - [`SmbiosError::BadLength`] if the declared length is below the format
///   minimum or at least `0x24`.
/// - [`SmbiosError::Truncated`] if fewer bytes than declared are supplied.
pub fn parse(data: &[u8]) -> Result<TableDescriptor, SmbiosError> {
    parse_traced(data, &mut NoTrace)
}

/// Like [`parse`], reporting decision points to `trace`.
///
/// # Errors
///
/// See [`parse`].
pub fn parse_traced(
    data: &[u8],
    trace: &mut impl ScanTrace,
) -> Result<TableDescriptor, SmbiosError> {
    if data.len() < MIN_PROBE_LEN {
        return Err(SmbiosError::TooShort { len: data.len() });
    }

    let format = detect_format(data)?;
    trace.entry_point(format);

    let declared = read_u8_at(data, format.length_offset()).ok_or(SmbiosError::TooShort {
        len: data.len(),
    })?;
    if declared < format.min_len() || declared >= MAX_LEN {
        return Err(SmbiosError::BadLength {
            len: declared,
            format,
        });
    }

    let len = usize::from(declared);
    let truncated = SmbiosError::Truncated {
        expected: len,
        actual: data.len(),
    };
    let ep = data.get(..len).ok_or(truncated)?;

    let version_offset = format.length_offset() + 1;
    let major = read_u8_at(ep, version_offset).ok_or(truncated)?;
    let minor = read_u8_at(ep, version_offset + 1).ok_or(truncated)?;

    let (docrev, table_len, table_addr) = match format {
        EntryPointFormat::ThirtyTwoBit => (
            0,
            u32::from(read_u16_le_at(ep, 0x16).ok_or(truncated)?),
            u64::from(read_u32_le_at(ep, 0x18).ok_or(truncated)?),
        ),
        EntryPointFormat::SixtyFourBit => (
            read_u8_at(ep, version_offset + 2).ok_or(truncated)?,
            read_u32_le_at(ep, 0x0C).ok_or(truncated)?,
            read_u64_le_at(ep, 0x10).ok_or(truncated)?,
        ),
    };

    let descriptor = TableDescriptor {
        format,
        version: SmbiosVersion {
            major,
            minor,
            docrev,
        },
        entry_point_len: declared,
        table_len,
        table_addr,
    };
    trace.descriptor(&descriptor);
    Ok(descriptor)
}

/// Parses an SMBIOS entry point and validates its checksum.
///
/// # Errors
///
/// Everything [`parse`] reports, plus [`SmbiosError::BadChecksum`] if the
/// declared entry point bytes do not sum to zero.
pub fn parse_checked(data: &[u8]) -> Result<TableDescriptor, SmbiosError> {
    parse_checked_traced(data, &mut NoTrace)
}

/// Like [`parse_checked`], reporting decision points to `trace`.
///
/// # Errors
///
/// See [`parse_checked`].
pub fn parse_checked_traced(
    data: &[u8],
    trace: &mut impl ScanTrace,
) -> Result<TableDescriptor, SmbiosError> {
    let descriptor = parse_traced(data, trace)?;
    let len = usize::from(descriptor.entry_point_len);
    let ep = data.get(..len).ok_or(SmbiosError::Truncated {
        expected: len,
        actual: data.len(),
    })?;
    let sum = checksum(ep);
    if sum != 0 {
        return Err(SmbiosError::BadChecksum { sum });
    }
    Ok(descriptor)
}

/// Identifies the entry point format from its anchor.
fn detect_format(data: &[u8]) -> Result<EntryPointFormat, SmbiosError> {
    [EntryPointFormat::ThirtyTwoBit, EntryPointFormat::SixtyFourBit]
        .into_iter()
        .find(|format| data.starts_with(format.anchor()))
        .ok_or(SmbiosError::BadSignature)
}
