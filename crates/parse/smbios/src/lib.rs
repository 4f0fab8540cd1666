//! `dmislot-smbios` --- a standalone, `no_std` SMBIOS/DMI table decoder.
//!
//! This crate understands just enough of the SMBIOS format to answer one
//! question: which System Slot (type 9) structure describes a given PCI
//! `segment:bus:device.function` address, and what is that slot called.
//!
//! Decoding happens in two steps over byte slices the caller has already
//! read (on Linux, `/sys/firmware/dmi/tables/smbios_entry_point` and
//! `/sys/firmware/dmi/tables/DMI`):
//!
//! 1. [`entry::parse`] recognises the 32-bit (`_SM_`) or 64-bit (`_SM3_`)
//!    entry point and produces a [`TableDescriptor`].
//! 2. [`slot::scan`] / [`slot::scan_all`] walk the structure table and
//!    decode the PCI address carried by each System Slot record.
//!
//! Every field is read through bounds-checked helpers; a table that fails a
//! structural check is rejected as a whole.
//!
//! # Usage
//!
//! ```ignore
//! let descriptor = dmislot_smbios::entry::parse(&entry_point_bytes)?;
//! let query = SlotQuery::Exact("0000:02:03.1".parse()?);
//! if let Some(slot) = dmislot_smbios::scan(&table_bytes, descriptor.table_len(), &query)? {
//!     // slot.name() ...
//! }
//! ```

#![no_std]
#![warn(missing_docs)]

#[cfg(any(feature = "alloc", test))]
extern crate alloc;

pub mod bytes;
pub mod entry;
pub mod pci;
pub mod slot;
pub mod structure;
pub mod trace;

use core::fmt;

pub use entry::{EntryPointFormat, SmbiosVersion, TableDescriptor};
pub use pci::{ParsePciAddressError, PciAddress};
#[cfg(feature = "alloc")]
pub use slot::{scan_all, scan_all_traced};
pub use slot::{SlotIter, SlotQuery, SystemSlot, scan, scan_traced, slots, slots_traced};
pub use structure::{RecordIter, StructureRecord, StructureTable};
pub use trace::{LogTrace, NoTrace, ScanTrace, SkipReason};

/// Errors that can occur while decoding SMBIOS data.
///
/// The first group describes an entry point that does not point at a usable
/// structure table; the second describes a structure table that is
/// internally inconsistent. Neither group is recoverable: decoding stops at
/// the first error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmbiosError {
    /// Fewer than the 8 bytes needed to identify the entry point.
    TooShort {
        /// Number of bytes available.
        len: usize,
    },
    /// The entry point does not start with `_SM_` or `_SM3_`.
    BadSignature,
    /// The declared entry point length is outside the bounds for its format.
    BadLength {
        /// The declared entry point length.
        len: u8,
        /// The format the anchor identified.
        format: EntryPointFormat,
    },
    /// The entry point is shorter than its own declared length.
    Truncated {
        /// Number of bytes the entry point declares.
        expected: usize,
        /// Number of bytes available.
        actual: usize,
    },
    /// The entry point bytes do not sum to zero.
    BadChecksum {
        /// The 8-bit sum of the entry point bytes.
        sum: u8,
    },
    /// A structure declares a length shorter than its own 4-byte header.
    MalformedRecord {
        /// Offset of the structure within the table.
        offset: usize,
        /// Handle of the structure.
        handle: u16,
        /// Declared formatted-area length.
        len: u8,
    },
    /// A structure's formatted area extends past the end of the table.
    RecordOverflow {
        /// Offset of the structure within the table.
        offset: usize,
        /// Handle of the structure.
        handle: u16,
        /// Declared formatted-area length.
        len: u8,
    },
    /// A structure's string area is unterminated or holds too many strings.
    StringTableOverflow {
        /// Offset of the structure within the table.
        offset: usize,
        /// Handle of the structure.
        handle: u16,
    },
}

impl fmt::Display for SmbiosError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::TooShort { len } => {
                write!(f, "entry point too short: {len} bytes")
            }
            Self::BadSignature => f.write_str("bad SMBIOS entry point anchor"),
            Self::BadLength { len, format } => {
                write!(f, "bad {format} entry point length: {len:#x}")
            }
            Self::Truncated { expected, actual } => write!(
                f,
                "entry point truncated: declares {expected} bytes, got {actual}"
            ),
            Self::BadChecksum { sum } => {
                write!(f, "entry point checksum mismatch (sum {sum:#04x})")
            }
            Self::MalformedRecord {
                offset,
                handle,
                len,
            } => write!(
                f,
                "structure too short at offset {offset:#x} (handle {handle:#06x}, length {len})"
            ),
            Self::RecordOverflow {
                offset,
                handle,
                len,
            } => write!(
                f,
                "structure overflows table at offset {offset:#x} (handle {handle:#06x}, length {len})"
            ),
            Self::StringTableOverflow { offset, handle } => write!(
                f,
                "string table overflow at offset {offset:#x} (handle {handle:#06x})"
            ),
        }
    }
}

impl core::error::Error for SmbiosError {}

impl SmbiosError {
    /// Returns `true` if the error describes the entry point rather than the
    /// structure table.
    #[must_use]
    pub fn is_entry_point_error(&self) -> bool {
        matches!(
            self,
            Self::TooShort { .. }
                | Self::BadSignature
                | Self::BadLength { .. }
                | Self::Truncated { .. }
                | Self::BadChecksum { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn display_carries_context() {
        let err = SmbiosError::RecordOverflow {
            offset: 0x40,
            handle: 0x0901,
            len: 0x11,
        };
        assert_eq!(
            err.to_string(),
            "structure overflows table at offset 0x40 (handle 0x0901, length 17)"
        );
    }

    #[test]
    fn bad_length_names_format() {
        let err = SmbiosError::BadLength {
            len: 0x10,
            format: EntryPointFormat::SixtyFourBit,
        };
        assert_eq!(err.to_string(), "bad 64-bit entry point length: 0x10");
    }

    #[test]
    fn error_groups() {
        assert!(SmbiosError::BadSignature.is_entry_point_error());
        assert!(SmbiosError::TooShort { len: 3 }.is_entry_point_error());
        assert!(
            !SmbiosError::StringTableOverflow {
                offset: 0,
                handle: 0
            }
            .is_entry_point_error()
        );
    }
}
