//! SMBIOS structure table walking.
//!
//! The structure table is a packed sequence of records. Each record is a
//! formatted area (a 4-byte header of type, length and handle, followed by
//! type-specific fields) and a string area of NUL-terminated strings closed
//! by an extra NUL:
//!
//! ```text
//! +------+-----+--------+-----------------+---------------------------+
//! | type | len | handle | fields ...      | "str1\0" "str2\0" ... "\0" |
//! +------+-----+--------+-----------------+---------------------------+
//! |<------------- len bytes ------------->|<------ string area ------>|
//! ```
//!
//! A record without strings ends in two NUL bytes. Formatted-area fields
//! refer to strings by 1-based index; index 0 means "no string".

use core::iter::FusedIterator;

use crate::SmbiosError;

/// Size of the header every structure starts with.
pub const HEADER_LEN: usize = 4;

/// Maximum number of strings a single structure may reference.
pub const MAX_STRINGS: usize = 255;

/// A structure table bounded to its declared length.
#[derive(Debug, Clone, Copy)]
pub struct StructureTable<'a> {
    data: &'a [u8],
}

impl<'a> StructureTable<'a> {
    /// Wraps `data`, considering at most `declared_len` bytes of it.
    #[must_use]
    pub fn new(data: &'a [u8], declared_len: u32) -> Self {
        let len = usize::try_from(declared_len).map_or(data.len(), |len| len.min(data.len()));
        Self {
            data: &data[..len],
        }
    }

    /// Returns the number of bytes that will be walked.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if there are no bytes to walk.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns an iterator over the records in the table.
    #[must_use]
    pub fn records(&self) -> RecordIter<'a> {
        RecordIter {
            data: self.data,
            offset: 0,
            failed: false,
        }
    }
}

/// A single delimited structure record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StructureRecord<'a> {
    offset: usize,
    record_type: u8,
    len: u8,
    handle: u16,
    /// The whole record, formatted area through closing NUL.
    bytes: &'a [u8],
    formatted: &'a [u8],
    /// String area up to, but excluding, the closing NUL.
    strings: &'a [u8],
}

impl<'a> StructureRecord<'a> {
    /// Returns the structure type (9 = System Slot).
    #[must_use]
    pub fn record_type(&self) -> u8 {
        self.record_type
    }

    /// Returns the declared length of the formatted area.
    #[must_use]
    pub fn declared_len(&self) -> u8 {
        self.len
    }

    /// Returns the structure handle.
    #[must_use]
    pub fn handle(&self) -> u16 {
        self.handle
    }

    /// Returns the offset of the structure within the table.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Returns the formatted area, header included.
    #[must_use]
    pub fn formatted_area(&self) -> &'a [u8] {
        self.formatted
    }

    /// Returns the whole record, string area and terminator included.
    ///
    /// Some structures place fields at offsets their declared length does
    /// not cover; those bytes are only reachable through this view.
    #[must_use]
    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Resolves a 1-based string reference.
    ///
    /// Returns `None` for index 0 and for references past the last string.
    #[must_use]
    pub fn string(&self, index: u8) -> Option<&'a [u8]> {
        let slot = usize::from(index).checked_sub(1)?;
        self.string_slots().nth(slot).filter(|s| !s.is_empty())
    }

    /// Returns an iterator over the strings present in the string area.
    pub fn strings(&self) -> impl Iterator<Item = &'a [u8]> + use<'a> {
        self.string_slots().filter(|s| !s.is_empty())
    }

    /// Returns the number of strings present in the string area.
    #[must_use]
    pub fn string_count(&self) -> usize {
        self.strings().count()
    }

    /// Returns the total size of the record, string area and terminator included.
    #[must_use]
    pub fn total_len(&self) -> usize {
        self.bytes.len()
    }

    /// Iterates string slots in reference order.
    ///
    /// Every slot is NUL-terminated inside `strings`, so splitting yields one
    /// trailing empty piece that is never a slot.
    fn string_slots(&self) -> impl Iterator<Item = &'a [u8]> + use<'a> {
        let strings = self.strings;
        let slots = strings.iter().filter(|&&b| b == 0).count();
        strings.split(|&b| b == 0).take(slots)
    }
}

/// Iterator over the records of a [`StructureTable`].
///
/// Yields `Err` once if the table is malformed, then stops.
#[derive(Debug, Clone)]
pub struct RecordIter<'a> {
    data: &'a [u8],
    offset: usize,
    failed: bool,
}

impl<'a> RecordIter<'a> {
    /// Returns the offset of the next record to be read.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Delimits the record at `self.offset`.
    ///
    /// Returns `Ok(None)` when fewer than [`HEADER_LEN`] bytes remain.
    fn read_record(&self) -> Result<Option<(StructureRecord<'a>, usize)>, SmbiosError> {
        let offset = self.offset;
        let Some(header) = self.data.get(offset..offset + HEADER_LEN) else {
            return Ok(None);
        };
        let record_type = header[0];
        let len = header[1];
        let handle = u16::from_le_bytes([header[2], header[3]]);

        if usize::from(len) < HEADER_LEN {
            return Err(SmbiosError::MalformedRecord {
                offset,
                handle,
                len,
            });
        }

        let formatted_end = offset + usize::from(len);
        if formatted_end > self.data.len() {
            return Err(SmbiosError::RecordOverflow {
                offset,
                handle,
                len,
            });
        }

        let (strings_end, next) = find_string_area_end(self.data, formatted_end)
            .ok_or(SmbiosError::StringTableOverflow { offset, handle })?;

        let record = StructureRecord {
            offset,
            record_type,
            len,
            handle,
            bytes: &self.data[offset..next],
            formatted: &self.data[offset..formatted_end],
            strings: &self.data[formatted_end..strings_end],
        };
        Ok(Some((record, next)))
    }
}

impl<'a> Iterator for RecordIter<'a> {
    type Item = Result<StructureRecord<'a>, SmbiosError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.read_record() {
            Ok(Some((record, next))) => {
                self.offset = next;
                Some(Ok(record))
            }
            Ok(None) => None,
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

impl FusedIterator for RecordIter<'_> {}

/// Scans the string area starting at `start`.
///
/// Returns the offset of the closing NUL and the offset just past it, or
/// `None` if the area runs off the end of `data` or holds more than
/// [`MAX_STRINGS`] strings.
///
/// A NUL in the first position is an empty first slot, so both `"\0\0"` and
/// `"str\0\0"` close a record.
fn find_string_area_end(data: &[u8], start: usize) -> Option<(usize, usize)> {
    let mut pos = start;
    let mut slot = 0;
    loop {
        if *data.get(pos)? != 0 {
            if slot == MAX_STRINGS {
                return None;
            }
            let len = data.get(pos..)?.iter().position(|&b| b == 0)?;
            pos += len + 1;
        } else if slot == 0 {
            pos += 1;
        } else {
            return Some((pos, pos + 1));
        }
        slot += 1;
    }
}
