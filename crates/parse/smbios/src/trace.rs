//! Diagnostic hooks for the decoder.
//!
//! The decoder reports its decisions (format recognised, record visited,
//! slot skipped, slot found) to a [`ScanTrace`] passed in by the caller.
//! [`NoTrace`] discards everything; [`LogTrace`] forwards to the [`log`]
//! facade at debug level.

use core::fmt;

use crate::entry::{EntryPointFormat, TableDescriptor};
use crate::slot::SystemSlot;
use crate::structure::StructureRecord;

/// Why a System Slot record did not yield a PCI address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The structure predates the segment/bus/device fields.
    TooShort,
    /// The slot type does not describe a PCI-family slot.
    NotPci,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooShort => f.write_str("structure too short for PCI address"),
            Self::NotPci => f.write_str("slot type is not PCI"),
        }
    }
}

/// Receives decoder decision points.
///
/// Every method has an empty default body, so implementors only override the
/// events they care about.
pub trait ScanTrace {
    /// The entry point anchor identified `format`.
    fn entry_point(&mut self, format: EntryPointFormat) {
        let _ = format;
    }

    /// The entry point was parsed successfully.
    fn descriptor(&mut self, descriptor: &TableDescriptor) {
        let _ = descriptor;
    }

    /// A structure record was delimited.
    fn record(&mut self, record: &StructureRecord<'_>) {
        let _ = record;
    }

    /// A System Slot record was not decoded.
    fn slot_skipped(
        &mut self,
        record: &StructureRecord<'_>,
        slot_type: u8,
        name: Option<&[u8]>,
        reason: SkipReason,
    ) {
        let _ = (record, slot_type, name, reason);
    }

    /// A System Slot record carrying a PCI address was decoded.
    fn slot_found(&mut self, slot: &SystemSlot<'_>) {
        let _ = slot;
    }
}

impl<T: ScanTrace + ?Sized> ScanTrace for &mut T {
    fn entry_point(&mut self, format: EntryPointFormat) {
        (**self).entry_point(format);
    }

    fn descriptor(&mut self, descriptor: &TableDescriptor) {
        (**self).descriptor(descriptor);
    }

    fn record(&mut self, record: &StructureRecord<'_>) {
        (**self).record(record);
    }

    fn slot_skipped(
        &mut self,
        record: &StructureRecord<'_>,
        slot_type: u8,
        name: Option<&[u8]>,
        reason: SkipReason,
    ) {
        (**self).slot_skipped(record, slot_type, name, reason);
    }

    fn slot_found(&mut self, slot: &SystemSlot<'_>) {
        (**self).slot_found(slot);
    }
}

/// A [`ScanTrace`] that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTrace;

impl ScanTrace for NoTrace {}

/// A [`ScanTrace`] that logs every event through [`log::debug!`].
#[derive(Debug, Clone, Copy, Default)]
pub struct LogTrace;

impl ScanTrace for LogTrace {
    fn entry_point(&mut self, format: EntryPointFormat) {
        log::debug!("Got {format} entry point");
    }

    fn descriptor(&mut self, descriptor: &TableDescriptor) {
        log::debug!(
            "Entry point is SMBIOS {}, len={}, addr={:#x}",
            descriptor.version(),
            descriptor.table_len(),
            descriptor.table_addr()
        );
    }

    fn record(&mut self, record: &StructureRecord<'_>) {
        log::trace!(
            "Got table type={}, handle={:#06x}, len={}",
            record.record_type(),
            record.handle(),
            record.declared_len()
        );
    }

    fn slot_skipped(
        &mut self,
        record: &StructureRecord<'_>,
        slot_type: u8,
        name: Option<&[u8]>,
        reason: SkipReason,
    ) {
        log::debug!(
            "Slot {slot_type:#x} found at {:#06x}: {} ({reason})",
            record.offset(),
            Lossy(name)
        );
    }

    fn slot_found(&mut self, slot: &SystemSlot<'_>) {
        log::debug!(
            "PCI slot '{}' found! S.BDF = {}",
            Lossy(slot.name()),
            slot.address()
        );
    }
}

/// Formats optional SMBIOS string bytes as lossy UTF-8 without allocating.
struct Lossy<'a>(Option<&'a [u8]>);

impl fmt::Display for Lossy<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(bytes) = self.0 else {
            return f.write_str("(null)");
        };
        for chunk in bytes.utf8_chunks() {
            f.write_str(chunk.valid())?;
            if !chunk.invalid().is_empty() {
                f.write_str("\u{FFFD}")?;
            }
        }
        Ok(())
    }
}
