//! System Slot (type 9) decoding and PCI address queries.
//!
//! Since SMBIOS 2.6 a System Slot structure carries the segment, bus and
//! device/function of the device in the slot:
//!
//! | Offset | Field                          |
//! |--------|--------------------------------|
//! | 0x04   | slot designation (string ref)  |
//! | 0x05   | slot type                      |
//! | 0x0D   | segment group number (16-bit)  |
//! | 0x0F   | bus number                     |
//! | 0x10   | device (7:3) / function (2:0)  |

use core::ops::RangeInclusive;

use crate::bytes::{read_u8_at, read_u16_le_at};
use crate::pci::PciAddress;
use crate::structure::{RecordIter, StructureRecord, StructureTable};
use crate::trace::{NoTrace, ScanTrace, SkipReason};
use crate::SmbiosError;

/// Structure type of a System Slot.
pub const SYSTEM_SLOT_TYPE: u8 = 9;

/// Offset of the slot designation string reference.
pub const SLOT_DESIGNATION_OFFSET: usize = 0x04;

/// Offset of the slot type.
pub const SLOT_TYPE_OFFSET: usize = 0x05;

/// Offset of the segment group number.
pub const SEGMENT_OFFSET: usize = 0x0D;

/// Offset of the bus number.
pub const BUS_OFFSET: usize = 0x0F;

/// Offset of the packed device/function byte.
pub const DEVFN_OFFSET: usize = 0x10;

/// Structures shorter than this predate the PCI address fields.
pub const PCI_FIELDS_MIN_LEN: u8 = 0x10;

/// Slot types of the PCI family: PCI, PCI-X, AGP and PCI Express variants.
const PCI_SLOT_TYPES: [u8; 8] = [0x06, 0x0E, 0x12, 0x1F, 0x20, 0x21, 0x22, 0x23];

/// PCI Express slot types in the 0xA5.. block.
const PCI_EXPRESS_SLOT_TYPES: RangeInclusive<u8> = 0xA5..=0xB6;

/// Returns `true` if `slot_type` describes a slot with a PCI address.
#[must_use]
pub fn is_pci_slot_type(slot_type: u8) -> bool {
    PCI_SLOT_TYPES.contains(&slot_type) || PCI_EXPRESS_SLOT_TYPES.contains(&slot_type)
}

/// A System Slot that carries a PCI address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SystemSlot<'a> {
    handle: u16,
    offset: usize,
    slot_type: u8,
    name: Option<&'a [u8]>,
    address: PciAddress,
}

impl<'a> SystemSlot<'a> {
    /// Returns the handle of the System Slot structure.
    #[must_use]
    pub fn handle(&self) -> u16 {
        self.handle
    }

    /// Returns the offset of the structure within the table.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Returns the SMBIOS slot type code.
    #[must_use]
    pub fn slot_type(&self) -> u8 {
        self.slot_type
    }

    /// Returns the raw slot designation, if the structure references one.
    ///
    /// SMBIOS strings are not guaranteed to be UTF-8.
    #[must_use]
    pub fn name(&self) -> Option<&'a [u8]> {
        self.name
    }

    /// Returns the PCI address of the device in the slot.
    #[must_use]
    pub fn address(&self) -> PciAddress {
        self.address
    }

    /// Decodes `record` if it is a System Slot with a PCI address.
    ///
    /// Other structure types return `None` silently; System Slots that are
    /// too short or not PCI are reported to `trace` before returning `None`.
    pub fn decode(record: &StructureRecord<'a>, trace: &mut impl ScanTrace) -> Option<Self> {
        if record.record_type() != SYSTEM_SLOT_TYPE {
            return None;
        }

        let area = record.formatted_area();
        let name = read_u8_at(area, SLOT_DESIGNATION_OFFSET).and_then(|i| record.string(i));
        let slot_type = read_u8_at(area, SLOT_TYPE_OFFSET).unwrap_or(0);

        if record.declared_len() < PCI_FIELDS_MIN_LEN {
            trace.slot_skipped(record, slot_type, name, SkipReason::TooShort);
            return None;
        }
        if !is_pci_slot_type(slot_type) {
            trace.slot_skipped(record, slot_type, name, SkipReason::NotPci);
            return None;
        }

        // A 0x10-byte structure ends just before the device/function byte,
        // which then overlaps the string area.
        let bytes = record.bytes();
        let (Some(segment), Some(bus), Some(devfn)) = (
            read_u16_le_at(bytes, SEGMENT_OFFSET),
            read_u8_at(bytes, BUS_OFFSET),
            read_u8_at(bytes, DEVFN_OFFSET),
        ) else {
            trace.slot_skipped(record, slot_type, name, SkipReason::TooShort);
            return None;
        };

        let slot = Self {
            handle: record.handle(),
            offset: record.offset(),
            slot_type,
            name,
            address: PciAddress::from_packed(segment, bus, devfn),
        };
        trace.slot_found(&slot);
        Some(slot)
    }
}

/// Which slots a scan is looking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotQuery {
    /// Every System Slot with a PCI address.
    All,
    /// The System Slot whose address equals this one in all four fields.
    Exact(PciAddress),
}

impl SlotQuery {
    /// Returns `true` if a slot at `address` satisfies the query.
    #[must_use]
    pub fn matches(&self, address: &PciAddress) -> bool {
        match self {
            Self::All => true,
            Self::Exact(target) => target == address,
        }
    }
}

/// Iterator over the PCI-bearing System Slots of a structure table.
///
/// Yields `Err` once if the table is malformed, then stops.
pub struct SlotIter<'a, T = NoTrace> {
    records: RecordIter<'a>,
    trace: T,
}

impl<'a, T: ScanTrace> Iterator for SlotIter<'a, T> {
    type Item = Result<SystemSlot<'a>, SmbiosError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let record = match self.records.next()? {
                Ok(record) => record,
                Err(e) => return Some(Err(e)),
            };
            self.trace.record(&record);
            if let Some(slot) = SystemSlot::decode(&record, &mut self.trace) {
                return Some(Ok(slot));
            }
        }
    }
}

/// Returns an iterator over the PCI-bearing System Slots in `data`.
///
/// At most `declared_len` bytes of `data` are walked.
#[must_use]
pub fn slots(data: &[u8], declared_len: u32) -> SlotIter<'_> {
    slots_traced(data, declared_len, NoTrace)
}

/// Like [`slots`], reporting decision points to `trace`.
#[must_use]
pub fn slots_traced<T: ScanTrace>(
    data: &[u8],
    declared_len: u32,
    trace: T,
) -> SlotIter<'_, T> {
    SlotIter {
        records: StructureTable::new(data, declared_len).records(),
        trace,
    }
}

/// Finds the first System Slot satisfying `query`.
///
/// The walk stops at the first match; records after it are not examined.
///
/// # Errors
///
/// Returns the first structural error met before a match.
pub fn scan<'a>(
    data: &'a [u8],
    declared_len: u32,
    query: &SlotQuery,
) -> Result<Option<SystemSlot<'a>>, SmbiosError> {
    scan_traced(data, declared_len, query, &mut NoTrace)
}

/// Like [`scan`], reporting decision points to `trace`.
///
/// # Errors
///
/// See [`scan`].
pub fn scan_traced<'a>(
    data: &'a [u8],
    declared_len: u32,
    query: &SlotQuery,
    trace: &mut impl ScanTrace,
) -> Result<Option<SystemSlot<'a>>, SmbiosError> {
    for slot in slots_traced(data, declared_len, trace) {
        let slot = slot?;
        if query.matches(&slot.address()) {
            return Ok(Some(slot));
        }
    }
    Ok(None)
}

/// Collects every PCI-bearing System Slot in table order.
///
/// # Errors
///
/// Returns the first structural error in the table; slots decoded before it
/// are discarded.
#[cfg(feature = "alloc")]
pub fn scan_all(
    data: &[u8],
    declared_len: u32,
) -> Result<alloc::vec::Vec<SystemSlot<'_>>, SmbiosError> {
    scan_all_traced(data, declared_len, &mut NoTrace)
}

/// Like [`scan_all`], reporting decision points to `trace`.
///
/// # Errors
///
/// See [`scan_all`].
#[cfg(feature = "alloc")]
pub fn scan_all_traced<'a>(
    data: &'a [u8],
    declared_len: u32,
    trace: &mut impl ScanTrace,
) -> Result<alloc::vec::Vec<SystemSlot<'a>>, SmbiosError> {
    slots_traced(data, declared_len, trace).collect()
}

#[cfg(all(test, feature = "alloc"))]
mod tests {
    use super::*;
    use crate::structure::tests::{push_end_of_table, push_record};
    use alloc::vec;
    use alloc::vec::Vec;

    // ---- Builders -----------------------------------------------------------

    /// Type 9 fields after the header, SMBIOS 2.6 layout (length 0x11).
    fn slot_fields(name_index: u8, slot_type: u8, segment: u16, bus: u8, devfn: u8) -> Vec<u8> {
        let mut fields = vec![
            name_index, // 0x04 designation
            slot_type,  // 0x05 type
            0x0D,       // 0x06 data bus width (x16)
            0x04,       // 0x07 current usage (in use)
            0x04,       // 0x08 length (long)
            0x01,       // 0x09 slot ID
            0x00,       // 0x0A
            0x0C,       // 0x0B characteristics 1
            0x01,       // 0x0C characteristics 2
        ];
        fields.extend_from_slice(&segment.to_le_bytes()); // 0x0D
        fields.push(bus); // 0x0F
        fields.push(devfn); // 0x10
        fields
    }

    fn len_of(table: &[u8]) -> u32 {
        u32::try_from(table.len()).unwrap()
    }

    /// A BIOS record, one PCIe slot at 0000:02:03.1 named "Slot1", and the
    /// end-of-table marker.
    fn single_slot_table() -> Vec<u8> {
        let mut table = Vec::new();
        push_record(&mut table, 0, 0x0000, &[1, 2, 0, 0], &["Vendor", "1.0"]);
        push_record(&mut table, 9, 0x0900, &slot_fields(1, 0x06, 0, 0x02, 0x19), &["Slot1"]);
        push_end_of_table(&mut table, 0xFEFF);
        table
    }

    fn addr(s: &str) -> PciAddress {
        s.parse().unwrap()
    }

    // ---- Queries ------------------------------------------------------------

    #[test]
    fn exact_match_returns_name() {
        let table = single_slot_table();
        let query = SlotQuery::Exact(addr("0000:02:03.1"));
        let slot = scan(&table, len_of(&table), &query).unwrap().unwrap();
        assert_eq!(slot.name(), Some(&b"Slot1"[..]));
        assert_eq!(slot.handle(), 0x0900);
        assert_eq!(slot.slot_type(), 0x06);
    }

    #[test]
    fn exact_mismatch_is_not_found() {
        let table = single_slot_table();
        for other in ["0000:02:03.2", "0000:02:04.1", "0000:03:03.1", "0001:02:03.1"] {
            let query = SlotQuery::Exact(addr(other));
            assert_eq!(scan(&table, len_of(&table), &query), Ok(None), "{other}");
        }
    }

    #[test]
    fn all_returns_every_pci_slot() {
        let table = single_slot_table();
        let slots = scan_all(&table, len_of(&table)).unwrap();
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].address(), PciAddress::new(0, 0x02, 0x03, 0x1).unwrap());
        assert_eq!(slots[0].name(), Some(&b"Slot1"[..]));
    }

    #[test]
    fn all_query_in_scan_returns_first_slot() {
        let table = single_slot_table();
        let slot = scan(&table, len_of(&table), &SlotQuery::All).unwrap().unwrap();
        assert_eq!(slot.address(), addr("0000:02:03.1"));
    }

    #[test]
    fn scan_all_is_repeatable() {
        let mut table = single_slot_table();
        push_record(&mut table, 9, 0x0901, &slot_fields(1, 0xA5, 1, 0x40, 0x00), &["Slot2"]);
        let first = scan_all(&table, len_of(&table)).unwrap();
        let second = scan_all(&table, len_of(&table)).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
    }

    #[test]
    fn multiple_slots_in_table_order() {
        let mut table = Vec::new();
        push_record(&mut table, 9, 0x0900, &slot_fields(1, 0xA5, 0, 0x01, 0x00), &["PCIE1"]);
        push_record(&mut table, 9, 0x0901, &slot_fields(1, 0xB6, 0, 0x02, 0x08), &["PCIE2"]);
        push_record(&mut table, 9, 0x0902, &slot_fields(1, 0x12, 0, 0x03, 0x10), &["PCIX"]);
        push_end_of_table(&mut table, 0xFEFF);

        let names: Vec<_> = scan_all(&table, len_of(&table))
            .unwrap()
            .iter()
            .map(|s| s.name().unwrap())
            .collect();
        assert_eq!(names, vec![&b"PCIE1"[..], &b"PCIE2"[..], &b"PCIX"[..]]);

        let slot = scan(&table, len_of(&table), &SlotQuery::Exact(addr("0000:02:01.0")))
            .unwrap()
            .unwrap();
        assert_eq!(slot.name(), Some(&b"PCIE2"[..]));
    }

    // ---- Record filtering ---------------------------------------------------

    #[test]
    fn short_slot_is_skipped() {
        let mut fields = slot_fields(1, 0x06, 0, 0x02, 0x19);
        fields.truncate(0x0F - 4);
        let mut table = Vec::new();
        push_record(&mut table, 9, 0x0900, &fields, &["Old"]);
        assert!(scan_all(&table, len_of(&table)).unwrap().is_empty());
    }

    #[test]
    fn minimal_pci_slot_reads_devfn_past_formatted_area() {
        let mut fields = slot_fields(1, 0x06, 0, 0x02, 0x19);
        fields.truncate(usize::from(PCI_FIELDS_MIN_LEN) - 4);
        let mut table = Vec::new();
        // The first string byte doubles as the device/function byte.
        push_record(&mut table, 9, 0x0900, &fields, &["\u{19}Edge"]);
        push_end_of_table(&mut table, 0xFEFF);

        let slots = scan_all(&table, len_of(&table)).unwrap();
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].address(), addr("0000:02:03.1"));
        assert_eq!(slots[0].name(), Some(&b"\x19Edge"[..]));

        let query = SlotQuery::Exact(addr("0000:02:03.1"));
        assert!(scan(&table, len_of(&table), &query).unwrap().is_some());
    }

    #[test]
    fn non_pci_slot_types_are_skipped() {
        let mut table = Vec::new();
        for (i, slot_type) in [0x03u8, 0x0A, 0x24, 0xA4, 0xB7, 0xFF].into_iter().enumerate() {
            let handle = 0x0900 + u16::try_from(i).unwrap();
            push_record(&mut table, 9, handle, &slot_fields(1, slot_type, 0, 1, 0), &["X"]);
        }
        assert!(scan_all(&table, len_of(&table)).unwrap().is_empty());
    }

    #[test]
    fn pci_slot_type_set() {
        for t in [0x06, 0x0E, 0x12, 0x1F, 0x20, 0x21, 0x22, 0x23, 0xA5, 0xB0, 0xB6] {
            assert!(is_pci_slot_type(t), "{t:#x}");
        }
        for t in [0x00, 0x05, 0x07, 0x1E, 0x24, 0xA4, 0xB7] {
            assert!(!is_pci_slot_type(t), "{t:#x}");
        }
    }

    #[test]
    fn other_types_with_slot_shape_are_ignored() {
        let mut table = Vec::new();
        push_record(&mut table, 8, 0x0800, &slot_fields(1, 0x06, 0, 0x02, 0x19), &["Port"]);
        assert!(scan_all(&table, len_of(&table)).unwrap().is_empty());
    }

    #[test]
    fn missing_name_reference() {
        let mut table = Vec::new();
        push_record(&mut table, 9, 0x0900, &slot_fields(0, 0x06, 0, 0x02, 0x19), &["Unused"]);
        push_record(&mut table, 9, 0x0901, &slot_fields(3, 0x06, 0, 0x02, 0x1A), &["Only"]);
        let slots = scan_all(&table, len_of(&table)).unwrap();
        assert_eq!(slots.len(), 2);
        assert_eq!(slots[0].name(), None);
        assert_eq!(slots[1].name(), None);
    }

    // ---- Failure semantics --------------------------------------------------

    #[test]
    fn exact_match_stops_before_later_corruption() {
        let mut table = single_slot_table();
        table.extend_from_slice(&[9, 3, 0xAD, 0xDE, 0, 0]);
        let query = SlotQuery::Exact(addr("0000:02:03.1"));
        assert!(scan(&table, len_of(&table), &query).unwrap().is_some());
    }

    #[test]
    fn corruption_discards_partial_results() {
        let mut table = single_slot_table();
        table.extend_from_slice(&[9, 3, 0xAD, 0xDE, 0, 0]);
        assert_eq!(
            scan_all(&table, len_of(&table)),
            Err(SmbiosError::MalformedRecord {
                offset: single_slot_table().len(),
                handle: 0xDEAD,
                len: 3
            })
        );

        let query = SlotQuery::Exact(addr("0000:07:00.0"));
        assert!(matches!(
            scan(&table, len_of(&table), &query),
            Err(SmbiosError::MalformedRecord { .. })
        ));
    }

    #[test]
    fn declared_length_bounds_the_scan() {
        let table = single_slot_table();
        // Cut inside the slot record: its formatted area no longer fits.
        let cut = u32::try_from(20 + 8).unwrap();
        assert!(matches!(
            scan_all(&table, cut),
            Err(SmbiosError::RecordOverflow { handle: 0x0900, .. })
        ));
    }

    // ---- Tracing ------------------------------------------------------------

    #[derive(Default)]
    struct Recorder {
        records: usize,
        skipped: Vec<(u16, SkipReason)>,
        found: Vec<PciAddress>,
    }

    impl ScanTrace for Recorder {
        fn record(&mut self, _record: &StructureRecord<'_>) {
            self.records += 1;
        }

        fn slot_skipped(
            &mut self,
            record: &StructureRecord<'_>,
            _slot_type: u8,
            _name: Option<&[u8]>,
            reason: SkipReason,
        ) {
            self.skipped.push((record.handle(), reason));
        }

        fn slot_found(&mut self, slot: &SystemSlot<'_>) {
            self.found.push(slot.address());
        }
    }

    #[test]
    fn trace_sees_decisions() {
        let mut short = slot_fields(1, 0x06, 0, 0x02, 0x19);
        short.truncate(0x0F - 4);

        let mut table = Vec::new();
        push_record(&mut table, 9, 0x0900, &short, &["Old"]);
        push_record(&mut table, 9, 0x0901, &slot_fields(1, 0x0A, 0, 0, 0), &["ISA"]);
        push_record(&mut table, 9, 0x0902, &slot_fields(1, 0xA8, 0, 0x05, 0x00), &["M.2"]);
        push_end_of_table(&mut table, 0xFEFF);

        let mut recorder = Recorder::default();
        let slots = scan_all_traced(&table, len_of(&table), &mut recorder).unwrap();
        assert_eq!(slots.len(), 1);
        assert_eq!(recorder.records, 4);
        assert_eq!(
            recorder.skipped,
            vec![(0x0900, SkipReason::TooShort), (0x0901, SkipReason::NotPci)]
        );
        assert_eq!(recorder.found, vec![addr("0000:05:00.0")]);
    }

    #[test]
    fn exact_scan_trace_stops_at_match() {
        let mut table = single_slot_table();
        push_record(&mut table, 9, 0x0901, &slot_fields(1, 0x06, 0, 0x09, 0), &["Later"]);
        let mut recorder = Recorder::default();
        let query = SlotQuery::Exact(addr("0000:02:03.1"));
        scan_traced(&table, len_of(&table), &query, &mut recorder).unwrap();
        assert_eq!(recorder.records, 2);
        assert_eq!(recorder.found.len(), 1);
    }
}
