//! Rendering lookup results to stdout.

use std::io::{self, Write};

use dmislot_smbios::SystemSlot;

/// Writes the raw designation of a matched slot, without a trailing newline.
pub fn write_name(out: &mut impl Write, slot: &SystemSlot<'_>) -> io::Result<()> {
    out.write_all(slot.name().unwrap_or_default())?;
    out.flush()
}

/// Writes one `ssss.bb:dd.f<TAB>name` line per slot.
pub fn write_list(out: &mut impl Write, slots: &[SystemSlot<'_>]) -> io::Result<()> {
    for slot in slots {
        let address = slot.address();
        write!(
            out,
            "{:04x}.{:02x}:{:02x}.{:x}\t",
            address.segment(),
            address.bus(),
            address.device(),
            address.function()
        )?;
        out.write_all(slot.name().unwrap_or_default())?;
        out.write_all(b"\n")?;
    }
    out.flush()
}
