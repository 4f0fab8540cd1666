//! PCI segment/bus/device/function addresses.

use core::fmt;
use core::str::FromStr;

/// Highest valid PCI device number.
pub const MAX_DEVICE: u8 = 0x1F;

/// Highest valid PCI function number.
pub const MAX_FUNCTION: u8 = 0x07;

/// A PCI address with segment (`ssss:bb:dd.f`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct PciAddress {
    segment: u16,
    bus: u8,
    device: u8,
    function: u8,
}

impl PciAddress {
    /// Creates an address, or `None` if `device` or `function` is out of range.
    #[must_use]
    pub const fn new(segment: u16, bus: u8, device: u8, function: u8) -> Option<Self> {
        if device > MAX_DEVICE || function > MAX_FUNCTION {
            return None;
        }
        Some(Self {
            segment,
            bus,
            device,
            function,
        })
    }

    /// Creates an address from a packed device/function byte.
    ///
    /// The device number lives in bits 7..3, the function in bits 2..0.
    #[must_use]
    pub const fn from_packed(segment: u16, bus: u8, devfn: u8) -> Self {
        Self {
            segment,
            bus,
            device: devfn >> 3,
            function: devfn & MAX_FUNCTION,
        }
    }

    /// Returns the PCI segment group.
    #[must_use]
    pub const fn segment(&self) -> u16 {
        self.segment
    }

    /// Returns the bus number.
    #[must_use]
    pub const fn bus(&self) -> u8 {
        self.bus
    }

    /// Returns the device number (0..=31).
    #[must_use]
    pub const fn device(&self) -> u8 {
        self.device
    }

    /// Returns the function number (0..=7).
    #[must_use]
    pub const fn function(&self) -> u8 {
        self.function
    }

    /// Returns the packed device/function byte.
    #[must_use]
    pub const fn devfn(&self) -> u8 {
        (self.device << 3) | self.function
    }
}

impl fmt::Display for PciAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04x}:{:02x}:{:02x}.{:x}",
            self.segment, self.bus, self.device, self.function
        )
    }
}

/// Errors from parsing a [`PciAddress`] string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParsePciAddressError {
    /// The string is not shaped like `ssss:bb:dd.f`.
    Format,
    /// The segment is not 1 to 4 hex digits.
    Segment,
    /// The bus is not 1 or 2 hex digits.
    Bus,
    /// The device is not 1 or 2 hex digits, or exceeds `0x1f`.
    Device,
    /// The function is not a single hex digit, or exceeds 7.
    Function,
}

impl fmt::Display for ParsePciAddressError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Format => f.write_str("expected segment:bus:device.function"),
            Self::Segment => f.write_str("invalid PCI segment"),
            Self::Bus => f.write_str("invalid PCI bus"),
            Self::Device => f.write_str("invalid PCI device"),
            Self::Function => f.write_str("invalid PCI function"),
        }
    }
}

impl core::error::Error for ParsePciAddressError {}

/// Parses 1 to `max_digits` hex digits.
fn parse_hex_field(s: &str, max_digits: usize) -> Option<u16> {
    if s.is_empty() || s.len() > max_digits || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    u16::from_str_radix(s, 16).ok()
}

impl FromStr for PciAddress {
    type Err = ParsePciAddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (segment, rest) = s.split_once(':').ok_or(ParsePciAddressError::Format)?;
        let (bus, rest) = rest.split_once(':').ok_or(ParsePciAddressError::Format)?;
        let (device, function) = rest.split_once('.').ok_or(ParsePciAddressError::Format)?;

        let segment = parse_hex_field(segment, 4).ok_or(ParsePciAddressError::Segment)?;
        let bus = parse_hex_field(bus, 2)
            .and_then(|b| u8::try_from(b).ok())
            .ok_or(ParsePciAddressError::Bus)?;
        let device = parse_hex_field(device, 2)
            .and_then(|d| u8::try_from(d).ok())
            .filter(|&d| d <= MAX_DEVICE)
            .ok_or(ParsePciAddressError::Device)?;
        let function = parse_hex_field(function, 1)
            .and_then(|f| u8::try_from(f).ok())
            .filter(|&f| f <= MAX_FUNCTION)
            .ok_or(ParsePciAddressError::Function)?;

        Ok(Self {
            segment,
            bus,
            device,
            function,
        })
    }
}
