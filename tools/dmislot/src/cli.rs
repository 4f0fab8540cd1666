//! Command-line interface definitions for dmislot.

use std::path::PathBuf;

use clap::{ArgAction, ArgGroup, Parser};
use dmislot_smbios::PciAddress;

/// Print the SMBIOS System Slot designation of a PCI device.
#[derive(Debug, Parser)]
#[command(name = "dmislot", version, about)]
#[command(group(ArgGroup::new("query").required(true).args(["pci", "all"])))]
pub struct Cli {
    /// SMBIOS entry point file.
    #[arg(long, short = 'e', value_name = "PATH")]
    pub entry_point: Option<PathBuf>,

    /// DMI structure table file.
    #[arg(long, short = 'd', value_name = "PATH")]
    pub dmi_table: Option<PathBuf>,

    /// PCI address to look up, as segment:bus:device.function (e.g. 0000:02:03.1).
    #[arg(long, short = 'p', value_name = "SBDF")]
    pub pci: Option<PciAddress>,

    /// List every PCI slot as `ssss.bb:dd.f<TAB>name`.
    #[arg(long, short = 'a')]
    pub all: bool,

    /// Reject entry points whose checksum does not validate.
    #[arg(long)]
    pub verify_checksum: bool,

    /// TOML file with default settings.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Print diagnostics to stderr (repeat for per-structure tracing).
    #[arg(long, short = 'v', action = ArgAction::Count, conflicts_with = "quiet")]
    pub verbose: u8,

    /// Only report errors.
    #[arg(long, short = 'q')]
    pub quiet: bool,
}
