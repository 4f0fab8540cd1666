//! dmislot: print the SMBIOS System Slot designation of a PCI device.
//!
//! Reads the SMBIOS entry point and DMI structure table (from sysfs by
//! default), then either prints the name of the slot holding one PCI
//! address or lists every PCI slot the firmware describes.
//!
//! Exit status:
//! - `0`: success
//! - `1`: bad arguments, unreadable files, or a truncated table
//! - `2`: no slot matches the requested address
//! - `3`: the firmware tables are malformed

mod cli;
mod config;
mod report;
mod source;
mod verbose;

use std::io;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use dmislot_smbios::{LogTrace, SlotQuery, SmbiosError, entry};

use crate::cli::Cli;
use crate::config::Settings;

/// Arguments, I/O, or configuration problem.
const EXIT_INPUT_ERROR: u8 = 1;
/// Exact lookup found no matching slot.
const EXIT_NOT_FOUND: u8 = 2;
/// The firmware tables failed to decode.
const EXIT_DECODE_ERROR: u8 = 3;

/// Result of a lookup that ran to completion.
enum Outcome {
    Found,
    NotFound,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::from(EXIT_INPUT_ERROR)
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    match run(&cli) {
        Ok(Outcome::Found) => ExitCode::SUCCESS,
        Ok(Outcome::NotFound) => ExitCode::from(EXIT_NOT_FOUND),
        Err(e) => {
            eprintln!("ERROR: {e:#}");
            ExitCode::from(exit_code_for(&e))
        }
    }
}

/// Classifies a fatal error into an exit status.
fn exit_code_for(err: &anyhow::Error) -> u8 {
    if err.downcast_ref::<SmbiosError>().is_some() {
        EXIT_DECODE_ERROR
    } else {
        EXIT_INPUT_ERROR
    }
}

/// Wraps a decoder error with the part of the firmware data it concerns.
fn decode_error(err: SmbiosError) -> anyhow::Error {
    let what = if err.is_entry_point_error() {
        "bad SMBIOS entry point"
    } else {
        "bad DMI table"
    };
    anyhow::Error::new(err).context(what)
}

fn run(cli: &Cli) -> Result<Outcome> {
    let settings = Settings::resolve(cli)?;
    verbose::init(settings.verbosity);

    let ep = source::read_entry_point(&settings.entry_point)?;
    let descriptor = if settings.verify_checksum {
        entry::parse_checked_traced(&ep, &mut LogTrace)
    } else {
        entry::parse_traced(&ep, &mut LogTrace)
    }
    .map_err(decode_error)?;

    let table_len = descriptor.table_len();
    let table = source::read_table(&settings.dmi_table, table_len)?;

    let mut out = io::stdout().lock();
    match settings.query {
        SlotQuery::All => {
            let slots = dmislot_smbios::scan_all_traced(&table, table_len, &mut LogTrace)
                .map_err(decode_error)?;
            log::debug!("{} PCI slot(s) found", slots.len());
            report::write_list(&mut out, &slots).context("failed to write output")?;
            Ok(Outcome::Found)
        }
        query @ SlotQuery::Exact(address) => {
            match dmislot_smbios::scan_traced(&table, table_len, &query, &mut LogTrace)
                .map_err(decode_error)?
            {
                Some(slot) => {
                    report::write_name(&mut out, &slot).context("failed to write output")?;
                    Ok(Outcome::Found)
                }
                None => {
                    log::warn!("no PCI slot found for {address}");
                    Ok(Outcome::NotFound)
                }
            }
        }
    }
}
