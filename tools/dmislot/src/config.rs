//! Settings resolution for dmislot.
//!
//! Three layers, later ones winning: built-in defaults (the Linux sysfs
//! paths), an optional TOML file named by `--config`, and command-line
//! flags.
//!
//! ```toml
//! entry-point = "/tmp/smbios_entry_point"
//! dmi-table = "/tmp/DMI"
//! verify-checksum = true
//! verbose = false
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use dmislot_smbios::SlotQuery;
use serde::Deserialize;

use crate::cli::Cli;
use crate::verbose::Verbosity;

/// Default location of the SMBIOS entry point on Linux.
pub const DEFAULT_ENTRY_POINT: &str = "/sys/firmware/dmi/tables/smbios_entry_point";

/// Default location of the DMI structure table on Linux.
pub const DEFAULT_DMI_TABLE: &str = "/sys/firmware/dmi/tables/DMI";

/// Contents of a `--config` file. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileConfig {
    pub entry_point: Option<PathBuf>,
    pub dmi_table: Option<PathBuf>,
    pub verify_checksum: Option<bool>,
    pub verbose: Option<bool>,
}

impl FileConfig {
    /// Loads and parses a config file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("failed to parse config {}", path.display()))
    }
}

/// Fully resolved settings for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub entry_point: PathBuf,
    pub dmi_table: PathBuf,
    pub query: SlotQuery,
    pub verify_checksum: bool,
    pub verbosity: Verbosity,
}

impl Settings {
    /// Resolves settings from the CLI, reading `--config` if given.
    pub fn resolve(cli: &Cli) -> Result<Self> {
        let file = match &cli.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        Ok(Self::merge(cli, file))
    }

    /// Layers `cli` over `file` over the built-in defaults.
    pub fn merge(cli: &Cli, file: FileConfig) -> Self {
        let entry_point = cli
            .entry_point
            .clone()
            .or(file.entry_point)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_ENTRY_POINT));
        let dmi_table = cli
            .dmi_table
            .clone()
            .or(file.dmi_table)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DMI_TABLE));

        // clap guarantees exactly one of `--pci` / `--all`.
        let query = match cli.pci {
            Some(address) => SlotQuery::Exact(address),
            None => SlotQuery::All,
        };

        let mut verbosity = Verbosity::from_flags(cli.quiet, cli.verbose);
        if file.verbose == Some(true) && verbosity == Verbosity::Default {
            verbosity = Verbosity::Verbose;
        }

        Self {
            entry_point,
            dmi_table,
            query,
            verify_checksum: cli.verify_checksum || file.verify_checksum.unwrap_or(false),
            verbosity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("dmislot").chain(args.iter().copied())).unwrap()
    }

    fn file(text: &str) -> FileConfig {
        toml::from_str(text).unwrap()
    }

    #[test]
    fn defaults_are_sysfs_paths() {
        let settings = Settings::merge(&cli(&["-a"]), FileConfig::default());
        assert_eq!(settings.entry_point, PathBuf::from(DEFAULT_ENTRY_POINT));
        assert_eq!(settings.dmi_table, PathBuf::from(DEFAULT_DMI_TABLE));
        assert_eq!(settings.query, SlotQuery::All);
        assert!(!settings.verify_checksum);
        assert_eq!(settings.verbosity, Verbosity::Default);
    }

    #[test]
    fn file_overrides_defaults() {
        let config = file(
            r#"
            entry-point = "/tmp/ep"
            dmi-table = "/tmp/dmi"
            verify-checksum = true
            verbose = true
            "#,
        );
        let settings = Settings::merge(&cli(&["-a"]), config);
        assert_eq!(settings.entry_point, PathBuf::from("/tmp/ep"));
        assert_eq!(settings.dmi_table, PathBuf::from("/tmp/dmi"));
        assert!(settings.verify_checksum);
        assert_eq!(settings.verbosity, Verbosity::Verbose);
    }

    #[test]
    fn flags_override_file() {
        let config = file(
            r#"
            entry-point = "/tmp/ep"
            verbose = true
            "#,
        );
        let settings = Settings::merge(&cli(&["-p", "0000:02:03.1", "-e", "ep", "-q"]), config);
        assert_eq!(settings.entry_point, PathBuf::from("ep"));
        assert_eq!(settings.verbosity, Verbosity::Quiet);
        assert_eq!(
            settings.query,
            SlotQuery::Exact("0000:02:03.1".parse().unwrap())
        );
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(toml::from_str::<FileConfig>("entry_point = \"/tmp/ep\"").is_err());
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let err = FileConfig::load(Path::new("/nonexistent/dmislot.toml")).unwrap_err();
        assert!(format!("{err:#}").contains("failed to read config"));
    }
}
