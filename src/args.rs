//! These structs provide the CLI interface for the ing-import CLI.

use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::error;
use tracing_subscriber::filter::LevelFilter;

/// ing-import: Turns ING (ING-DiBa) CSV transaction reports into ledger entries.
///
/// The program reads "Umsatzanzeige" CSV files downloaded from ING online banking, checks that they
/// belong to the configured account and prints one transaction per booked row, plus opening and
/// closing balance assertions when the file declares its sort order.
///
/// The account is configured in a JSON file, by default ing-import/config.json under your
/// platform's configuration directory. It holds the IBAN, the ledger account name, the customer
/// name printed on the statement and, optionally, the file encoding.
#[derive(Debug, Parser, Clone)]
pub struct Args {
    #[clap(flatten)]
    common: Common,

    #[command(subcommand)]
    command: Command,
}

impl Args {
    pub fn common(&self) -> &Common {
        &self.common
    }

    pub fn command(&self) -> &Command {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Print the ledger account of each file that is a statement for the configured account.
    ///
    /// Files that are not recognized are skipped.
    Identify(IdentifyArgs),
    /// Print the ledger entries of each recognized file.
    ///
    /// Files that are not recognized are skipped. A recognized file that cannot be parsed stops
    /// the program with an error.
    Extract(ExtractArgs),
}

/// Arguments common to all subcommands.
#[derive(Debug, Parser, Clone)]
pub struct Common {
    /// The logging verbosity. One of, from least to most verbose:
    /// off, error, warn, info, debug, trace
    ///
    /// This can be overridden by RUST_LOG.
    #[arg(long, default_value_t = LevelFilter::INFO)]
    log_level: LevelFilter,

    /// The configuration file. Defaults to ing-import/config.json in your configuration directory.
    #[arg(long, env = "ING_IMPORT_CONFIG", default_value_t = default_config_path())]
    config: DisplayPath,
}

impl Common {
    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    pub fn config(&self) -> &DisplayPath {
        &self.config
    }
}

/// (Not shown): Args for the `ing-import identify` command.
#[derive(Debug, Parser, Clone)]
pub struct IdentifyArgs {
    /// The CSV files to check.
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

impl IdentifyArgs {
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }
}

/// (Not shown): Args for the `ing-import extract` command.
#[derive(Debug, Parser, Clone)]
pub struct ExtractArgs {
    /// How the entries are printed.
    #[arg(long, value_enum, default_value_t = OutputFormat::Ledger)]
    format: OutputFormat,

    /// The CSV files to extract.
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

impl ExtractArgs {
    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }
}

/// The output format of `extract`.
#[derive(
    Debug, Default, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// Plain-text ledger entries separated by blank lines.
    #[default]
    Ledger,
    /// A JSON array of entries.
    Json,
}

serde_plain::derive_display_from_serialize!(OutputFormat);
serde_plain::derive_fromstr_from_deserialize!(OutputFormat);

fn default_config_path() -> DisplayPath {
    DisplayPath(match dirs::config_dir() {
        Some(dir) => dir.join("ing-import").join(crate::config::CONFIG_JSON),
        None => {
            error!(
                "There was an error when trying to get your configuration directory. You can get \
                around this by providing --config or ING_IMPORT_CONFIG instead of relying on the \
                default configuration file. If you continue using the program right now, you may \
                have problems!",
            );
            PathBuf::from(crate::config::CONFIG_JSON)
        }
    })
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DisplayPath(PathBuf);

impl From<PathBuf> for DisplayPath {
    fn from(value: PathBuf) -> Self {
        DisplayPath(value)
    }
}

impl Deref for DisplayPath {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<Path> for DisplayPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl Display for DisplayPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_string_lossy())
    }
}

impl FromStr for DisplayPath {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(PathBuf::from(s)))
    }
}

impl DisplayPath {
    pub fn path(&self) -> &Path {
        &self.0
    }
}
