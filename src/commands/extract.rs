use crate::args::OutputFormat;
use crate::commands::Out;
use crate::model::LedgerEntry;
use crate::Config;
use anyhow::{Context, Result};
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;
use tracing::{debug, info};

/// The number of entries extracted from one file.
#[derive(Debug, Clone, Serialize, Eq, PartialEq)]
pub struct ExtractedFile {
    path: PathBuf,
    transactions: usize,
    balances: usize,
}

impl ExtractedFile {
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    pub fn transactions(&self) -> usize {
        self.transactions
    }

    pub fn balances(&self) -> usize {
        self.balances
    }
}

/// What `extract` did with its files.
#[derive(Debug, Clone, Default, Serialize, Eq, PartialEq)]
pub struct Extraction {
    extracted: Vec<ExtractedFile>,
    skipped: Vec<PathBuf>,
}

impl Extraction {
    pub fn extracted(&self) -> &[ExtractedFile] {
        &self.extracted
    }

    pub fn skipped(&self) -> &[PathBuf] {
        &self.skipped
    }
}

/// Extracts the entries of every recognized file in `files` and writes them to `out` in `format`.
///
/// Nothing is written if any recognized file fails to parse.
///
/// # Errors
/// Returns an error if a file cannot be read, a recognized file is malformed, or `out` cannot be
/// written.
pub fn extract<W: Write>(
    config: &Config,
    files: &[PathBuf],
    format: OutputFormat,
    out: &mut W,
) -> Result<Out<Extraction>> {
    let importer = config.importer();
    let mut extraction = Extraction::default();
    let mut entries: Vec<LedgerEntry> = Vec::new();

    for path in files {
        let recognized = importer
            .identify(path)
            .with_context(|| format!("Unable to read {}", path.display()))?;
        if !recognized {
            info!("Skipping {}, not a statement for this account", path.display());
            extraction.skipped.push(path.clone());
            continue;
        }

        let extracted = importer
            .extract(path)
            .with_context(|| format!("Unable to extract {}", path.display()))?;
        let balances = extracted
            .iter()
            .filter(|e| e.as_balance().is_some())
            .count();
        debug!("Extracted {} entries from {}", extracted.len(), path.display());
        extraction.extracted.push(ExtractedFile {
            path: path.clone(),
            transactions: extracted.len() - balances,
            balances,
        });
        entries.extend(extracted);
    }

    write_entries(&entries, format, out)?;

    Ok(Out::new(
        format!(
            "Extracted {} entries from {} files, skipped {}",
            entries.len(),
            extraction.extracted.len(),
            extraction.skipped.len()
        ),
        extraction,
    ))
}

fn write_entries<W: Write>(entries: &[LedgerEntry], format: OutputFormat, out: &mut W) -> Result<()> {
    match format {
        OutputFormat::Ledger => {
            for entry in entries {
                writeln!(out, "{entry}\n")?;
            }
        }
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, entries)
                .context("Unable to serialize entries")?;
            writeln!(out)?;
        }
    }
    out.flush().context("Unable to flush output")
}
