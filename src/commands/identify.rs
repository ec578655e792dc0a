use crate::commands::Out;
use crate::Config;
use anyhow::{Context, Result};
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;
use tracing::info;

/// Whether a file was recognized, and the account it belongs to if so.
#[derive(Debug, Clone, Serialize, Eq, PartialEq)]
pub struct Identification {
    path: PathBuf,
    account: Option<String>,
}

impl Identification {
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    pub fn account(&self) -> Option<&str> {
        self.account.as_deref()
    }
}

/// Checks every file in `files` and writes `<file>: <account>` to `out` for each one that is a
/// statement for the configured account.
///
/// # Errors
/// Returns an error if a file cannot be read or `out` cannot be written.
pub fn identify<W: Write>(
    config: &Config,
    files: &[PathBuf],
    out: &mut W,
) -> Result<Out<Vec<Identification>>> {
    let importer = config.importer();
    let mut results = Vec::with_capacity(files.len());
    for path in files {
        let recognized = importer
            .identify(path)
            .with_context(|| format!("Unable to read {}", path.display()))?;
        let account = if recognized {
            let account = importer.account(path);
            writeln!(out, "{}: {account}", path.display())?;
            Some(account.to_string())
        } else {
            info!("Skipping {}, not a statement for this account", path.display());
            None
        };
        results.push(Identification {
            path: path.clone(),
            account,
        });
    }

    let count = results.iter().filter(|i| i.account.is_some()).count();
    Ok(Out::new(
        format!("Recognized {count} of {} files", results.len()),
        results,
    ))
}
