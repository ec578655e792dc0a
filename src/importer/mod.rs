//! Recognizes and parses ING transaction reports ("Umsatzanzeige").
//!
//! An `Importer` is configured once with an `ImporterIdentity` and can then be used for any number
//! of files, from any number of threads. Each call keeps its parsing state on the stack.
//!
//! ```no_run
//! # use ing_import::{Importer, ImporterIdentity};
//! let identity = ImporterIdentity::new("DE99 9999 9999 9999 9999 99", "Assets:ING:Giro", "Regina Phalange");
//! let importer = Importer::new(identity);
//! if importer.identify("Umsatzanzeige.csv")? {
//!     for entry in importer.extract("Umsatzanzeige.csv")? {
//!         println!("{entry}\n");
//!     }
//! }
//! # Ok::<(), ing_import::Error>(())
//! ```

mod balance;
mod header;
mod rows;

use crate::error::{Error, Result};
use crate::identity::ImporterIdentity;
use crate::model::LedgerEntry;
use balance::Candidates;
use header::LineReader;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct Importer {
    identity: ImporterIdentity,
}

impl Importer {
    pub fn new(identity: ImporterIdentity) -> Self {
        Self { identity }
    }

    /// The account that entries from `path` are booked to. This is the configured account for
    /// every file.
    pub fn account(&self, _path: impl AsRef<Path>) -> &str {
        self.identity.account()
    }

    /// Returns whether the file at `path` is a statement for the configured account.
    ///
    /// Only the header and metadata lines are read. A file that is not a matching statement gives
    /// `Ok(false)`.
    ///
    /// # Errors
    /// - `Error::Io` if the file cannot be opened or read, or is not valid in the configured
    ///   encoding.
    pub fn identify(&self, path: impl AsRef<Path>) -> Result<bool> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let identified = self.identify_reader(BufReader::new(file))?;
        debug!("{} identified: {identified}", path.display());
        Ok(identified)
    }

    /// Like `identify`, but reads the statement from `reader`.
    pub fn identify_reader<R: BufRead>(&self, reader: R) -> Result<bool> {
        let mut lines = LineReader::new(reader, self.identity.encoding());
        match self.check_header(&mut lines) {
            Ok(()) => Ok(true),
            Err(Error::Format(e)) => {
                debug!("Not a matching statement: {e}");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    fn check_header<R: BufRead>(&self, lines: &mut LineReader<R>) -> Result<()> {
        header::read_preamble(lines)?;
        for row in header::read_metadata_rows(lines)? {
            header::check_identity(&row, &self.identity)?;
        }
        Ok(())
    }

    /// Parses the file at `path` into ledger entries.
    ///
    /// The result holds one transaction per data row in file order, followed by the opening and
    /// closing balance assertions if they could be derived.
    ///
    /// # Errors
    /// - `Error::Io` if the file cannot be opened or read, or is not valid in the configured
    ///   encoding.
    /// - `Error::Format` if the file is not a statement for the configured account, or any part of
    ///   it is malformed. No entries are returned in that case.
    pub fn extract(&self, path: impl AsRef<Path>) -> Result<Vec<LedgerEntry>> {
        let path = path.as_ref();
        let file = File::open(path)?;
        self.extract_reader(BufReader::new(file), &path.to_string_lossy())
    }

    /// Like `extract`, but reads the statement from `reader`. `filename` is recorded in the
    /// metadata of each entry and used in log messages.
    pub fn extract_reader<R: BufRead>(&self, reader: R, filename: &str) -> Result<Vec<LedgerEntry>> {
        let account = self.identity.account();
        let mut lines = LineReader::new(reader, self.identity.encoding());

        header::read_preamble(&mut lines)?;
        let period = header::read_metadata(&mut lines, &self.identity)?;
        let sort_order = header::read_sort_and_pre_header(&mut lines, filename)?;

        let body = lines.into_body()?;
        let rows = rows::read_rows(&body, account, filename)?;
        let candidates = Candidates::new(sort_order, &rows);
        let assertions = balance::assertions(&candidates, &period, account, filename)?;

        debug!(
            "{filename}: {} transactions, {} balance assertions",
            rows.transactions.len(),
            assertions.len()
        );
        let mut entries = rows.transactions;
        entries.extend(assertions.into_iter().map(LedgerEntry::from));
        Ok(entries)
    }
}
