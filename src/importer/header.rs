//! The line-oriented part of a statement: everything above the CSV column header.
//!
//! ```text
//! Umsatzanzeige;Datei erstellt am: 25.07.2018 12:00
//! ;Letztes Update: aktuell                (optional)
//!                                         (only if the line above is present)
//! IBAN;DE99 9999 9999 9999 9999 99
//! Kontoname;Girokonto
//! Bank;ING
//! Kunde;Regina Phalange
//! Zeitraum;01.06.2018 - 30.06.2018
//! Saldo;5.000,00;EUR
//!
//! Sortierung;Datum absteigend             (optional)
//!                                         (only if the line above is present)
//! In der CSV-Datei finden Sie alle bereits gebuchten Umsätze. ...
//!
//! ```

use crate::error::{Error, FormatError, FormatErrorKind, Result};
use crate::identity::{ImporterIdentity, BANKS};
use chrono::{Days, NaiveDate};
use csv::{ReaderBuilder, StringRecord};
use encoding_rs::Encoding;
use serde::Serialize;
use std::io::{self, BufRead, ErrorKind};
use tracing::{debug, trace, warn};

const FIRST_HEADER_PREFIX: &str = "Umsatzanzeige;Datei erstellt am";
const SECOND_HEADER: &str = ";Letztes Update: aktuell";
const SORT_PREFIX: &str = "Sortierung";
const SORT_DESCENDING: &str = "Datum absteigend";
const SORT_ASCENDING: &str = "Datum aufsteigend";
const DATE_FORMAT: &str = "%d.%m.%Y";
const PERIOD_SEPARATOR: &str = " - ";

/// The keys of the metadata block. Its length is the number of lines in the block.
pub(crate) const META_KEYS: [&str; 6] = ["IBAN", "Kontoname", "Bank", "Kunde", "Zeitraum", "Saldo"];

const IBAN: &str = "IBAN";
const BANK: &str = "Bank";
const USER: &str = "Kunde";
const PERIOD: &str = "Zeitraum";

pub(crate) const PRE_HEADER: &str = "In der CSV-Datei finden Sie alle bereits gebuchten Umsätze. \
    Die vorgemerkten Umsätze werden nicht aufgenommen, auch wenn sie in \
    Ihrem Internetbanking angezeigt werden.";

/// Reads a statement one decoded, trimmed line at a time and remembers the current line number.
///
/// The end of the file reads as an empty line.
pub(crate) struct LineReader<R> {
    inner: R,
    encoding: &'static Encoding,
    line: usize,
    buf: Vec<u8>,
}

impl<R: BufRead> LineReader<R> {
    pub(crate) fn new(inner: R, encoding: &'static Encoding) -> Self {
        Self {
            inner,
            encoding,
            line: 0,
            buf: Vec::new(),
        }
    }

    /// The 1-based number of the line most recently returned by `next_line`.
    pub(crate) fn line(&self) -> usize {
        self.line
    }

    pub(crate) fn next_line(&mut self) -> Result<String> {
        self.buf.clear();
        self.inner.read_until(b'\n', &mut self.buf)?;
        self.line += 1;
        let decoded = decode(self.encoding, &self.buf)?;
        let trimmed = decoded.trim();
        let line = if self.line == 1 {
            trimmed.trim_start_matches('\u{feff}')
        } else {
            trimmed
        };
        trace!("line {}: {line}", self.line);
        Ok(line.to_string())
    }

    pub(crate) fn expect_empty(&mut self) -> Result<()> {
        let line = self.next_line()?;
        if line.is_empty() {
            Ok(())
        } else {
            Err(self.error(FormatErrorKind::ExpectedEmptyLine(line)))
        }
    }

    pub(crate) fn error(&self, kind: FormatErrorKind) -> Error {
        FormatError::new(self.line, kind).into()
    }

    /// Consumes the reader and decodes everything that has not been read yet.
    pub(crate) fn into_body(mut self) -> Result<Body> {
        let mut bytes = Vec::new();
        self.inner.read_to_end(&mut bytes)?;
        Ok(Body {
            text: decode(self.encoding, &bytes)?,
            lines_before: self.line,
        })
    }
}

/// The decoded remainder of a statement, starting with the CSV column header.
pub(crate) struct Body {
    pub(crate) text: String,
    /// How many lines of the file precede `text`.
    pub(crate) lines_before: usize,
}

fn decode(encoding: &'static Encoding, bytes: &[u8]) -> io::Result<String> {
    encoding
        .decode_without_bom_handling_and_without_replacement(bytes)
        .map(|s| s.into_owned())
        .ok_or_else(|| {
            io::Error::new(
                ErrorKind::InvalidData,
                format!("The file is not valid {}", encoding.name()),
            )
        })
}

/// Reads the report header: the first line, the optional second line and, if that is present, the
/// empty line after it.
pub(crate) fn read_preamble<R: BufRead>(reader: &mut LineReader<R>) -> Result<()> {
    let line = reader.next_line()?;
    if !line.starts_with(FIRST_HEADER_PREFIX) {
        return Err(reader.error(FormatErrorKind::FirstHeader(line)));
    }

    let line = reader.next_line()?;
    if !line.is_empty() {
        if line != SECOND_HEADER {
            return Err(reader.error(FormatErrorKind::SecondHeader(line)));
        }
        reader.expect_empty()?;
    }
    Ok(())
}

/// One `key;value[;more]` row of the metadata block.
#[derive(Debug, Clone, Eq, PartialEq)]
pub(crate) struct MetaRow {
    pub(crate) line: usize,
    pub(crate) key: String,
    pub(crate) value: String,
}

/// Reads the fixed number of metadata lines that follow the preamble.
pub(crate) fn read_metadata_rows<R: BufRead>(reader: &mut LineReader<R>) -> Result<Vec<MetaRow>> {
    let mut rows = Vec::with_capacity(META_KEYS.len());
    for _ in META_KEYS {
        let line = reader.next_line()?;
        let record = split_fields(&line).map_err(|_| {
            reader.error(FormatErrorKind::MetadataRow(line.clone()))
        })?;
        match (record.get(0), record.get(1)) {
            (Some(key), Some(value)) => rows.push(MetaRow {
                line: reader.line(),
                key: key.to_string(),
                value: value.to_string(),
            }),
            _ => return Err(reader.error(FormatErrorKind::MetadataRow(line))),
        }
    }
    Ok(rows)
}

/// Splits a single `;` separated line, honoring `"` quoting.
fn split_fields(line: &str) -> std::result::Result<StringRecord, csv::Error> {
    let mut rdr = ReaderBuilder::new()
        .delimiter(b';')
        .quote(b'"')
        .has_headers(false)
        .flexible(true)
        .from_reader(line.as_bytes());
    let mut record = StringRecord::new();
    rdr.read_record(&mut record)?;
    Ok(record)
}

/// Fails if the row is an `IBAN`, `Bank` or `Kunde` row that does not match `identity`. Other
/// rows always pass.
pub(crate) fn check_identity(row: &MetaRow, identity: &ImporterIdentity) -> Result<()> {
    let kind = match row.key.as_str() {
        IBAN if !identity.matches_iban(&row.value) => FormatErrorKind::IbanMismatch {
            expected: identity.iban().to_string(),
            found: row.value.clone(),
        },
        BANK if !BANKS.contains(&row.value.as_str()) => {
            FormatErrorKind::UnknownBank(row.value.clone())
        }
        USER if row.value != identity.user() => FormatErrorKind::UserMismatch {
            expected: identity.user().to_string(),
            found: row.value.clone(),
        },
        _ => return Ok(()),
    };
    Err(FormatError::new(row.line, kind).into())
}

/// The inclusive date range a statement covers.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub(crate) struct Period {
    pub(crate) from: NaiveDate,
    pub(crate) to: NaiveDate,
}

impl Period {
    /// Parses `DD.MM.YYYY - DD.MM.YYYY`.
    pub(crate) fn parse(value: &str) -> Option<Self> {
        let parts: Vec<&str> = value.trim().split(PERIOD_SEPARATOR).collect();
        match parts.as_slice() {
            [from, to] => Some(Self {
                from: parse_date(from)?,
                to: parse_date(to)?,
            }),
            _ => None,
        }
    }

    /// The day after the period ends.
    pub(crate) fn day_after(&self) -> Option<NaiveDate> {
        self.to.checked_add_days(Days::new(1))
    }
}

pub(crate) fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT).ok()
}

/// Validates every metadata row against `identity` and returns the statement period.
pub(crate) fn read_metadata<R: BufRead>(
    reader: &mut LineReader<R>,
    identity: &ImporterIdentity,
) -> Result<Period> {
    let mut period = None;
    for row in read_metadata_rows(reader)? {
        check_identity(&row, identity)?;
        if row.key == PERIOD {
            let parsed = Period::parse(&row.value).ok_or_else(|| {
                FormatError::new(row.line, FormatErrorKind::Period(row.value.clone()))
            })?;
            debug!("Statement period {} to {}", parsed.from, parsed.to);
            period = Some(parsed);
        }
        // The `Saldo` row is the balance at the time the file was generated, not at the end of the
        // period, so it cannot be used for a balance assertion.
    }
    period.ok_or_else(|| reader.error(FormatErrorKind::MissingPeriod))
}

/// The order in which the bank wrote the transaction rows.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub(crate) enum SortOrder {
    AscendingByDate,
    DescendingByDate,
    Unknown,
}

serde_plain::derive_display_from_serialize!(SortOrder);

impl SortOrder {
    /// Returns `None` if `line` is not a `Sortierung` line.
    pub(crate) fn from_line(line: &str) -> Option<Self> {
        if !line.starts_with(SORT_PREFIX) {
            return None;
        }
        Some(if line.contains(SORT_DESCENDING) {
            SortOrder::DescendingByDate
        } else if line.contains(SORT_ASCENDING) {
            SortOrder::AscendingByDate
        } else {
            SortOrder::Unknown
        })
    }
}

/// Reads from the empty line after the metadata block through the empty line after the
/// pre-header sentence, returning the declared sort order if there is a `Sortierung` line.
pub(crate) fn read_sort_and_pre_header<R: BufRead>(
    reader: &mut LineReader<R>,
    filename: &str,
) -> Result<Option<SortOrder>> {
    reader.expect_empty()?;

    let mut line = reader.next_line()?;
    let sort_order = SortOrder::from_line(&line);
    if let Some(order) = sort_order {
        debug!("Line {} declares sort order {order}", reader.line());
        if order == SortOrder::Unknown {
            warn!(
                "{filename}:{}: balance assertions can only be generated \
                if transactions are sorted by date",
                reader.line()
            );
        }
        reader.expect_empty()?;
        line = reader.next_line()?;
    }

    if line != PRE_HEADER {
        return Err(reader.error(FormatErrorKind::PreHeader(line)));
    }
    reader.expect_empty()?;
    Ok(sort_order)
}
