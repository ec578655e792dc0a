//! Errors returned by the statement importer.
//!
//! There are exactly two kinds of failure. An `Io` error means the file could not be read (it is
//! missing, unreadable, or its bytes are not valid in the configured encoding). A `Format` error
//! means the file was read but does not have the structure of an ING transaction report, or it
//! belongs to a different account or customer.

use std::fmt::{Display, Formatter};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Format(#[from] FormatError),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns the `FormatError` if this is a format violation.
    pub fn as_format(&self) -> Option<&FormatError> {
        match self {
            Error::Format(e) => Some(e),
            Error::Io(_) => None,
        }
    }
}

/// A violation of the statement grammar or of the importer identity, located at a 1-based line.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
#[error("invalid statement format at line {line}: {kind}")]
pub struct FormatError {
    line: usize,
    kind: FormatErrorKind,
}

impl FormatError {
    pub fn new(line: usize, kind: FormatErrorKind) -> Self {
        Self { line, kind }
    }

    pub fn line(&self) -> usize {
        self.line
    }

    pub fn kind(&self) -> &FormatErrorKind {
        &self.kind
    }
}

/// The expectation that was not met.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum FormatErrorKind {
    FirstHeader(String),
    SecondHeader(String),
    ExpectedEmptyLine(String),
    MetadataRow(String),
    IbanMismatch { expected: String, found: String },
    UnknownBank(String),
    UserMismatch { expected: String, found: String },
    Period(String),
    MissingPeriod,
    PreHeader(String),
    MissingHeaderRow,
    MissingColumn(String),
    DuplicateColumn(String),
    ShortRow { column: String },
    Date { column: String, value: String },
    Amount { column: String, value: String },
    Csv(String),
}

impl Display for FormatErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            FormatErrorKind::FirstHeader(line) => {
                write!(f, "expected the report header 'Umsatzanzeige', found '{line}'")
            }
            FormatErrorKind::SecondHeader(line) => {
                write!(f, "unexpected second header line '{line}'")
            }
            FormatErrorKind::ExpectedEmptyLine(line) => {
                write!(f, "expected an empty line, found '{line}'")
            }
            FormatErrorKind::MetadataRow(line) => {
                write!(f, "malformed metadata row '{line}'")
            }
            FormatErrorKind::IbanMismatch { expected, found } => {
                write!(f, "IBAN '{found}' does not match '{expected}'")
            }
            FormatErrorKind::UnknownBank(bank) => write!(f, "unknown bank '{bank}'"),
            FormatErrorKind::UserMismatch { expected, found } => {
                write!(f, "customer '{found}' does not match '{expected}'")
            }
            FormatErrorKind::Period(value) => write!(f, "malformed period '{value}'"),
            FormatErrorKind::MissingPeriod => write!(f, "the metadata block has no period"),
            FormatErrorKind::PreHeader(line) => {
                write!(f, "unexpected line before the column header '{line}'")
            }
            FormatErrorKind::MissingHeaderRow => write!(f, "the column header row is missing"),
            FormatErrorKind::MissingColumn(name) => write!(f, "missing column '{name}'"),
            FormatErrorKind::DuplicateColumn(name) => {
                write!(f, "column '{name}' is ambiguous after renaming duplicates")
            }
            FormatErrorKind::ShortRow { column } => {
                write!(f, "the row has no value for column '{column}'")
            }
            FormatErrorKind::Date { column, value } => {
                write!(f, "invalid date '{value}' in column '{column}'")
            }
            FormatErrorKind::Amount { column, value } => {
                write!(f, "invalid amount '{value}' in column '{column}'")
            }
            FormatErrorKind::Csv(message) => write!(f, "{message}"),
        }
    }
}
