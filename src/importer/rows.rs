//! Decodes the CSV part of a statement: the column header and the transaction rows below it.

use crate::error::{Error, FormatError, FormatErrorKind, Result};
use crate::importer::header::{parse_date, Body};
use crate::model::{parse_number_de, Amount, LedgerEntry, Mapping, Meta, Posting, Transaction};
use csv::{Reader, ReaderBuilder, StringRecord};
use rust_decimal::Decimal;
use tracing::debug;

pub(crate) const BOOKING_DATE: &str = "Buchung";
pub(crate) const PAYEE: &str = "Auftraggeber/Empfänger";
pub(crate) const BOOKING_TEXT: &str = "Buchungstext";
pub(crate) const DESCRIPTION: &str = "Verwendungszweck";
pub(crate) const BALANCE: &str = "Saldo";
/// The first `Währung` column, the currency of `Saldo`.
pub(crate) const BALANCE_CURRENCY: &str = "Währung_1";
pub(crate) const AMOUNT: &str = "Betrag";
/// The second `Währung` column, the currency of `Betrag`.
pub(crate) const CURRENCY: &str = "Währung_2";

const REQUIRED: [&str; 8] = [
    BOOKING_DATE,
    PAYEE,
    BOOKING_TEXT,
    DESCRIPTION,
    BALANCE,
    BALANCE_CURRENCY,
    AMOUNT,
    CURRENCY,
];

/// What is kept of a row so that a balance assertion can be derived from it after the loop.
#[derive(Debug, Clone, Eq, PartialEq)]
pub(crate) struct RowSnapshot {
    pub(crate) line: usize,
    /// The running balance after this row, still in German-locale notation.
    pub(crate) balance: String,
    pub(crate) balance_currency: String,
    pub(crate) amount: Decimal,
    pub(crate) currency: String,
}

/// The transactions of a statement in file order, along with the first and last rows.
#[derive(Debug, Default)]
pub(crate) struct Rows {
    pub(crate) transactions: Vec<LedgerEntry>,
    pub(crate) first: Option<RowSnapshot>,
    pub(crate) last: Option<RowSnapshot>,
}

impl Rows {
    fn push(&mut self, transaction: Transaction, snapshot: RowSnapshot) {
        self.transactions.push(transaction.into());
        if self.first.is_none() {
            self.first = Some(snapshot.clone());
        }
        self.last = Some(snapshot);
    }
}

/// Reads the column header and every data row of `body`, booking each row to `account`.
pub(crate) fn read_rows(body: &Body, account: &str, filename: &str) -> Result<Rows> {
    let mut rdr = ReaderBuilder::new()
        .delimiter(b';')
        .quote(b'"')
        .has_headers(false)
        .flexible(true)
        .from_reader(body.text.as_bytes());
    let mut lines = LineCounter::new(body);
    let mut header = StringRecord::new();

    if !next_record(&mut rdr, &mut header, &lines)? {
        return Err(
            FormatError::new(body.lines_before + 1, FormatErrorKind::MissingHeaderRow).into(),
        );
    }
    let header_line = lines.line_of(&header);
    check_quotes(body, &header, &rdr, header_line)?;
    let mapping = Mapping::new(header.iter()).map_err(|e| {
        FormatError::new(
            header_line,
            FormatErrorKind::DuplicateColumn(e.name().to_string()),
        )
    })?;
    if let Some(missing) = mapping.missing(&REQUIRED) {
        return Err(FormatError::new(
            header_line,
            FormatErrorKind::MissingColumn(missing.to_string()),
        )
        .into());
    }
    debug!("Line {header_line} has columns {:?}", mapping.names());

    let mut rows = Rows::default();
    let mut record = StringRecord::new();
    while next_record(&mut rdr, &mut record, &lines)? {
        let line = lines.line_of(&record);
        check_quotes(body, &record, &rdr, line)?;
        if mapping.is_header(&record) {
            debug!("Skipping repeated column header at line {line}");
            continue;
        }
        let row = RowReader {
            mapping: &mapping,
            record: &record,
            line,
        };
        let (transaction, snapshot) = row.decode(account, filename)?;
        rows.push(transaction, snapshot);
    }
    debug!("Decoded {} transactions", rows.transactions.len());
    Ok(rows)
}

fn next_record(
    rdr: &mut Reader<&[u8]>,
    record: &mut StringRecord,
    lines: &LineCounter<'_>,
) -> Result<bool> {
    rdr.read_record(record).map_err(|e| csv_error(lines.current(), e))
}

/// Fails if `record`, which the reader has just returned, ends inside a quoted field. The csv
/// reader accepts an unterminated quote by running the field to the end of the input.
fn check_quotes(
    body: &Body,
    record: &StringRecord,
    rdr: &Reader<&[u8]>,
    line: usize,
) -> Result<()> {
    let text = body.text.as_bytes();
    let end = (rdr.position().byte() as usize).min(text.len());
    let start = record
        .position()
        .map(|p| p.byte() as usize)
        .unwrap_or(0)
        .min(end);
    if ends_in_quotes(&text[start..end]) {
        return Err(FormatError::new(
            line,
            FormatErrorKind::Csv("unterminated quoted field".to_string()),
        )
        .into());
    }
    Ok(())
}

fn ends_in_quotes(raw: &[u8]) -> bool {
    let mut in_quotes = false;
    let mut field_start = true;
    let mut bytes = raw.iter().peekable();
    while let Some(&b) = bytes.next() {
        if in_quotes {
            if b == b'"' {
                // `""` is an escaped quote
                if bytes.peek() == Some(&&b'"') {
                    bytes.next();
                } else {
                    in_quotes = false;
                }
            }
        } else if b == b'"' && field_start {
            in_quotes = true;
        }
        field_start = !in_quotes && matches!(b, b';' | b'\r' | b'\n');
    }
    in_quotes
}

/// Named access to the fields of one data row.
struct RowReader<'a> {
    mapping: &'a Mapping,
    record: &'a StringRecord,
    line: usize,
}

impl<'a> RowReader<'a> {
    fn field(&self, column: &str) -> Result<&'a str> {
        self.mapping.get(self.record, column).ok_or_else(|| {
            FormatError::new(
                self.line,
                FormatErrorKind::ShortRow {
                    column: column.to_string(),
                },
            )
            .into()
        })
    }

    fn decode(&self, account: &str, filename: &str) -> Result<(Transaction, RowSnapshot)> {
        let raw_date = self.field(BOOKING_DATE)?;
        let date = parse_date(raw_date).ok_or_else(|| {
            FormatError::new(
                self.line,
                FormatErrorKind::Date {
                    column: BOOKING_DATE.to_string(),
                    value: raw_date.to_string(),
                },
            )
        })?;
        let payee = self.field(PAYEE)?;
        let narration = format!("{} {}", self.field(BOOKING_TEXT)?, self.field(DESCRIPTION)?)
            .trim()
            .to_string();
        let amount = self.number(AMOUNT)?;
        let currency = self.field(CURRENCY)?;

        let transaction = Transaction::new(
            Meta::new(filename, self.line),
            date,
            payee,
            narration,
            vec![Posting::new(account, Amount::new(amount, currency))],
        );
        let snapshot = RowSnapshot {
            line: self.line,
            balance: self.field(BALANCE)?.to_string(),
            balance_currency: self.field(BALANCE_CURRENCY)?.to_string(),
            amount,
            currency: currency.to_string(),
        };
        Ok((transaction, snapshot))
    }

    fn number(&self, column: &str) -> Result<Decimal> {
        let raw = self.field(column)?;
        parse_number_de(raw).map_err(|_| amount_error(self.line, column, raw))
    }
}

pub(crate) fn amount_error(line: usize, column: &str, value: &str) -> Error {
    FormatError::new(
        line,
        FormatErrorKind::Amount {
            column: column.to_string(),
            value: value.to_string(),
        },
    )
    .into()
}

/// Finds the 1-based file line that each record starts on.
///
/// A record's position is taken before the csv reader skips empty lines, so the line number is
/// derived from the byte offset after those empty lines instead.
struct LineCounter<'t> {
    text: &'t [u8],
    offset: usize,
    line: usize,
}

impl<'t> LineCounter<'t> {
    fn new(body: &'t Body) -> Self {
        Self {
            text: body.text.as_bytes(),
            offset: 0,
            line: body.lines_before + 1,
        }
    }

    /// The line of the most recent record.
    fn current(&self) -> usize {
        self.line
    }

    /// Records must be passed in the order they were read.
    fn line_of(&mut self, record: &StringRecord) -> usize {
        let mut start = record
            .position()
            .map(|p| p.byte() as usize)
            .unwrap_or(self.offset)
            .clamp(self.offset, self.text.len());
        while matches!(self.text.get(start), Some(b'\r') | Some(b'\n')) {
            start += 1;
        }
        self.line += self.text[self.offset..start]
            .iter()
            .filter(|&&b| b == b'\n')
            .count();
        self.offset = start;
        self.line
    }
}

fn csv_error(line: usize, e: csv::Error) -> Error {
    let message = e.to_string();
    match e.into_kind() {
        csv::ErrorKind::Io(io) => Error::Io(io),
        _ => FormatError::new(line, FormatErrorKind::Csv(message)).into(),
    }
}
