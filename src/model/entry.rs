use crate::model::Amount;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};

/// Where an entry came from: the statement file and the 1-based line number within it.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize)]
pub struct Meta {
    filename: String,
    lineno: usize,
}

impl Meta {
    pub fn new(filename: impl Into<String>, lineno: usize) -> Self {
        Self {
            filename: filename.into(),
            lineno,
        }
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn lineno(&self) -> usize {
        self.lineno
    }
}

/// One leg of a transaction.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize)]
pub struct Posting {
    account: String,
    units: Amount,
}

impl Posting {
    pub fn new(account: impl Into<String>, units: Amount) -> Self {
        Self {
            account: account.into(),
            units,
        }
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    pub fn units(&self) -> &Amount {
        &self.units
    }
}

/// A completed transaction with a single posting to the statement's account.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct Transaction {
    meta: Meta,
    date: NaiveDate,
    flag: char,
    payee: String,
    narration: String,
    tags: BTreeSet<String>,
    links: BTreeSet<String>,
    postings: Vec<Posting>,
}

/// The flag of a transaction that has been booked by the bank.
pub const FLAG_OKAY: char = '*';

impl Transaction {
    pub fn new(
        meta: Meta,
        date: NaiveDate,
        payee: impl Into<String>,
        narration: impl Into<String>,
        postings: Vec<Posting>,
    ) -> Self {
        Self {
            meta,
            date,
            flag: FLAG_OKAY,
            payee: payee.into(),
            narration: narration.into(),
            tags: BTreeSet::new(),
            links: BTreeSet::new(),
            postings,
        }
    }

    pub fn meta(&self) -> &Meta {
        &self.meta
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn flag(&self) -> char {
        self.flag
    }

    pub fn payee(&self) -> &str {
        &self.payee
    }

    pub fn narration(&self) -> &str {
        &self.narration
    }

    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    pub fn links(&self) -> &BTreeSet<String> {
        &self.links
    }

    pub fn postings(&self) -> &[Posting] {
        &self.postings
    }
}

/// Asserts that `account` holds `amount` at the start of `date`.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct BalanceAssertion {
    meta: Meta,
    date: NaiveDate,
    account: String,
    amount: Amount,
}

impl BalanceAssertion {
    pub fn new(meta: Meta, date: NaiveDate, account: impl Into<String>, amount: Amount) -> Self {
        Self {
            meta,
            date,
            account: account.into(),
            amount,
        }
    }

    pub fn meta(&self) -> &Meta {
        &self.meta
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    pub fn amount(&self) -> &Amount {
        &self.amount
    }
}

/// An entry produced from a statement file.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerEntry {
    Transaction(Transaction),
    Balance(BalanceAssertion),
}

impl LedgerEntry {
    pub fn meta(&self) -> &Meta {
        match self {
            LedgerEntry::Transaction(t) => t.meta(),
            LedgerEntry::Balance(b) => b.meta(),
        }
    }

    pub fn as_transaction(&self) -> Option<&Transaction> {
        match self {
            LedgerEntry::Transaction(t) => Some(t),
            LedgerEntry::Balance(_) => None,
        }
    }

    pub fn as_balance(&self) -> Option<&BalanceAssertion> {
        match self {
            LedgerEntry::Transaction(_) => None,
            LedgerEntry::Balance(b) => Some(b),
        }
    }
}

impl From<Transaction> for LedgerEntry {
    fn from(value: Transaction) -> Self {
        LedgerEntry::Transaction(value)
    }
}

impl From<BalanceAssertion> for LedgerEntry {
    fn from(value: BalanceAssertion) -> Self {
        LedgerEntry::Balance(value)
    }
}

/// Renders the entry as ledger text, e.g.
///
/// ```text
/// 2018-06-08 * "REWE Filialen Voll" "Lastschrift REWE SAGT DANKE"
///   Assets:ING:Giro  -500.00 EUR
/// ```
impl Display for LedgerEntry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            LedgerEntry::Transaction(t) => {
                write!(
                    f,
                    "{} {} \"{}\" \"{}\"",
                    t.date.format("%Y-%m-%d"),
                    t.flag,
                    escape(&t.payee),
                    escape(&t.narration)
                )?;
                for tag in &t.tags {
                    write!(f, " #{tag}")?;
                }
                for link in &t.links {
                    write!(f, " ^{link}")?;
                }
                for posting in &t.postings {
                    write!(f, "\n  {}  {}", posting.account, posting.units)?;
                }
                Ok(())
            }
            LedgerEntry::Balance(b) => write!(
                f,
                "{} balance {}  {}",
                b.date.format("%Y-%m-%d"),
                b.account,
                b.amount
            ),
        }
    }
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn eur(s: &str) -> Amount {
        Amount::new(Decimal::from_str(s).unwrap(), "EUR")
    }

    #[test]
    fn test_display_transaction() {
        let entry: LedgerEntry = Transaction::new(
            Meta::new("statement.csv", 15),
            date(2018, 6, 8),
            "REWE Filialen Voll",
            "Lastschrift REWE SAGT \"DANKE\"",
            vec![Posting::new("Assets:ING:Giro", eur("-500.00"))],
        )
        .into();
        assert_eq!(
            entry.to_string(),
            "2018-06-08 * \"REWE Filialen Voll\" \"Lastschrift REWE SAGT \\\"DANKE\\\"\"\n  \
            Assets:ING:Giro  -500.00 EUR"
        );
        assert_eq!(entry.meta().lineno(), 15);
    }

    #[test]
    fn test_display_balance() {
        let entry: LedgerEntry = BalanceAssertion::new(
            Meta::new("statement.csv", 15),
            date(2018, 7, 1),
            "Assets:ING:Giro",
            eur("1234.00"),
        )
        .into();
        assert_eq!(
            entry.to_string(),
            "2018-07-01 balance Assets:ING:Giro  1234.00 EUR"
        );
        assert!(entry.as_transaction().is_none());
        assert_eq!(entry.as_balance().map(|b| b.date()), Some(date(2018, 7, 1)));
    }

    #[test]
    fn test_serialize_tagged() {
        let entry: LedgerEntry = BalanceAssertion::new(
            Meta::new("s.csv", 3),
            date(2018, 7, 1),
            "Assets:ING:Giro",
            eur("1.50"),
        )
        .into();
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["type"], "balance");
        assert_eq!(json["date"], "2018-07-01");
        assert_eq!(json["amount"]["number"], "1.50");
        assert_eq!(json["amount"]["currency"], "EUR");
        assert_eq!(json["meta"]["lineno"], 3);
    }
}
