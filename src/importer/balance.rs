//! Balance assertions derived from the running balance column.
//!
//! The `Saldo` column holds the account balance after each row. Which row is chronologically first
//! or last depends on the sort order the statement declares, so without a known order nothing is
//! derived.

use crate::error::{FormatError, FormatErrorKind, Result};
use crate::importer::header::{Period, SortOrder};
use crate::importer::rows::{amount_error, RowSnapshot, Rows, BALANCE};
use crate::model::{parse_number_de, Amount, BalanceAssertion, Meta};
use rust_decimal::Decimal;
use tracing::{debug, warn};

/// The rows holding the balance before the period and the balance after it.
#[derive(Debug, Default)]
pub(crate) struct Candidates {
    pub(crate) opening: Option<RowSnapshot>,
    pub(crate) closing: Option<RowSnapshot>,
}

impl Candidates {
    pub(crate) fn new(sort_order: Option<SortOrder>, rows: &Rows) -> Self {
        match sort_order {
            Some(SortOrder::AscendingByDate) => Self {
                opening: rows.first.clone(),
                closing: rows.last.clone(),
            },
            Some(SortOrder::DescendingByDate) => Self {
                opening: rows.last.clone(),
                closing: rows.first.clone(),
            },
            Some(SortOrder::Unknown) | None => Self::default(),
        }
    }
}

/// Builds the opening assertion, dated on the first day of the period, and the closing assertion,
/// dated on the day after the period. Either may be absent.
pub(crate) fn assertions(
    candidates: &Candidates,
    period: &Period,
    account: &str,
    filename: &str,
) -> Result<Vec<BalanceAssertion>> {
    let mut out = Vec::with_capacity(2);
    if let Some(row) = &candidates.opening {
        if let Some(assertion) = opening(row, period, account, filename)? {
            out.push(assertion);
        }
    }
    if let Some(row) = &candidates.closing {
        out.push(closing(row, period, account, filename)?);
    }
    Ok(out)
}

/// The balance before `row` was booked: its running balance minus its amount.
fn opening(
    row: &RowSnapshot,
    period: &Period,
    account: &str,
    filename: &str,
) -> Result<Option<BalanceAssertion>> {
    if row.balance_currency != row.currency {
        warn!(
            "{filename}:{}: opening balance can not be generated due to currency mismatch: \
            {} <> {}",
            row.line, row.balance_currency, row.currency
        );
        return Ok(None);
    }
    let balance = running_balance(row)? - row.amount;
    debug!("Opening balance {balance} on {}", period.from);
    Ok(Some(BalanceAssertion::new(
        Meta::new(filename, row.line),
        period.from,
        account,
        Amount::new(balance, row.balance_currency.as_str()),
    )))
}

/// The balance after `row` is the opening balance of the day after the period.
fn closing(
    row: &RowSnapshot,
    period: &Period,
    account: &str,
    filename: &str,
) -> Result<BalanceAssertion> {
    let date = period.day_after().ok_or_else(|| {
        FormatError::new(row.line, FormatErrorKind::Period(period.to.to_string()))
    })?;
    let balance = running_balance(row)?;
    debug!("Closing balance {balance} on {date}");
    Ok(BalanceAssertion::new(
        Meta::new(filename, row.line),
        date,
        account,
        Amount::new(balance, row.balance_currency.as_str()),
    ))
}

fn running_balance(row: &RowSnapshot) -> Result<Decimal> {
    parse_number_de(&row.balance).map_err(|_| amount_error(row.line, BALANCE, &row.balance))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::str::FromStr;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn june() -> Period {
        Period {
            from: date(2018, 6, 1),
            to: date(2018, 6, 30),
        }
    }

    fn snapshot(line: usize, balance: &str, amount: &str, currencies: (&str, &str)) -> RowSnapshot {
        RowSnapshot {
            line,
            balance: balance.into(),
            balance_currency: currencies.0.into(),
            amount: dec(amount),
            currency: currencies.1.into(),
        }
    }

    fn rows() -> Rows {
        Rows {
            transactions: Vec::new(),
            first: Some(snapshot(16, "100,00", "100.00", ("EUR", "EUR"))),
            last: Some(snapshot(18, "80,00", "-10.00", ("EUR", "EUR"))),
        }
    }

    #[test]
    fn test_candidates_ascending() {
        let c = Candidates::new(Some(SortOrder::AscendingByDate), &rows());
        assert_eq!(c.opening.unwrap().line, 16);
        assert_eq!(c.closing.unwrap().line, 18);
    }

    #[test]
    fn test_candidates_descending() {
        let c = Candidates::new(Some(SortOrder::DescendingByDate), &rows());
        assert_eq!(c.opening.unwrap().line, 18);
        assert_eq!(c.closing.unwrap().line, 16);
    }

    #[test]
    fn test_candidates_unknown_or_absent() {
        assert!(Candidates::new(Some(SortOrder::Unknown), &rows()).opening.is_none());
        assert!(Candidates::new(None, &rows()).closing.is_none());
    }

    #[test]
    fn test_candidates_no_rows() {
        let c = Candidates::new(Some(SortOrder::AscendingByDate), &Rows::default());
        assert!(c.opening.is_none());
        assert!(c.closing.is_none());
        assert!(assertions(&c, &june(), "Assets:Giro", "s.csv")
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_assertions() {
        let row = snapshot(16, "1.234,00", "-500.00", ("EUR", "EUR"));
        let c = Candidates {
            opening: Some(row.clone()),
            closing: Some(row),
        };
        let out = assertions(&c, &june(), "Assets:Giro", "s.csv").unwrap();
        assert_eq!(out.len(), 2);

        assert_eq!(out[0].date(), date(2018, 6, 1));
        assert_eq!(out[0].amount().number(), dec("1734.00"));
        assert_eq!(out[0].amount().currency(), "EUR");
        assert_eq!(out[0].account(), "Assets:Giro");
        assert_eq!(out[0].meta().lineno(), 16);

        assert_eq!(out[1].date(), date(2018, 7, 1));
        assert_eq!(out[1].amount().number(), dec("1234.00"));
    }

    #[test]
    fn test_currency_mismatch_skips_opening_only() {
        let row = snapshot(16, "1.234,00", "-500.00", ("EUR", "USD"));
        let c = Candidates {
            opening: Some(row.clone()),
            closing: Some(row),
        };
        let out = assertions(&c, &june(), "Assets:Giro", "s.csv").unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].date(), date(2018, 7, 1));
        assert_eq!(out[0].amount().currency(), "EUR");
    }

    #[test]
    fn test_bad_running_balance() {
        let row = snapshot(17, "", "-500.00", ("EUR", "EUR"));
        let c = Candidates {
            opening: None,
            closing: Some(row),
        };
        let e = assertions(&c, &june(), "Assets:Giro", "s.csv").unwrap_err();
        let f = e.as_format().unwrap();
        assert_eq!(f.line(), 17);
        assert_eq!(
            f.kind(),
            &FormatErrorKind::Amount {
                column: "Saldo".into(),
                value: String::new()
            }
        );
    }

    #[test]
    fn test_closing_on_year_end() {
        let period = Period {
            from: date(2018, 12, 1),
            to: date(2018, 12, 31),
        };
        let c = Candidates {
            opening: None,
            closing: Some(snapshot(16, "1,00", "1.00", ("EUR", "EUR"))),
        };
        let out = assertions(&c, &period, "Assets:Giro", "s.csv").unwrap();
        assert_eq!(out[0].date(), date(2019, 1, 1));
    }
}
