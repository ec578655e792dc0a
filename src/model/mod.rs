//! Types that represent the output of an import, such as `Transaction` and `BalanceAssertion`,
//! and the building blocks used to decode statement rows.
mod amount;
mod entry;
mod mapping;

pub use amount::{parse_number_de, Amount, AmountError};
pub use entry::{BalanceAssertion, LedgerEntry, Meta, Posting, Transaction, FLAG_OKAY};
pub use mapping::{Mapping, MappingError};
