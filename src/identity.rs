//! The fixed identity an importer checks every statement against.

use encoding_rs::Encoding;
use std::fmt::{Display, Formatter};

/// Banks that produce this report format.
pub const BANKS: [&str; 2] = ["ING", "ING-DiBa"];

/// The encoding ING uses for its CSV exports.
pub const DEFAULT_ENCODING: &str = "ISO-8859-1";

/// Removes all whitespace from an IBAN so that `DE99 9999 ...` and `DE999999...` compare equal.
pub fn normalize_iban(iban: &str) -> String {
    iban.chars().filter(|c| !c.is_whitespace()).collect()
}

/// The account a statement must belong to, and where its entries are booked.
#[derive(Debug, Clone)]
pub struct ImporterIdentity {
    iban: String,
    account: String,
    user: String,
    encoding: &'static Encoding,
}

impl ImporterIdentity {
    /// Creates an identity using the default ISO-8859-1 file encoding.
    ///
    /// # Arguments
    /// - `iban` - The IBAN of the account, with or without spaces.
    /// - `account` - The ledger account that postings and balance assertions are booked to.
    /// - `user` - The customer name as printed in the `Kunde` metadata row.
    pub fn new(iban: &str, account: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            iban: normalize_iban(iban),
            account: account.into(),
            user: user.into(),
            encoding: encoding_rs::WINDOWS_1252,
        }
    }

    /// Replaces the file encoding with the one named by `label`, e.g. `UTF-8` or `latin1`.
    ///
    /// Labels are resolved as in the WHATWG Encoding Standard, which treats `ISO-8859-1` as
    /// `windows-1252`.
    pub fn with_encoding(mut self, label: &str) -> Result<Self, UnknownEncoding> {
        self.encoding = Encoding::for_label(label.trim().as_bytes())
            .ok_or_else(|| UnknownEncoding(label.to_string()))?;
        Ok(self)
    }

    /// The IBAN without whitespace.
    pub fn iban(&self) -> &str {
        &self.iban
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn encoding(&self) -> &'static Encoding {
        self.encoding
    }

    pub(crate) fn matches_iban(&self, declared: &str) -> bool {
        normalize_iban(declared) == self.iban
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct UnknownEncoding(String);

impl Display for UnknownEncoding {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Unknown file encoding '{}'", self.0)
    }
}

impl std::error::Error for UnknownEncoding {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_iban() {
        assert_eq!(
            normalize_iban("DE99 9999 9999 9999 9999 99"),
            "DE99999999999999999999"
        );
        assert_eq!(normalize_iban("DE99\t9999\u{a0}99"), "DE99999999");
    }

    #[test]
    fn test_identity_normalizes_iban() {
        let identity = ImporterIdentity::new("DE99 9999 9999 9999 9999 99", "Assets:Giro", "R");
        assert_eq!(identity.iban(), "DE99999999999999999999");
        assert!(identity.matches_iban("DE99999999999999999999"));
        assert!(identity.matches_iban("DE99 9999 9999 9999 9999 99"));
        assert!(!identity.matches_iban("DE00 0000 0000 0000 0000 00"));
    }

    #[test]
    fn test_default_encoding() {
        let identity = ImporterIdentity::new("DE00", "Assets:Giro", "R");
        assert_eq!(identity.encoding(), encoding_rs::WINDOWS_1252);
        assert_eq!(
            Encoding::for_label(DEFAULT_ENCODING.as_bytes()),
            Some(encoding_rs::WINDOWS_1252)
        );
    }

    #[test]
    fn test_with_encoding() {
        let identity = ImporterIdentity::new("DE00", "Assets:Giro", "R")
            .with_encoding("utf-8")
            .unwrap();
        assert_eq!(identity.encoding(), encoding_rs::UTF_8);
    }

    #[test]
    fn test_unknown_encoding() {
        let e = ImporterIdentity::new("DE00", "Assets:Giro", "R")
            .with_encoding("klingon")
            .unwrap_err();
        assert_eq!(e.to_string(), "Unknown file encoding 'klingon'");
    }
}
