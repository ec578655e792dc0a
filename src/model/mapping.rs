use csv::StringRecord;
use std::collections::HashMap;
use std::error::Error as StdError;
use std::fmt::{Display, Formatter};

#[derive(Debug, Default, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct MappingError(String);

impl MappingError {
    /// The header name that could not be made unique.
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl Display for MappingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Renaming duplicate headers produced '{}', which is already a header",
            self.0
        )
    }
}

impl StdError for MappingError {}

/// Maps the column names of a CSV header row to their indexes.
///
/// A header row may repeat a name. ING, for example, has two `Währung` columns: the first is the
/// currency of the running balance, the second is the currency of the transaction amount. Every
/// occurrence of a repeated name is renamed by appending its 1-based ordinal, so the two columns
/// become `Währung_1` and `Währung_2`. Names that occur once are unchanged.
#[derive(Default, Debug, Clone, Eq, PartialEq)]
pub struct Mapping {
    raw: Vec<String>,
    names: Vec<String>,
    index: HashMap<String, usize>,
}

impl Mapping {
    pub fn new<S, I>(headers: I) -> Result<Self, MappingError>
    where
        S: Into<String>,
        I: IntoIterator<Item = S>,
    {
        let raw: Vec<String> = headers.into_iter().map(|s| s.into()).collect();

        let mut totals: HashMap<&str, usize> = HashMap::new();
        for name in &raw {
            *totals.entry(name.as_str()).or_default() += 1;
        }

        let mut seen: HashMap<&str, usize> = HashMap::new();
        let names: Vec<String> = raw
            .iter()
            .map(|name| {
                if totals.get(name.as_str()).copied().unwrap_or_default() > 1 {
                    let ordinal = seen.entry(name.as_str()).or_default();
                    *ordinal += 1;
                    format!("{name}_{ordinal}")
                } else {
                    name.clone()
                }
            })
            .collect();

        let mut index = HashMap::with_capacity(names.len());
        for (ix, name) in names.iter().enumerate() {
            if index.insert(name.clone(), ix).is_some() {
                return Err(MappingError(name.clone()));
            }
        }

        Ok(Self { raw, names, index })
    }

    /// The column names after duplicates have been renamed.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Returns the first of `names` that is not a column.
    pub fn missing<'a>(&self, names: &[&'a str]) -> Option<&'a str> {
        names
            .iter()
            .copied()
            .find(|name| !self.index.contains_key(*name))
    }

    /// Gets the field of `record` in the column called `name`.
    pub fn get<'r>(&self, record: &'r StringRecord, name: &str) -> Option<&'r str> {
        self.index_of(name).and_then(|ix| record.get(ix))
    }

    /// True when `record` repeats the header row that this mapping was built from.
    pub fn is_header(&self, record: &StringRecord) -> bool {
        record.len() == self.raw.len() && record.iter().zip(&self.raw).all(|(a, b)| a == b)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const ING_HEADER: [&str; 9] = [
        "Buchung",
        "Valuta",
        "Auftraggeber/Empfänger",
        "Buchungstext",
        "Verwendungszweck",
        "Saldo",
        "Währung",
        "Betrag",
        "Währung",
    ];

    #[test]
    fn test_unique_names_unchanged() {
        let mapping = Mapping::new(["a", "b", "c"]).unwrap();
        assert_eq!(mapping.names(), &["a", "b", "c"]);
        assert_eq!(mapping.index_of("b"), Some(1));
    }

    #[test]
    fn test_ing_currency_columns() {
        let mapping = Mapping::new(ING_HEADER).unwrap();
        assert_eq!(mapping.index_of("Währung_1"), Some(6));
        assert_eq!(mapping.index_of("Währung_2"), Some(8));
        assert_eq!(mapping.index_of("Währung"), None);
        assert_eq!(mapping.index_of("Betrag"), Some(7));
    }

    #[test]
    fn test_many_repeats_of_many_names() {
        let mapping = Mapping::new(["x", "y", "x", "z", "y", "x"]).unwrap();
        assert_eq!(mapping.names(), &["x_1", "y_1", "x_2", "z", "y_2", "x_3"]);
    }

    #[test]
    fn test_inserted_column_does_not_shift_lookup() {
        let mut headers = ING_HEADER.to_vec();
        headers.insert(4, "Kategorie");
        let mapping = Mapping::new(headers).unwrap();
        let record = StringRecord::from(vec![
            "08.06.2018",
            "08.06.2018",
            "REWE",
            "Lastschrift",
            "Lebensmittel",
            "REWE SAGT DANKE",
            "1.234,00",
            "EUR",
            "-500,00",
            "USD",
        ]);
        assert_eq!(mapping.get(&record, "Verwendungszweck"), Some("REWE SAGT DANKE"));
        assert_eq!(mapping.get(&record, "Währung_1"), Some("EUR"));
        assert_eq!(mapping.get(&record, "Währung_2"), Some("USD"));
    }

    #[test]
    fn test_get_short_record() {
        let mapping = Mapping::new(["a", "b"]).unwrap();
        let record = StringRecord::from(vec!["1"]);
        assert_eq!(mapping.get(&record, "a"), Some("1"));
        assert_eq!(mapping.get(&record, "b"), None);
        assert_eq!(mapping.get(&record, "c"), None);
    }

    #[test]
    fn test_collision_with_synthetic_name() {
        let e = Mapping::new(["a", "a", "a_1"]).unwrap_err();
        assert_eq!(e.name(), "a_1");
    }

    #[test]
    fn test_missing() {
        let mapping = Mapping::new(ING_HEADER).unwrap();
        assert_eq!(mapping.missing(&["Buchung", "Betrag"]), None);
        assert_eq!(mapping.missing(&["Buchung", "Kategorie"]), Some("Kategorie"));
    }

    #[test]
    fn test_is_header() {
        let mapping = Mapping::new(ING_HEADER).unwrap();
        assert!(mapping.is_header(&StringRecord::from(ING_HEADER.to_vec())));
        assert!(!mapping.is_header(&StringRecord::from(vec!["Buchung"])));
    }
}
