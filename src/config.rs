//! Configuration file handling.
//!
//! The configuration file holds the identity of the account whose statements are imported: the
//! IBAN, the ledger account to book to, the customer name printed on the statement and, optionally,
//! the file encoding.

use crate::identity::{ImporterIdentity, DEFAULT_ENCODING};
use crate::Importer;
use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const APP_NAME: &str = "ing-import";
const CONFIG_VERSION: u8 = 1;
pub(crate) const CONFIG_JSON: &str = "config.json";

/// The loaded configuration. Construct it with `Config::load`.
#[derive(Debug, Clone)]
pub struct Config {
    config_path: PathBuf,
    config_file: ConfigFile,
    identity: ImporterIdentity,
}

impl Config {
    /// This will
    /// - read and parse the config file at `path`
    /// - validate the app name
    /// - resolve the file encoding
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let config_path = path.into();
        let config_file = ConfigFile::load(&config_path)?;
        let identity = ImporterIdentity::new(
            &config_file.iban,
            config_file.account_name.as_str(),
            config_file.user.as_str(),
        )
        .with_encoding(config_file.file_encoding())
        .with_context(|| {
            format!(
                "Invalid file_encoding in config file {}",
                config_path.display()
            )
        })?;
        Ok(Self {
            config_path,
            config_file,
            identity,
        })
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn account_name(&self) -> &str {
        &self.config_file.account_name
    }

    pub fn identity(&self) -> &ImporterIdentity {
        &self.identity
    }

    /// Creates an `Importer` for the configured account.
    pub fn importer(&self) -> Importer {
        Importer::new(self.identity.clone())
    }
}

/// Represents the serialization and deserialization format of the configuration file.
///
/// Example configuration:
/// ```json
/// {
///   "app_name": "ing-import",
///   "config_version": 1,
///   "iban": "DE99 9999 9999 9999 9999 99",
///   "account_name": "Assets:ING:Giro",
///   "user": "Regina Phalange",
///   "file_encoding": "ISO-8859-1"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
struct ConfigFile {
    /// Application name, should always be "ing-import"
    app_name: String,

    /// Configuration file version
    config_version: u8,

    /// The IBAN of the account, spaces are allowed
    iban: String,

    /// The ledger account that transactions and balance assertions are booked to
    account_name: String,

    /// The customer name as it appears in the `Kunde` row of the statement
    user: String,

    /// Defaults to ISO-8859-1 if not specified
    #[serde(skip_serializing_if = "Option::is_none")]
    file_encoding: Option<String>,
}

impl ConfigFile {
    /// Loads a ConfigFile from the specified path.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed
    fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file at {}", path.display()))?;

        let config: ConfigFile = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file at {}", path.display()))?;

        ensure!(
            config.app_name == APP_NAME,
            "Invalid app_name in config file: expected '{}', got '{}'",
            APP_NAME,
            config.app_name
        );
        ensure!(
            config.config_version == CONFIG_VERSION,
            "Unsupported config_version {} in config file, expected {}",
            config.config_version,
            CONFIG_VERSION
        );

        Ok(config)
    }

    fn file_encoding(&self) -> &str {
        self.file_encoding.as_deref().unwrap_or(DEFAULT_ENCODING)
    }

    #[cfg(test)]
    fn new(iban: &str, account_name: &str, user: &str, file_encoding: Option<&str>) -> Self {
        Self {
            app_name: APP_NAME.to_string(),
            config_version: CONFIG_VERSION,
            iban: iban.to_string(),
            account_name: account_name.to_string(),
            user: user.to_string(),
            file_encoding: file_encoding.map(|s| s.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &TempDir, json: &str) -> PathBuf {
        let path = dir.path().join(CONFIG_JSON);
        std::fs::write(&path, json).unwrap();
        path
    }

    #[test]
    fn test_config_load() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            r#"{
                "app_name": "ing-import",
                "config_version": 1,
                "iban": "DE99 9999 9999 9999 9999 99",
                "account_name": "Assets:ING:Giro",
                "user": "Regina Phalange"
            }"#,
        );

        let config = Config::load(&path).unwrap();

        assert_eq!(config.config_path(), path);
        assert_eq!(config.account_name(), "Assets:ING:Giro");
        assert_eq!(config.identity().iban(), "DE99999999999999999999");
        assert_eq!(config.identity().user(), "Regina Phalange");
        assert_eq!(config.identity().encoding(), encoding_rs::WINDOWS_1252);
        assert_eq!(config.importer().account("x.csv"), "Assets:ING:Giro");
    }

    #[test]
    fn test_config_load_encoding() {
        let dir = TempDir::new().unwrap();
        let json = serde_json::to_string(&ConfigFile::new(
            "DE99",
            "Assets:ING:Giro",
            "Regina Phalange",
            Some("utf-8"),
        ))
        .unwrap();
        let config = Config::load(write(&dir, &json)).unwrap();
        assert_eq!(config.identity().encoding(), encoding_rs::UTF_8);
    }

    #[test]
    fn test_config_load_unknown_encoding() {
        let dir = TempDir::new().unwrap();
        let json = serde_json::to_string(&ConfigFile::new(
            "DE99",
            "Assets:ING:Giro",
            "Regina Phalange",
            Some("klingon"),
        ))
        .unwrap();
        let e = Config::load(write(&dir, &json)).unwrap_err();
        assert!(e.to_string().contains("Invalid file_encoding"));
    }

    #[test]
    fn test_config_load_invalid_app_name() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            r#"{
                "app_name": "beancount",
                "config_version": 1,
                "iban": "DE99",
                "account_name": "Assets:ING:Giro",
                "user": "Regina Phalange"
            }"#,
        );
        let e = Config::load(path).unwrap_err();
        assert!(e.to_string().contains("Invalid app_name"));
    }

    #[test]
    fn test_config_load_missing_file() {
        let dir = TempDir::new().unwrap();
        let e = Config::load(dir.path().join(CONFIG_JSON)).unwrap_err();
        assert!(e.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_config_load_missing_field() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            r#"{"app_name": "ing-import", "config_version": 1, "iban": "DE99"}"#,
        );
        let e = Config::load(path).unwrap_err();
        assert!(e.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_config_file_serialization_omits_none_fields() {
        let config = ConfigFile::new("DE99", "Assets:ING:Giro", "Regina Phalange", None);
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("file_encoding"));
        assert_eq!(config.file_encoding(), DEFAULT_ENCODING);
    }
}
