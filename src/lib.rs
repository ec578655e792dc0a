pub mod args;
pub mod commands;
mod config;
mod error;
mod identity;
mod importer;
pub mod model;


pub use config::Config;
pub use error::{Error, FormatError, FormatErrorKind, Result};
pub use identity::{normalize_iban, ImporterIdentity, UnknownEncoding, BANKS, DEFAULT_ENCODING};
pub use importer::Importer;
