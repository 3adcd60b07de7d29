//! Error types for the library layer.

use std::fmt;

use crate::config::ConfigError;
use crate::db::DbError;
use crate::geography::SeedDataError;

/// Errors produced by the library layer, wrapping store, configuration and
/// seed data failures and adding lookup and input validation failures.
#[derive(Debug)]
pub enum CsrMatchError {
    /// A store operation failed.
    Db(DbError),
    /// The scoring configuration could not be loaded.
    Config(ConfigError),
    /// Embedded seed data failed to parse or validate.
    SeedData(SeedDataError),
    /// A referenced company or NGO does not exist.
    NotFound(String),
    /// User-provided input failed validation.
    InvalidInput(String),
}

impl fmt::Display for CsrMatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Db(e) => write!(f, "Store error: {}", e),
            Self::Config(e) => write!(f, "Config error: {}", e),
            Self::SeedData(e) => write!(f, "Seed data error: {}", e),
            Self::NotFound(what) => write!(f, "Not found: {}", what),
            Self::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
        }
    }
}

impl std::error::Error for CsrMatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Db(e) => Some(e),
            Self::Config(e) => Some(e),
            Self::SeedData(e) => Some(e),
            _ => None,
        }
    }
}

impl From<DbError> for CsrMatchError {
    fn from(e: DbError) -> Self {
        Self::Db(e)
    }
}

impl From<ConfigError> for CsrMatchError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<SeedDataError> for CsrMatchError {
    fn from(e: SeedDataError) -> Self {
        Self::SeedData(e)
    }
}
