//! CLI subcommand implementations.

pub mod batch;
pub mod import;
pub mod matches;
pub mod ngos;
pub mod score;

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use csrmatch_lib::{load_aspirational_districts, Db, MatchEngine, ScoringConfig};

/// Environment variable consulted when `--db` is not given.
pub const DB_ENV_VAR: &str = "CSRMATCH_DB";

/// Resolve the database path from `--db` or `CSRMATCH_DB`.
pub fn resolve_db_path(arg: Option<&PathBuf>) -> Result<PathBuf> {
    if let Some(path) = arg {
        return Ok(path.clone());
    }
    match std::env::var(DB_ENV_VAR) {
        Ok(path) if !path.trim().is_empty() => Ok(PathBuf::from(path)),
        _ => bail!("no database given: pass --db or set {}", DB_ENV_VAR),
    }
}

/// Open the store and bring its schema up to date.
pub fn open_db(arg: Option<&PathBuf>) -> Result<Db> {
    let path = resolve_db_path(arg)?;
    let db = Db::open(&path)?;
    db.init()?;
    Ok(db)
}

/// Build a scoring engine from `--config`, or the embedded defaults.
pub fn load_engine(config: Option<&Path>) -> Result<MatchEngine> {
    let config = match config {
        Some(path) => ScoringConfig::from_file(path)?,
        None => ScoringConfig::embedded()?,
    };
    Ok(MatchEngine::new(config, load_aspirational_districts()?))
}
