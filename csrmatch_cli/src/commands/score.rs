//! The `score` subcommand: score one company/NGO pair and persist the match.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use csrmatch_lib::validation;

use crate::output::{print_matches, OutputFormat};

#[derive(Args)]
pub struct ScoreArgs {
    /// SQLite database path (defaults to $CSRMATCH_DB)
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Company CIN
    #[arg(long)]
    pub company: String,

    /// NGO registry id
    #[arg(long)]
    pub ngo: String,

    /// Scoring config TOML (defaults to the built-in weights)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

pub fn run(args: &ScoreArgs, format: &OutputFormat) -> Result<()> {
    let company_id = validation::validate_entity_id(&args.company)?;
    let ngo_id = validation::validate_entity_id(&args.ngo)?;

    let db = super::open_db(args.db.as_ref())?;
    let engine = super::load_engine(args.config.as_deref())?;

    let record = engine.create_match(&db, &company_id, &ngo_id)?;
    print_matches(std::slice::from_ref(&record), format)
}
