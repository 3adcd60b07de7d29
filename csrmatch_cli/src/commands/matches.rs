//! The `matches` subcommand: list persisted matches, best first.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use csrmatch_lib::{validation, MatchFilter};

use crate::output::{print_matches, OutputFormat};

#[derive(Args)]
pub struct MatchesArgs {
    /// SQLite database path (defaults to $CSRMATCH_DB)
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Only matches for this company CIN
    #[arg(long)]
    pub company: Option<String>,

    /// Only matches for this NGO registry id
    #[arg(long)]
    pub ngo: Option<String>,

    /// Minimum composite score (0-100)
    #[arg(long)]
    pub min_score: Option<f64>,

    /// Maximum number of rows
    #[arg(long, default_value = "50")]
    pub limit: i64,
}

pub fn run(args: &MatchesArgs, format: &OutputFormat) -> Result<()> {
    let filter = MatchFilter {
        company_id: args
            .company
            .as_deref()
            .map(validation::validate_entity_id)
            .transpose()?,
        ngo_id: args
            .ngo
            .as_deref()
            .map(validation::validate_entity_id)
            .transpose()?,
        min_score: args.min_score.map(validation::validate_min_score).transpose()?,
        limit: Some(validation::validate_limit(args.limit)?),
    };

    let db = super::open_db(args.db.as_ref())?;
    let matches = db.query_matches(&filter)?;
    eprintln!("{} matches", matches.len());
    print_matches(&matches, format)
}
