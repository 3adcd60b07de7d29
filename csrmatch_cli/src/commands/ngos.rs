//! The `ngos` subcommand: search the NGO directory.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use csrmatch_lib::{validation, NgoFilter};

use crate::output::{print_json, print_ngos, OutputFormat};

#[derive(Args)]
pub struct NgosArgs {
    /// SQLite database path (defaults to $CSRMATCH_DB)
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Case-insensitive text search over name and achievements
    #[arg(long)]
    pub search: Option<String>,

    /// Case-insensitive district filter (substring)
    #[arg(long)]
    pub district: Option<String>,

    /// Maximum number of rows
    #[arg(long)]
    pub limit: Option<i64>,

    /// Print the known districts instead of NGOs
    #[arg(long)]
    pub districts: bool,
}

pub fn run(args: &NgosArgs, format: &OutputFormat) -> Result<()> {
    let filter = NgoFilter {
        search: args.search.as_deref().map(validation::validate_search).transpose()?,
        district: args
            .district
            .as_deref()
            .map(validation::validate_district)
            .transpose()?,
        limit: args.limit.map(validation::validate_limit).transpose()?,
    };

    let db = super::open_db(args.db.as_ref())?;
    let directory = db.ngo_directory(&filter)?;

    if args.districts {
        match format {
            OutputFormat::Json => print_json(&directory.districts),
            _ => {
                for district in &directory.districts {
                    println!("{}", district);
                }
            }
        }
        return Ok(());
    }

    if let OutputFormat::Json = format {
        print_json(&directory);
        return Ok(());
    }
    eprintln!(
        "{} NGOs ({} known districts)",
        directory.ngos.len(),
        directory.districts.len()
    );
    print_ngos(&directory.ngos, format)
}
