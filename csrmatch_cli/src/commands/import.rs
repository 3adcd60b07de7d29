//! The `import` subcommand: load collector output into SQLite.

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Args;
use csrmatch_lib::{import_companies_from_json, import_ngos_from_json, ImportSummary};

use crate::output::{print_import_summary, OutputFormat};

#[derive(Args)]
pub struct ImportArgs {
    /// SQLite database path (defaults to $CSRMATCH_DB)
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// JSON array of NGO records
    #[arg(long)]
    pub ngos: Option<PathBuf>,

    /// JSON array of company records
    #[arg(long)]
    pub companies: Option<PathBuf>,
}

pub fn run(args: &ImportArgs, format: &OutputFormat) -> Result<()> {
    if args.ngos.is_none() && args.companies.is_none() {
        bail!("nothing to import: pass --ngos and/or --companies");
    }

    let mut db = super::open_db(args.db.as_ref())?;
    let mut results: Vec<(&str, ImportSummary)> = Vec::new();

    // Companies first so a later batch run can reference both sides.
    if let Some(ref path) = args.companies {
        eprintln!("Importing companies from {}", path.display());
        results.push(("companies", import_companies_from_json(&mut db, path)?));
    }
    if let Some(ref path) = args.ngos {
        eprintln!("Importing NGOs from {}", path.display());
        results.push(("ngos", import_ngos_from_json(&mut db, path)?));
    }

    print_import_summary(&results, format)
}
