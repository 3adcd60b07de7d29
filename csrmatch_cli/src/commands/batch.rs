//! The `batch` subcommand: score many pairs concurrently.
//!
//! Without explicit `--company`/`--ngo` ids every stored company is paired
//! with every stored NGO. Ctrl-C stops the run; matches already written stay.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{bail, Result};
use clap::Args;
use csrmatch_lib::{
    cartesian_pairs, score_batch, validation, BatchOptions, PairOutcome,
};
use indicatif::{ProgressBar, ProgressStyle};

use crate::output::{print_batch_outcome, OutputFormat};

#[derive(Args)]
pub struct BatchArgs {
    /// SQLite database path (defaults to $CSRMATCH_DB)
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Company CINs to score (repeatable; default: all stored companies)
    #[arg(long = "company")]
    pub companies: Vec<String>,

    /// NGO registry ids to score (repeatable; default: all stored NGOs)
    #[arg(long = "ngo")]
    pub ngos: Vec<String>,

    /// Pairs scored concurrently (1-64)
    #[arg(long, default_value = "4")]
    pub concurrency: usize,

    /// Scoring config TOML (defaults to the built-in weights)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

pub async fn run(args: &BatchArgs, format: &OutputFormat) -> Result<()> {
    let concurrency = validation::validate_concurrency(args.concurrency)?;

    let db = super::open_db(args.db.as_ref())?;
    let engine = Arc::new(super::load_engine(args.config.as_deref())?);

    let company_ids = if args.companies.is_empty() {
        db.list_company_ids()?
    } else {
        args.companies
            .iter()
            .map(|id| validation::validate_entity_id(id))
            .collect::<Result<Vec<_>, _>>()?
    };
    let ngo_ids = if args.ngos.is_empty() {
        db.list_ngo_ids()?
    } else {
        args.ngos
            .iter()
            .map(|id| validation::validate_entity_id(id))
            .collect::<Result<Vec<_>, _>>()?
    };

    let pairs = cartesian_pairs(&company_ids, &ngo_ids);
    if pairs.is_empty() {
        bail!("nothing to score: no companies or no NGOs selected");
    }
    eprintln!(
        "Scoring {} pairs ({} companies x {} NGOs)",
        pairs.len(),
        company_ids.len(),
        ngo_ids.len()
    );

    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = Arc::clone(&cancel);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.store(true, Ordering::SeqCst);
            }
        });
    }

    let pb = ProgressBar::new(pairs.len() as u64);
    pb.set_style(
        ProgressStyle::with_template(
            "[{elapsed_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} ({eta}) {msg}",
        )?,
    );
    pb.set_message("scoring pairs...");

    let mut persisted = 0usize;
    let mut skipped = 0usize;
    let outcome = score_batch(
        &db,
        engine,
        &pairs,
        &BatchOptions { concurrency },
        Arc::clone(&cancel),
        |event| {
            match event {
                PairOutcome::Persisted(_) => persisted += 1,
                PairOutcome::NotFound { missing, .. } => {
                    skipped += 1;
                    pb.println(format!("  Warning: {} not found", missing));
                }
                PairOutcome::Failed { pair, error } => {
                    skipped += 1;
                    pb.println(format!(
                        "  Warning: {} / {} failed: {}",
                        pair.company_id, pair.ngo_id, error
                    ));
                }
            }
            pb.set_message(format!("{} persisted, {} skipped", persisted, skipped));
            pb.inc(1);
        },
    )
    .await?;

    if cancel.load(Ordering::SeqCst) {
        pb.abandon_with_message(format!(
            "Interrupted: {} persisted, {} cancelled",
            outcome.persisted, outcome.cancelled
        ));
    } else {
        pb.finish_with_message(format!(
            "Done: {} persisted, {} not found, {} failed",
            outcome.persisted, outcome.not_found, outcome.failed
        ));
    }

    print_batch_outcome(&outcome, format)
}
