mod commands;
mod output;
mod xml_output;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::output::OutputFormat;

#[derive(Parser)]
#[command(name = "csrmatch")]
#[command(about = "Match companies to NGOs for CSR funding and score compliance")]
struct Cli {
    /// Output format: table, json, csv, md, xml
    #[arg(long, default_value = "table", global = true)]
    output: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load NGO and company records from collector JSON
    Import(commands::import::ImportArgs),
    /// Score one company/NGO pair and store the match
    Score(commands::score::ScoreArgs),
    /// Score many pairs concurrently
    Batch(commands::batch::BatchArgs),
    /// List stored matches, best first
    Matches(commands::matches::MatchesArgs),
    /// Search the NGO directory
    Ngos(commands::ngos::NgosArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    if let Ok(directive) = "csrmatch_lib=info".parse() {
        filter = filter.add_directive(directive);
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let format = OutputFormat::parse(&cli.output);

    match &cli.command {
        Commands::Import(args) => commands::import::run(args, &format)?,
        Commands::Score(args) => commands::score::run(args, &format)?,
        Commands::Batch(args) => commands::batch::run(args, &format).await?,
        Commands::Matches(args) => commands::matches::run(args, &format)?,
        Commands::Ngos(args) => commands::ngos::run(args, &format)?,
    }

    Ok(())
}
