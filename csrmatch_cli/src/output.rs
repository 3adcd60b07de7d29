use anyhow::Result;
use csrmatch_lib::{verify_compliance, BatchOutcome, ImportSummary, MatchRecord, Ngo};
use serde::Serialize;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::xml_output;

#[derive(Clone, Debug, PartialEq)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
    Markdown,
    Xml,
}

impl OutputFormat {
    /// Unknown names fall back to a table.
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "json" => Self::Json,
            "csv" => Self::Csv,
            "markdown" | "md" => Self::Markdown,
            "xml" => Self::Xml,
            _ => Self::Table,
        }
    }
}

#[derive(Tabled, Serialize)]
struct MatchRow {
    #[tabled(rename = "ID")]
    #[serde(rename = "ID")]
    id: i64,
    #[tabled(rename = "Company")]
    #[serde(rename = "Company")]
    company_id: String,
    #[tabled(rename = "NGO")]
    #[serde(rename = "NGO")]
    ngo_id: String,
    #[tabled(rename = "Score")]
    #[serde(rename = "Score")]
    score: String,
    #[tabled(rename = "Geo")]
    #[serde(rename = "Geo")]
    geographic: String,
    #[tabled(rename = "SDG")]
    #[serde(rename = "SDG")]
    thematic: String,
    #[tabled(rename = "Compliant")]
    #[serde(rename = "Compliant")]
    compliant: String,
    #[tabled(rename = "Strengths")]
    #[serde(rename = "Strengths")]
    strengths: String,
    #[tabled(rename = "Risks")]
    #[serde(rename = "Risks")]
    risks: String,
    #[tabled(rename = "Created")]
    #[serde(rename = "Created")]
    created_at: String,
}

#[derive(Tabled, Serialize)]
struct NgoRow {
    #[tabled(rename = "ID")]
    #[serde(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    #[serde(rename = "Name")]
    name: String,
    #[tabled(rename = "State")]
    #[serde(rename = "State")]
    state: String,
    #[tabled(rename = "District")]
    #[serde(rename = "District")]
    district: String,
    #[tabled(rename = "SDGs")]
    #[serde(rename = "SDGs")]
    sdgs: String,
    #[tabled(rename = "Credibility")]
    #[serde(rename = "Credibility")]
    credibility: String,
    #[tabled(rename = "Compliant")]
    #[serde(rename = "Compliant")]
    compliant: String,
}

#[derive(Tabled, Serialize)]
struct ImportRow {
    #[tabled(rename = "Records")]
    #[serde(rename = "Records")]
    kind: String,
    #[tabled(rename = "Stored")]
    #[serde(rename = "Stored")]
    stored: usize,
    #[tabled(rename = "Failed")]
    #[serde(rename = "Failed")]
    failed: usize,
}

#[derive(Tabled, Serialize)]
struct BatchRow {
    #[tabled(rename = "Persisted")]
    #[serde(rename = "Persisted")]
    persisted: usize,
    #[tabled(rename = "Not Found")]
    #[serde(rename = "Not Found")]
    not_found: usize,
    #[tabled(rename = "Failed")]
    #[serde(rename = "Failed")]
    failed: usize,
    #[tabled(rename = "Cancelled")]
    #[serde(rename = "Cancelled")]
    cancelled: usize,
}

// -- Row builders --

fn build_match_rows(matches: &[MatchRecord]) -> Vec<MatchRow> {
    matches
        .iter()
        .map(|m| MatchRow {
            id: m.id,
            company_id: m.company_id.clone(),
            ngo_id: m.ngo_id.clone(),
            score: format_score(m.score),
            geographic: m
                .geographic_score
                .map(|g| g.to_string())
                .unwrap_or_else(|| "-".to_string()),
            thematic: m.thematic_score.map(format_score).unwrap_or_else(|| "-".to_string()),
            compliant: yes_no(m.compliance_status.is_compliant),
            strengths: m.strengths.join("; "),
            risks: m.risk_factors.join("; "),
            created_at: m.created_at.format("%Y-%m-%d %H:%M").to_string(),
        })
        .collect()
}

fn build_ngo_rows(ngos: &[Ngo]) -> Vec<NgoRow> {
    ngos.iter()
        .map(|n| NgoRow {
            id: n.id.clone(),
            name: n.name.clone(),
            state: n.state.clone(),
            district: n.district.clone(),
            sdgs: n
                .sdgs
                .iter()
                .map(|s| s.to_string())
                .collect::<Vec<_>>()
                .join(", "),
            credibility: n
                .credibility_score
                .map(|c| format!("{:.1}", c))
                .unwrap_or_else(|| "-".to_string()),
            compliant: yes_no(verify_compliance(n).is_compliant),
        })
        .collect()
}

fn build_import_rows(results: &[(&str, ImportSummary)]) -> Vec<ImportRow> {
    results
        .iter()
        .map(|(kind, summary)| ImportRow {
            kind: kind.to_string(),
            stored: summary.stored,
            failed: summary.failed,
        })
        .collect()
}

fn build_batch_rows(outcome: &BatchOutcome) -> Vec<BatchRow> {
    vec![BatchRow {
        persisted: outcome.persisted,
        not_found: outcome.not_found,
        failed: outcome.failed,
        cancelled: outcome.cancelled,
    }]
}

// -- Generic renderers --

fn print_rows<T: Tabled>(rows: Vec<T>, markdown: bool) {
    let mut table = Table::new(rows);
    if markdown {
        table.with(Style::markdown());
    }
    println!("{}", table);
}

fn print_rows_csv<T: Serialize>(rows: &[T]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(std::io::stdout());
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

// -- Matches --

pub fn print_matches(matches: &[MatchRecord], format: &OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => print_rows(build_match_rows(matches), false),
        OutputFormat::Markdown => print_rows(build_match_rows(matches), true),
        OutputFormat::Csv => print_rows_csv(&build_match_rows(matches))?,
        OutputFormat::Json => print_json(&matches),
        OutputFormat::Xml => println!("{}", xml_output::matches_to_xml(matches)?),
    }
    Ok(())
}

// -- NGOs --

pub fn print_ngos(ngos: &[Ngo], format: &OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => print_rows(build_ngo_rows(ngos), false),
        OutputFormat::Markdown => print_rows(build_ngo_rows(ngos), true),
        OutputFormat::Csv => print_rows_csv(&build_ngo_rows(ngos))?,
        OutputFormat::Json => print_json(&ngos),
        OutputFormat::Xml => println!("{}", xml_output::ngos_to_xml(ngos)?),
    }
    Ok(())
}

// -- Summaries --

pub fn print_import_summary(
    results: &[(&str, ImportSummary)],
    format: &OutputFormat,
) -> Result<()> {
    let rows = build_import_rows(results);
    match format {
        OutputFormat::Table => print_rows(rows, false),
        OutputFormat::Markdown => print_rows(rows, true),
        OutputFormat::Csv => print_rows_csv(&rows)?,
        OutputFormat::Json => print_json(&rows),
        OutputFormat::Xml => println!("{}", xml_output::summary_to_xml("imports", "import", &rows)?),
    }
    Ok(())
}

pub fn print_batch_outcome(outcome: &BatchOutcome, format: &OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => print_rows(build_batch_rows(outcome), false),
        OutputFormat::Markdown => print_rows(build_batch_rows(outcome), true),
        OutputFormat::Csv => print_rows_csv(&build_batch_rows(outcome))?,
        OutputFormat::Json => print_json(outcome),
        OutputFormat::Xml => println!(
            "{}",
            xml_output::summary_to_xml("batches", "batch", std::slice::from_ref(outcome))?
        ),
    }
    Ok(())
}

// -- JSON output --

pub fn print_json<T: serde::Serialize>(data: &T) {
    match serde_json::to_string_pretty(data) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to serialize to JSON: {}", e),
    }
}

fn format_score(score: f64) -> String {
    format!("{:.1}", score)
}

fn yes_no(value: bool) -> String {
    let text = if value { "yes" } else { "no" };
    text.to_string()
}
