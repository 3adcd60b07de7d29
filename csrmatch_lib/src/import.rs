//! Loading of ingestion-pipeline output into the store.
//!
//! The collectors emit JSON arrays of loosely-typed records. Field names from
//! both the registry scrapers and the store schema are accepted, flags may be
//! booleans, 0/1, or "Yes"/"No", and SDG lists may mix numbers and strings.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::OnceLock;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use crate::alignment::map_sdgs_to_schedule_vii;
use crate::db::{Db, DbError};
use crate::types::{is_valid_sdg, Company, Location, Ngo, Registrations};

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("failed to read input file: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("store error: {0}")]
    Db(#[from] DbError),
}

/// Stored vs. failed record counts for one import run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub stored: usize,
    pub failed: usize,
}

/// Six-digit Indian PIN code, first digit non-zero.
fn postal_code_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[1-9][0-9]{5}$").ok()).as_ref()
}

pub fn is_valid_postal_code(code: &str) -> bool {
    postal_code_regex().is_some_and(|re| re.is_match(code))
}

/// NGO record as emitted by the registry collectors.
#[derive(Deserialize, Debug, Clone)]
pub struct NgoRecord {
    #[serde(alias = "darpan_id")]
    pub id: String,
    #[serde(default, alias = "organisation_name", deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default, alias = "district_name")]
    pub district: Option<String>,
    #[serde(default, alias = "pincode")]
    pub postal_code: Option<Value>,
    #[serde(default, alias = "sectors", deserialize_with = "null_as_default")]
    pub focus_areas: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub sdgs: Vec<Value>,
    #[serde(default)]
    pub schedule_vii_categories: Option<Vec<String>>,
    #[serde(default, alias = "has_12a", alias = "12a_status", deserialize_with = "flag")]
    pub reg_flag_a: bool,
    #[serde(default, alias = "has_80g", alias = "80g_status", deserialize_with = "flag")]
    pub reg_flag_b: bool,
    #[serde(default, alias = "has_fcra", alias = "fcra_status", deserialize_with = "flag")]
    pub reg_flag_fcra: bool,
    #[serde(default, alias = "has_csr1", deserialize_with = "flag")]
    pub reg_flag_csr1: bool,
    #[serde(default, alias = "works_with_foreign_funds", deserialize_with = "flag")]
    pub foreign_funds: bool,
    #[serde(default)]
    pub annual_budget: Option<f64>,
    #[serde(default, alias = "csr_funds_utilized")]
    pub funds_utilized: Option<f64>,
    #[serde(default)]
    pub credibility_score: Option<f64>,
    #[serde(default)]
    pub achievements: Option<String>,
    #[serde(default, alias = "last_updated")]
    pub updated_at: Option<String>,
}

/// Company record as emitted by the MCA collector.
#[derive(Deserialize, Debug, Clone)]
pub struct CompanyRecord {
    #[serde(alias = "cin")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default)]
    pub csr_budget: Option<f64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub preferred_geographies: Vec<Location>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub focus_areas: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub sdgs: Vec<Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub compliance_requirements: Vec<String>,
    #[serde(default)]
    pub preferred_ngo_size: Option<String>,
    #[serde(default, alias = "last_updated")]
    pub updated_at: Option<String>,
}

impl NgoRecord {
    pub fn into_ngo(self) -> Ngo {
        let sdgs = parse_sdgs(&self.sdgs, &self.id);
        let schedule_vii_categories = match self.schedule_vii_categories {
            Some(categories) if !categories.is_empty() => categories.into_iter().collect(),
            _ => map_sdgs_to_schedule_vii(&sdgs),
        };
        let postal_code = self
            .postal_code
            .as_ref()
            .and_then(scalar_text)
            .filter(|code| {
                let valid = is_valid_postal_code(code);
                if !valid {
                    warn!(ngo = %self.id, postal_code = %code, "invalid postal code, dropping");
                }
                valid
            });

        Ngo {
            name: self.name.trim().to_string(),
            state: self.state.unwrap_or_default().trim().to_string(),
            district: self.district.unwrap_or_default().trim().to_string(),
            postal_code,
            focus_areas: self.focus_areas,
            sdgs,
            schedule_vii_categories,
            registrations: Registrations {
                has_12a: self.reg_flag_a,
                has_80g: self.reg_flag_b,
                has_fcra: self.reg_flag_fcra,
                has_csr1: self.reg_flag_csr1,
            },
            foreign_funds: self.foreign_funds,
            annual_budget: self.annual_budget,
            funds_utilized: self.funds_utilized,
            credibility_score: self.credibility_score,
            achievements: self.achievements.filter(|a| !a.trim().is_empty()),
            updated_at: parse_timestamp(self.updated_at.as_deref()),
            id: self.id.trim().to_string(),
        }
    }
}

impl CompanyRecord {
    pub fn into_company(self) -> Company {
        let mut csr_budget = self.csr_budget.unwrap_or(0.0);
        if csr_budget < 0.0 {
            warn!(company = %self.id, csr_budget, "negative CSR budget, using 0");
            csr_budget = 0.0;
        }
        Company {
            name: self.name.trim().to_string(),
            csr_budget,
            preferred_geographies: self.preferred_geographies,
            focus_areas: self.focus_areas,
            sdgs: parse_sdgs(&self.sdgs, &self.id),
            compliance_requirements: self.compliance_requirements,
            preferred_ngo_size: self.preferred_ngo_size.filter(|s| !s.trim().is_empty()),
            updated_at: parse_timestamp(self.updated_at.as_deref()),
            id: self.id.trim().to_string(),
        }
    }
}

/// Parse a JSON array of NGO records.
///
/// Records with an empty id are skipped and counted as failed.
pub fn parse_ngo_records(content: &str) -> Result<(Vec<Ngo>, usize), ImportError> {
    let records: Vec<NgoRecord> = serde_json::from_str(content)?;
    let mut skipped = 0;
    let mut ngos = Vec::with_capacity(records.len());
    for record in records {
        if record.id.trim().is_empty() {
            warn!(name = %record.name, "NGO record without registry id, skipping");
            skipped += 1;
            continue;
        }
        ngos.push(record.into_ngo());
    }
    Ok((ngos, skipped))
}

/// Parse a JSON array of company records.
///
/// Records with an empty CIN are skipped and counted as failed.
pub fn parse_company_records(content: &str) -> Result<(Vec<Company>, usize), ImportError> {
    let records: Vec<CompanyRecord> = serde_json::from_str(content)?;
    let mut skipped = 0;
    let mut companies = Vec::with_capacity(records.len());
    for record in records {
        if record.id.trim().is_empty() {
            warn!(name = %record.name, "company record without CIN, skipping");
            skipped += 1;
            continue;
        }
        companies.push(record.into_company());
    }
    Ok((companies, skipped))
}

pub fn import_ngos_from_json(
    db: &mut Db,
    path: impl AsRef<Path>,
) -> Result<ImportSummary, ImportError> {
    let content = std::fs::read_to_string(path.as_ref())?;
    let (ngos, skipped) = parse_ngo_records(&content)?;
    let written = db.upsert_ngos(&ngos)?;
    let summary = ImportSummary {
        stored: written.stored,
        failed: written.failed + skipped,
    };
    info!(
        path = %path.as_ref().display(),
        stored = summary.stored,
        failed = summary.failed,
        "imported NGO records"
    );
    Ok(summary)
}

pub fn import_companies_from_json(
    db: &mut Db,
    path: impl AsRef<Path>,
) -> Result<ImportSummary, ImportError> {
    let content = std::fs::read_to_string(path.as_ref())?;
    let (companies, skipped) = parse_company_records(&content)?;
    let written = db.upsert_companies(&companies)?;
    let summary = ImportSummary {
        stored: written.stored,
        failed: written.failed + skipped,
    };
    info!(
        path = %path.as_ref().display(),
        stored = summary.stored,
        failed = summary.failed,
        "imported company records"
    );
    Ok(summary)
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Accepts `true`/`false`, numbers (non-zero is true), "Yes"/"No",
/// "true"/"false", "1"/"0", and null (false).
fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Bool(b) => b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "yes" | "y" | "true" | "1"
        ),
        _ => false,
    })
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => n.as_u64().map(|n| n.to_string()),
        _ => None,
    }
}

fn parse_sdgs(values: &[Value], id: &str) -> BTreeSet<u8> {
    let mut sdgs = BTreeSet::new();
    for value in values {
        let parsed = match value {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        };
        match parsed {
            Some(n) if is_valid_sdg(n) => {
                sdgs.insert(n as u8);
            }
            _ => warn!(id, value = %value, "dropping invalid SDG identifier"),
        }
    }
    sdgs
}

fn parse_timestamp(raw: Option<&str>) -> Option<DateTime<Utc>> {
    let text = raw.map(str::trim).filter(|t| !t.is_empty())?;
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}

#[cfg(test)]
mod tests {
    use super::*;

    const COLLECTOR_NGOS: &str = r#"[
        {
            "darpan_id": "BR/2017/0154321",
            "name": "Gram Vikas Sansthan",
            "state": "Bihar",
            "district": "Gaya",
            "pincode": 823001,
            "focus_areas": ["education"],
            "sdgs": [4, "5", 22],
            "has_12a": 1,
            "has_80g": "Yes",
            "has_fcra": false,
            "csr_funds_utilized": 125000,
            "credibility_score": 4.1,
            "last_updated": "2024-01-15T09:30:00.000000"
        },
        {
            "id": "AS/2020/0042",
            "name": "Brahmaputra Care",
            "postal_code": "01234",
            "sdgs": null,
            "schedule_vii_categories": ["healthcare"],
            "has_csr1": true,
            "works_with_foreign_funds": "yes"
        }
    ]"#;

    #[test]
    fn test_collector_field_names_accepted() {
        let (ngos, skipped) = parse_ngo_records(COLLECTOR_NGOS).expect("parse");
        assert_eq!(skipped, 0);
        assert_eq!(ngos.len(), 2);

        let first = &ngos[0];
        assert_eq!(first.id, "BR/2017/0154321");
        assert_eq!(first.postal_code.as_deref(), Some("823001"));
        assert!(first.registrations.has_12a);
        assert!(first.registrations.has_80g);
        assert!(!first.registrations.has_csr1);
        assert_eq!(first.funds_utilized, Some(125000.0));
        assert!(first.updated_at.is_some());
    }

    #[test]
    fn test_invalid_sdgs_dropped_and_categories_derived() {
        let (ngos, _) = parse_ngo_records(COLLECTOR_NGOS).expect("parse");
        let first = &ngos[0];
        assert_eq!(first.sdgs.iter().copied().collect::<Vec<_>>(), vec![4, 5]);
        assert!(first.schedule_vii_categories.contains("education"));
        assert!(first.schedule_vii_categories.contains("women empowerment"));
    }

    #[test]
    fn test_explicit_categories_kept_and_bad_postal_code_dropped() {
        let (ngos, _) = parse_ngo_records(COLLECTOR_NGOS).expect("parse");
        let second = &ngos[1];
        assert!(second.sdgs.is_empty());
        assert_eq!(second.schedule_vii_categories.len(), 1);
        assert!(second.postal_code.is_none());
        assert!(second.registrations.has_csr1);
        assert!(second.foreign_funds);
        assert_eq!(second.state, "");
    }

    #[test]
    fn test_blank_id_skipped() {
        let (ngos, skipped) =
            parse_ngo_records(r#"[{"id": " ", "name": "Nameless"}]"#).expect("parse");
        assert!(ngos.is_empty());
        assert_eq!(skipped, 1);
    }

    #[test]
    fn test_not_an_array_is_json_error() {
        let result = parse_ngo_records(r#"{"id": "X"}"#);
        assert!(matches!(result, Err(ImportError::Json(_))));
    }

    #[test]
    fn test_company_record_with_cin_and_negative_budget() {
        let json = r#"[{
            "cin": "L17110MH1973PLC019786",
            "name": "Example Industries",
            "csr_budget": -10,
            "preferred_geographies": [{"state": "Bihar", "district": "Gaya"}, {"state": "Assam"}],
            "sdgs": [4, 6],
            "compliance_requirements": null
        }]"#;
        let (companies, skipped) = parse_company_records(json).expect("parse");
        assert_eq!(skipped, 0);
        let company = &companies[0];
        assert_eq!(company.id, "L17110MH1973PLC019786");
        assert_eq!(company.csr_budget, 0.0);
        assert_eq!(company.preferred_geographies.len(), 2);
        assert_eq!(company.preferred_geographies[1].district, "");
        assert!(company.compliance_requirements.is_empty());
    }

    #[test]
    fn test_postal_code_validation() {
        assert!(is_valid_postal_code("110001"));
        assert!(!is_valid_postal_code("011001"));
        assert!(!is_valid_postal_code("11001"));
        assert!(!is_valid_postal_code("11000a"));
    }

    #[test]
    fn test_import_from_file_counts() {
        let dir = std::env::temp_dir().join(format!("csrmatch-import-{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("temp dir");
        let path = dir.join("ngos.json");
        std::fs::write(
            &path,
            r#"[{"id": "N1", "name": "One"}, {"id": "", "name": "Blank"}, {"id": "N2", "name": "Two"}]"#,
        )
        .expect("write fixture");

        let mut db = Db::open_in_memory().expect("open");
        db.init().expect("init");
        let summary = import_ngos_from_json(&mut db, &path).expect("import");
        assert_eq!(summary, ImportSummary { stored: 2, failed: 1 });
        assert_eq!(db.list_ngo_ids().expect("ids"), vec!["N1", "N2"]);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_import_missing_file_is_io_error() {
        let mut db = Db::open_in_memory().expect("open");
        db.init().expect("init");
        let result = import_companies_from_json(&mut db, "/nonexistent/companies.json");
        assert!(matches!(result, Err(ImportError::Io(_))));
    }
}
