//! SQLite storage for NGO, company, and match records.
//!
//! Structured fields (focus areas, SDGs, geographies, audit lists) are stored
//! as JSON text columns. Entity reads decode them best-effort: a NULL or
//! malformed column becomes an empty container and a warning, never an error.

use std::collections::BTreeSet;
use std::path::Path;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use crate::compliance::ComplianceStatus;
use crate::matching::{MatchAssessment, MatchRecord};
use crate::types::{is_valid_sdg, Company, Location, Ngo, Registrations};

#[derive(thiserror::Error, Debug)]
pub enum DbError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("date parse error: {0}")]
    Date(#[from] chrono::ParseError),
}

/// Per-record outcome of a bulk write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WriteSummary {
    pub stored: usize,
    pub failed: usize,
}

/// Filter for the NGO directory query.
#[derive(Debug, Clone, Default)]
pub struct NgoFilter {
    /// Case-insensitive substring over name and achievements.
    pub search: Option<String>,
    /// Case-insensitive substring over district.
    pub district: Option<String>,
    pub limit: Option<i64>,
}

/// NGO directory result: matching NGOs plus every known district.
#[derive(Debug, Clone, Serialize)]
pub struct NgoDirectory {
    pub ngos: Vec<Ngo>,
    pub districts: Vec<String>,
}

/// Filter for ranked match listings.
#[derive(Debug, Clone, Default)]
pub struct MatchFilter {
    pub company_id: Option<String>,
    pub ngo_id: Option<String>,
    pub min_score: Option<f64>,
    pub limit: Option<i64>,
}

const NGO_COLUMNS: &str = "id, name, state, district, postal_code, focus_areas, sdgs,
     schedule_vii_categories, reg_flag_a, reg_flag_b, reg_flag_fcra, reg_flag_csr1,
     foreign_funds, annual_budget, funds_utilized, credibility_score, achievements,
     updated_at";

const COMPANY_COLUMNS: &str = "id, name, csr_budget, preferred_geographies, focus_areas, sdgs,
     compliance_requirements, preferred_ngo_size, updated_at";

const MATCH_COLUMNS: &str = "id, company_id, ngo_id, score, geographic_score, thematic_score,
     strengths, compliance_status, risk_factors, created_at";

pub struct Db {
    conn: Connection,
}

impl Db {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA foreign_keys = ON;
             PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(Self { conn })
    }

    /// Get a reference to the underlying connection (for tests).
    #[doc(hidden)]
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    pub fn init(&self) -> Result<(), DbError> {
        // Migrations run before the schema so that indexes in the schema can
        // reference columns the migrations add to pre-existing tables.
        let version: i32 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;

        if version < 1 {
            self.migrate_v1()?;
            self.conn.pragma_update(None, "user_version", 1)?;
        }

        if version < 2 {
            self.migrate_v2()?;
            self.conn.pragma_update(None, "user_version", 2)?;
        }

        let schema = include_str!("../../schema/sqlite.sql");
        self.conn.execute_batch(schema)?;

        Ok(())
    }

    fn migrate_v1(&self) -> Result<(), DbError> {
        self.add_columns(&[
            "ALTER TABLE ngos ADD COLUMN reg_flag_csr1 INTEGER NOT NULL DEFAULT 0",
            "ALTER TABLE ngos ADD COLUMN foreign_funds INTEGER NOT NULL DEFAULT 0",
            "ALTER TABLE ngos ADD COLUMN achievements TEXT",
        ])
    }

    fn migrate_v2(&self) -> Result<(), DbError> {
        self.add_columns(&[
            "ALTER TABLE matches ADD COLUMN geographic_score INTEGER",
            "ALTER TABLE matches ADD COLUMN thematic_score REAL",
        ])
    }

    fn add_columns(&self, statements: &[&str]) -> Result<(), DbError> {
        for sql in statements {
            match self.conn.execute(sql, []) {
                Ok(_) => {}
                Err(rusqlite::Error::SqliteFailure(_, Some(ref msg)))
                    if msg.contains("duplicate column name")
                        || msg.contains("no such table") => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    // -- Entity repository --

    pub fn get_ngo(&self, id: &str) -> Result<Option<Ngo>, DbError> {
        let sql = format!("SELECT {} FROM ngos WHERE id = ?1", NGO_COLUMNS);
        let raw = self
            .conn
            .query_row(&sql, params![id], read_ngo_row)
            .optional()?;
        Ok(raw.map(RawNgo::into_ngo))
    }

    pub fn get_company(&self, id: &str) -> Result<Option<Company>, DbError> {
        let sql = format!("SELECT {} FROM companies WHERE id = ?1", COMPANY_COLUMNS);
        let raw = self
            .conn
            .query_row(&sql, params![id], read_company_row)
            .optional()?;
        Ok(raw.map(RawCompany::into_company))
    }

    pub fn list_ngo_ids(&self) -> Result<Vec<String>, DbError> {
        self.list_ids("SELECT id FROM ngos ORDER BY id")
    }

    pub fn list_company_ids(&self) -> Result<Vec<String>, DbError> {
        self.list_ids("SELECT id FROM companies ORDER BY id")
    }

    fn list_ids(&self, sql: &str) -> Result<Vec<String>, DbError> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut ids = Vec::new();
        for row in rows {
            ids.push(row?);
        }
        Ok(ids)
    }

    /// Insert or replace NGO records. Rows that fail are counted and skipped.
    pub fn upsert_ngos(&mut self, ngos: &[Ngo]) -> Result<WriteSummary, DbError> {
        let tx = self.conn.transaction()?;
        let mut summary = WriteSummary::default();
        {
            let mut stmt = tx.prepare(
                "INSERT INTO ngos (
                   id, name, state, district, postal_code, focus_areas, sdgs,
                   schedule_vii_categories, reg_flag_a, reg_flag_b, reg_flag_fcra,
                   reg_flag_csr1, foreign_funds, annual_budget, funds_utilized,
                   credibility_score, achievements, updated_at
                 )
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)
                 ON CONFLICT(id) DO UPDATE SET
                   name = excluded.name,
                   state = excluded.state,
                   district = excluded.district,
                   postal_code = excluded.postal_code,
                   focus_areas = excluded.focus_areas,
                   sdgs = excluded.sdgs,
                   schedule_vii_categories = excluded.schedule_vii_categories,
                   reg_flag_a = excluded.reg_flag_a,
                   reg_flag_b = excluded.reg_flag_b,
                   reg_flag_fcra = excluded.reg_flag_fcra,
                   reg_flag_csr1 = excluded.reg_flag_csr1,
                   foreign_funds = excluded.foreign_funds,
                   annual_budget = excluded.annual_budget,
                   funds_utilized = excluded.funds_utilized,
                   credibility_score = excluded.credibility_score,
                   achievements = excluded.achievements,
                   updated_at = excluded.updated_at",
            )?;

            for ngo in ngos {
                let updated_at = ngo.updated_at.unwrap_or_else(Utc::now).to_rfc3339();
                let result = stmt.execute(params![
                    ngo.id,
                    ngo.name,
                    ngo.state,
                    ngo.district,
                    ngo.postal_code,
                    serde_json::to_string(&ngo.focus_areas)?,
                    serde_json::to_string(&ngo.sdgs)?,
                    serde_json::to_string(&ngo.schedule_vii_categories)?,
                    ngo.registrations.has_12a,
                    ngo.registrations.has_80g,
                    ngo.registrations.has_fcra,
                    ngo.registrations.has_csr1,
                    ngo.foreign_funds,
                    ngo.annual_budget,
                    ngo.funds_utilized,
                    ngo.credibility_score,
                    ngo.achievements,
                    updated_at,
                ]);
                match result {
                    Ok(_) => summary.stored += 1,
                    Err(e) => {
                        warn!(ngo = %ngo.id, error = %e, "failed to store NGO");
                        summary.failed += 1;
                    }
                }
            }
        }
        tx.commit()?;
        Ok(summary)
    }

    /// Insert or replace company records. Rows that fail are counted and skipped.
    pub fn upsert_companies(&mut self, companies: &[Company]) -> Result<WriteSummary, DbError> {
        let tx = self.conn.transaction()?;
        let mut summary = WriteSummary::default();
        {
            let mut stmt = tx.prepare(
                "INSERT INTO companies (
                   id, name, csr_budget, preferred_geographies, focus_areas, sdgs,
                   compliance_requirements, preferred_ngo_size, updated_at
                 )
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                 ON CONFLICT(id) DO UPDATE SET
                   name = excluded.name,
                   csr_budget = excluded.csr_budget,
                   preferred_geographies = excluded.preferred_geographies,
                   focus_areas = excluded.focus_areas,
                   sdgs = excluded.sdgs,
                   compliance_requirements = excluded.compliance_requirements,
                   preferred_ngo_size = excluded.preferred_ngo_size,
                   updated_at = excluded.updated_at",
            )?;

            for company in companies {
                let updated_at = company.updated_at.unwrap_or_else(Utc::now).to_rfc3339();
                let result = stmt.execute(params![
                    company.id,
                    company.name,
                    company.csr_budget,
                    serde_json::to_string(&company.preferred_geographies)?,
                    serde_json::to_string(&company.focus_areas)?,
                    serde_json::to_string(&company.sdgs)?,
                    serde_json::to_string(&company.compliance_requirements)?,
                    company.preferred_ngo_size,
                    updated_at,
                ]);
                match result {
                    Ok(_) => summary.stored += 1,
                    Err(e) => {
                        warn!(company = %company.id, error = %e, "failed to store company");
                        summary.failed += 1;
                    }
                }
            }
        }
        tx.commit()?;
        Ok(summary)
    }

    // -- Matches --

    /// Persist a scored pair as a new, immutable match row.
    ///
    /// Fails if either referenced entity is missing (foreign keys are on).
    pub fn insert_match(&self, assessment: &MatchAssessment) -> Result<MatchRecord, DbError> {
        let created_at = Utc::now();
        self.conn.execute(
            "INSERT INTO matches (
               company_id, ngo_id, score, geographic_score, thematic_score,
               strengths, compliance_status, risk_factors, created_at
             )
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                assessment.company_id,
                assessment.ngo_id,
                assessment.score,
                assessment.geographic_score,
                assessment.thematic_score,
                serde_json::to_string(&assessment.strengths)?,
                serde_json::to_string(&assessment.compliance_status)?,
                serde_json::to_string(&assessment.risk_factors)?,
                created_at.to_rfc3339(),
            ],
        )?;

        Ok(MatchRecord {
            id: self.conn.last_insert_rowid(),
            company_id: assessment.company_id.clone(),
            ngo_id: assessment.ngo_id.clone(),
            score: assessment.score,
            geographic_score: Some(assessment.geographic_score),
            thematic_score: Some(assessment.thematic_score),
            strengths: assessment.strengths.clone(),
            compliance_status: assessment.compliance_status.clone(),
            risk_factors: assessment.risk_factors.clone(),
            created_at,
        })
    }

    pub fn get_match(&self, id: i64) -> Result<Option<MatchRecord>, DbError> {
        let sql = format!("SELECT {} FROM matches WHERE id = ?1", MATCH_COLUMNS);
        let raw = self
            .conn
            .query_row(&sql, params![id], read_match_row)
            .optional()?;
        raw.map(RawMatch::into_record).transpose()
    }

    pub fn match_count(&self) -> Result<i64, DbError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(1) FROM matches", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Persisted matches ranked by score (highest first, then oldest first).
    pub fn query_matches(&self, filter: &MatchFilter) -> Result<Vec<MatchRecord>, DbError> {
        let mut sql = format!("SELECT {} FROM matches WHERE 1=1", MATCH_COLUMNS);
        let mut params_vec: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

        if let Some(ref company_id) = filter.company_id {
            params_vec.push(Box::new(company_id.clone()));
            sql.push_str(&format!(" AND company_id = ?{}", params_vec.len()));
        }
        if let Some(ref ngo_id) = filter.ngo_id {
            params_vec.push(Box::new(ngo_id.clone()));
            sql.push_str(&format!(" AND ngo_id = ?{}", params_vec.len()));
        }
        if let Some(min_score) = filter.min_score {
            params_vec.push(Box::new(min_score));
            sql.push_str(&format!(" AND score >= ?{}", params_vec.len()));
        }

        sql.push_str(" ORDER BY score DESC, id ASC");

        if let Some(n) = filter.limit {
            sql.push_str(&format!(" LIMIT {}", n));
        }

        let param_refs: Vec<&dyn rusqlite::types::ToSql> =
            params_vec.iter().map(|p| p.as_ref()).collect();

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(param_refs.as_slice(), read_match_row)?;

        let mut result = Vec::new();
        for row in rows {
            result.push(row?.into_record()?);
        }
        Ok(result)
    }

    // -- Directory query --

    /// Search NGOs by free text and district, returning the matches plus
    /// every distinct known district (for a selector).
    pub fn ngo_directory(&self, filter: &NgoFilter) -> Result<NgoDirectory, DbError> {
        let mut sql = format!("SELECT {} FROM ngos WHERE 1=1", NGO_COLUMNS);
        let mut params_vec: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

        if let Some(ref search) = filter.search {
            params_vec.push(Box::new(search.to_lowercase()));
            sql.push_str(&format!(
                " AND (instr(lower(name), ?{n}) > 0 OR instr(lower(COALESCE(achievements, '')), ?{n}) > 0)",
                n = params_vec.len()
            ));
        }
        if let Some(ref district) = filter.district {
            params_vec.push(Box::new(district.to_lowercase()));
            sql.push_str(&format!(
                " AND instr(lower(COALESCE(district, '')), ?{}) > 0",
                params_vec.len()
            ));
        }

        sql.push_str(" ORDER BY name COLLATE NOCASE, id");

        if let Some(n) = filter.limit {
            sql.push_str(&format!(" LIMIT {}", n));
        }

        let param_refs: Vec<&dyn rusqlite::types::ToSql> =
            params_vec.iter().map(|p| p.as_ref()).collect();

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(param_refs.as_slice(), read_ngo_row)?;

        let mut ngos = Vec::new();
        for row in rows {
            ngos.push(row?.into_ngo());
        }

        Ok(NgoDirectory {
            ngos,
            districts: self.known_districts()?,
        })
    }

    /// Distinct non-blank NGO districts, sorted case-insensitively.
    pub fn known_districts(&self) -> Result<Vec<String>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT TRIM(district) AS d FROM ngos
             WHERE district IS NOT NULL AND TRIM(district) != ''
             ORDER BY d COLLATE NOCASE",
        )?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut districts = Vec::new();
        for row in rows {
            districts.push(row?);
        }
        Ok(districts)
    }
}

// -- Row decoding --

struct RawNgo {
    id: String,
    name: SqlValue,
    state: SqlValue,
    district: SqlValue,
    postal_code: SqlValue,
    focus_areas: SqlValue,
    sdgs: SqlValue,
    schedule_vii_categories: SqlValue,
    reg_flag_a: SqlValue,
    reg_flag_b: SqlValue,
    reg_flag_fcra: SqlValue,
    reg_flag_csr1: SqlValue,
    foreign_funds: SqlValue,
    annual_budget: SqlValue,
    funds_utilized: SqlValue,
    credibility_score: SqlValue,
    achievements: SqlValue,
    updated_at: SqlValue,
}

fn read_ngo_row(row: &Row<'_>) -> rusqlite::Result<RawNgo> {
    Ok(RawNgo {
        id: row.get(0)?,
        name: row.get(1)?,
        state: row.get(2)?,
        district: row.get(3)?,
        postal_code: row.get(4)?,
        focus_areas: row.get(5)?,
        sdgs: row.get(6)?,
        schedule_vii_categories: row.get(7)?,
        reg_flag_a: row.get(8)?,
        reg_flag_b: row.get(9)?,
        reg_flag_fcra: row.get(10)?,
        reg_flag_csr1: row.get(11)?,
        foreign_funds: row.get(12)?,
        annual_budget: row.get(13)?,
        funds_utilized: row.get(14)?,
        credibility_score: row.get(15)?,
        achievements: row.get(16)?,
        updated_at: row.get(17)?,
    })
}

impl RawNgo {
    fn into_ngo(self) -> Ngo {
        let id = self.id;
        let text = |value: SqlValue, field: &str| column_text(value, field, &id);
        let flag = |value: SqlValue, field: &str| column_flag(value, field, &id);
        let real = |value: SqlValue, field: &str| column_real(value, field, &id);

        let focus_areas = text(self.focus_areas, "focus_areas");
        let sdgs = text(self.sdgs, "sdgs");
        let categories = text(self.schedule_vii_categories, "schedule_vii_categories");
        let updated_at = text(self.updated_at, "updated_at");

        Ngo {
            name: text(self.name, "name").unwrap_or_default(),
            state: text(self.state, "state").unwrap_or_default(),
            district: text(self.district, "district").unwrap_or_default(),
            postal_code: text(self.postal_code, "postal_code").filter(|p| !p.trim().is_empty()),
            focus_areas: decode_list(focus_areas.as_deref(), "focus_areas", &id),
            sdgs: decode_sdgs(sdgs.as_deref(), &id),
            schedule_vii_categories: decode_list::<String>(
                categories.as_deref(),
                "schedule_vii_categories",
                &id,
            )
            .into_iter()
            .collect(),
            registrations: Registrations {
                has_12a: flag(self.reg_flag_a, "reg_flag_a"),
                has_80g: flag(self.reg_flag_b, "reg_flag_b"),
                has_fcra: flag(self.reg_flag_fcra, "reg_flag_fcra"),
                has_csr1: flag(self.reg_flag_csr1, "reg_flag_csr1"),
            },
            foreign_funds: flag(self.foreign_funds, "foreign_funds"),
            annual_budget: real(self.annual_budget, "annual_budget"),
            funds_utilized: real(self.funds_utilized, "funds_utilized"),
            credibility_score: real(self.credibility_score, "credibility_score"),
            achievements: text(self.achievements, "achievements"),
            updated_at: decode_timestamp(updated_at.as_deref(), &id),
            id,
        }
    }
}

struct RawCompany {
    id: String,
    name: SqlValue,
    csr_budget: SqlValue,
    preferred_geographies: SqlValue,
    focus_areas: SqlValue,
    sdgs: SqlValue,
    compliance_requirements: SqlValue,
    preferred_ngo_size: SqlValue,
    updated_at: SqlValue,
}

fn read_company_row(row: &Row<'_>) -> rusqlite::Result<RawCompany> {
    Ok(RawCompany {
        id: row.get(0)?,
        name: row.get(1)?,
        csr_budget: row.get(2)?,
        preferred_geographies: row.get(3)?,
        focus_areas: row.get(4)?,
        sdgs: row.get(5)?,
        compliance_requirements: row.get(6)?,
        preferred_ngo_size: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

impl RawCompany {
    fn into_company(self) -> Company {
        let id = self.id;
        let text = |value: SqlValue, field: &str| column_text(value, field, &id);

        let mut csr_budget = column_real(self.csr_budget, "csr_budget", &id).unwrap_or(0.0);
        if csr_budget < 0.0 {
            warn!(company = %id, csr_budget, "negative CSR budget, using 0");
            csr_budget = 0.0;
        }
        let geographies = text(self.preferred_geographies, "preferred_geographies");
        let focus_areas = text(self.focus_areas, "focus_areas");
        let sdgs = text(self.sdgs, "sdgs");
        let requirements = text(self.compliance_requirements, "compliance_requirements");
        let updated_at = text(self.updated_at, "updated_at");

        Company {
            name: text(self.name, "name").unwrap_or_default(),
            csr_budget,
            preferred_geographies: decode_list::<Location>(
                geographies.as_deref(),
                "preferred_geographies",
                &id,
            ),
            focus_areas: decode_list(focus_areas.as_deref(), "focus_areas", &id),
            sdgs: decode_sdgs(sdgs.as_deref(), &id),
            compliance_requirements: decode_list(
                requirements.as_deref(),
                "compliance_requirements",
                &id,
            ),
            preferred_ngo_size: text(self.preferred_ngo_size, "preferred_ngo_size")
                .filter(|s| !s.trim().is_empty()),
            updated_at: decode_timestamp(updated_at.as_deref(), &id),
            id,
        }
    }
}

struct RawMatch {
    id: i64,
    company_id: String,
    ngo_id: String,
    score: f64,
    geographic_score: Option<u8>,
    thematic_score: Option<f64>,
    strengths: String,
    compliance_status: String,
    risk_factors: String,
    created_at: String,
}

fn read_match_row(row: &Row<'_>) -> rusqlite::Result<RawMatch> {
    Ok(RawMatch {
        id: row.get(0)?,
        company_id: row.get(1)?,
        ngo_id: row.get(2)?,
        score: row.get(3)?,
        geographic_score: row.get(4)?,
        thematic_score: row.get(5)?,
        strengths: row.get(6)?,
        compliance_status: row.get(7)?,
        risk_factors: row.get(8)?,
        created_at: row.get(9)?,
    })
}

impl RawMatch {
    fn into_record(self) -> Result<MatchRecord, DbError> {
        let compliance_status: ComplianceStatus = serde_json::from_str(&self.compliance_status)?;
        Ok(MatchRecord {
            id: self.id,
            company_id: self.company_id,
            ngo_id: self.ngo_id,
            score: self.score,
            geographic_score: self.geographic_score,
            thematic_score: self.thematic_score,
            strengths: serde_json::from_str(&self.strengths)?,
            compliance_status: ComplianceStatus::from_issues(compliance_status.issues),
            risk_factors: serde_json::from_str(&self.risk_factors)?,
            created_at: DateTime::parse_from_rfc3339(&self.created_at)?.with_timezone(&Utc),
        })
    }
}

/// Read a text column. Numbers are rendered as text; blobs are dropped.
fn column_text(value: SqlValue, field: &str, id: &str) -> Option<String> {
    match value {
        SqlValue::Null => None,
        SqlValue::Text(text) => Some(text),
        SqlValue::Integer(n) => Some(n.to_string()),
        SqlValue::Real(f) => Some(f.to_string()),
        SqlValue::Blob(_) => {
            warn!(id, field, "binary value in text column, ignoring");
            None
        }
    }
}

/// Read a registration flag. Nonzero numbers and "yes"/"y"/"true"/"1" are
/// set; NULL and recognised negatives are unset.
fn column_flag(value: SqlValue, field: &str, id: &str) -> bool {
    match value {
        SqlValue::Null => false,
        SqlValue::Integer(n) => n != 0,
        SqlValue::Real(f) => f != 0.0,
        SqlValue::Text(text) => match text.trim().to_ascii_lowercase().as_str() {
            "yes" | "y" | "true" | "1" => true,
            "no" | "n" | "false" | "0" | "" => false,
            _ => {
                warn!(id, field, value = %text, "unrecognised flag value, treating as unset");
                false
            }
        },
        SqlValue::Blob(_) => {
            warn!(id, field, "binary value in flag column, treating as unset");
            false
        }
    }
}

/// Read a numeric column. Numeric text is parsed; anything else is absent.
fn column_real(value: SqlValue, field: &str, id: &str) -> Option<f64> {
    let parsed = match &value {
        SqlValue::Null => return None,
        SqlValue::Integer(n) => Some(*n as f64),
        SqlValue::Real(f) => Some(*f),
        SqlValue::Text(text) if text.trim().is_empty() => return None,
        SqlValue::Text(text) => text.trim().parse::<f64>().ok(),
        SqlValue::Blob(_) => None,
    };
    match parsed {
        Some(f) if f.is_finite() => Some(f),
        _ => {
            warn!(id, field, value = ?value, "non-numeric value in numeric column, ignoring");
            None
        }
    }
}

/// Decode a JSON array column, degrading to an empty list on NULL, blank,
/// `null`, or malformed content.
fn decode_list<T: DeserializeOwned>(raw: Option<&str>, field: &str, id: &str) -> Vec<T> {
    let text = match raw.map(str::trim) {
        None | Some("") => return Vec::new(),
        Some(text) => text,
    };
    match serde_json::from_str::<Option<Vec<T>>>(text) {
        Ok(values) => values.unwrap_or_default(),
        Err(e) => {
            warn!(id, field, error = %e, "malformed JSON column, using empty list");
            Vec::new()
        }
    }
}

/// Decode an SDG column. Accepts numbers or numeric strings; drops anything
/// outside 1-17.
fn decode_sdgs(raw: Option<&str>, id: &str) -> BTreeSet<u8> {
    let values: Vec<serde_json::Value> = decode_list(raw, "sdgs", id);
    let mut sdgs = BTreeSet::new();
    for value in values {
        let parsed = match &value {
            serde_json::Value::Number(n) => n.as_i64(),
            serde_json::Value::String(s) => s.trim().parse::<i64>().ok(),
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

/// Parse RFC 3339 or naive ISO-8601 timestamps (assumed UTC).
fn decode_timestamp(raw: Option<&str>, id: &str) -> Option<DateTime<Utc>> {
    let text = raw.map(str::trim).filter(|t| !t.is_empty())?;
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    warn!(id, value = text, "unparseable timestamp, ignoring");
    None
}
