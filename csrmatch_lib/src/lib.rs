//! Library layer for the CSR matchmaker: typed NGO/company records, SQLite
//! store, compliance and fit scorers, and the match aggregator.
//!
//! Scoring is pure and deterministic; only [`Db`] performs I/O. Batches fan
//! scoring out over tokio tasks and funnel persistence through one writer.

pub mod alignment;
pub mod batch;
pub mod compliance;
pub mod config;
pub mod db;
pub mod error;
pub mod geography;
pub mod import;
pub mod matching;
pub mod types;
pub mod validation;

pub use alignment::{map_sdgs_to_schedule_vii, sdg_alignment};
pub use batch::{cartesian_pairs, score_batch, BatchOptions, BatchOutcome, PairOutcome, PairRequest};
pub use compliance::{verify_compliance, ComplianceStatus};
pub use config::{ConfigError, ScoringConfig};
pub use db::{Db, DbError, MatchFilter, NgoDirectory, NgoFilter, WriteSummary};
pub use error::CsrMatchError;
pub use geography::{
    geographic_proximity, load_aspirational_districts, AspirationalDistricts, ProximityTier,
    SeedDataError,
};
pub use import::{import_companies_from_json, import_ngos_from_json, ImportError, ImportSummary};
pub use matching::{MatchAssessment, MatchEngine, MatchRecord};
pub use types::{Company, Location, Ngo, Registrations};
