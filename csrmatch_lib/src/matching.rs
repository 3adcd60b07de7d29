//! Match aggregation: combine compliance, geography, and SDG alignment into a
//! composite score with an auditable breakdown, and persist it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::alignment::{sdg_alignment, shared_sdgs};
use crate::compliance::{verify_compliance, ComplianceStatus};
use crate::config::ScoringConfig;
use crate::db::Db;
use crate::error::CsrMatchError;
use crate::geography::{
    geographic_proximity, load_aspirational_districts, AspirationalDistricts, ProximityTier,
};
use crate::types::{Company, Ngo};

pub const STRENGTH_COMPLIANT: &str = "Meets all CSR compliance requirements";
pub const RISK_NO_SDG_DATA: &str = "SDG data missing for thematic alignment";

/// Scored pair, before persistence.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct MatchAssessment {
    pub company_id: String,
    pub ngo_id: String,
    pub score: f64,
    pub geographic_tier: ProximityTier,
    pub geographic_score: u8,
    pub thematic_score: f64,
    pub shared_sdgs: Vec<u8>,
    pub strengths: Vec<String>,
    pub compliance_status: ComplianceStatus,
    pub risk_factors: Vec<String>,
}

/// A persisted, immutable match row.
///
/// Sub-scores are optional because rows written before they were recorded
/// carry NULLs.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MatchRecord {
    pub id: i64,
    pub company_id: String,
    pub ngo_id: String,
    pub score: f64,
    pub geographic_score: Option<u8>,
    pub thematic_score: Option<f64>,
    pub strengths: Vec<String>,
    pub compliance_status: ComplianceStatus,
    pub risk_factors: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Stateless scorer holding the read-only configuration and lookup tables.
///
/// Cheap to share behind an `Arc` across scoring tasks.
#[derive(Debug, Clone)]
pub struct MatchEngine {
    config: ScoringConfig,
    aspirational: AspirationalDistricts,
}

impl MatchEngine {
    pub fn new(config: ScoringConfig, aspirational: AspirationalDistricts) -> Self {
        Self {
            config,
            aspirational,
        }
    }

    /// Engine with the embedded scoring config and aspirational district list.
    pub fn with_defaults() -> Result<Self, CsrMatchError> {
        Ok(Self::new(
            ScoringConfig::embedded()?,
            load_aspirational_districts()?,
        ))
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Score a company/NGO pair. Pure; never fails for well-typed input.
    pub fn assess(&self, company: &Company, ngo: &Ngo) -> MatchAssessment {
        let compliance_status = verify_compliance(ngo);
        let geographic_tier =
            geographic_proximity(&company.preferred_geographies, &ngo.location(), &self.aspirational);
        let geographic_score = geographic_tier.score();
        let thematic_score = sdg_alignment(&company.sdgs, &ngo.sdgs);
        let shared = shared_sdgs(&company.sdgs, &ngo.sdgs);
        let sdg_data_missing = company.sdgs.is_empty() || ngo.sdgs.is_empty();

        let t = &self.config.thresholds;
        let mut strengths = Vec::new();
        let mut risk_factors = compliance_status.issues.clone();

        if is_proximity_hit(geographic_tier) && geographic_score >= t.geographic_strength {
            strengths.push(geographic_tier.label().to_string());
        }
        if thematic_score > 0.0 && thematic_score >= t.thematic_strength {
            strengths.push(format!(
                "Strong SDG alignment ({:.1}%, shared goals: {})",
                thematic_score,
                join_ids(&shared)
            ));
        }
        if compliance_status.is_compliant {
            strengths.push(STRENGTH_COMPLIANT.to_string());
        }

        if geographic_score < t.geographic_risk {
            risk_factors.push(if is_proximity_hit(geographic_tier) {
                format!("Geographic proximity below threshold ({})", geographic_score)
            } else {
                geographic_tier.label().to_string()
            });
        }
        if thematic_score < t.thematic_risk {
            risk_factors.push(if sdg_data_missing {
                RISK_NO_SDG_DATA.to_string()
            } else {
                format!("Weak SDG alignment ({:.1}%)", thematic_score)
            });
        }

        let w = &self.config.weights;
        let mut score = w.geographic * f64::from(geographic_score) + w.thematic * thematic_score;
        if !compliance_status.is_compliant {
            score *= self.config.gating.non_compliant_multiplier;
        }
        let score = score.clamp(0.0, 100.0);

        debug!(
            company = %company.id,
            ngo = %ngo.id,
            score,
            geographic_score,
            thematic_score,
            compliant = compliance_status.is_compliant,
            "assessed pair"
        );

        MatchAssessment {
            company_id: company.id.clone(),
            ngo_id: ngo.id.clone(),
            score,
            geographic_tier,
            geographic_score,
            thematic_score,
            shared_sdgs: shared,
            strengths,
            compliance_status,
            risk_factors,
        }
    }

    /// Load both entities, score them, and persist one new match row.
    ///
    /// Every call inserts a new row; earlier matches for the same pair are
    /// left untouched.
    pub fn create_match(
        &self,
        db: &Db,
        company_id: &str,
        ngo_id: &str,
    ) -> Result<MatchRecord, CsrMatchError> {
        let company = db
            .get_company(company_id)?
            .ok_or_else(|| CsrMatchError::NotFound(format!("company {}", company_id)))?;
        let ngo = db
            .get_ngo(ngo_id)?
            .ok_or_else(|| CsrMatchError::NotFound(format!("NGO {}", ngo_id)))?;

        let assessment = self.assess(&company, &ngo);
        Ok(db.insert_match(&assessment)?)
    }
}

fn is_proximity_hit(tier: ProximityTier) -> bool {
    matches!(
        tier,
        ProximityTier::DistrictMatch | ProximityTier::AspirationalDistrict | ProximityTier::StateMatch
    )
}

fn join_ids(ids: &[u8]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
