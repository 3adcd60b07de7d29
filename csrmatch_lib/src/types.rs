//! Typed NGO and company records.
//!
//! These are the shapes the scoring engine works with. Every optional or
//! loosely-typed column is resolved to a concrete value by the store before a
//! record reaches this form, so scorers never deal with missing-field
//! ambiguity.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lowest valid UN Sustainable Development Goal number.
pub const SDG_MIN: u8 = 1;
/// Highest valid UN Sustainable Development Goal number.
pub const SDG_MAX: u8 = 17;

/// Returns true if `id` is one of the 17 SDG numbers.
pub fn is_valid_sdg(id: i64) -> bool {
    (SDG_MIN as i64..=SDG_MAX as i64).contains(&id)
}

/// An administrative {state, district} pair.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Location {
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub district: String,
}

impl Location {
    pub fn new(state: impl Into<String>, district: impl Into<String>) -> Self {
        Self {
            state: state.into(),
            district: district.into(),
        }
    }

    /// A location with neither a state nor a district cannot be compared.
    pub fn is_empty(&self) -> bool {
        self.state.trim().is_empty() && self.district.trim().is_empty()
    }
}

/// Statutory registrations an NGO has on file.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Registrations {
    /// Section 12A income-tax exemption.
    #[serde(default)]
    pub has_12a: bool,
    /// Section 80G donor deduction.
    #[serde(default)]
    pub has_80g: bool,
    /// Foreign Contribution (Regulation) Act registration.
    #[serde(default)]
    pub has_fcra: bool,
    /// CSR-1 filing with the Ministry of Corporate Affairs.
    #[serde(default)]
    pub has_csr1: bool,
}

/// A registered nonprofit, keyed by its registry (NGO Darpan) identifier.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Ngo {
    pub id: String,
    pub name: String,
    pub state: String,
    pub district: String,
    pub postal_code: Option<String>,
    pub focus_areas: Vec<String>,
    pub sdgs: BTreeSet<u8>,
    pub schedule_vii_categories: BTreeSet<String>,
    pub registrations: Registrations,
    /// Whether the NGO operates on foreign funds (FCRA then applies).
    pub foreign_funds: bool,
    pub annual_budget: Option<f64>,
    pub funds_utilized: Option<f64>,
    pub credibility_score: Option<f64>,
    pub achievements: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Ngo {
    /// Minimal record with no registrations, no SDGs and no credibility score.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        state: impl Into<String>,
        district: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            state: state.into(),
            district: district.into(),
            postal_code: None,
            focus_areas: Vec::new(),
            sdgs: BTreeSet::new(),
            schedule_vii_categories: BTreeSet::new(),
            registrations: Registrations::default(),
            foreign_funds: false,
            annual_budget: None,
            funds_utilized: None,
            credibility_score: None,
            achievements: None,
            updated_at: None,
        }
    }

    pub fn location(&self) -> Location {
        Location::new(self.state.clone(), self.district.clone())
    }
}

/// A company with a CSR budget, keyed by its Corporate Identification Number.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Company {
    pub id: String,
    pub name: String,
    pub csr_budget: f64,
    /// Ordered; geographic scoring walks this list front to back.
    pub preferred_geographies: Vec<Location>,
    pub focus_areas: Vec<String>,
    pub sdgs: BTreeSet<u8>,
    pub compliance_requirements: Vec<String>,
    pub preferred_ngo_size: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Company {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            csr_budget: 0.0,
            preferred_geographies: Vec::new(),
            focus_areas: Vec::new(),
            sdgs: BTreeSet::new(),
            compliance_requirements: Vec::new(),
            preferred_ngo_size: None,
            updated_at: None,
        }
    }
}
