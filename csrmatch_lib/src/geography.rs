//! Geographic proximity between a company's preferred locations and an NGO.
//!
//! Also owns the aspirational district list: compile-time YAML seed data,
//! parsed once at startup and shared read-only by every scoring task.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::Location;

/// Error types for seed data loading.
#[derive(Error, Debug)]
pub enum SeedDataError {
    #[error("Failed to parse seed data YAML: {0}")]
    YamlParse(#[from] serde_yml::Error),
    #[error("Empty district name listed under state: {0}")]
    EmptyDistrict(String),
    #[error("Duplicate aspirational district: {0}")]
    DuplicateDistrict(String),
}

/// Districts of one state as listed in the seed file.
#[derive(Deserialize, Debug, Clone)]
pub struct StateDistricts {
    pub state: String,
    pub districts: Vec<String>,
}

/// Top-level structure for the aspirational districts YAML file.
#[derive(Deserialize, Debug)]
struct AspirationalDistrictFile {
    states: Vec<StateDistricts>,
}

/// Normalized set of aspirational district names.
#[derive(Debug, Clone, Default)]
pub struct AspirationalDistricts {
    names: HashSet<String>,
}

impl AspirationalDistricts {
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            names: names
                .into_iter()
                .map(|n| normalize(n.as_ref()))
                .filter(|n| !n.is_empty())
                .collect(),
        }
    }

    /// Case- and whitespace-insensitive membership test.
    pub fn contains(&self, district: &str) -> bool {
        self.names.contains(&normalize(district))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Parse and validate aspirational districts from YAML content.
///
/// The same district name may appear under two states; the same name twice
/// under one state is rejected.
pub fn parse_aspirational_districts(
    yaml_content: &str,
) -> Result<AspirationalDistricts, SeedDataError> {
    let file: AspirationalDistrictFile = serde_yml::from_str(yaml_content)?;

    let mut seen = HashSet::new();
    let mut names = Vec::new();

    for entry in file.states {
        for district in entry.districts {
            let key = (normalize(&entry.state), normalize(&district));
            if key.1.is_empty() {
                return Err(SeedDataError::EmptyDistrict(entry.state.clone()));
            }
            if !seen.insert(key) {
                return Err(SeedDataError::DuplicateDistrict(format!(
                    "{} ({})",
                    district, entry.state
                )));
            }
            names.push(district);
        }
    }

    Ok(AspirationalDistricts::from_names(names))
}

/// Load the aspirational district list embedded at compile time.
pub fn load_aspirational_districts() -> Result<AspirationalDistricts, SeedDataError> {
    let yaml_content = include_str!("../../seed_data/aspirational_districts.yml");
    parse_aspirational_districts(yaml_content)
}

/// Tiered proximity result. Each tier maps to a fixed score.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProximityTier {
    DistrictMatch,
    AspirationalDistrict,
    StateMatch,
    Baseline,
    Unassessable,
}

impl ProximityTier {
    pub fn score(self) -> u8 {
        match self {
            Self::DistrictMatch => 100,
            Self::AspirationalDistrict => 85,
            Self::StateMatch => 75,
            Self::Baseline => 25,
            Self::Unassessable => 0,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::DistrictMatch => "Exact district match",
            Self::AspirationalDistrict => "NGO operates in an aspirational district",
            Self::StateMatch => "Operates in a preferred state",
            Self::Baseline => "Outside preferred geographies",
            Self::Unassessable => "Geographic proximity could not be assessed",
        }
    }
}

/// Score an NGO location against a company's ordered preferred locations.
///
/// For each preferred location in turn: exact district, then state, then the
/// aspirational list. The first hit across all locations wins. No hit yields
/// [`ProximityTier::Baseline`]; an empty preference list or an NGO with no
/// location yields [`ProximityTier::Unassessable`].
pub fn geographic_proximity(
    preferred: &[Location],
    ngo: &Location,
    aspirational: &AspirationalDistricts,
) -> ProximityTier {
    if preferred.is_empty() || ngo.is_empty() {
        return ProximityTier::Unassessable;
    }

    let ngo_state = normalize(&ngo.state);
    let ngo_district = normalize(&ngo.district);

    for location in preferred {
        let state = normalize(&location.state);
        let district = normalize(&location.district);

        if !district.is_empty() && district == ngo_district {
            return ProximityTier::DistrictMatch;
        }
        if !state.is_empty() && state == ngo_state {
            return ProximityTier::StateMatch;
        }
        if aspirational.contains(&ngo_district) {
            return ProximityTier::AspirationalDistrict;
        }
    }

    ProximityTier::Baseline
}

fn normalize(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
