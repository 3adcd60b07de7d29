//! Thematic alignment between company and NGO interests.
//!
//! Interests are expressed as UN Sustainable Development Goal numbers. The
//! static [`SDG_SCHEDULE_VII`] table maps each goal onto the Schedule VII
//! (Companies Act 2013) categories CSR spending must fall into.

use std::collections::BTreeSet;

use crate::types::{SDG_MAX, SDG_MIN};

/// SDG number to Schedule VII categories. One entry per goal, in order.
pub const SDG_SCHEDULE_VII: [(u8, &[&str]); 17] = [
    (1, &["poverty eradication", "hunger eradication"]),
    (2, &["hunger eradication", "agriculture"]),
    (3, &["healthcare", "preventive healthcare"]),
    (4, &["education", "vocational skills"]),
    (5, &["gender equality", "women empowerment"]),
    (6, &["sanitation", "safe drinking water"]),
    (7, &["renewable energy"]),
    (8, &["employment", "vocational skills", "livelihood"]),
    (9, &["innovation", "technology incubators"]),
    (10, &["socio-economic inequalities", "marginalized groups"]),
    (11, &["slum development", "housing"]),
    (12, &["sustainable consumption"]),
    (13, &["environmental sustainability", "ecological balance"]),
    (14, &["marine resources", "conservation"]),
    (15, &["forest conservation", "biodiversity"]),
    (16, &["peace", "justice", "governance"]),
    (17, &["public-private partnerships"]),
];

/// Schedule VII categories for a single SDG, or an empty slice if out of range.
pub fn schedule_vii_categories(sdg: u8) -> &'static [&'static str] {
    if !(SDG_MIN..=SDG_MAX).contains(&sdg) {
        return &[];
    }
    SDG_SCHEDULE_VII[(sdg - SDG_MIN) as usize].1
}

/// Map a set of SDGs onto the deduplicated set of Schedule VII categories.
pub fn map_sdgs_to_schedule_vii<'a, I>(sdgs: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = &'a u8>,
{
    sdgs.into_iter()
        .flat_map(|sdg| schedule_vii_categories(*sdg).iter())
        .map(|c| c.to_string())
        .collect()
}

/// Jaccard overlap of two SDG sets, scaled to 0-100.
///
/// Returns 0.0 when either set is empty.
pub fn sdg_alignment(company_sdgs: &BTreeSet<u8>, ngo_sdgs: &BTreeSet<u8>) -> f64 {
    if company_sdgs.is_empty() || ngo_sdgs.is_empty() {
        return 0.0;
    }
    let shared = company_sdgs.intersection(ngo_sdgs).count();
    let union = company_sdgs.union(ngo_sdgs).count();
    (shared as f64 / union as f64) * 100.0
}

/// SDGs present in both sets, ascending.
pub fn shared_sdgs(company_sdgs: &BTreeSet<u8>, ngo_sdgs: &BTreeSet<u8>) -> Vec<u8> {
    company_sdgs.intersection(ngo_sdgs).copied().collect()
}
