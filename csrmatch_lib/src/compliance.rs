//! MCA-mandated compliance checks for NGOs receiving CSR funds.
//!
//! The verdict is a pure function of the NGO record. Issues are appended in a
//! fixed rule order so that audit output is reproducible across runs.

use serde::{Deserialize, Serialize};

use crate::types::Ngo;

/// Credibility scores below this value are flagged as an issue.
pub const MIN_CREDIBILITY_SCORE: f64 = 3.0;

pub const ISSUE_MISSING_12A: &str = "Missing 12A registration";
pub const ISSUE_MISSING_80G: &str = "Missing 80G registration";
pub const ISSUE_MISSING_CSR1: &str = "Missing CSR-1 registration";
pub const ISSUE_MISSING_FCRA: &str = "Missing FCRA registration for foreign funds";
pub const ISSUE_LOW_CREDIBILITY: &str = "Low credibility score";

/// Outcome of [`verify_compliance`].
///
/// Construct through `verify_compliance` or [`ComplianceStatus::from_issues`]
/// so `is_compliant` always agrees with `issues`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ComplianceStatus {
    pub is_compliant: bool,
    pub issues: Vec<String>,
}

impl ComplianceStatus {
    pub fn from_issues(issues: Vec<String>) -> Self {
        Self {
            is_compliant: issues.is_empty(),
            issues,
        }
    }
}

/// Check an NGO against the CSR eligibility rules.
///
/// Rules, in order:
/// 1. 12A registration on file
/// 2. 80G registration on file
/// 3. CSR-1 registration on file (an absent flag counts as missing)
/// 4. FCRA registration, only when the NGO operates on foreign funds
/// 5. credibility score of at least [`MIN_CREDIBILITY_SCORE`] (absent = 0)
pub fn verify_compliance(ngo: &Ngo) -> ComplianceStatus {
    let mut issues = Vec::new();
    let regs = &ngo.registrations;

    if !regs.has_12a {
        issues.push(ISSUE_MISSING_12A.to_string());
    }
    if !regs.has_80g {
        issues.push(ISSUE_MISSING_80G.to_string());
    }
    if !regs.has_csr1 {
        issues.push(ISSUE_MISSING_CSR1.to_string());
    }
    if ngo.foreign_funds && !regs.has_fcra {
        issues.push(ISSUE_MISSING_FCRA.to_string());
    }
    if ngo.credibility_score.unwrap_or(0.0) < MIN_CREDIBILITY_SCORE {
        issues.push(ISSUE_LOW_CREDIBILITY.to_string());
    }

    ComplianceStatus::from_issues(issues)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Registrations;

    fn compliant_ngo() -> Ngo {
        let mut ngo = Ngo::new("BR/2019/0001", "Asha Trust", "Bihar", "Gaya");
        ngo.registrations = Registrations {
            has_12a: true,
            has_80g: true,
            has_fcra: false,
            has_csr1: true,
        };
        ngo.credibility_score = Some(4.2);
        ngo
    }

    #[test]
    fn test_fully_compliant() {
        let status = verify_compliance(&compliant_ngo());
        assert!(status.is_compliant);
        assert!(status.issues.is_empty());
    }

    #[test]
    fn test_missing_exemptions_and_csr1_yields_three_issues() {
        let mut ngo = compliant_ngo();
        ngo.registrations = Registrations::default();
        ngo.foreign_funds = false;

        let status = verify_compliance(&ngo);
        assert!(!status.is_compliant);
        assert_eq!(
            status.issues,
            vec![ISSUE_MISSING_12A, ISSUE_MISSING_80G, ISSUE_MISSING_CSR1]
        );
    }

    #[test]
    fn test_fcra_only_required_with_foreign_funds() {
        let mut ngo = compliant_ngo();
        assert!(verify_compliance(&ngo).is_compliant);

        ngo.foreign_funds = true;
        let status = verify_compliance(&ngo);
        assert_eq!(status.issues, vec![ISSUE_MISSING_FCRA]);

        ngo.registrations.has_fcra = true;
        assert!(verify_compliance(&ngo).is_compliant);
    }

    #[test]
    fn test_absent_credibility_defaults_to_zero() {
        let mut ngo = compliant_ngo();
        ngo.credibility_score = None;
        assert_eq!(verify_compliance(&ngo).issues, vec![ISSUE_LOW_CREDIBILITY]);
    }

    #[test]
    fn test_credibility_threshold_is_inclusive() {
        let mut ngo = compliant_ngo();
        ngo.credibility_score = Some(3.0);
        assert!(verify_compliance(&ngo).is_compliant);
        ngo.credibility_score = Some(2.99);
        assert!(!verify_compliance(&ngo).is_compliant);
    }

    #[test]
    fn test_issue_order_is_fixed() {
        let mut ngo = Ngo::new("X", "Nothing On File", "Assam", "Dhubri");
        ngo.foreign_funds = true;
        let status = verify_compliance(&ngo);
        assert_eq!(
            status.issues,
            vec![
                ISSUE_MISSING_12A,
                ISSUE_MISSING_80G,
                ISSUE_MISSING_CSR1,
                ISSUE_MISSING_FCRA,
                ISSUE_LOW_CREDIBILITY,
            ]
        );
    }

    #[test]
    fn test_compliant_iff_no_issues() {
        let mut ngos = vec![compliant_ngo(), Ngo::new("A", "Bare", "", "")];
        let mut partial = compliant_ngo();
        partial.registrations.has_80g = false;
        ngos.push(partial);

        for ngo in &ngos {
            let status = verify_compliance(ngo);
            assert_eq!(status.is_compliant, status.issues.is_empty());
        }
    }

    #[test]
    fn test_deterministic() {
        let mut ngo = compliant_ngo();
        ngo.registrations.has_csr1 = false;
        assert_eq!(verify_compliance(&ngo), verify_compliance(&ngo));
    }

    #[test]
    fn test_from_issues_keeps_biconditional() {
        assert!(ComplianceStatus::from_issues(vec![]).is_compliant);
        assert!(!ComplianceStatus::from_issues(vec!["x".to_string()]).is_compliant);
    }
}
