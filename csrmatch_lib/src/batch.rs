//! Concurrent scoring of many company/NGO pairs.
//!
//! Entities are loaded once up front, pairs are scored on a `JoinSet` bounded
//! by a `Semaphore`, and assessments are sent over an `mpsc` channel to the
//! caller's task, which is the only writer to the store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::db::Db;
use crate::error::CsrMatchError;
use crate::matching::{MatchAssessment, MatchEngine, MatchRecord};
use crate::types::{Company, Ngo};

pub const DEFAULT_CONCURRENCY: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct PairRequest {
    pub company_id: String,
    pub ngo_id: String,
}

impl PairRequest {
    pub fn new(company_id: impl Into<String>, ngo_id: impl Into<String>) -> Self {
        Self {
            company_id: company_id.into(),
            ngo_id: ngo_id.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Maximum number of pairs scored at once (values below 1 are treated as 1).
    pub concurrency: usize,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

/// What happened to a single pair.
#[derive(Debug, Clone)]
pub enum PairOutcome {
    Persisted(MatchRecord),
    NotFound { pair: PairRequest, missing: String },
    Failed { pair: PairRequest, error: String },
}

/// Totals for one batch. `persisted + not_found + failed + cancelled` always
/// equals the number of requested pairs.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchOutcome {
    pub persisted: usize,
    pub not_found: usize,
    pub failed: usize,
    pub cancelled: usize,
    pub match_ids: Vec<i64>,
}

impl BatchOutcome {
    pub fn total(&self) -> usize {
        self.persisted + self.not_found + self.failed + self.cancelled
    }
}

/// Every company paired with every NGO, company-major.
pub fn cartesian_pairs(company_ids: &[String], ngo_ids: &[String]) -> Vec<PairRequest> {
    company_ids
        .iter()
        .flat_map(|c| ngo_ids.iter().map(move |n| PairRequest::new(c.clone(), n.clone())))
        .collect()
}

/// Message sent from scoring tasks to the writer.
struct Scored {
    pair: PairRequest,
    assessment: MatchAssessment,
}

/// Result of loading one entity ahead of scoring.
enum Loaded<T> {
    Found(Arc<T>),
    Missing,
    Unreadable(String),
}

impl<T> Loaded<T> {
    fn from_read<E: std::fmt::Display>(read: Result<Option<T>, E>) -> Self {
        match read {
            Ok(Some(entity)) => Self::Found(Arc::new(entity)),
            Ok(None) => Self::Missing,
            Err(e) => Self::Unreadable(e.to_string()),
        }
    }
}

/// Score and persist `pairs`.
///
/// Pairs referencing a missing company or NGO are reported as `not_found`;
/// entities that cannot be read and insert failures count as `failed`. None
/// of these stops the batch. Once `cancel` is
/// set, outstanding tasks are aborted and every pair not yet persisted is
/// counted as `cancelled`. Matches already written are kept.
pub async fn score_batch<F>(
    db: &Db,
    engine: Arc<MatchEngine>,
    pairs: &[PairRequest],
    options: &BatchOptions,
    cancel: Arc<AtomicBool>,
    mut on_progress: F,
) -> Result<BatchOutcome, CsrMatchError>
where
    F: FnMut(&PairOutcome),
{
    let mut outcome = BatchOutcome::default();

    if cancel.load(Ordering::SeqCst) {
        outcome.cancelled = pairs.len();
        info!(cancelled = outcome.cancelled, "batch cancelled before start");
        return Ok(outcome);
    }

    let mut companies: HashMap<String, Loaded<Company>> = HashMap::new();
    let mut ngos: HashMap<String, Loaded<Ngo>> = HashMap::new();
    for pair in pairs {
        if !companies.contains_key(&pair.company_id) {
            let company = db.get_company(&pair.company_id);
            companies.insert(pair.company_id.clone(), Loaded::from_read(company));
        }
        if !ngos.contains_key(&pair.ngo_id) {
            let ngo = db.get_ngo(&pair.ngo_id);
            ngos.insert(pair.ngo_id.clone(), Loaded::from_read(ngo));
        }
    }

    let concurrency = options.concurrency.max(1);
    let semaphore = Arc::new(Semaphore::new(concurrency));
    let (tx, mut rx) = mpsc::channel::<Scored>(concurrency * 2);
    let mut join_set = JoinSet::new();

    for pair in pairs {
        let company = companies.get(&pair.company_id);
        let ngo = ngos.get(&pair.ngo_id);
        let (company, ngo) = match (company, ngo) {
            (Some(Loaded::Found(c)), Some(Loaded::Found(n))) => (Arc::clone(c), Arc::clone(n)),
            (Some(Loaded::Unreadable(error)), _) | (_, Some(Loaded::Unreadable(error))) => {
                warn!(
                    company = %pair.company_id,
                    ngo = %pair.ngo_id,
                    %error,
                    "failed to load pair"
                );
                outcome.failed += 1;
                on_progress(&PairOutcome::Failed {
                    pair: pair.clone(),
                    error: error.clone(),
                });
                continue;
            }
            (company, _) => {
                let missing = if matches!(company, Some(Loaded::Found(_))) {
                    format!("NGO {}", pair.ngo_id)
                } else {
                    format!("company {}", pair.company_id)
                };
                warn!(
                    company = %pair.company_id,
                    ngo = %pair.ngo_id,
                    %missing,
                    "pair references a missing entity"
                );
                outcome.not_found += 1;
                on_progress(&PairOutcome::NotFound {
                    pair: pair.clone(),
                    missing,
                });
                continue;
            }
        };

        let sem = Arc::clone(&semaphore);
        let sender = tx.clone();
        let engine = Arc::clone(&engine);
        let cancel = Arc::clone(&cancel);
        let pair = pair.clone();

        join_set.spawn(async move {
            let Ok(_permit) = sem.acquire().await else {
                return;
            };
            if cancel.load(Ordering::SeqCst) {
                return;
            }
            let assessment = engine.assess(&company, &ngo);
            let _ = sender.send(Scored { pair, assessment }).await;
        });
    }
    drop(tx);

    while let Some(scored) = rx.recv().await {
        if cancel.load(Ordering::SeqCst) {
            join_set.abort_all();
            break;
        }
        let result = match db.insert_match(&scored.assessment) {
            Ok(record) => {
                outcome.persisted += 1;
                outcome.match_ids.push(record.id);
                PairOutcome::Persisted(record)
            }
            Err(e) => {
                warn!(
                    company = %scored.pair.company_id,
                    ngo = %scored.pair.ngo_id,
                    error = %e,
                    "failed to persist match"
                );
                outcome.failed += 1;
                PairOutcome::Failed {
                    pair: scored.pair,
                    error: e.to_string(),
                }
            }
        };
        on_progress(&result);
    }

    while join_set.join_next().await.is_some() {}

    outcome.cancelled = pairs.len() - (outcome.persisted + outcome.not_found + outcome.failed);
    info!(
        persisted = outcome.persisted,
        not_found = outcome.not_found,
        failed = outcome.failed,
        cancelled = outcome.cancelled,
        "batch finished"
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Location, Registrations};

    fn setup() -> (Db, Arc<MatchEngine>) {
        let mut db = Db::open_in_memory().expect("open");
        db.init().expect("init");

        let mut company = Company::new("C1", "Example Industries");
        company.preferred_geographies = vec![Location::new("Bihar", "Gaya")];
        company.sdgs = [4, 5].into_iter().collect();
        let mut other = Company::new("C2", "Second Example");
        other.sdgs = [6].into_iter().collect();
        db.upsert_companies(&[company, other]).expect("companies");

        let ngos: Vec<Ngo> = ["N1", "N2", "N3"]
            .iter()
            .map(|id| {
                let mut ngo = Ngo::new(*id, format!("NGO {}", id), "Bihar", "Gaya");
                ngo.registrations = Registrations {
                    has_12a: true,
                    has_80g: true,
                    has_fcra: false,
                    has_csr1: true,
                };
                ngo.credibility_score = Some(4.0);
                ngo.sdgs = [4].into_iter().collect();
                ngo
            })
            .collect();
        db.upsert_ngos(&ngos).expect("ngos");

        let engine = Arc::new(MatchEngine::with_defaults().expect("engine"));
        (db, engine)
    }

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_cartesian_pairs_company_major() {
        let pairs = cartesian_pairs(&ids(&["C1", "C2"]), &ids(&["N1", "N2"]));
        assert_eq!(
            pairs,
            vec![
                PairRequest::new("C1", "N1"),
                PairRequest::new("C1", "N2"),
                PairRequest::new("C2", "N1"),
                PairRequest::new("C2", "N2"),
            ]
        );
    }

    #[test]
    fn test_cartesian_pairs_empty_side() {
        assert!(cartesian_pairs(&ids(&["C1"]), &[]).is_empty());
    }

    #[tokio::test]
    async fn test_batch_persists_all_pairs() {
        let (db, engine) = setup();
        let pairs = cartesian_pairs(&ids(&["C1", "C2"]), &ids(&["N1", "N2", "N3"]));
        let mut seen = 0;

        let outcome = score_batch(
            &db,
            engine,
            &pairs,
            &BatchOptions::default(),
            Arc::new(AtomicBool::new(false)),
            |_| seen += 1,
        )
        .await
        .expect("batch");

        assert_eq!(outcome.persisted, 6);
        assert_eq!(outcome.total(), 6);
        assert_eq!(seen, 6);
        assert_eq!(db.match_count().expect("count"), 6);

        let mut match_ids = outcome.match_ids.clone();
        match_ids.sort_unstable();
        match_ids.dedup();
        assert_eq!(match_ids.len(), 6);
    }

    #[tokio::test]
    async fn test_missing_entity_reported_and_batch_continues() {
        let (db, engine) = setup();
        let pairs = vec![
            PairRequest::new("C1", "N1"),
            PairRequest::new("C1", "MISSING"),
            PairRequest::new("NOPE", "N2"),
            PairRequest::new("C1", "N3"),
        ];
        let mut missing = Vec::new();

        let outcome = score_batch(
            &db,
            engine,
            &pairs,
            &BatchOptions { concurrency: 2 },
            Arc::new(AtomicBool::new(false)),
            |event| {
                if let PairOutcome::NotFound { missing: what, .. } = event {
                    missing.push(what.clone());
                }
            },
        )
        .await
        .expect("batch");

        assert_eq!(outcome.persisted, 2);
        assert_eq!(outcome.not_found, 2);
        assert_eq!(outcome.failed, 0);
        assert_eq!(outcome.cancelled, 0);
        assert_eq!(missing, vec!["NGO MISSING", "company NOPE"]);
    }

    #[tokio::test]
    async fn test_pre_cancelled_batch_persists_nothing() {
        let (db, engine) = setup();
        let pairs = cartesian_pairs(&ids(&["C1"]), &ids(&["N1", "N2"]));

        let outcome = score_batch(
            &db,
            engine,
            &pairs,
            &BatchOptions::default(),
            Arc::new(AtomicBool::new(true)),
            |_| {},
        )
        .await
        .expect("batch");

        assert_eq!(outcome.cancelled, 2);
        assert_eq!(outcome.persisted, 0);
        assert_eq!(db.match_count().expect("count"), 0);
    }

    #[tokio::test]
    async fn test_cancel_mid_batch_keeps_persisted() {
        let (db, engine) = setup();
        let pairs = cartesian_pairs(&ids(&["C1", "C2"]), &ids(&["N1", "N2", "N3"]));
        let cancel = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancel);

        let outcome = score_batch(
            &db,
            engine,
            &pairs,
            &BatchOptions { concurrency: 1 },
            cancel,
            move |event| {
                if matches!(event, PairOutcome::Persisted(_)) {
                    flag.store(true, Ordering::SeqCst);
                }
            },
        )
        .await
        .expect("batch");

        assert_eq!(outcome.persisted, 1);
        assert_eq!(outcome.cancelled, 5);
        assert_eq!(db.match_count().expect("count"), 1);
    }

    #[tokio::test]
    async fn test_persistence_failure_counted() {
        let (db, engine) = setup();
        db.conn()
            .execute_batch(
                "CREATE TRIGGER reject_n2 BEFORE INSERT ON matches
                 WHEN NEW.ngo_id = 'N2'
                 BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
            )
            .expect("trigger");
        let pairs = cartesian_pairs(&ids(&["C1"]), &ids(&["N1", "N2", "N3"]));

        let outcome = score_batch(
            &db,
            engine,
            &pairs,
            &BatchOptions::default(),
            Arc::new(AtomicBool::new(false)),
            |_| {},
        )
        .await
        .expect("batch");

        assert_eq!(outcome.persisted, 2);
        assert_eq!(outcome.failed, 1);
        assert_eq!(db.match_count().expect("count"), 2);
    }

    #[tokio::test]
    async fn test_scraped_text_flags_do_not_abort_batch() {
        let (db, engine) = setup();
        db.conn()
            .execute(
                "INSERT INTO ngos (id, name, state, district, sdgs, reg_flag_a, reg_flag_b,
                                   reg_flag_csr1, credibility_score)
                 VALUES ('N4', 'Scraped', 'Bihar', 'Gaya', '[4]', 'yes', 'Yes', 'true', '4.1')",
                [],
            )
            .expect("insert scraped row");
        let pairs = cartesian_pairs(&ids(&["C1"]), &ids(&["N1", "N4"]));

        let outcome = score_batch(
            &db,
            engine,
            &pairs,
            &BatchOptions::default(),
            Arc::new(AtomicBool::new(false)),
            |_| {},
        )
        .await
        .expect("batch");

        assert_eq!(outcome.persisted, 2);
        assert_eq!(outcome.failed, 0);
        let scraped = db
            .query_matches(&crate::db::MatchFilter {
                ngo_id: Some("N4".to_string()),
                ..Default::default()
            })
            .expect("query");
        assert!(scraped[0].compliance_status.is_compliant);
    }

    #[tokio::test]
    async fn test_unreadable_entities_counted_as_failed() {
        let (db, engine) = setup();
        db.conn()
            .execute_batch("ALTER TABLE companies RENAME TO companies_archived")
            .expect("rename");
        let pairs = cartesian_pairs(&ids(&["C1", "C2"]), &ids(&["N1"]));
        let mut errors = Vec::new();

        let outcome = score_batch(
            &db,
            engine,
            &pairs,
            &BatchOptions::default(),
            Arc::new(AtomicBool::new(false)),
            |event| {
                if let PairOutcome::Failed { error, .. } = event {
                    errors.push(error.clone());
                }
            },
        )
        .await
        .expect("read errors stay per pair");

        assert_eq!(outcome.failed, 2);
        assert_eq!(outcome.persisted, 0);
        assert_eq!(outcome.total(), 2);
        assert!(errors.iter().all(|e| e.contains("no such table")), "got {errors:?}");
    }
}
