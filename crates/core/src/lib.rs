//! apishift-core: cross-version API matching and annotation migration.
//!
//! Given two [`ApiModel`] snapshots of one library and an annotation store
//! curated against the first, [`Matcher`] computes which v1 element became
//! which v2 element, and [`migrate`] moves every annotation it can onto its
//! new target, recording everything else in a [`MigrationReport`].

pub mod check;
pub mod config;
pub mod correspondence;
pub mod matcher;
pub mod migrator;
pub mod report;
pub mod scorer;
pub mod validator;

pub use check::{check_store, StoreIssue};
pub use config::{ConfigError, MatchConfig, ScoreWeights};
pub use correspondence::{
    Confidence, Correspondence, CorrespondenceSet, CorrespondenceSummary, MatchKind, Side,
};
pub use matcher::Matcher;
pub use migrator::migrate;
pub use report::{MigrationReport, OrphanReason, Outcome, Rejection, ReportEntry, ReportSummary};
pub use scorer::{ParentMatch, ScoreContext, SimilarityScorer};
pub use validator::{validate, RejectionReason, ValidationResult};

use apishift_interchange::{AnnotationStore, ApiModel};

/// Everything one migration run produces.
#[derive(Debug, Clone, PartialEq)]
pub struct MigrationOutcome {
    pub correspondences: CorrespondenceSet,
    pub store: AnnotationStore,
    pub report: MigrationReport,
}

/// Match `v1` against `v2` and migrate `store` through the result.
pub fn run(
    v1: &ApiModel,
    v2: &ApiModel,
    store: &AnnotationStore,
    config: &MatchConfig,
) -> Result<MigrationOutcome, ConfigError> {
    let matcher = Matcher::new(config)?;
    let correspondences = matcher.match_models(v1, v2);
    let (migrated, report) = migrate(store, &correspondences, v2);
    tracing::debug!(
        from = v1.version(),
        to = v2.version(),
        correspondences = correspondences.len(),
        migrated = migrated.len(),
        "migration run complete"
    );
    Ok(MigrationOutcome {
        correspondences,
        store: migrated,
        report,
    })
}
