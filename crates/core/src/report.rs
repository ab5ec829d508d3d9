//! Migration report: one outcome per annotated v1 target, plus the v2
//! elements that are new. The two lists are kept apart, so an identifier
//! appears at most once in each.

use serde::Serialize;
use serde_json::Value;
use std::fmt;

use apishift_interchange::ElementKind;

use crate::validator::RejectionReason;

/// An annotation that failed validation against its new target.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rejection {
    /// Position in the target's annotation list.
    pub index: usize,
    pub kind: &'static str,
    pub reason: RejectionReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrphanReason {
    /// The element no longer exists in v2.
    Removed,
    /// The annotation names an element v1 never had.
    UnresolvedReference,
}

impl fmt::Display for OrphanReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrphanReason::Removed => write!(f, "removed"),
            OrphanReason::UnresolvedReference => write!(f, "unresolved-reference"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    /// At least one annotation moved to `v2_id`.
    Migrated {
        v2_id: String,
        migrated: Vec<&'static str>,
        rejected: Vec<Rejection>,
        low_confidence: bool,
    },
    /// The element has a counterpart but every annotation failed validation.
    RejectedOnMigration {
        v2_id: String,
        rejected: Vec<Rejection>,
    },
    AmbiguousPending {
        candidates: Vec<String>,
        annotations: usize,
    },
    Orphaned {
        reason: OrphanReason,
        annotations: usize,
    },
    /// New in v2; may need fresh annotations.
    Added { kind: ElementKind },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportEntry {
    pub id: String,
    #[serde(flatten)]
    pub outcome: Outcome,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReportSummary {
    pub migrated: usize,
    pub low_confidence: usize,
    pub rejected_on_migration: usize,
    pub ambiguous_pending: usize,
    pub orphaned: usize,
    pub added: usize,
    pub annotations_migrated: usize,
    pub annotations_rejected: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MigrationReport {
    pub from_version: Option<String>,
    pub to_version: String,
    /// One entry per input target, in target order.
    pub entries: Vec<ReportEntry>,
    /// `Added` entries for v2 elements nobody claimed.
    pub added: Vec<ReportEntry>,
}

impl MigrationReport {
    /// Outcome for the input target `id`.
    pub fn entry(&self, id: &str) -> Option<&Outcome> {
        self.entries
            .iter()
            .find(|e| e.id == id)
            .map(|e| &e.outcome)
    }

    /// Kind of `id` if it is a v2 element reported as added.
    pub fn added_kind(&self, id: &str) -> Option<ElementKind> {
        self.added.iter().find(|e| e.id == id).and_then(|e| match e.outcome {
            Outcome::Added { kind } => Some(kind),
            _ => None,
        })
    }

    fn all_entries(&self) -> impl Iterator<Item = &ReportEntry> {
        self.entries.iter().chain(&self.added)
    }

    pub fn summary(&self) -> ReportSummary {
        let mut summary = ReportSummary::default();
        for entry in self.all_entries() {
            match &entry.outcome {
                Outcome::Migrated {
                    migrated,
                    rejected,
                    low_confidence,
                    ..
                } => {
                    summary.migrated += 1;
                    summary.annotations_migrated += migrated.len();
                    summary.annotations_rejected += rejected.len();
                    if *low_confidence {
                        summary.low_confidence += 1;
                    }
                }
                Outcome::RejectedOnMigration { rejected, .. } => {
                    summary.rejected_on_migration += 1;
                    summary.annotations_rejected += rejected.len();
                }
                Outcome::AmbiguousPending { .. } => summary.ambiguous_pending += 1,
                Outcome::Orphaned { .. } => summary.orphaned += 1,
                Outcome::Added { .. } => summary.added += 1,
            }
        }
        summary
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Value {
        let mut json = serde_json::to_value(self).unwrap_or(Value::Null);
        if let Value::Object(map) = &mut json {
            map.insert(
                "summary".to_string(),
                serde_json::to_value(self.summary()).unwrap_or(Value::Null),
            );
        }
        json
    }

    /// Format as human-readable text.
    pub fn to_text(&self) -> String {
        let summary = self.summary();
        let mut lines = vec![
            format!(
                "Migration {} -> {}",
                self.from_version.as_deref().unwrap_or("?"),
                self.to_version
            ),
            format!(
                "{} migrated ({} low confidence), {} rejected, {} ambiguous, {} orphaned, {} added",
                summary.migrated,
                summary.low_confidence,
                summary.rejected_on_migration,
                summary.ambiguous_pending,
                summary.orphaned,
                summary.added
            ),
            String::new(),
        ];

        for entry in self.all_entries() {
            let line = match &entry.outcome {
                Outcome::Migrated {
                    v2_id,
                    migrated,
                    low_confidence,
                    ..
                } => {
                    let unsure = if *low_confidence { " [unsure]" } else { "" };
                    format!(
                        "  migrated   {} -> {} ({}){}",
                        entry.id,
                        v2_id,
                        migrated.join(", "),
                        unsure
                    )
                }
                Outcome::RejectedOnMigration { v2_id, .. } => {
                    format!("  rejected   {} -> {}", entry.id, v2_id)
                }
                Outcome::AmbiguousPending { candidates, .. } => {
                    format!("  ambiguous  {} -> {{{}}}", entry.id, candidates.join(", "))
                }
                Outcome::Orphaned { reason, .. } => {
                    format!("  orphaned   {} ({})", entry.id, reason)
                }
                Outcome::Added { kind } => format!("  added      {} ({})", entry.id, kind),
            };
            lines.push(line);

            let rejected: &[Rejection] = match &entry.outcome {
                Outcome::Migrated { rejected, .. }
                | Outcome::RejectedOnMigration { rejected, .. } => rejected.as_slice(),
                _ => &[],
            };
            for r in rejected {
                lines.push(format!("      #{} {}: {}", r.index, r.kind, r.reason));
            }
        }
        lines.join("\n")
    }
}
