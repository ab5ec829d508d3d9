//! Matcher output: one correspondence per v1 element plus one per
//! unclaimed v2 element.

use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use apishift_interchange::ElementKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    Exact,
    Renamed,
    Ambiguous,
    Unmatched,
}

impl fmt::Display for MatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchKind::Exact => write!(f, "exact"),
            MatchKind::Renamed => write!(f, "renamed"),
            MatchKind::Ambiguous => write!(f, "ambiguous"),
            MatchKind::Unmatched => write!(f, "unmatched"),
        }
    }
}

/// Whether a rename cleared the exact threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    High,
    Low,
}

/// Which snapshot an unmatched element belongs to. v1-side elements were
/// removed, v2-side elements were added.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    V1,
    V2,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "match_kind", rename_all = "snake_case")]
pub enum Correspondence {
    Exact {
        kind: ElementKind,
        v1_id: String,
        v2_id: String,
    },
    Renamed {
        kind: ElementKind,
        v1_id: String,
        v2_id: String,
        score: f64,
        confidence: Confidence,
    },
    /// Several candidates tied; left for human review.
    Ambiguous {
        kind: ElementKind,
        v1_id: String,
        candidates: Vec<String>,
        score: f64,
    },
    Unmatched {
        kind: ElementKind,
        side: Side,
        id: String,
    },
}

impl Correspondence {
    pub fn match_kind(&self) -> MatchKind {
        match self {
            Correspondence::Exact { .. } => MatchKind::Exact,
            Correspondence::Renamed { .. } => MatchKind::Renamed,
            Correspondence::Ambiguous { .. } => MatchKind::Ambiguous,
            Correspondence::Unmatched { .. } => MatchKind::Unmatched,
        }
    }

    pub fn kind(&self) -> ElementKind {
        match self {
            Correspondence::Exact { kind, .. }
            | Correspondence::Renamed { kind, .. }
            | Correspondence::Ambiguous { kind, .. }
            | Correspondence::Unmatched { kind, .. } => *kind,
        }
    }

    pub fn score(&self) -> f64 {
        match self {
            Correspondence::Exact { .. } => 1.0,
            Correspondence::Renamed { score, .. } | Correspondence::Ambiguous { score, .. } => {
                *score
            }
            Correspondence::Unmatched { .. } => 0.0,
        }
    }

    /// The v1 element this entry describes, if any.
    pub fn v1_id(&self) -> Option<&str> {
        match self {
            Correspondence::Exact { v1_id, .. }
            | Correspondence::Renamed { v1_id, .. }
            | Correspondence::Ambiguous { v1_id, .. } => Some(v1_id),
            Correspondence::Unmatched {
                side: Side::V1, id, ..
            } => Some(id),
            Correspondence::Unmatched { .. } => None,
        }
    }

    /// The single v2 element an exact or renamed entry resolved to.
    pub fn matched_v2(&self) -> Option<&str> {
        match self {
            Correspondence::Exact { v2_id, .. } | Correspondence::Renamed { v2_id, .. } => {
                Some(v2_id)
            }
            _ => None,
        }
    }

    pub fn is_low_confidence(&self) -> bool {
        matches!(
            self,
            Correspondence::Renamed {
                confidence: Confidence::Low,
                ..
            }
        )
    }
}

/// Counts per correspondence kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CorrespondenceSummary {
    pub exact: usize,
    pub renamed: usize,
    pub low_confidence: usize,
    pub ambiguous: usize,
    pub removed: usize,
    pub added: usize,
}

/// Ordered correspondences with lookup by v1 and v2 identifier.
///
/// No v2 element is the target of more than one exact or renamed entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CorrespondenceSet {
    entries: Vec<Correspondence>,
    by_v1: BTreeMap<String, usize>,
    matched_v2: BTreeMap<String, String>,
    pending_v2: BTreeSet<String>,
}

impl CorrespondenceSet {
    pub(crate) fn push(&mut self, entry: Correspondence) {
        let index = self.entries.len();
        if let Some(v1_id) = entry.v1_id() {
            self.by_v1.insert(v1_id.to_string(), index);
        }
        match &entry {
            Correspondence::Exact { v1_id, v2_id, .. }
            | Correspondence::Renamed { v1_id, v2_id, .. } => {
                let previous = self.matched_v2.insert(v2_id.clone(), v1_id.clone());
                debug_assert!(previous.is_none(), "v2 element {} claimed twice", v2_id);
            }
            Correspondence::Ambiguous { candidates, .. } => {
                self.pending_v2.extend(candidates.iter().cloned());
            }
            Correspondence::Unmatched { .. } => {}
        }
        self.entries.push(entry);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Correspondence> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn for_v1(&self, v1_id: &str) -> Option<&Correspondence> {
        self.by_v1.get(v1_id).and_then(|&i| self.entries.get(i))
    }

    /// The v2 element `v1_id` was matched to, for exact and renamed entries.
    pub fn matched_v2(&self, v1_id: &str) -> Option<&str> {
        self.for_v1(v1_id).and_then(Correspondence::matched_v2)
    }

    /// Whether some v1 element was matched onto `v2_id`.
    pub fn is_claimed_v2(&self, v2_id: &str) -> bool {
        self.matched_v2.contains_key(v2_id)
    }

    /// The v1 element claiming `v2_id`.
    pub fn claimant_of(&self, v2_id: &str) -> Option<&str> {
        self.matched_v2.get(v2_id).map(String::as_str)
    }

    /// Whether `v2_id` is a candidate of some ambiguous entry.
    pub fn is_pending_v2(&self, v2_id: &str) -> bool {
        self.pending_v2.contains(v2_id)
    }

    /// v2 elements with no v1 counterpart.
    pub fn added(&self) -> impl Iterator<Item = &Correspondence> {
        self.entries.iter().filter(|c| {
            matches!(
                c,
                Correspondence::Unmatched {
                    side: Side::V2,
                    ..
                }
            )
        })
    }

    pub fn summary(&self) -> CorrespondenceSummary {
        let mut summary = CorrespondenceSummary::default();
        for entry in &self.entries {
            match entry {
                Correspondence::Exact { .. } => summary.exact += 1,
                Correspondence::Renamed { confidence, .. } => {
                    summary.renamed += 1;
                    if *confidence == Confidence::Low {
                        summary.low_confidence += 1;
                    }
                }
                Correspondence::Ambiguous { .. } => summary.ambiguous += 1,
                Correspondence::Unmatched { side: Side::V1, .. } => summary.removed += 1,
                Correspondence::Unmatched { side: Side::V2, .. } => summary.added += 1,
            }
        }
        summary
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Value {
        serde_json::json!({
            "correspondences": serde_json::to_value(&self.entries).unwrap_or(Value::Null),
            "summary": serde_json::to_value(self.summary()).unwrap_or(Value::Null),
        })
    }

    /// Review table: one row per entry, `similarity | v1 | v2`.
    pub fn to_text(&self) -> String {
        let summary = self.summary();
        let mut lines = vec![
            format!(
                "{} exact, {} renamed ({} low confidence), {} ambiguous, {} removed, {} added",
                summary.exact,
                summary.renamed,
                summary.low_confidence,
                summary.ambiguous,
                summary.removed,
                summary.added
            ),
            String::new(),
            "| similarity | kind | v1 | v2 | match |".to_string(),
            "|-----------:|------|----|----|-------|".to_string(),
        ];
        for entry in &self.entries {
            let (v1, v2) = match entry {
                Correspondence::Exact { v1_id, v2_id, .. }
                | Correspondence::Renamed { v1_id, v2_id, .. } => (v1_id.clone(), v2_id.clone()),
                Correspondence::Ambiguous {
                    v1_id, candidates, ..
                } => (v1_id.clone(), candidates.join(", ")),
                Correspondence::Unmatched {
                    side: Side::V1, id, ..
                } => (id.clone(), "-".to_string()),
                Correspondence::Unmatched { id, .. } => ("-".to_string(), id.clone()),
            };
            let label = if entry.is_low_confidence() {
                "renamed (unsure)".to_string()
            } else {
                entry.match_kind().to_string()
            };
            lines.push(format!(
                "| {:.3} | {} | {} | {} | {} |",
                entry.score(),
                entry.kind(),
                v1,
                v2,
                label
            ));
        }
        lines.join("\n")
    }
}
