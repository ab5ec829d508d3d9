//! Hierarchical correspondence matching.
//!
//! Levels are processed top-down (modules, classes, functions, parameters).
//! At each level every v1 element is first tried against the v2 element with
//! the same identifier; the rest are scored against the v2 elements under
//! their parent's counterpart, and contested candidates are settled by a
//! fixed-point loop in which every round settles at least one element.
//!
//! Nothing depends on hash ordering or thread scheduling: elements are
//! visited in identifier order and candidates are sorted by score, then
//! identifier.

use std::collections::{BTreeMap, BTreeSet};
use std::thread;

use apishift_interchange::{ApiElement, ApiModel, ElementKind};

use crate::config::{ConfigError, MatchConfig};
use crate::correspondence::{Confidence, Correspondence, CorrespondenceSet, Side};
use crate::scorer::{ParentMatch, ScoreContext, SimilarityScorer};

#[derive(Debug, Clone)]
pub struct Matcher {
    scorer: SimilarityScorer,
    exact_threshold: f64,
    ambiguous_threshold: f64,
    workers: usize,
}

/// A scored v2 candidate for one v1 element.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Candidate {
    pub v2_id: String,
    pub score: f64,
}

/// How a v1 element was settled at its own level.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Settled {
    Matched { v2_id: String, score: f64 },
    Ambiguous { candidates: Vec<String>, score: f64 },
    Unmatched,
}

/// Resolution of an already-processed v1 element, as seen by its children.
#[derive(Debug, Clone, PartialEq)]
enum Resolution {
    Matched(String),
    Ambiguous(Vec<String>),
    Unmatched,
}

/// Where a v1 element's candidates come from.
enum Scope<'a> {
    Root,
    Under(&'a str),
    AnyOf(&'a [String]),
}

impl Matcher {
    pub fn new(config: &MatchConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Matcher {
            scorer: SimilarityScorer::from_config(config),
            exact_threshold: config.exact_threshold,
            ambiguous_threshold: config.ambiguous_threshold,
            workers: config.workers,
        })
    }

    /// Compute the correspondence set between two snapshots.
    pub fn match_models(&self, v1: &ApiModel, v2: &ApiModel) -> CorrespondenceSet {
        let mut resolved: BTreeMap<String, Resolution> = BTreeMap::new();
        let mut set = CorrespondenceSet::default();
        for kind in ElementKind::LEVELS {
            self.match_level(kind, v1, v2, &mut resolved, &mut set);
        }
        set
    }

    fn match_level(
        &self,
        kind: ElementKind,
        v1: &ApiModel,
        v2: &ApiModel,
        resolved: &mut BTreeMap<String, Resolution>,
        set: &mut CorrespondenceSet,
    ) {
        let mut settled: BTreeMap<String, Settled> = BTreeMap::new();
        let mut exact: BTreeSet<String> = BTreeSet::new();
        let mut taken: BTreeSet<String> = BTreeSet::new();
        let mut to_score: Vec<&ApiElement> = Vec::new();

        // ── Forced unmatched and exact identifiers ──────────────────
        for a in v1.ids_of_kind(kind).iter().filter_map(|id| v1.get(id)) {
            let parent = a.parent_id.as_ref().map(|p| resolved.get(p));
            match parent {
                Some(None) | Some(Some(Resolution::Unmatched)) => {
                    settled.insert(a.id.clone(), Settled::Unmatched);
                    continue;
                }
                _ => {}
            }

            let exact_hit = v2.get(&a.id).is_some_and(|b| {
                b.kind == kind
                    && match (&a.parent_id, &b.parent_id) {
                        (None, None) => true,
                        (Some(p), Some(q)) => {
                            matches!(resolved.get(p), Some(Resolution::Matched(m)) if m == q)
                        }
                        _ => false,
                    }
            });
            if exact_hit {
                exact.insert(a.id.clone());
                taken.insert(a.id.clone());
                settled.insert(
                    a.id.clone(),
                    Settled::Matched {
                        v2_id: a.id.clone(),
                        score: 1.0,
                    },
                );
            } else {
                to_score.push(a);
            }
        }

        // ── Candidate scoring ───────────────────────────────────────
        let candidates = self.score_all(&to_score, v1, v2, resolved, &taken);

        // ── Conflict resolution ─────────────────────────────────────
        settled.extend(resolve_conflicts(candidates, &mut taken));

        // ── Record ──────────────────────────────────────────────────
        let mut level_counts = [0usize; 4];
        for (v1_id, outcome) in settled {
            let (entry, resolution) = match outcome {
                Settled::Matched { v2_id, .. } if exact.contains(&v1_id) => {
                    level_counts[0] += 1;
                    (
                        Correspondence::Exact {
                            kind,
                            v1_id: v1_id.clone(),
                            v2_id: v2_id.clone(),
                        },
                        Resolution::Matched(v2_id),
                    )
                }
                Settled::Matched { v2_id, score } => {
                    level_counts[1] += 1;
                    let confidence = if score >= self.exact_threshold {
                        Confidence::High
                    } else {
                        tracing::info!(
                            v1 = %v1_id,
                            v2 = %v2_id,
                            score,
                            "low-confidence rename"
                        );
                        Confidence::Low
                    };
                    (
                        Correspondence::Renamed {
                            kind,
                            v1_id: v1_id.clone(),
                            v2_id: v2_id.clone(),
                            score,
                            confidence,
                        },
                        Resolution::Matched(v2_id),
                    )
                }
                Settled::Ambiguous { candidates, score } => {
                    level_counts[2] += 1;
                    tracing::warn!(
                        v1 = %v1_id,
                        candidates = ?candidates,
                        score,
                        "ambiguous match left for review"
                    );
                    (
                        Correspondence::Ambiguous {
                            kind,
                            v1_id: v1_id.clone(),
                            candidates: candidates.clone(),
                            score,
                        },
                        Resolution::Ambiguous(candidates),
                    )
                }
                Settled::Unmatched => {
                    level_counts[3] += 1;
                    (
                        Correspondence::Unmatched {
                            kind,
                            side: Side::V1,
                            id: v1_id.clone(),
                        },
                        Resolution::Unmatched,
                    )
                }
            };
            set.push(entry);
            resolved.insert(v1_id, resolution);
        }

        let mut added = 0usize;
        for id in v2.ids_of_kind(kind) {
            if !set.is_claimed_v2(id) && !set.is_pending_v2(id) {
                added += 1;
                set.push(Correspondence::Unmatched {
                    kind,
                    side: Side::V2,
                    id: id.clone(),
                });
            }
        }

        tracing::debug!(
            level = %kind,
            exact = level_counts[0],
            renamed = level_counts[1],
            ambiguous = level_counts[2],
            removed = level_counts[3],
            added,
            "matched level"
        );
    }

    /// Score every element in `to_score` against its candidate scope. With
    /// more than one worker, elements are sharded by top-level module and
    /// scored on scoped threads; results are merged by identifier, so the
    /// outcome does not depend on the worker count.
    fn score_all(
        &self,
        to_score: &[&ApiElement],
        v1: &ApiModel,
        v2: &ApiModel,
        resolved: &BTreeMap<String, Resolution>,
        taken: &BTreeSet<String>,
    ) -> BTreeMap<String, Vec<Candidate>> {
        if self.workers <= 1 || to_score.len() < 2 {
            return to_score
                .iter()
                .map(|a| (a.id.clone(), self.candidates_for(a, v1, v2, resolved, taken)))
                .collect();
        }

        let mut shards: BTreeMap<&str, Vec<&ApiElement>> = BTreeMap::new();
        for &a in to_score {
            shards.entry(v1.root_of(&a.id)).or_default().push(a);
        }
        let mut buckets: Vec<Vec<&ApiElement>> = vec![Vec::new(); self.workers.min(shards.len())];
        let bucket_count = buckets.len();
        for (i, shard) in shards.into_values().enumerate() {
            buckets[i % bucket_count].extend(shard);
        }

        thread::scope(|scope| {
            let handles: Vec<_> = buckets
                .iter()
                .map(|bucket| {
                    scope.spawn(move || {
                        bucket
                            .iter()
                            .map(|a| (a.id.clone(), self.candidates_for(a, v1, v2, resolved, taken)))
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            handles
                .into_iter()
                .flat_map(|handle| {
                    handle
                        .join()
                        .unwrap_or_else(|payload| std::panic::resume_unwind(payload))
                })
                .collect()
        })
    }

    /// Candidates for `a` scoring at or above the ambiguous threshold, best
    /// first, ties broken by identifier.
    fn candidates_for(
        &self,
        a: &ApiElement,
        v1: &ApiModel,
        v2: &ApiModel,
        resolved: &BTreeMap<String, Resolution>,
        taken: &BTreeSet<String>,
    ) -> Vec<Candidate> {
        let scope = match a.parent_id.as_ref().and_then(|p| resolved.get(p)) {
            None => Scope::Root,
            Some(Resolution::Matched(q)) => Scope::Under(q),
            Some(Resolution::Ambiguous(qs)) => Scope::AnyOf(qs),
            Some(Resolution::Unmatched) => return Vec::new(),
        };

        let (pool, parent): (Vec<&ApiElement>, ParentMatch<'_>) = match scope {
            Scope::Root => (
                v2.ids_of_kind(a.kind)
                    .iter()
                    .filter_map(|id| v2.get(id))
                    .filter(|b| b.parent_id.is_none())
                    .collect(),
                ParentMatch::Root,
            ),
            Scope::Under(q) => (
                v2.children_of_kind(q, a.kind).collect(),
                ParentMatch::Resolved(q),
            ),
            Scope::AnyOf(qs) => (
                qs.iter()
                    .flat_map(|q| v2.children_of_kind(q, a.kind))
                    .collect(),
                ParentMatch::Unresolved,
            ),
        };

        let ctx = ScoreContext { v1, v2, parent };
        let mut candidates: Vec<Candidate> = pool
            .into_iter()
            .filter(|b| !taken.contains(&b.id))
            .map(|b| Candidate {
                v2_id: b.id.clone(),
                score: self.scorer.score(a, b, &ctx),
            })
            .filter(|c| c.score >= self.ambiguous_threshold)
            .collect();
        candidates.sort_by(|x, y| {
            y.score
                .total_cmp(&x.score)
                .then_with(|| x.v2_id.cmp(&y.v2_id))
        });
        candidates
    }
}

/// Settle contested candidates.
///
/// Each round, every pending v1 element claims all of its best remaining
/// candidates (more than one when scores tie). An element outbid on any of
/// them by a strictly higher claimant sits the round out. Of the rest, a
/// sole claimant of a single candidate is matched to it; several equal
/// claimants of one candidate are all ambiguous over it; an element whose own
/// best candidates tie is ambiguous over them, unless one of them was just
/// settled, in which case it retries. Every candidate named in a settled
/// entry is withheld from later rounds. The highest pending claim always
/// settles something, so the loop ends after at most one round per element.
pub(crate) fn resolve_conflicts(
    mut pending: BTreeMap<String, Vec<Candidate>>,
    taken: &mut BTreeSet<String>,
) -> BTreeMap<String, Settled> {
    let mut settled = BTreeMap::new();

    while !pending.is_empty() {
        let mut claims: BTreeMap<String, (Vec<String>, f64)> = BTreeMap::new();
        for (v1_id, candidates) in &pending {
            let mut available = candidates.iter().filter(|c| !taken.contains(&c.v2_id));
            let Some(best) = available.next() else {
                settled.insert(v1_id.clone(), Settled::Unmatched);
                continue;
            };
            let tied: Vec<String> = std::iter::once(best)
                .chain(available.take_while(|c| c.score == best.score))
                .map(|c| c.v2_id.clone())
                .collect();
            claims.insert(v1_id.clone(), (tied, best.score));
        }
        pending.retain(|id, _| claims.contains_key(id));

        let mut top: BTreeMap<&str, f64> = BTreeMap::new();
        for (tied, score) in claims.values() {
            for v2_id in tied {
                let best = top.entry(v2_id.as_str()).or_insert(*score);
                *best = best.max(*score);
            }
        }

        let standing: Vec<(&String, &Vec<String>, f64)> = claims
            .iter()
            .filter(|(_, (tied, score))| tied.iter().all(|v2_id| top[v2_id.as_str()] <= *score))
            .map(|(id, (tied, score))| (id, tied, *score))
            .collect();

        // single-candidate claims settle first
        let mut contenders: BTreeMap<&str, Vec<&String>> = BTreeMap::new();
        for &(id, tied, _) in &standing {
            if let [v2_id] = tied.as_slice() {
                contenders.entry(v2_id.as_str()).or_default().push(id);
            }
        }

        let mut done: Vec<String> = Vec::new();
        let mut reserved: BTreeSet<String> = BTreeSet::new();
        for (v2_id, ids) in &contenders {
            let score = top[v2_id];
            for id in ids {
                let outcome = if ids.len() == 1 {
                    Settled::Matched {
                        v2_id: v2_id.to_string(),
                        score,
                    }
                } else {
                    Settled::Ambiguous {
                        candidates: vec![v2_id.to_string()],
                        score,
                    }
                };
                settled.insert(id.to_string(), outcome);
                done.push(id.to_string());
            }
            reserved.insert(v2_id.to_string());
        }

        for (id, tied, score) in &standing {
            if tied.len() > 1 && !tied.iter().any(|v2_id| contenders.contains_key(v2_id.as_str())) {
                settled.insert(
                    id.to_string(),
                    Settled::Ambiguous {
                        candidates: tied.to_vec(),
                        score: *score,
                    },
                );
                done.push(id.to_string());
                reserved.extend(tied.iter().cloned());
            }
        }

        taken.extend(reserved);
        for id in done {
            pending.remove(&id);
        }
    }

    settled
}
