//! Similarity scoring between a v1 element and a same-kind v2 candidate.
//!
//! A score is a weighted sum of three signals, each in [0, 1]:
//!
//! - **name**: normalized Levenshtein similarity of the short names
//! - **parent**: whether the candidate sits under the v2 element the v1
//!   parent was resolved to
//! - **context**: parameter-name overlap for functions, position proximity
//!   for parameters, child-name overlap for modules and classes
//!
//! Scores are pure functions of their inputs, so the same pair always scores
//! the same regardless of evaluation order or thread.

use std::collections::BTreeSet;

use apishift_interchange::{ApiElement, ApiModel, ElementKind};

use crate::config::{MatchConfig, ScoreWeights};

/// How the v1 element's parent was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentMatch<'a> {
    /// The v1 element is a module and has no parent.
    Root,
    /// The v1 parent was matched to this v2 element.
    Resolved(&'a str),
    /// The v1 parent was left ambiguous.
    Unresolved,
}

/// The snapshots the scored pair lives in, and its parent resolution.
#[derive(Debug, Clone, Copy)]
pub struct ScoreContext<'a> {
    pub v1: &'a ApiModel,
    pub v2: &'a ApiModel,
    pub parent: ParentMatch<'a>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityScorer {
    weights: ScoreWeights,
    position_decay: f64,
}

impl SimilarityScorer {
    pub fn new(weights: &ScoreWeights, position_decay: f64) -> Self {
        SimilarityScorer {
            weights: weights.normalized(),
            position_decay,
        }
    }

    pub fn from_config(config: &MatchConfig) -> Self {
        Self::new(&config.weights, config.position_decay)
    }

    /// Score `a` (from `ctx.v1`) against `b` (from `ctx.v2`). Identical
    /// identifiers always score 1.0.
    pub fn score(&self, a: &ApiElement, b: &ApiElement, ctx: &ScoreContext<'_>) -> f64 {
        debug_assert_eq!(a.kind, b.kind, "only same-kind elements are compared");
        if a.id == b.id {
            return 1.0;
        }

        let name = name_similarity(&a.name, &b.name);
        let parent = parent_similarity(ctx.parent, b.parent_id.as_deref());
        let context = self.context_similarity(a, b, ctx);

        let w = &self.weights;
        (w.name * name + w.parent * parent + w.context * context).clamp(0.0, 1.0)
    }

    fn context_similarity(&self, a: &ApiElement, b: &ApiElement, ctx: &ScoreContext<'_>) -> f64 {
        match a.kind {
            ElementKind::Parameter => {
                let distance = a.ordinal_position.abs_diff(b.ordinal_position);
                let exponent = i32::try_from(distance).unwrap_or(i32::MAX);
                self.position_decay.powi(exponent)
            }
            ElementKind::Function => jaccard(
                &child_names(ctx.v1, &a.id, Some(ElementKind::Parameter)),
                &child_names(ctx.v2, &b.id, Some(ElementKind::Parameter)),
            ),
            ElementKind::Module | ElementKind::Class => jaccard(
                &child_names(ctx.v1, &a.id, None),
                &child_names(ctx.v2, &b.id, None),
            ),
        }
    }
}

/// `1 - distance / longer length`, counted in characters. Two empty names
/// are identical.
pub fn name_similarity(a: &str, b: &str) -> f64 {
    let longest = a.chars().count().max(b.chars().count());
    if longest == 0 {
        return 1.0;
    }
    1.0 - strsim::levenshtein(a, b) as f64 / longest as f64
}

fn parent_similarity(parent: ParentMatch<'_>, candidate_parent: Option<&str>) -> f64 {
    match parent {
        ParentMatch::Root => {
            if candidate_parent.is_none() {
                1.0
            } else {
                0.0
            }
        }
        ParentMatch::Resolved(expected) => {
            if candidate_parent == Some(expected) {
                1.0
            } else {
                0.0
            }
        }
        ParentMatch::Unresolved => 0.5,
    }
}

fn child_names<'a>(model: &'a ApiModel, id: &str, kind: Option<ElementKind>) -> BTreeSet<&'a str> {
    model
        .children_of(id)
        .iter()
        .filter_map(|child| model.get(child))
        .filter(|child| kind.map_or(true, |k| child.kind == k))
        .map(|child| child.name.as_str())
        .collect()
}

/// Jaccard index; two empty sets are identical.
fn jaccard(a: &BTreeSet<&str>, b: &BTreeSet<&str>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 1.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn models() -> (ApiModel, ApiModel) {
        let v1 = ApiModel::from_elements(
            "1",
            vec![
                ApiElement::module("pkg"),
                ApiElement::function("pkg.foo", "pkg"),
                ApiElement::parameter("pkg.foo.a", "pkg.foo", 0),
                ApiElement::parameter("pkg.foo.b", "pkg.foo", 1),
            ],
        )
        .unwrap();
        let v2 = ApiModel::from_elements(
            "2",
            vec![
                ApiElement::module("pkg"),
                ApiElement::function("pkg.bar", "pkg"),
                ApiElement::parameter("pkg.bar.a", "pkg.bar", 0),
                ApiElement::parameter("pkg.bar.b", "pkg.bar", 1),
            ],
        )
        .unwrap();
        (v1, v2)
    }

    #[test]
    fn name_similarity_bounds() {
        assert_eq!(name_similarity("", ""), 1.0);
        assert_eq!(name_similarity("same", "same"), 1.0);
        assert_eq!(name_similarity("a", "c"), 0.0);
        assert!((name_similarity("b", "beta") - 0.25).abs() < 1e-12);
        // counted in characters, not bytes
        assert!((name_similarity("größe", "grösse") - 4.0 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn identical_ids_short_circuit() {
        let (v1, _) = models();
        let scorer = SimilarityScorer::from_config(&MatchConfig::default());
        let ctx = ScoreContext {
            v1: &v1,
            v2: &v1,
            parent: ParentMatch::Unresolved,
        };
        let foo = v1.get("pkg.foo").unwrap();
        assert_eq!(scorer.score(foo, foo, &ctx), 1.0);
    }

    #[test]
    fn renamed_function_keeps_context() {
        let (v1, v2) = models();
        let scorer = SimilarityScorer::from_config(&MatchConfig::default());
        let ctx = ScoreContext {
            v1: &v1,
            v2: &v2,
            parent: ParentMatch::Resolved("pkg"),
        };
        let score = scorer.score(v1.get("pkg.foo").unwrap(), v2.get("pkg.bar").unwrap(), &ctx);
        // name 0, parent 1, params identical
        assert!((score - 0.6).abs() < 1e-9);
    }

    #[test]
    fn parameter_position_decays() {
        let (v1, v2) = models();
        let scorer = SimilarityScorer::from_config(&MatchConfig::default());
        let ctx = ScoreContext {
            v1: &v1,
            v2: &v2,
            parent: ParentMatch::Resolved("pkg.bar"),
        };
        let a = v1.get("pkg.foo.a").unwrap();
        let same = scorer.score(a, v2.get("pkg.bar.a").unwrap(), &ctx);
        let shifted = scorer.score(a, v2.get("pkg.bar.b").unwrap(), &ctx);
        assert!((same - 1.0).abs() < 1e-9);
        assert!((shifted - 0.45).abs() < 1e-9);
    }

    #[test]
    fn unresolved_parent_scores_half() {
        assert_eq!(parent_similarity(ParentMatch::Unresolved, Some("x")), 0.5);
        assert_eq!(parent_similarity(ParentMatch::Root, None), 1.0);
        assert_eq!(parent_similarity(ParentMatch::Root, Some("x")), 0.0);
        assert_eq!(parent_similarity(ParentMatch::Resolved("x"), Some("y")), 0.0);
    }
}
