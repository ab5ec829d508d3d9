//! Consistency check of an annotation store against the snapshot it
//! claims to describe.

use serde::Serialize;
use std::fmt;

use apishift_interchange::{AnnotationStore, ApiModel};

use crate::validator::{validate, RejectionReason};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum StoreIssue {
    /// The target does not exist in the snapshot.
    UnresolvedTarget { target: String, annotations: usize },
    /// The annotation is not valid on its own target.
    Invalid {
        target: String,
        index: usize,
        kind: &'static str,
        reason: RejectionReason,
    },
}

impl fmt::Display for StoreIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreIssue::UnresolvedTarget {
                target,
                annotations,
            } => write!(
                f,
                "{}: target not found ({} annotation(s))",
                target, annotations
            ),
            StoreIssue::Invalid {
                target,
                index,
                kind,
                reason,
            } => write!(f, "{}: #{} {}: {}", target, index, kind, reason),
        }
    }
}

/// Every problem with `store` as an annotation set for `model`, in target
/// order.
pub fn check_store(store: &AnnotationStore, model: &ApiModel) -> Vec<StoreIssue> {
    let mut issues = Vec::new();
    for (target, annotations) in store.iter() {
        let Some(element) = model.get(target) else {
            issues.push(StoreIssue::UnresolvedTarget {
                target: target.to_string(),
                annotations: annotations.len(),
            });
            continue;
        };
        for (index, annotation) in annotations.iter().enumerate() {
            if let Err(reason) = validate(annotation, element) {
                issues.push(StoreIssue::Invalid {
                    target: target.to_string(),
                    index,
                    kind: annotation.payload.kind_name(),
                    reason,
                });
            }
        }
    }
    issues
}
