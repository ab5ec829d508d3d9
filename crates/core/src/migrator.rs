//! Moving a v1 annotation store onto v2 identifiers.

use apishift_interchange::{AnnotationStore, ApiModel};

use crate::correspondence::{Correspondence, CorrespondenceSet};
use crate::report::{MigrationReport, OrphanReason, Outcome, Rejection, ReportEntry};
use crate::validator::validate;

/// Migrate `store` through `correspondences` onto `v2`.
///
/// The returned store holds only annotations that were re-targeted and
/// validated. Every input target gets exactly one report entry; every v2
/// element nobody claimed (and that is not a pending ambiguous candidate)
/// gets an `Added` entry in the report's separate `added` list.
pub fn migrate(
    store: &AnnotationStore,
    correspondences: &CorrespondenceSet,
    v2: &ApiModel,
) -> (AnnotationStore, MigrationReport) {
    let mut migrated = AnnotationStore::with_version(v2.version());
    let mut entries = Vec::with_capacity(store.target_count());

    for (target, annotations) in store.iter() {
        let outcome = match correspondences.for_v1(target) {
            None => {
                tracing::warn!(id = %target, "annotation target does not exist in v1");
                Outcome::Orphaned {
                    reason: OrphanReason::UnresolvedReference,
                    annotations: annotations.len(),
                }
            }
            Some(Correspondence::Ambiguous { candidates, .. }) => Outcome::AmbiguousPending {
                candidates: candidates.clone(),
                annotations: annotations.len(),
            },
            Some(Correspondence::Unmatched { .. }) => Outcome::Orphaned {
                reason: OrphanReason::Removed,
                annotations: annotations.len(),
            },
            Some(entry @ (Correspondence::Exact { .. } | Correspondence::Renamed { .. })) => {
                let v2_id = entry.matched_v2().unwrap_or(target);
                match v2.get(v2_id) {
                    None => Outcome::Orphaned {
                        reason: OrphanReason::Removed,
                        annotations: annotations.len(),
                    },
                    Some(element) => {
                        let mut kinds = Vec::new();
                        let mut rejected = Vec::new();
                        for (index, annotation) in annotations.iter().enumerate() {
                            match validate(annotation, element) {
                                Ok(()) => {
                                    kinds.push(annotation.payload.kind_name());
                                    migrated.push(annotation.retargeted(v2_id));
                                }
                                Err(reason) => {
                                    tracing::info!(
                                        id = %target,
                                        v2 = %v2_id,
                                        %reason,
                                        "annotation rejected on migration"
                                    );
                                    rejected.push(Rejection {
                                        index,
                                        kind: annotation.payload.kind_name(),
                                        reason,
                                    });
                                }
                            }
                        }
                        if kinds.is_empty() {
                            Outcome::RejectedOnMigration {
                                v2_id: v2_id.to_string(),
                                rejected,
                            }
                        } else {
                            Outcome::Migrated {
                                v2_id: v2_id.to_string(),
                                migrated: kinds,
                                rejected,
                                low_confidence: entry.is_low_confidence(),
                            }
                        }
                    }
                }
            }
        };
        entries.push(ReportEntry {
            id: target.to_string(),
            outcome,
        });
    }

    let added = correspondences
        .added()
        .filter_map(|c| match c {
            Correspondence::Unmatched { kind, id, .. } => Some(ReportEntry {
                id: id.clone(),
                outcome: Outcome::Added { kind: *kind },
            }),
            _ => None,
        })
        .collect();

    let report = MigrationReport {
        from_version: store.version().map(str::to_string),
        to_version: v2.version().to_string(),
        entries,
        added,
    };
    (migrated, report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MatchConfig;
    use crate::matcher::Matcher;
    use apishift_interchange::{
        Annotation, AnnotationPayload, ApiElement, BoundaryType, EnumType, NamedType,
    };

    fn models() -> (ApiModel, ApiModel) {
        let v1 = ApiModel::from_elements(
            "1.0",
            vec![
                ApiElement::module("pkg"),
                ApiElement::function("pkg.foo", "pkg"),
                ApiElement::parameter("pkg.foo.a", "pkg.foo", 0),
                ApiElement::parameter("pkg.foo.b", "pkg.foo", 1),
            ],
        )
        .unwrap();
        let v2 = ApiModel::from_elements(
            "2.0",
            vec![
                ApiElement::module("pkg"),
                ApiElement::function("pkg.foo", "pkg"),
                ApiElement::parameter("pkg.foo.a", "pkg.foo", 0),
                ApiElement::parameter("pkg.foo.c", "pkg.foo", 5),
            ],
        )
        .unwrap();
        (v1, v2)
    }

    fn run(store: &AnnotationStore) -> (AnnotationStore, MigrationReport) {
        let (v1, v2) = models();
        let set = Matcher::new(&MatchConfig::default())
            .unwrap()
            .match_models(&v1, &v2);
        migrate(store, &set, &v2)
    }

    #[test]
    fn mixed_validation_keeps_valid_annotations() {
        let mut store = AnnotationStore::with_version("1.0");
        store.push(Annotation::new(
            "pkg.foo.a",
            AnnotationPayload::Boundary(BoundaryType::new("int", Some(0.0), Some(10.0))),
        ));
        store.push(Annotation::new(
            "pkg.foo.a",
            AnnotationPayload::Enum(EnumType::new(Vec::<String>::new())),
        ));

        let (out, report) = run(&store);
        assert_eq!(out.version(), Some("2.0"));
        assert_eq!(out.get("pkg.foo.a").len(), 1);
        match report.entry("pkg.foo.a") {
            Some(Outcome::Migrated {
                migrated, rejected, ..
            }) => {
                assert_eq!(migrated, &vec!["BoundaryType"]);
                assert_eq!(rejected.len(), 1);
                assert_eq!(rejected[0].index, 1);
            }
            other => panic!("expected Migrated, got {:?}", other),
        }
    }

    #[test]
    fn all_rejected_reports_rejected_on_migration() {
        let mut store = AnnotationStore::new();
        store.push(Annotation::new(
            "pkg.foo",
            AnnotationPayload::Boundary(BoundaryType::new("int", Some(0.0), Some(1.0))),
        ));
        let (out, report) = run(&store);
        assert!(out.is_empty());
        assert!(matches!(
            report.entry("pkg.foo"),
            Some(Outcome::RejectedOnMigration { .. })
        ));
    }

    #[test]
    fn unknown_target_is_unresolved_reference() {
        let mut store = AnnotationStore::new();
        store.push(Annotation::new(
            "pkg.nowhere",
            AnnotationPayload::Named(NamedType::new("int")),
        ));
        let (_, report) = run(&store);
        assert_eq!(
            report.entry("pkg.nowhere"),
            Some(&Outcome::Orphaned {
                reason: OrphanReason::UnresolvedReference,
                annotations: 1
            })
        );
    }

    #[test]
    fn removed_target_is_orphaned_and_added_listed_apart() {
        let mut store = AnnotationStore::new();
        store.push(Annotation::new("pkg.foo.b", AnnotationPayload::Remove));
        let (out, report) = run(&store);
        assert!(out.is_empty());
        assert_eq!(
            report.entry("pkg.foo.b"),
            Some(&Outcome::Orphaned {
                reason: OrphanReason::Removed,
                annotations: 1
            })
        );
        assert_eq!(report.entries.len(), 1);
        let added: Vec<&str> = report.added.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(added, vec!["pkg.foo.c"]);
    }
}
