//! End-to-end matching and migration over small hand-built snapshots.

use apishift_core::{
    run, Confidence, Correspondence, MatchConfig, Matcher, OrphanReason, Outcome, Side,
};
use apishift_interchange::{
    Annotation, AnnotationPayload, AnnotationStore, ApiElement, ApiModel, BoundaryType, ElementKind,
    NamedType,
};

// ── Helpers ─────────────────────────────────────────────────────────

fn make_model(version: &str, elements: Vec<ApiElement>) -> ApiModel {
    ApiModel::from_elements(version, elements).unwrap()
}

fn foo_with(params: &[&str]) -> Vec<ApiElement> {
    let mut elements = vec![
        ApiElement::module("pkg"),
        ApiElement::function("pkg.foo", "pkg"),
    ];
    for (i, p) in params.iter().enumerate() {
        elements.push(ApiElement::parameter(format!("pkg.foo.{}", p), "pkg.foo", i));
    }
    elements
}

fn unit_boundary(target: &str) -> Annotation {
    Annotation::new(
        target,
        AnnotationPayload::Boundary(BoundaryType::new("int", Some(0.0), Some(1.0))),
    )
}

fn class_with_run(class: &str) -> Vec<ApiElement> {
    let run = format!("{}.run", class);
    vec![
        ApiElement::class(class, "pkg"),
        ApiElement::function(run.clone(), class),
        ApiElement::parameter(format!("{}.self", run), run, 0),
    ]
}

// ──────────────────────────────────────────────
// 1. Rename
// ──────────────────────────────────────────────

#[test]
fn renamed_function_carries_parameter_annotations() {
    let v1 = make_model("1", foo_with(&["a", "b"]));
    let v2 = make_model(
        "2",
        vec![
            ApiElement::module("pkg"),
            ApiElement::function("pkg.bar", "pkg"),
            ApiElement::parameter("pkg.bar.a", "pkg.bar", 0),
            ApiElement::parameter("pkg.bar.b", "pkg.bar", 1),
        ],
    );
    let mut store = AnnotationStore::with_version("1");
    store.push(unit_boundary("pkg.foo.a"));

    let outcome = run(&v1, &v2, &store, &MatchConfig::default()).unwrap();

    match outcome.correspondences.for_v1("pkg.foo") {
        Some(Correspondence::Renamed {
            v2_id, confidence, ..
        }) => {
            assert_eq!(v2_id, "pkg.bar");
            assert_eq!(*confidence, Confidence::Low);
        }
        other => panic!("expected Renamed, got {:?}", other),
    }
    assert_eq!(outcome.correspondences.matched_v2("pkg.foo.a"), Some("pkg.bar.a"));

    assert!(matches!(
        outcome.report.entry("pkg.foo.a"),
        Some(Outcome::Migrated { v2_id, .. }) if v2_id == "pkg.bar.a"
    ));
    assert_eq!(outcome.store.get("pkg.bar.a").len(), 1);
    assert_eq!(outcome.store.get("pkg.bar.a")[0].target_id, "pkg.bar.a");
    assert!(!outcome.store.contains_target("pkg.foo.a"));
}

// ──────────────────────────────────────────────
// 2. Removal
// ──────────────────────────────────────────────

#[test]
fn dropped_parameter_orphans_its_annotation() {
    let v1 = make_model("1", foo_with(&["a", "b"]));
    let v2 = make_model("2", foo_with(&["a"]));
    let mut store = AnnotationStore::new();
    store.push(unit_boundary("pkg.foo.b"));

    let outcome = run(&v1, &v2, &store, &MatchConfig::default()).unwrap();

    assert_eq!(
        outcome.report.entry("pkg.foo.b"),
        Some(&Outcome::Orphaned {
            reason: OrphanReason::Removed,
            annotations: 1
        })
    );
    assert!(outcome.store.is_empty());
}

// ──────────────────────────────────────────────
// 3. Ambiguity
// ──────────────────────────────────────────────

#[test]
fn equally_similar_methods_are_ambiguous() {
    let mut v1_elements = vec![ApiElement::module("pkg")];
    v1_elements.extend(class_with_run("pkg.A"));
    v1_elements.extend(class_with_run("pkg.B"));
    let mut v2_elements = vec![ApiElement::module("pkg")];
    v2_elements.extend(class_with_run("pkg.C"));
    let v1 = make_model("1", v1_elements);
    let v2 = make_model("2", v2_elements);

    let mut store = AnnotationStore::new();
    store.push(Annotation::new(
        "pkg.A.run",
        AnnotationPayload::Named(NamedType::new("None")),
    ));
    store.push(Annotation::new("pkg.B.run", AnnotationPayload::Remove));

    let outcome = run(&v1, &v2, &store, &MatchConfig::default()).unwrap();

    for id in ["pkg.A.run", "pkg.B.run"] {
        match outcome.correspondences.for_v1(id) {
            Some(Correspondence::Ambiguous { candidates, .. }) => {
                assert_eq!(candidates, &vec!["pkg.C.run".to_string()]);
            }
            other => panic!("expected Ambiguous for {}, got {:?}", id, other),
        }
        assert!(matches!(
            outcome.report.entry(id),
            Some(Outcome::AmbiguousPending { candidates, .. }) if candidates == &vec!["pkg.C.run".to_string()]
        ));
    }
    assert!(outcome.store.is_empty());
    // pending candidates are not reported as new
    assert!(outcome.report.entry("pkg.C.run").is_none());
}

// ──────────────────────────────────────────────
// 4. Addition
// ──────────────────────────────────────────────

#[test]
fn new_parameter_is_reported_added() {
    let v1 = make_model("1", foo_with(&["a", "b"]));
    let v2 = make_model("2", foo_with(&["a", "b", "c"]));
    let mut store = AnnotationStore::new();
    store.push(unit_boundary("pkg.foo.a"));

    let outcome = run(&v1, &v2, &store, &MatchConfig::default()).unwrap();

    assert_eq!(outcome.report.entry("pkg.foo.c"), None);
    assert_eq!(
        outcome.report.added_kind("pkg.foo.c"),
        Some(ElementKind::Parameter)
    );
    assert!(!outcome.store.contains_target("pkg.foo.c"));
    assert_eq!(outcome.store.len(), 1);
}

#[test]
fn target_known_only_to_v2_is_reported_once_per_list() {
    let v1 = make_model("1", foo_with(&["a", "b"]));
    let v2 = make_model("2", foo_with(&["a", "b", "c"]));
    let mut store = AnnotationStore::new();
    store.push(unit_boundary("pkg.foo.c"));

    let outcome = run(&v1, &v2, &store, &MatchConfig::default()).unwrap();
    let report = &outcome.report;

    let as_target: Vec<_> = report.entries.iter().filter(|e| e.id == "pkg.foo.c").collect();
    assert_eq!(as_target.len(), 1);
    assert_eq!(
        as_target[0].outcome,
        Outcome::Orphaned {
            reason: OrphanReason::UnresolvedReference,
            annotations: 1
        }
    );
    assert_eq!(report.added.iter().filter(|e| e.id == "pkg.foo.c").count(), 1);
    assert!(outcome.store.is_empty());
}

// ──────────────────────────────────────────────
// 5. Ordering and thresholds
// ──────────────────────────────────────────────

#[test]
fn renamed_parameter_matched_by_position() {
    let v1 = make_model("1", foo_with(&["a", "b"]));
    let v2 = make_model("2", foo_with(&["a", "beta"]));
    let set = Matcher::new(&MatchConfig::default())
        .unwrap()
        .match_models(&v1, &v2);
    assert_eq!(set.matched_v2("pkg.foo.b"), Some("pkg.foo.beta"));
    assert_eq!(set.added().count(), 0);
}

#[test]
fn correspondences_are_ordered_by_level_then_id() {
    let v1 = make_model("1", foo_with(&["b", "a"]));
    let v2 = make_model("2", foo_with(&["a", "b", "z"]));
    let set = Matcher::new(&MatchConfig::default())
        .unwrap()
        .match_models(&v1, &v2);

    let order: Vec<(String, bool)> = set
        .iter()
        .map(|c| match c {
            Correspondence::Unmatched {
                side: Side::V2, id, ..
            } => (id.clone(), true),
            other => (other.v1_id().unwrap_or_default().to_string(), false),
        })
        .collect();
    assert_eq!(
        order,
        vec![
            ("pkg".to_string(), false),
            ("pkg.foo".to_string(), false),
            ("pkg.foo.a".to_string(), false),
            ("pkg.foo.b".to_string(), false),
            ("pkg.foo.z".to_string(), true),
        ]
    );
}

#[test]
fn raising_the_floor_turns_weak_renames_into_removals() {
    let v1 = make_model("1", foo_with(&["a"]));
    let v2 = make_model(
        "2",
        vec![
            ApiElement::module("pkg"),
            ApiElement::function("pkg.bar", "pkg"),
            ApiElement::parameter("pkg.bar.a", "pkg.bar", 0),
        ],
    );
    let strict = MatchConfig {
        exact_threshold: 0.95,
        ambiguous_threshold: 0.7,
        ..MatchConfig::default()
    };
    let set = Matcher::new(&strict).unwrap().match_models(&v1, &v2);
    assert!(matches!(
        set.for_v1("pkg.foo"),
        Some(Correspondence::Unmatched { side: Side::V1, .. })
    ));
    // the parameter follows its parent
    assert!(matches!(
        set.for_v1("pkg.foo.a"),
        Some(Correspondence::Unmatched { side: Side::V1, .. })
    ));
    assert_eq!(set.summary().added, 2);
}

#[test]
fn invalid_config_is_refused() {
    let v1 = make_model("1", foo_with(&[]));
    let config = MatchConfig {
        workers: 0,
        ..MatchConfig::default()
    };
    assert!(run(&v1, &v1, &AnnotationStore::new(), &config).is_err());
}
