//! Annotation store: ordered annotation lists keyed by target identifier.

use std::collections::BTreeMap;

use crate::types::Annotation;

/// All annotations for one API version.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AnnotationStore {
    version: Option<String>,
    annotations: BTreeMap<String, Vec<Annotation>>,
}

impl AnnotationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_version(version: impl Into<String>) -> Self {
        AnnotationStore {
            version: Some(version.into()),
            annotations: BTreeMap::new(),
        }
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn set_version(&mut self, version: Option<String>) {
        self.version = version;
    }

    /// Append `annotation` to the list of its own target.
    pub fn push(&mut self, annotation: Annotation) {
        self.annotations
            .entry(annotation.target_id.clone())
            .or_default()
            .push(annotation);
    }

    /// Annotations attached to `target_id`, in insertion order.
    pub fn get(&self, target_id: &str) -> &[Annotation] {
        self.annotations
            .get(target_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn contains_target(&self, target_id: &str) -> bool {
        self.annotations.contains_key(target_id)
    }

    /// Target identifiers, sorted.
    pub fn targets(&self) -> impl Iterator<Item = &str> {
        self.annotations.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Annotation])> {
        self.annotations
            .iter()
            .map(|(target, list)| (target.as_str(), list.as_slice()))
    }

    /// Number of annotations across all targets.
    pub fn len(&self) -> usize {
        self.annotations.values().map(Vec::len).sum()
    }

    pub fn target_count(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AnnotationPayload, NamedType};

    #[test]
    fn push_groups_by_target_in_order() {
        let mut store = AnnotationStore::with_version("1.0");
        store.push(Annotation::new("b", AnnotationPayload::Remove));
        store.push(Annotation::new(
            "a",
            AnnotationPayload::Named(NamedType::new("int")),
        ));
        store.push(Annotation::new(
            "b",
            AnnotationPayload::Named(NamedType::new("str")),
        ));

        assert_eq!(store.len(), 3);
        assert_eq!(store.target_count(), 2);
        assert_eq!(store.targets().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(store.get("b")[0].payload, AnnotationPayload::Remove);
        assert!(store.get("missing").is_empty());
    }
}
