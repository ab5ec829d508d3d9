//! Immutable API snapshot: a flat arena of elements keyed by identifier,
//! plus the parent/child and per-kind indices the matcher walks.

use std::collections::BTreeMap;

use crate::error::InputFormatError;
use crate::types::{ApiElement, ElementKind};

/// One library version's API, built once and never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiModel {
    package: Option<String>,
    version: String,
    elements: BTreeMap<String, ApiElement>,
    children: BTreeMap<String, Vec<String>>,
    by_kind: BTreeMap<ElementKind, Vec<String>>,
}

impl ApiModel {
    /// Build a snapshot, checking identifier uniqueness and the parent rules
    /// (modules are roots, classes live in modules, functions in modules or
    /// classes, parameters in functions).
    pub fn from_elements<I>(version: impl Into<String>, elements: I) -> Result<Self, InputFormatError>
    where
        I: IntoIterator<Item = ApiElement>,
    {
        let mut arena: BTreeMap<String, ApiElement> = BTreeMap::new();
        for element in elements {
            if arena.contains_key(&element.id) {
                return Err(InputFormatError::DuplicateId { id: element.id });
            }
            arena.insert(element.id.clone(), element);
        }

        let mut children: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut by_kind: BTreeMap<ElementKind, Vec<String>> = BTreeMap::new();

        // BTreeMap iteration keeps both indices sorted by id.
        for element in arena.values() {
            let parent_kind = match &element.parent_id {
                Some(parent_id) => {
                    let parent = arena.get(parent_id).ok_or_else(|| {
                        InputFormatError::DanglingParent {
                            id: element.id.clone(),
                            parent: parent_id.clone(),
                        }
                    })?;
                    Some(parent.kind)
                }
                None => None,
            };

            if !element.kind.accepts_parent(parent_kind) {
                let reason = match parent_kind {
                    Some(kind) => format!("cannot be nested under a {}", kind),
                    None => "must have a parent".to_string(),
                };
                return Err(InputFormatError::InvalidParent {
                    id: element.id.clone(),
                    kind: element.kind,
                    reason,
                });
            }

            if let Some(parent_id) = &element.parent_id {
                children
                    .entry(parent_id.clone())
                    .or_default()
                    .push(element.id.clone());
            }
            by_kind
                .entry(element.kind)
                .or_default()
                .push(element.id.clone());
        }

        Ok(ApiModel {
            package: None,
            version: version.into(),
            elements: arena,
            children,
            by_kind,
        })
    }

    pub fn with_package(mut self, package: impl Into<String>) -> Self {
        self.package = Some(package.into());
        self
    }

    pub fn package(&self) -> Option<&str> {
        self.package.as_deref()
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn get(&self, id: &str) -> Option<&ApiElement> {
        self.elements.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.elements.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// All elements in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = &ApiElement> {
        self.elements.values()
    }

    /// Identifiers of every element of `kind`, sorted.
    pub fn ids_of_kind(&self, kind: ElementKind) -> &[String] {
        self.by_kind.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Identifiers of the direct children of `id`, sorted.
    pub fn children_of(&self, id: &str) -> &[String] {
        self.children.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Direct children of `id` restricted to one kind.
    pub fn children_of_kind<'a>(
        &'a self,
        id: &str,
        kind: ElementKind,
    ) -> impl Iterator<Item = &'a ApiElement> + 'a {
        self.children_of(id)
            .iter()
            .filter_map(move |child| self.elements.get(child))
            .filter(move |child| child.kind == kind)
    }

    /// Identifier of the top-level module `id` lives under (itself for a module).
    /// Unknown identifiers are returned unchanged.
    pub fn root_of<'a>(&'a self, id: &'a str) -> &'a str {
        let mut current = id;
        while let Some(parent) = self
            .elements
            .get(current)
            .and_then(|e| e.parent_id.as_deref())
        {
            current = parent;
        }
        current
    }
}
