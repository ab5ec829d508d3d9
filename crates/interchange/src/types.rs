//! Typed structs for API elements and annotation payloads.
//!
//! The loosely-shaped JSON records are parsed exactly once (see
//! [`crate::deserialize`]) into these variants; nothing downstream ever
//! looks at the raw form again.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

// ── Elements ────────────────────────────────────────────────────────

/// The four element kinds, ordered the way the tree is walked (top-down).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum ElementKind {
    Module,
    Class,
    Function,
    Parameter,
}

impl ElementKind {
    /// All kinds in level order.
    pub const LEVELS: [ElementKind; 4] = [
        ElementKind::Module,
        ElementKind::Class,
        ElementKind::Function,
        ElementKind::Parameter,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ElementKind::Module => "Module",
            ElementKind::Class => "Class",
            ElementKind::Function => "Function",
            ElementKind::Parameter => "Parameter",
        }
    }

    /// Whether an element of this kind may hang under a parent of `parent` kind.
    /// `None` stands for "no parent".
    pub fn accepts_parent(&self, parent: Option<ElementKind>) -> bool {
        matches!(
            (self, parent),
            (ElementKind::Module, None)
                | (ElementKind::Class, Some(ElementKind::Module))
                | (
                    ElementKind::Function,
                    Some(ElementKind::Module) | Some(ElementKind::Class)
                )
                | (ElementKind::Parameter, Some(ElementKind::Function))
        )
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Last dot-separated segment of a qualified identifier.
pub fn last_segment(id: &str) -> &str {
    id.rsplit('.').next().unwrap_or(id)
}

/// One node of an API snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiElement {
    pub id: String,
    pub kind: ElementKind,
    /// Back-reference into the same snapshot; `None` only for modules.
    pub parent_id: Option<String>,
    /// Index among siblings of the same kind.
    pub ordinal_position: usize,
    pub name: String,
    pub declared_type: Option<String>,
    pub default_value: Option<String>,
}

impl ApiElement {
    /// Build an element whose name is the last segment of `id`.
    pub fn new(
        id: impl Into<String>,
        kind: ElementKind,
        parent_id: Option<String>,
        ordinal_position: usize,
    ) -> Self {
        let id = id.into();
        let name = last_segment(&id).to_string();
        ApiElement {
            id,
            kind,
            parent_id,
            ordinal_position,
            name,
            declared_type: None,
            default_value: None,
        }
    }

    pub fn module(id: impl Into<String>) -> Self {
        Self::new(id, ElementKind::Module, None, 0)
    }

    pub fn class(id: impl Into<String>, parent: impl Into<String>) -> Self {
        Self::new(id, ElementKind::Class, Some(parent.into()), 0)
    }

    pub fn function(id: impl Into<String>, parent: impl Into<String>) -> Self {
        Self::new(id, ElementKind::Function, Some(parent.into()), 0)
    }

    pub fn parameter(id: impl Into<String>, parent: impl Into<String>, position: usize) -> Self {
        Self::new(id, ElementKind::Parameter, Some(parent.into()), position)
    }
}

// ── Type specs ──────────────────────────────────────────────────────

/// A numeric interval. `None` on either side means unbounded.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryType {
    pub base_type: String,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub min_inclusive: bool,
    pub max_inclusive: bool,
}

impl BoundaryType {
    /// A closed interval `[min, max]`.
    pub fn new(base_type: impl Into<String>, min: Option<f64>, max: Option<f64>) -> Self {
        BoundaryType {
            base_type: base_type.into(),
            min,
            max,
            min_inclusive: true,
            max_inclusive: true,
        }
    }

    pub fn with_inclusivity(mut self, min_inclusive: bool, max_inclusive: bool) -> Self {
        self.min_inclusive = min_inclusive;
        self.max_inclusive = max_inclusive;
        self
    }
}

/// A closed set of literal values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumType {
    pub values: BTreeSet<String>,
}

impl EnumType {
    pub fn new<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        EnumType {
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}

/// A bare type name with no constraint attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedType {
    pub name: String,
}

impl NamedType {
    pub fn new(name: impl Into<String>) -> Self {
        NamedType { name: name.into() }
    }
}

/// A member of a union.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeSpec {
    Boundary(BoundaryType),
    Enum(EnumType),
    Named(NamedType),
}

impl TypeSpec {
    pub fn kind_name(&self) -> &'static str {
        match self {
            TypeSpec::Boundary(_) => "BoundaryType",
            TypeSpec::Enum(_) => "EnumType",
            TypeSpec::Named(_) => "NamedType",
        }
    }

    /// Boundary and enum specs constrain values; named types do not.
    pub fn is_value_constraint(&self) -> bool {
        matches!(self, TypeSpec::Boundary(_) | TypeSpec::Enum(_))
    }
}

/// An ordered list of alternative type specs.
#[derive(Debug, Clone, PartialEq)]
pub struct UnionType {
    pub types: Vec<TypeSpec>,
}

// ── Annotations ─────────────────────────────────────────────────────

/// The constraint an annotation carries, one variant per `kind`.
#[derive(Debug, Clone, PartialEq)]
pub enum AnnotationPayload {
    Boundary(BoundaryType),
    Union(UnionType),
    Enum(EnumType),
    Named(NamedType),
    /// The element is intentionally excluded.
    Remove,
}

impl AnnotationPayload {
    /// The `kind` tag used in interchange JSON.
    pub fn kind_name(&self) -> &'static str {
        match self {
            AnnotationPayload::Boundary(_) => "BoundaryType",
            AnnotationPayload::Union(_) => "UnionType",
            AnnotationPayload::Enum(_) => "EnumType",
            AnnotationPayload::Named(_) => "NamedType",
            AnnotationPayload::Remove => "Remove",
        }
    }
}

/// One constraint attached to exactly one element.
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    pub target_id: String,
    pub payload: AnnotationPayload,
    /// Provenance block (`type`, `description`), carried through untouched.
    pub docstring: Option<Value>,
    /// Every other record field (authors, reviewers, comments...), opaque.
    pub metadata: BTreeMap<String, Value>,
}

impl Annotation {
    pub fn new(target_id: impl Into<String>, payload: AnnotationPayload) -> Self {
        Annotation {
            target_id: target_id.into(),
            payload,
            docstring: None,
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_docstring(mut self, docstring: Value) -> Self {
        self.docstring = Some(docstring);
        self
    }

    /// Copy of this annotation attached to a different element.
    pub fn retargeted(&self, target_id: &str) -> Annotation {
        Annotation {
            target_id: target_id.to_string(),
            ..self.clone()
        }
    }
}
