//! Structural errors raised while building an API snapshot or loading an
//! annotation store. Every variant is fatal for the run that produced it.

use crate::types::ElementKind;

/// A malformed or schema-violating input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InputFormatError {
    /// A required field is absent.
    #[error("{context}: missing required field '{field}'")]
    MissingField { context: String, field: String },

    /// A field is present but holds the wrong JSON type.
    #[error("{context}: field '{field}' must be {expected}")]
    WrongType {
        context: String,
        field: String,
        expected: &'static str,
    },

    /// A `kind` tag that is not part of the schema.
    #[error("{context}: unknown kind '{kind}'")]
    UnknownKind { context: String, kind: String },

    /// Two elements of one snapshot share an identifier.
    #[error("duplicate identifier '{id}'")]
    DuplicateId { id: String },

    /// An element names a parent that does not exist in the same snapshot.
    #[error("element '{id}' references missing parent '{parent}'")]
    DanglingParent { id: String, parent: String },

    /// An element hangs under a parent of the wrong kind (or under none).
    #[error("{kind} '{id}': {reason}")]
    InvalidParent {
        id: String,
        kind: ElementKind,
        reason: String,
    },

    /// An annotation record carries a `target` that disagrees with its key.
    #[error("annotation listed under '{key}' targets '{target}'")]
    TargetMismatch { key: String, target: String },

    /// A union member is itself a union.
    #[error("{context}: union members cannot be unions")]
    NestedUnion { context: String },
}
