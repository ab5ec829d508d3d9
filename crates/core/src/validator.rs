//! Annotation soundness checks against a target element.

use serde::{Serialize, Serializer};
use std::fmt;

use apishift_interchange::{
    Annotation, AnnotationPayload, ApiElement, BoundaryType, ElementKind, EnumType, TypeSpec,
    UnionType,
};

/// Why an annotation cannot be attached to an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectionReason {
    /// A value constraint on something that is not a parameter.
    KindMismatch,
    MinExceedsMax,
    /// The bounds admit no value of the base type.
    EmptyInterval,
    NonNumericBaseType(String),
    UnionTooSmall,
    EmptyEnum,
    UnionMember {
        index: usize,
        reason: Box<RejectionReason>,
    },
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectionReason::KindMismatch => write!(f, "kind-mismatch"),
            RejectionReason::MinExceedsMax => write!(f, "min-exceeds-max"),
            RejectionReason::EmptyInterval => write!(f, "empty-interval"),
            RejectionReason::NonNumericBaseType(base) => {
                write!(f, "non-numeric-base-type ({})", base)
            }
            RejectionReason::UnionTooSmall => write!(f, "union-too-small"),
            RejectionReason::EmptyEnum => write!(f, "empty-enum"),
            RejectionReason::UnionMember { index, reason } => {
                write!(f, "union-member[{}]: {}", index, reason)
            }
        }
    }
}

impl Serialize for RejectionReason {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

pub type ValidationResult = Result<(), RejectionReason>;

/// Check `annotation` is internally consistent and may sit on `target`.
/// Payload checks run first, so a malformed boundary on a function reports
/// the boundary problem.
pub fn validate(annotation: &Annotation, target: &ApiElement) -> ValidationResult {
    validate_payload(&annotation.payload)?;
    check_target(&annotation.payload, target.kind)
}

/// Target-independent checks.
pub fn validate_payload(payload: &AnnotationPayload) -> ValidationResult {
    match payload {
        AnnotationPayload::Boundary(b) => validate_boundary(b),
        AnnotationPayload::Enum(e) => validate_enum(e),
        AnnotationPayload::Union(u) => validate_union(u),
        AnnotationPayload::Named(_) | AnnotationPayload::Remove => Ok(()),
    }
}

fn check_target(payload: &AnnotationPayload, kind: ElementKind) -> ValidationResult {
    let constrains_values = match payload {
        AnnotationPayload::Boundary(_) | AnnotationPayload::Enum(_) => true,
        AnnotationPayload::Union(u) => u.types.iter().any(TypeSpec::is_value_constraint),
        AnnotationPayload::Named(_) | AnnotationPayload::Remove => false,
    };
    if constrains_values && kind != ElementKind::Parameter {
        return Err(RejectionReason::KindMismatch);
    }
    Ok(())
}

fn validate_spec(spec: &TypeSpec) -> ValidationResult {
    match spec {
        TypeSpec::Boundary(b) => validate_boundary(b),
        TypeSpec::Enum(e) => validate_enum(e),
        TypeSpec::Named(_) => Ok(()),
    }
}

fn validate_union(union: &UnionType) -> ValidationResult {
    if union.types.len() < 2 {
        return Err(RejectionReason::UnionTooSmall);
    }
    for (index, spec) in union.types.iter().enumerate() {
        validate_spec(spec).map_err(|reason| RejectionReason::UnionMember {
            index,
            reason: Box::new(reason),
        })?;
    }
    Ok(())
}

fn validate_enum(e: &EnumType) -> ValidationResult {
    if e.values.is_empty() {
        return Err(RejectionReason::EmptyEnum);
    }
    Ok(())
}

fn validate_boundary(b: &BoundaryType) -> ValidationResult {
    let integral = match b.base_type.as_str() {
        "int" => true,
        "float" => false,
        other => return Err(RejectionReason::NonNumericBaseType(other.to_string())),
    };

    // An unbounded end can never make the interval empty.
    let (Some(min), Some(max)) = (b.min, b.max) else {
        return Ok(());
    };
    if min > max {
        return Err(RejectionReason::MinExceedsMax);
    }

    if integral {
        let lo = if b.min_inclusive {
            min.ceil()
        } else {
            min.floor() + 1.0
        };
        let hi = if b.max_inclusive {
            max.floor()
        } else {
            max.ceil() - 1.0
        };
        if lo > hi {
            return Err(RejectionReason::EmptyInterval);
        }
    } else if min == max && !(b.min_inclusive && b.max_inclusive) {
        return Err(RejectionReason::EmptyInterval);
    }
    Ok(())
}
