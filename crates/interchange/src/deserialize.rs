//! Deserialization from interchange JSON into typed structs.
//!
//! Two entry points: [`api_model_from_json`] flattens a nested API snapshot
//! into an [`ApiModel`], and [`annotation_store_from_json`] dispatches every
//! annotation record on its `kind` tag. Both reject structurally broken input
//! with an [`InputFormatError`]; payload *values* (an empty enum, `min > max`)
//! are left for the validator to judge.

use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};

use crate::error::InputFormatError;
use crate::model::ApiModel;
use crate::store::AnnotationStore;
use crate::types::*;

/// Sentinels older stores use for unbounded interval ends.
pub const NEGATIVE_INFINITY: &str = "NegativeInfinity";
pub const INFINITY: &str = "Infinity";

/// Deserialize a nested API snapshot into an [`ApiModel`].
pub fn api_model_from_json(snapshot: &Value) -> Result<ApiModel, InputFormatError> {
    let root = as_object(snapshot, "api snapshot")?;
    let version = required_str(root, "version", "api snapshot")?;
    let package = optional_str(root, "package", "api snapshot")?;

    let mut elements = Vec::new();
    for (position, module) in required_array(root, "modules", "api snapshot")?
        .iter()
        .enumerate()
    {
        parse_module(module, position, &mut elements)?;
    }

    let model = ApiModel::from_elements(version, elements)?;
    Ok(match package {
        Some(package) => model.with_package(package),
        None => model,
    })
}

/// Deserialize an annotation store.
///
/// Targets listed with an empty array are dropped: they carry nothing to
/// migrate.
pub fn annotation_store_from_json(document: &Value) -> Result<AnnotationStore, InputFormatError> {
    let root = as_object(document, "annotation store")?;
    let mut store = AnnotationStore::new();
    store.set_version(optional_str(root, "version", "annotation store")?);

    let annotations = root
        .get("annotations")
        .ok_or_else(|| InputFormatError::MissingField {
            context: "annotation store".to_string(),
            field: "annotations".to_string(),
        })?
        .as_object()
        .ok_or_else(|| InputFormatError::WrongType {
            context: "annotation store".to_string(),
            field: "annotations".to_string(),
            expected: "an object keyed by target identifier",
        })?;

    for (target, records) in annotations {
        let records = records
            .as_array()
            .ok_or_else(|| InputFormatError::WrongType {
                context: format!("annotations for '{}'", target),
                field: target.clone(),
                expected: "an array of annotation records",
            })?;
        for (index, record) in records.iter().enumerate() {
            let context = format!("annotation '{}'[{}]", target, index);
            store.push(parse_annotation(target, record, &context)?);
        }
    }

    Ok(store)
}

// ── API snapshot ────────────────────────────────────────────────────

fn parse_module(
    value: &Value,
    position: usize,
    out: &mut Vec<ApiElement>,
) -> Result<(), InputFormatError> {
    let obj = as_object(value, &format!("module #{}", position))?;
    let element = parse_element(obj, ElementKind::Module, None, position)?;
    let context = format!("module '{}'", element.id);
    let id = element.id.clone();
    out.push(element);

    for (index, class) in optional_array(obj, "classes", &context)?.iter().enumerate() {
        parse_class(class, &id, index, out)?;
    }
    for (index, function) in optional_array(obj, "functions", &context)?.iter().enumerate() {
        parse_function(function, &id, index, out)?;
    }
    Ok(())
}

fn parse_class(
    value: &Value,
    parent: &str,
    position: usize,
    out: &mut Vec<ApiElement>,
) -> Result<(), InputFormatError> {
    let obj = as_object(value, &format!("class #{} of '{}'", position, parent))?;
    let element = parse_element(obj, ElementKind::Class, Some(parent), position)?;
    let context = format!("class '{}'", element.id);
    let id = element.id.clone();
    out.push(element);

    for (index, function) in optional_array(obj, "functions", &context)?.iter().enumerate() {
        parse_function(function, &id, index, out)?;
    }
    Ok(())
}

fn parse_function(
    value: &Value,
    parent: &str,
    position: usize,
    out: &mut Vec<ApiElement>,
) -> Result<(), InputFormatError> {
    let obj = as_object(value, &format!("function #{} of '{}'", position, parent))?;
    let element = parse_element(obj, ElementKind::Function, Some(parent), position)?;
    let context = format!("function '{}'", element.id);
    let id = element.id.clone();
    out.push(element);

    for (index, parameter) in optional_array(obj, "parameters", &context)?.iter().enumerate() {
        let obj = as_object(parameter, &format!("parameter #{} of '{}'", index, id))?;
        out.push(parse_element(obj, ElementKind::Parameter, Some(&id), index)?);
    }
    Ok(())
}

fn parse_element(
    obj: &Map<String, Value>,
    kind: ElementKind,
    parent: Option<&str>,
    position: usize,
) -> Result<ApiElement, InputFormatError> {
    let placeholder = format!("{} #{}", kind.as_str().to_lowercase(), position);
    let id = required_str(obj, "id", &placeholder)?;
    let context = format!("{} '{}'", kind.as_str().to_lowercase(), id);

    let mut element = ApiElement::new(id, kind, parent.map(str::to_string), position);
    if let Some(name) = optional_str(obj, "name", &context)? {
        element.name = name;
    }
    element.declared_type = optional_str(obj, "type", &context)?;
    element.default_value = match obj.get("default") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => Some(other.to_string()),
    };
    Ok(element)
}

// ── Annotations ─────────────────────────────────────────────────────

const COMMON_FIELDS: &[&str] = &["kind", "target", "docstring"];
const BOUNDARY_FIELDS: &[&str] = &[
    "baseType",
    "base_type",
    "min",
    "max",
    "minInclusive",
    "min_inclusive",
    "maxInclusive",
    "max_inclusive",
];
const ENUM_FIELDS: &[&str] = &["values"];
const NAMED_FIELDS: &[&str] = &["name"];
const UNION_FIELDS: &[&str] = &["types"];
const NO_FIELDS: &[&str] = &[];

fn parse_annotation(
    target: &str,
    record: &Value,
    context: &str,
) -> Result<Annotation, InputFormatError> {
    let obj = as_object(record, context)?;

    if let Some(explicit) = optional_str(obj, "target", context)? {
        if explicit != target {
            return Err(InputFormatError::TargetMismatch {
                key: target.to_string(),
                target: explicit,
            });
        }
    }

    let kind = required_str(obj, "kind", context)?;
    let (payload, payload_fields): (AnnotationPayload, &[&str]) = match kind.as_str() {
        "BoundaryType" => (
            AnnotationPayload::Boundary(parse_boundary(obj, context)?),
            BOUNDARY_FIELDS,
        ),
        "EnumType" => (AnnotationPayload::Enum(parse_enum(obj, context)?), ENUM_FIELDS),
        "NamedType" => (
            AnnotationPayload::Named(NamedType::new(required_str(obj, "name", context)?)),
            NAMED_FIELDS,
        ),
        "UnionType" => (AnnotationPayload::Union(parse_union(obj, context)?), UNION_FIELDS),
        "Remove" => (AnnotationPayload::Remove, NO_FIELDS),
        other => {
            return Err(InputFormatError::UnknownKind {
                context: context.to_string(),
                kind: other.to_string(),
            })
        }
    };

    let docstring = match obj.get("docstring") {
        None | Some(Value::Null) => None,
        Some(block) => Some(block.clone()),
    };

    let metadata: BTreeMap<String, Value> = obj
        .iter()
        .filter(|(key, _)| {
            !COMMON_FIELDS.contains(&key.as_str()) && !payload_fields.contains(&key.as_str())
        })
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    Ok(Annotation {
        target_id: target.to_string(),
        payload,
        docstring,
        metadata,
    })
}

fn parse_type_spec(value: &Value, context: &str) -> Result<TypeSpec, InputFormatError> {
    let obj = as_object(value, context)?;
    let kind = required_str(obj, "kind", context)?;
    match kind.as_str() {
        "BoundaryType" => Ok(TypeSpec::Boundary(parse_boundary(obj, context)?)),
        "EnumType" => Ok(TypeSpec::Enum(parse_enum(obj, context)?)),
        "NamedType" => Ok(TypeSpec::Named(NamedType::new(required_str(
            obj, "name", context,
        )?))),
        "UnionType" => Err(InputFormatError::NestedUnion {
            context: context.to_string(),
        }),
        other => Err(InputFormatError::UnknownKind {
            context: context.to_string(),
            kind: other.to_string(),
        }),
    }
}

fn parse_boundary(obj: &Map<String, Value>, context: &str) -> Result<BoundaryType, InputFormatError> {
    let base_type = match first_present(obj, &["baseType", "base_type"]) {
        Some((_, Value::String(s))) => s.clone(),
        Some((field, _)) => {
            return Err(InputFormatError::WrongType {
                context: context.to_string(),
                field: field.to_string(),
                expected: "a string",
            })
        }
        None => {
            return Err(InputFormatError::MissingField {
                context: context.to_string(),
                field: "baseType".to_string(),
            })
        }
    };

    Ok(BoundaryType {
        base_type,
        min: parse_bound(obj, "min", NEGATIVE_INFINITY, context)?,
        max: parse_bound(obj, "max", INFINITY, context)?,
        min_inclusive: parse_flag(obj, &["minInclusive", "min_inclusive"], context)?,
        max_inclusive: parse_flag(obj, &["maxInclusive", "max_inclusive"], context)?,
    })
}

fn parse_bound(
    obj: &Map<String, Value>,
    field: &str,
    unbounded: &str,
    context: &str,
) -> Result<Option<f64>, InputFormatError> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s == unbounded => Ok(None),
        Some(Value::Number(n)) => Ok(n.as_f64()),
        Some(_) => Err(InputFormatError::WrongType {
            context: context.to_string(),
            field: field.to_string(),
            expected: if unbounded == INFINITY {
                "a number, null, or \"Infinity\""
            } else {
                "a number, null, or \"NegativeInfinity\""
            },
        }),
    }
}

fn parse_flag(
    obj: &Map<String, Value>,
    aliases: &[&str],
    context: &str,
) -> Result<bool, InputFormatError> {
    match first_present(obj, aliases) {
        None | Some((_, Value::Null)) => Ok(true),
        Some((_, Value::Bool(b))) => Ok(*b),
        Some((field, _)) => Err(InputFormatError::WrongType {
            context: context.to_string(),
            field: field.to_string(),
            expected: "a boolean",
        }),
    }
}

fn parse_enum(obj: &Map<String, Value>, context: &str) -> Result<EnumType, InputFormatError> {
    let values = required_array(obj, "values", context)?
        .iter()
        .map(|v| {
            v.as_str()
                .map(str::to_string)
                .ok_or_else(|| InputFormatError::WrongType {
                    context: context.to_string(),
                    field: "values".to_string(),
                    expected: "an array of strings",
                })
        })
        .collect::<Result<BTreeSet<String>, _>>()?;
    Ok(EnumType { values })
}

fn parse_union(obj: &Map<String, Value>, context: &str) -> Result<UnionType, InputFormatError> {
    let types = required_array(obj, "types", context)?
        .iter()
        .enumerate()
        .map(|(index, member)| parse_type_spec(member, &format!("{} member {}", context, index)))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(UnionType { types })
}

// ── Parsing helpers ─────────────────────────────────────────────────

fn as_object<'a>(value: &'a Value, context: &str) -> Result<&'a Map<String, Value>, InputFormatError> {
    value.as_object().ok_or_else(|| InputFormatError::WrongType {
        context: context.to_string(),
        field: "(record)".to_string(),
        expected: "an object",
    })
}

fn required_str(
    obj: &Map<String, Value>,
    field: &str,
    context: &str,
) -> Result<String, InputFormatError> {
    optional_str(obj, field, context)?.ok_or_else(|| InputFormatError::MissingField {
        context: context.to_string(),
        field: field.to_string(),
    })
}

fn optional_str(
    obj: &Map<String, Value>,
    field: &str,
    context: &str,
) -> Result<Option<String>, InputFormatError> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(InputFormatError::WrongType {
            context: context.to_string(),
            field: field.to_string(),
            expected: "a string",
        }),
    }
}

fn required_array<'a>(
    obj: &'a Map<String, Value>,
    field: &str,
    context: &str,
) -> Result<&'a [Value], InputFormatError> {
    match obj.get(field) {
        None | Some(Value::Null) => Err(InputFormatError::MissingField {
            context: context.to_string(),
            field: field.to_string(),
        }),
        Some(_) => optional_array(obj, field, context),
    }
}

fn optional_array<'a>(
    obj: &'a Map<String, Value>,
    field: &str,
    context: &str,
) -> Result<&'a [Value], InputFormatError> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(&[]),
        Some(Value::Array(items)) => Ok(items.as_slice()),
        Some(_) => Err(InputFormatError::WrongType {
            context: context.to_string(),
            field: field.to_string(),
            expected: "an array",
        }),
    }
}

fn first_present<'a, 'f>(
    obj: &'a Map<String, Value>,
    aliases: &[&'f str],
) -> Option<(&'f str, &'a Value)> {
    aliases
        .iter()
        .find_map(|field| obj.get(*field).map(|value| (*field, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn make_snapshot(modules: Vec<Value>) -> Value {
        json!({
            "package": "pkg",
            "version": "1.0.0",
            "modules": modules
        })
    }

    fn make_store(annotations: Value) -> Value {
        json!({ "version": "1.0.0", "annotations": annotations })
    }

    #[test]
    fn test_parse_nested_snapshot() {
        let snapshot = make_snapshot(vec![json!({
            "id": "pkg",
            "classes": [{
                "id": "pkg.A",
                "functions": [{ "id": "pkg.A.run", "parameters": [{ "id": "pkg.A.run.self" }] }]
            }],
            "functions": [{
                "id": "pkg.foo",
                "name": "foo",
                "parameters": [
                    { "id": "pkg.foo.a", "type": "int", "default": 0 },
                    { "id": "pkg.foo.b", "default": "'x'" }
                ]
            }]
        })]);

        let model = api_model_from_json(&snapshot).unwrap();
        assert_eq!(model.version(), "1.0.0");
        assert_eq!(model.package(), Some("pkg"));
        assert_eq!(model.len(), 7);

        let b = model.get("pkg.foo.b").unwrap();
        assert_eq!(b.kind, ElementKind::Parameter);
        assert_eq!(b.ordinal_position, 1);
        assert_eq!(b.parent_id.as_deref(), Some("pkg.foo"));
        assert_eq!(b.default_value.as_deref(), Some("'x'"));

        let a = model.get("pkg.foo.a").unwrap();
        assert_eq!(a.declared_type.as_deref(), Some("int"));
        assert_eq!(a.default_value.as_deref(), Some("0"));

        let run = model.get("pkg.A.run").unwrap();
        assert_eq!(run.parent_id.as_deref(), Some("pkg.A"));
        assert_eq!(run.name, "run");
    }

    #[test]
    fn test_missing_modules_array() {
        let result = api_model_from_json(&json!({"version": "1"}));
        match result.unwrap_err() {
            InputFormatError::MissingField { field, .. } => assert_eq!(field, "modules"),
            other => panic!("expected MissingField, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_element_id() {
        let snapshot = make_snapshot(vec![json!({"id": "pkg", "functions": [{"name": "foo"}]})]);
        match api_model_from_json(&snapshot).unwrap_err() {
            InputFormatError::MissingField { field, context } => {
                assert_eq!(field, "id");
                assert!(context.contains("function #0"));
            }
            other => panic!("expected MissingField, got {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_identifier_in_snapshot() {
        let snapshot = make_snapshot(vec![json!({
            "id": "pkg",
            "functions": [{"id": "pkg.foo"}, {"id": "pkg.foo"}]
        })]);
        assert_eq!(
            api_model_from_json(&snapshot).unwrap_err(),
            InputFormatError::DuplicateId { id: "pkg.foo".into() }
        );
    }

    #[test]
    fn test_parse_boundary_with_sentinels_and_aliases() {
        let store = annotation_store_from_json(&make_store(json!({
            "pkg.foo.a": [{
                "kind": "BoundaryType",
                "base_type": "float",
                "min": "NegativeInfinity",
                "max": 1.5,
                "min_inclusive": false,
                "docstring": {"type": "float", "description": "a weight"},
                "authors": ["$autogen$"]
            }]
        })))
        .unwrap();

        let annotation = &store.get("pkg.foo.a")[0];
        match &annotation.payload {
            AnnotationPayload::Boundary(b) => {
                assert_eq!(b.base_type, "float");
                assert_eq!(b.min, None);
                assert_eq!(b.max, Some(1.5));
                assert!(!b.min_inclusive);
                assert!(b.max_inclusive);
            }
            other => panic!("expected boundary, got {:?}", other),
        }
        assert!(annotation.docstring.is_some());
        assert_eq!(annotation.metadata.get("authors"), Some(&json!(["$autogen$"])));
        assert!(!annotation.metadata.contains_key("base_type"));
    }

    #[test]
    fn test_parse_union_and_enum() {
        let store = annotation_store_from_json(&make_store(json!({
            "pkg.foo.b": [
                {"kind": "EnumType", "values": ["b", "a", "a"]},
                {"kind": "UnionType", "types": [
                    {"kind": "NamedType", "name": "str"},
                    {"kind": "BoundaryType", "baseType": "int", "min": 0, "max": 9}
                ]}
            ]
        })))
        .unwrap();

        let list = store.get("pkg.foo.b");
        assert_eq!(list.len(), 2);
        match &list[0].payload {
            AnnotationPayload::Enum(e) => {
                assert_eq!(e.values.iter().collect::<Vec<_>>(), vec!["a", "b"]);
            }
            other => panic!("expected enum, got {:?}", other),
        }
        match &list[1].payload {
            AnnotationPayload::Union(u) => {
                assert_eq!(u.types.len(), 2);
                assert_eq!(u.types[1].kind_name(), "BoundaryType");
            }
            other => panic!("expected union, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_enum_is_accepted_for_later_validation() {
        let store = annotation_store_from_json(&make_store(json!({
            "pkg.foo.b": [{"kind": "EnumType", "values": []}]
        })))
        .unwrap();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_unknown_kind() {
        let result = annotation_store_from_json(&make_store(json!({
            "pkg.foo": [{"kind": "PureAnnotation"}]
        })));
        match result.unwrap_err() {
            InputFormatError::UnknownKind { kind, .. } => assert_eq!(kind, "PureAnnotation"),
            other => panic!("expected UnknownKind, got {:?}", other),
        }
    }

    #[test]
    fn test_nested_union_is_rejected() {
        let result = annotation_store_from_json(&make_store(json!({
            "pkg.foo.a": [{"kind": "UnionType", "types": [
                {"kind": "UnionType", "types": []},
                {"kind": "NamedType", "name": "int"}
            ]}]
        })));
        assert!(matches!(
            result.unwrap_err(),
            InputFormatError::NestedUnion { .. }
        ));
    }

    #[test]
    fn test_target_mismatch() {
        let result = annotation_store_from_json(&make_store(json!({
            "pkg.foo.a": [{"kind": "Remove", "target": "pkg.foo.b"}]
        })));
        assert_eq!(
            result.unwrap_err(),
            InputFormatError::TargetMismatch {
                key: "pkg.foo.a".into(),
                target: "pkg.foo.b".into()
            }
        );
    }

    #[test]
    fn test_wrong_bound_type() {
        let result = annotation_store_from_json(&make_store(json!({
            "pkg.foo.a": [{"kind": "BoundaryType", "baseType": "int", "min": "zero"}]
        })));
        match result.unwrap_err() {
            InputFormatError::WrongType { field, .. } => assert_eq!(field, "min"),
            other => panic!("expected WrongType, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_target_list_is_dropped() {
        let store = annotation_store_from_json(&make_store(json!({"pkg.foo": []}))).unwrap();
        assert!(store.is_empty());
    }
}
