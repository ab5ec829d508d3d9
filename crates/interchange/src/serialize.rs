//! Serialization back to interchange JSON.
//!
//! The writers emit exactly the shape [`crate::deserialize`] reads (camelCase
//! field names, sentinel strings for unbounded interval ends), so a written
//! document parses back into an equal value.

use serde_json::{json, Map, Value};

use crate::deserialize::{INFINITY, NEGATIVE_INFINITY};
use crate::model::ApiModel;
use crate::store::AnnotationStore;
use crate::types::*;

/// Serialize a store to `{"version": ..., "annotations": {target: [records]}}`.
pub fn annotation_store_to_json(store: &AnnotationStore) -> Value {
    let mut annotations = Map::new();
    for (target, list) in store.iter() {
        annotations.insert(
            target.to_string(),
            Value::Array(list.iter().map(annotation_to_json).collect()),
        );
    }

    let mut root = Map::new();
    if let Some(version) = store.version() {
        root.insert("version".to_string(), json!(version));
    }
    root.insert("annotations".to_string(), Value::Object(annotations));
    Value::Object(root)
}

/// Serialize one annotation record. The target is implied by the store key.
pub fn annotation_to_json(annotation: &Annotation) -> Value {
    let mut record: Map<String, Value> = annotation
        .metadata
        .iter()
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    record.insert("kind".to_string(), json!(annotation.payload.kind_name()));
    match &annotation.payload {
        AnnotationPayload::Boundary(b) => write_boundary(&mut record, b),
        AnnotationPayload::Enum(e) => write_enum(&mut record, e),
        AnnotationPayload::Named(n) => {
            record.insert("name".to_string(), json!(n.name));
        }
        AnnotationPayload::Union(u) => {
            record.insert(
                "types".to_string(),
                Value::Array(u.types.iter().map(type_spec_to_json).collect()),
            );
        }
        AnnotationPayload::Remove => {}
    }
    if let Some(docstring) = &annotation.docstring {
        record.insert("docstring".to_string(), docstring.clone());
    }
    Value::Object(record)
}

pub fn type_spec_to_json(spec: &TypeSpec) -> Value {
    let mut record = Map::new();
    record.insert("kind".to_string(), json!(spec.kind_name()));
    match spec {
        TypeSpec::Boundary(b) => write_boundary(&mut record, b),
        TypeSpec::Enum(e) => write_enum(&mut record, e),
        TypeSpec::Named(n) => {
            record.insert("name".to_string(), json!(n.name));
        }
    }
    Value::Object(record)
}

/// Serialize a snapshot back into the nested module/class/function form.
/// Siblings are written in ordinal order.
pub fn api_model_to_json(model: &ApiModel) -> Value {
    let modules: Vec<Value> = model
        .ids_of_kind(ElementKind::Module)
        .iter()
        .filter_map(|id| model.get(id))
        .map(|module| {
            let mut obj = element_fields(module);
            obj.insert(
                "classes".to_string(),
                Value::Array(
                    sorted_children(model, &module.id, ElementKind::Class)
                        .into_iter()
                        .map(|class| {
                            let mut class_obj = element_fields(class);
                            class_obj.insert(
                                "functions".to_string(),
                                functions_json(model, &class.id),
                            );
                            Value::Object(class_obj)
                        })
                        .collect(),
                ),
            );
            obj.insert("functions".to_string(), functions_json(model, &module.id));
            Value::Object(obj)
        })
        .collect();

    let mut root = Map::new();
    if let Some(package) = model.package() {
        root.insert("package".to_string(), json!(package));
    }
    root.insert("version".to_string(), json!(model.version()));
    root.insert("modules".to_string(), Value::Array(modules));
    Value::Object(root)
}

// ── Helpers ─────────────────────────────────────────────────────────

fn write_boundary(record: &mut Map<String, Value>, b: &BoundaryType) {
    record.insert("baseType".to_string(), json!(b.base_type));
    record.insert(
        "min".to_string(),
        b.min.map(number_json).unwrap_or_else(|| json!(NEGATIVE_INFINITY)),
    );
    record.insert(
        "max".to_string(),
        b.max.map(number_json).unwrap_or_else(|| json!(INFINITY)),
    );
    record.insert("minInclusive".to_string(), json!(b.min_inclusive));
    record.insert("maxInclusive".to_string(), json!(b.max_inclusive));
}

fn write_enum(record: &mut Map<String, Value>, e: &EnumType) {
    record.insert(
        "values".to_string(),
        Value::Array(e.values.iter().map(|v| json!(v)).collect()),
    );
}

/// Integral values are written without a fractional part.
fn number_json(value: f64) -> Value {
    const EXACT_INT_LIMIT: f64 = 9_007_199_254_740_992.0;
    if value.fract() == 0.0 && value.abs() < EXACT_INT_LIMIT {
        json!(value as i64)
    } else {
        json!(value)
    }
}

fn element_fields(element: &ApiElement) -> Map<String, Value> {
    let mut obj = Map::new();
    obj.insert("id".to_string(), json!(element.id));
    obj.insert("name".to_string(), json!(element.name));
    if let Some(declared_type) = &element.declared_type {
        obj.insert("type".to_string(), json!(declared_type));
    }
    if let Some(default_value) = &element.default_value {
        obj.insert("default".to_string(), json!(default_value));
    }
    obj
}

fn sorted_children<'a>(model: &'a ApiModel, parent: &str, kind: ElementKind) -> Vec<&'a ApiElement> {
    let mut children: Vec<&ApiElement> = model.children_of_kind(parent, kind).collect();
    children.sort_by(|a, b| {
        a.ordinal_position
            .cmp(&b.ordinal_position)
            .then_with(|| a.id.cmp(&b.id))
    });
    children
}

fn functions_json(model: &ApiModel, parent: &str) -> Value {
    Value::Array(
        sorted_children(model, parent, ElementKind::Function)
            .into_iter()
            .map(|function| {
                let mut obj = element_fields(function);
                obj.insert(
                    "parameters".to_string(),
                    Value::Array(
                        sorted_children(model, &function.id, ElementKind::Parameter)
                            .into_iter()
                            .map(|p| Value::Object(element_fields(p)))
                            .collect(),
                    ),
                );
                Value::Object(obj)
            })
            .collect(),
    )
}
