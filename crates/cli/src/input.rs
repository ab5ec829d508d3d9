//! Loading and validating the CLI's input files.
//!
//! Every JSON input is checked against its embedded JSON Schema before it is
//! parsed into typed values, so a malformed file is refused with the schema's
//! own error messages and nothing downstream ever sees it.

use std::fs;
use std::path::Path;

use serde_json::Value;

use apishift_core::MatchConfig;
use apishift_interchange::{
    annotation_store_from_json, api_model_from_json, AnnotationStore, ApiModel,
};

static API_SCHEMA_STR: &str = include_str!("../../../docs/api-schema.json");
static ANNOTATION_SCHEMA_STR: &str = include_str!("../../../docs/annotation-schema.json");

/// Which embedded schema a document is checked against.
#[derive(Debug, Clone, Copy)]
enum Schema {
    Api,
    Annotations,
}

impl Schema {
    fn source(self) -> &'static str {
        match self {
            Schema::Api => API_SCHEMA_STR,
            Schema::Annotations => ANNOTATION_SCHEMA_STR,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Schema::Api => "API snapshot",
            Schema::Annotations => "annotation store",
        }
    }
}

pub(crate) fn load_api_model(path: &Path) -> Result<ApiModel, String> {
    let doc = load_validated(path, Schema::Api)?;
    api_model_from_json(&doc).map_err(|e| format!("invalid API snapshot '{}': {}", path.display(), e))
}

pub(crate) fn load_annotation_store(path: &Path) -> Result<AnnotationStore, String> {
    let doc = load_validated(path, Schema::Annotations)?;
    annotation_store_from_json(&doc)
        .map_err(|e| format!("invalid annotation store '{}': {}", path.display(), e))
}

/// Read `--config`, or fall back to the defaults. The result is validated.
pub(crate) fn load_config(path: Option<&Path>) -> Result<MatchConfig, String> {
    let config = match path {
        None => MatchConfig::default(),
        Some(path) => {
            let content = fs::read_to_string(path)
                .map_err(|e| format!("could not read config '{}': {}", path.display(), e))?;
            parse_config(&content)
                .map_err(|e| format!("invalid config '{}': {}", path.display(), e))?
        }
    };
    config
        .validate()
        .map_err(|e| format!("invalid matcher configuration: {}", e))?;
    Ok(config)
}

fn parse_config(content: &str) -> Result<MatchConfig, String> {
    toml::from_str(content).map_err(|e| e.to_string())
}

fn read_json(path: &Path) -> Result<Value, String> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("error reading '{}': {}", path.display(), e))?;
    serde_json::from_str(&content)
        .map_err(|e| format!("error parsing JSON in '{}': {}", path.display(), e))
}

fn load_validated(path: &Path, schema: Schema) -> Result<Value, String> {
    let doc = read_json(path)?;
    let errors = schema_errors(&doc, schema)?;
    if errors.is_empty() {
        Ok(doc)
    } else {
        Err(format!(
            "'{}' is not a valid {}: {}",
            path.display(),
            schema.label(),
            errors.join("; ")
        ))
    }
}

fn schema_errors(doc: &Value, schema: Schema) -> Result<Vec<String>, String> {
    let schema_json: Value = serde_json::from_str(schema.source())
        .map_err(|e| format!("internal error: failed to parse embedded schema: {}", e))?;
    let validator = jsonschema::validator_for(&schema_json)
        .map_err(|e| format!("internal error: failed to compile schema: {}", e))?;
    Ok(validator
        .iter_errors(doc)
        .map(|e| format!("{}", e))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn embedded_schemas_compile() {
        for schema in [Schema::Api, Schema::Annotations] {
            let errors = schema_errors(&json!({}), schema).unwrap();
            assert!(!errors.is_empty(), "{} accepted an empty object", schema.label());
        }
    }

    #[test]
    fn api_schema_accepts_nested_snapshot() {
        let doc = json!({
            "version": "1.0",
            "modules": [{
                "id": "pkg",
                "functions": [{"id": "pkg.foo", "parameters": [{"id": "pkg.foo.a", "default": 3}]}]
            }]
        });
        assert!(schema_errors(&doc, Schema::Api).unwrap().is_empty());
    }

    #[test]
    fn annotation_schema_rejects_unknown_kind() {
        let doc = json!({"annotations": {"pkg.foo.a": [{"kind": "Mystery"}]}});
        assert!(!schema_errors(&doc, Schema::Annotations).unwrap().is_empty());

        let ok = json!({"annotations": {"pkg.foo.a": [
            {"kind": "BoundaryType", "baseType": "int", "min": 0, "max": "Infinity"},
            {"kind": "UnionType", "types": [{"kind": "NamedType", "name": "str"}, {"kind": "EnumType", "values": ["a"]}]},
            {"kind": "Remove", "comment": "internal"}
        ]}});
        assert!(schema_errors(&ok, Schema::Annotations).unwrap().is_empty());
    }

    #[test]
    fn config_overrides_defaults() {
        let config = parse_config(
            r#"
exact_threshold = 0.9
workers = 4

[weights]
name = 0.5
"#,
        )
        .unwrap();
        assert_eq!(config.exact_threshold, 0.9);
        assert_eq!(config.workers, 4);
        assert_eq!(config.weights.name, 0.5);
        assert_eq!(config.weights.parent, 0.3);
        assert_eq!(config.ambiguous_threshold, 0.5);
    }

    #[test]
    fn config_rejects_unknown_keys() {
        assert!(parse_config("treshold = 0.9").is_err());
    }
}
