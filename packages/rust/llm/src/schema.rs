//! JSON schemas for structured completions, and response cleanup.

use schemars::{JsonSchema, schema_for};
use serde_json::{Map, Value};

/// A named JSON schema in the shape strict structured-output endpoints accept:
/// no `$schema`, every `$ref` inlined, `additionalProperties: false` and every
/// property required on each object, no numeric `format` hints.
#[derive(Debug, Clone, PartialEq)]
pub struct StructuredSchema {
    name: String,
    schema: Value,
}

impl StructuredSchema {
    /// Derive the schema for `T` with `schemars` and normalize it.
    pub fn for_type<T: JsonSchema>(name: impl Into<String>) -> Self {
        let mut schema = serde_json::to_value(schema_for!(T)).unwrap_or(Value::Null);

        let definitions = match &mut schema {
            Value::Object(root) => {
                root.remove("$schema");
                root.remove("definitions")
            }
            _ => None,
        };
        if let Some(Value::Object(definitions)) = definitions {
            inline_refs(&mut schema, &definitions);
        }
        tighten_objects(&mut schema);

        Self {
            name: name.into(),
            schema,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &Value {
        &self.schema
    }
}

/// Replace `{"$ref": "#/definitions/X"}` nodes with the definition of `X`.
fn inline_refs(value: &mut Value, definitions: &Map<String, Value>) {
    match value {
        Value::Object(map) => {
            let target = map
                .get("$ref")
                .and_then(Value::as_str)
                .and_then(|r| r.strip_prefix("#/definitions/"))
                .and_then(|name| definitions.get(name))
                .cloned();
            if let Some(mut inlined) = target {
                inline_refs(&mut inlined, definitions);
                *value = inlined;
                return;
            }
            for child in map.values_mut() {
                inline_refs(child, definitions);
            }
        }
        Value::Array(items) => items.iter_mut().for_each(|item| inline_refs(item, definitions)),
        _ => {}
    }
}

fn tighten_objects(value: &mut Value) {
    match value {
        Value::Object(map) => {
            if map.get("type").and_then(Value::as_str) == Some("object") {
                map.insert("additionalProperties".into(), Value::Bool(false));
                let required: Option<Vec<Value>> = map
                    .get("properties")
                    .and_then(Value::as_object)
                    .map(|props| props.keys().cloned().map(Value::String).collect());
                if let Some(required) = required {
                    map.insert("required".into(), Value::Array(required));
                }
            }
            if matches!(map.get("type").and_then(Value::as_str), Some("number" | "integer")) {
                map.remove("format");
            }
            for child in map.values_mut() {
                tighten_objects(child);
            }
        }
        Value::Array(items) => items.iter_mut().for_each(tighten_objects),
        _ => {}
    }
}

/// Strip a surrounding Markdown code fence (```` ```json ```` or ```` ``` ````).
/// Text without a fence is returned trimmed.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (`json`, `JSON`, ...) up to the first newline.
    let rest = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest.trim_start_matches(|c: char| c.is_ascii_alphabetic()),
    };
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
