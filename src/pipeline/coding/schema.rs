//! Structured-output schema normalization.
//!
//! Converts a generic `{"type": "json_schema", "json_schema": {...}}` request into
//! the strict wire shape the Responses API expects. Only the outermost object
//! is normalized; nested sub-schemas are sent as given.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::CodingError;

/// Marker value of the top-level `type` key.
pub const STRUCTURED_OUTPUT_TYPE: &str = "json_schema";

/// Name used when the request does not supply one.
const DEFAULT_SCHEMA_NAME: &str = "StructuredSchema";

/// Provider wire shape for a strict structured-output format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseFormat {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub schema: Value,
    pub strict: bool,
}

impl ResponseFormat {
    /// True when the schema body constrains nothing.
    pub fn is_empty(&self) -> bool {
        match &self.schema {
            Value::Object(map) => map.is_empty(),
            Value::Null => true,
            _ => false,
        }
    }
}

/// Normalize a structured-output request into a strict [`ResponseFormat`].
///
/// The schema section may be nested (`json_schema.schema`) or flattened next to
/// `json_schema.name`. An already-normalized format (`{type, name, schema, strict}`)
/// is accepted too and normalizes to itself.
pub fn normalize_response_format(format: &Value) -> Result<ResponseFormat, CodingError> {
    let top = format
        .as_object()
        .ok_or_else(|| CodingError::Schema("response format must be an object".into()))?;

    if top.get("type").and_then(Value::as_str) != Some(STRUCTURED_OUTPUT_TYPE) {
        return Err(CodingError::Schema(format!(
            "response format must have top-level 'type': '{STRUCTURED_OUTPUT_TYPE}'"
        )));
    }

    let section: Map<String, Value> = match top.get("json_schema") {
        Some(Value::Object(section)) => section.clone(),
        Some(Value::Null) => Map::new(),
        Some(_) => {
            return Err(CodingError::Schema("json_schema must be an object".into()));
        }
        None => top
            .iter()
            .filter(|(key, _)| key.as_str() != "type" && key.as_str() != "strict")
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect(),
    };

    let name = section
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or(DEFAULT_SCHEMA_NAME)
        .to_string();

    let mut body = match section.get("schema") {
        Some(Value::Object(schema)) => schema.clone(),
        Some(Value::Null) => Map::new(),
        Some(_) => {
            return Err(CodingError::Schema(
                "json_schema.schema must be an object when provided".into(),
            ));
        }
        None => section
            .iter()
            .filter(|(key, _)| key.as_str() != "name")
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect(),
    };

    normalize_object_schema(&mut body);

    Ok(ResponseFormat {
        kind: STRUCTURED_OUTPUT_TYPE.to_string(),
        name,
        schema: Value::Object(body),
        strict: true,
    })
}

/// Close an object-shaped schema: `additionalProperties: false` and, when
/// `required` is absent, every declared property required in declaration order.
fn normalize_object_schema(schema: &mut Map<String, Value>) {
    let has_object_shape = schema.get("type").and_then(Value::as_str) == Some("object")
        || schema.contains_key("properties")
        || schema.contains_key("required");
    if !has_object_shape {
        return;
    }

    schema.insert("type".into(), Value::String("object".into()));
    schema
        .entry("properties")
        .or_insert_with(|| Value::Object(Map::new()));
    schema.insert("additionalProperties".into(), Value::Bool(false));

    if !schema.contains_key("required") {
        if let Some(Value::Object(properties)) = schema.get("properties") {
            let required: Vec<Value> = properties
                .keys()
                .map(|key| Value::String(key.clone()))
                .collect();
            schema.insert("required".into(), Value::Array(required));
        }
    }
}

/// Schema of one evidence span claim.
fn evidence_span_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "text": {"type": "string"},
            "explanation": {"type": "string"}
        },
        "required": ["text", "explanation"],
        "additionalProperties": false
    })
}

/// Schema of one ICD or CPT code entry.
fn code_entry_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "code": {"type": "string"},
            "description": {"type": "string"},
            "explanation": {"type": "string"},
            "evidence_spans": {
                "type": "array",
                "items": evidence_span_schema(),
                "minItems": 0
            }
        },
        "required": ["code", "description", "explanation", "evidence_spans"],
        "additionalProperties": false
    })
}

/// The structured-output request used for every coding call.
pub fn coding_response_schema() -> Value {
    json!({
        "type": STRUCTURED_OUTPUT_TYPE,
        "json_schema": {
            "name": "CodingPrediction",
            "schema": {
                "type": "object",
                "properties": {
                    "reasoning": {"type": "string"},
                    "icd_codes": {"type": "array", "items": code_entry_schema()},
                    "cpt_codes": {"type": "array", "items": code_entry_schema()}
                },
                "required": ["reasoning", "icd_codes", "cpt_codes"],
                "additionalProperties": false
            }
        }
    })
}
