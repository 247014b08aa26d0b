//! Input validation against a tool's declared `ParameterSchema`.

use serde_json::{Map, Value};

use crate::models::tool::ToolDefinition;
use crate::tools::ToolError;

/// Checks `input` against the definition and fills in declared defaults.
///
/// Unknown fields are passed through untouched.
pub fn validate(definition: &ToolDefinition, input: &Value) -> Result<Value, ToolError> {
    let schema = &definition.input_schema;
    let mut object = match input {
        Value::Object(map) => map.clone(),
        Value::Null if schema.required.is_empty() => Map::new(),
        other => {
            return Err(ToolError::InvalidInput(format!(
                "expected an object, got {}",
                type_name(other)
            )))
        }
    };

    for field in &schema.required {
        match object.get(field) {
            None | Some(Value::Null) => {
                return Err(ToolError::InvalidInput(format!(
                    "missing required field '{field}'"
                )))
            }
            Some(_) => {}
        }
    }

    for (field, spec) in &schema.properties {
        let present = object.get(field).is_some_and(|v| !v.is_null());
        if !present {
            if let Some(default) = &spec.default {
                object.insert(field.clone(), default.clone());
            }
            continue;
        }
        let value = &object[field];

        if !spec.kind.matches(value) {
            return Err(ToolError::InvalidInput(format!(
                "field '{field}' must be of type {}, got {}",
                spec.kind.as_str(),
                type_name(value)
            )));
        }

        if let Some(allowed) = &spec.allowed {
            let ok = value
                .as_str()
                .map(|s| allowed.iter().any(|a| a == s))
                .unwrap_or(false);
            if !ok {
                return Err(ToolError::InvalidInput(format!(
                    "field '{field}' must be one of [{}], got {value}",
                    allowed.join(", ")
                )));
            }
        }
    }

    Ok(Value::Object(object))
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
