use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::conversation::ContentBlock;

/// JSON-schema primitive kinds a tool parameter may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

impl ParamKind {
    pub fn matches(self, value: &Value) -> bool {
        match self {
            ParamKind::String => value.is_string(),
            ParamKind::Integer => value.is_i64() || value.is_u64(),
            ParamKind::Number => value.is_number(),
            ParamKind::Boolean => value.is_boolean(),
            ParamKind::Array => value.is_array(),
            ParamKind::Object => value.is_object(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ParamKind::String => "string",
            ParamKind::Integer => "integer",
            ParamKind::Number => "number",
            ParamKind::Boolean => "boolean",
            ParamKind::Array => "array",
            ParamKind::Object => "object",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    #[serde(rename = "type")]
    pub kind: ParamKind,
    pub description: String,
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub allowed: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl ParameterSpec {
    pub fn new(kind: ParamKind, description: &str) -> Self {
        Self {
            kind,
            description: description.to_string(),
            allowed: None,
            default: None,
        }
    }

    pub fn string(description: &str) -> Self {
        Self::new(ParamKind::String, description)
    }

    pub fn integer(description: &str) -> Self {
        Self::new(ParamKind::Integer, description)
    }

    pub fn one_of(mut self, values: &[&str]) -> Self {
        self.allowed = Some(values.iter().map(|v| v.to_string()).collect());
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }
}

/// Object schema describing a tool's input, serialized as JSON Schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSchema {
    #[serde(rename = "type")]
    pub kind: ParamKind,
    pub properties: BTreeMap<String, ParameterSpec>,
    pub required: Vec<String>,
}

impl Default for ParameterSchema {
    fn default() -> Self {
        Self {
            kind: ParamKind::Object,
            properties: BTreeMap::new(),
            required: Vec::new(),
        }
    }
}

/// Immutable description of a tool, transmitted to the model with every request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: ParameterSchema,
}

impl ToolDefinition {
    pub fn new(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            input_schema: ParameterSchema::default(),
        }
    }

    pub fn required(mut self, name: &str, spec: ParameterSpec) -> Self {
        self.input_schema.properties.insert(name.to_string(), spec);
        self.input_schema.required.push(name.to_string());
        self
    }

    pub fn optional(mut self, name: &str, spec: ParameterSpec) -> Self {
        self.input_schema.properties.insert(name.to_string(), spec);
        self
    }
}

/// A tool request lifted out of a model response. Consumed exactly once.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolInvocation {
    pub id: String,
    pub name: String,
    pub input: Value,
}

impl ToolInvocation {
    pub fn to_block(&self) -> ContentBlock {
        ContentBlock::ToolUse {
            id: self.id.clone(),
            name: self.name.clone(),
            input: self.input.clone(),
        }
    }
}

/// The result of executing one `ToolInvocation`.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutcome {
    pub tool_use_id: String,
    pub name: String,
    pub result: Result<Value, String>,
}

impl ToolOutcome {
    pub fn to_block(&self) -> ContentBlock {
        let (content, is_error) = match &self.result {
            Ok(value) => (value.clone(), false),
            Err(message) => (Value::String(message.clone()), true),
        };
        ContentBlock::ToolResult {
            tool_use_id: self.tool_use_id.clone(),
            name: self.name.clone(),
            content,
            is_error,
        }
    }
}

/// One entry of the per-turn audit trail returned as `meta.tools_used`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolUsage {
    pub name: String,
    pub input: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolUsage {
    pub fn record(invocation: &ToolInvocation, outcome: &ToolOutcome) -> Self {
        let (result, error) = match &outcome.result {
            Ok(value) => (Some(value.clone()), None),
            Err(message) => (None, Some(message.clone())),
        };
        Self {
            name: invocation.name.clone(),
            input: invocation.input.clone(),
            result,
            error,
        }
    }
}
