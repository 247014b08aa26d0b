//! findContent / replaceContent — line-addressed reads and writes on session documents.
//!
//! Every line of a document is an element with id `{target}-line-{n}` (1-based).
//! Writes go through `SessionStore::update_content` with the next version, so a
//! concurrent edit surfaces as a version conflict instead of being overwritten.

use async_trait::async_trait;
use regex::RegexBuilder;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::info;

use crate::models::tool::ToolDefinition;
use crate::session::{ContentKind, ContentUpdate};
use crate::tools::{definitions, ToolContext, ToolError, ToolHandler};

const MAX_MATCHES: usize = 50;

pub fn element_id(kind: ContentKind, line: usize) -> String {
    format!("{kind}-line-{line}")
}

pub fn parse_element_id(id: &str) -> Result<(ContentKind, usize), ToolError> {
    let invalid = || ToolError::InvalidInput(format!("malformed element_id '{id}'"));
    let (target, line) = id.rsplit_once("-line-").ok_or_else(invalid)?;
    let kind = target.parse::<ContentKind>().map_err(ToolError::InvalidInput)?;
    let line = line.parse::<usize>().map_err(|_| invalid())?;
    if line == 0 {
        return Err(invalid());
    }
    Ok((kind, line))
}

fn str_field<'a>(input: &'a Value, field: &str) -> Result<&'a str, ToolError> {
    input
        .get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| ToolError::InvalidInput(format!("'{field}' must be a string")))
}

#[derive(Debug, Serialize)]
struct ContentMatch<'a> {
    element_id: String,
    line: usize,
    text: &'a str,
}

pub struct FindContentTool {
    definition: ToolDefinition,
}

impl FindContentTool {
    pub fn new() -> Self {
        Self {
            definition: definitions::find_content(),
        }
    }
}

#[async_trait]
impl ToolHandler for FindContentTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, input: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let pattern = str_field(&input, "pattern")?;
        let kind = str_field(&input, "target")?
            .parse::<ContentKind>()
            .map_err(ToolError::InvalidInput)?;

        let regex = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .size_limit(1 << 20)
            .build()
            .map_err(|e| ToolError::InvalidInput(format!("invalid pattern: {e}")))?;

        let session = ctx.sessions.get_context(ctx.conversation_id);
        let field = session.field(kind);
        let content = field
            .content
            .as_deref()
            .ok_or_else(|| ToolError::NotFound(format!("no {kind} content loaded")))?;

        let matches: Vec<ContentMatch> = content
            .lines()
            .enumerate()
            .filter(|(_, line)| regex.is_match(line))
            .map(|(i, line)| ContentMatch {
                element_id: element_id(kind, i + 1),
                line: i + 1,
                text: line,
            })
            .collect();
        let total = matches.len();

        Ok(json!({
            "target": kind,
            "version": field.version,
            "total": total,
            "truncated": total > MAX_MATCHES,
            "matches": &matches[..total.min(MAX_MATCHES)],
        }))
    }
}

pub struct ReplaceContentTool {
    definition: ToolDefinition,
}

impl ReplaceContentTool {
    pub fn new() -> Self {
        Self {
            definition: definitions::replace_content(),
        }
    }
}

#[async_trait]
impl ToolHandler for ReplaceContentTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, input: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let id = str_field(&input, "element_id")?;
        let new_content = str_field(&input, "new_content")?;
        if new_content.contains(['\n', '\r']) {
            return Err(ToolError::InvalidInput(
                "'new_content' must be a single line".into(),
            ));
        }
        let (kind, line) = parse_element_id(id)?;

        let session = ctx.sessions.get_context(ctx.conversation_id);
        let field = session.field(kind);
        let content = field
            .content
            .as_deref()
            .ok_or_else(|| ToolError::NotFound(format!("no {kind} content loaded")))?;

        // Lines keep their own terminators so CRLF documents stay CRLF.
        let lines: Vec<&str> = content.split_inclusive('\n').collect();
        let count = lines.len();
        let target: &str = lines
            .get(line - 1)
            .copied()
            .ok_or_else(|| ToolError::NotFound(format!("{id} (document has {count} lines)")))?;
        let body = target
            .strip_suffix("\r\n")
            .or_else(|| target.strip_suffix('\n'))
            .unwrap_or(target);
        let ending = &target[body.len()..];
        let previous = body.to_string();

        let mut updated = String::with_capacity(content.len() + new_content.len());
        updated.extend(lines[..line - 1].iter().copied());
        updated.push_str(new_content);
        updated.push_str(ending);
        updated.extend(lines[line..].iter().copied());

        let committed = ctx.sessions.update_content(
            ctx.conversation_id,
            ContentUpdate {
                kind,
                content: updated,
                version: field.version + 1,
            },
        )?;
        let version = committed.field(kind).version;
        info!("Replaced {id} in conversation {}", ctx.conversation_id);

        Ok(json!({
            "element_id": id,
            "previous": previous,
            "updated": new_content,
            "version": version,
        }))
    }
}
