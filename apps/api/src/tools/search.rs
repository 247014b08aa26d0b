//! searchContext — semantic search over uploaded files and session documents.
//!
//! Flow: collect candidates (file paragraphs, resume, job description) →
//!       embed query + candidates → rank by cosine similarity → top_k.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::embeddings::similarity::rank;
use crate::models::tool::ToolDefinition;
use crate::session::ContentKind;
use crate::tools::{definitions, ToolContext, ToolError, ToolHandler};

/// Upper bound on a chunk, in characters.
pub const CHUNK_CHARS: usize = 800;
const MAX_TOP_K: usize = 10;

#[derive(Debug, Clone, PartialEq)]
struct Candidate {
    source: String,
    excerpt: String,
}

#[derive(Debug, Serialize)]
struct SearchHit {
    source: String,
    excerpt: String,
    score: f32,
}

/// Splits text into paragraph-aligned chunks of at most `max_chars`.
///
/// Consecutive paragraphs are merged while they fit; a paragraph longer
/// than `max_chars` is cut at word boundaries, and a single word longer
/// than `max_chars` is cut mid-word.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();

    let flush = |current: &mut String, chunks: &mut Vec<String>| {
        if !current.is_empty() {
            chunks.push(std::mem::take(current));
        }
    };

    for paragraph in text.split("\n\n").map(str::trim).filter(|p| !p.is_empty()) {
        if paragraph.chars().count() > max_chars {
            flush(&mut current, &mut chunks);
            for word in paragraph.split_whitespace() {
                if word.chars().count() > max_chars {
                    flush(&mut current, &mut chunks);
                    let chars: Vec<char> = word.chars().collect();
                    let mut pieces = chars.chunks(max_chars).map(|c| c.iter().collect::<String>());
                    let mut last = pieces.next().unwrap_or_default();
                    for piece in pieces {
                        chunks.push(std::mem::replace(&mut last, piece));
                    }
                    current = last;
                    continue;
                }
                let needed = current.chars().count() + word.chars().count() + 1;
                if !current.is_empty() && needed > max_chars {
                    flush(&mut current, &mut chunks);
                }
                if !current.is_empty() {
                    current.push(' ');
                }
                current.push_str(word);
            }
            flush(&mut current, &mut chunks);
            continue;
        }

        let needed = current.chars().count() + paragraph.chars().count() + 2;
        if !current.is_empty() && needed > max_chars {
            flush(&mut current, &mut chunks);
        }
        if !current.is_empty() {
            current.push_str("\n\n");
        }
        current.push_str(paragraph);
    }
    flush(&mut current, &mut chunks);
    chunks
}

fn collect_candidates(ctx: &ToolContext) -> Vec<Candidate> {
    let mut candidates = Vec::new();

    for file in ctx.files.iter() {
        candidates.extend(chunk_text(&file.content, CHUNK_CHARS).into_iter().map(|excerpt| {
            Candidate {
                source: format!("file:{}", file.name),
                excerpt,
            }
        }));
    }

    let session = ctx.sessions.get_context(ctx.conversation_id);
    for kind in [ContentKind::Resume, ContentKind::JobDescription] {
        if let Some(content) = session.content(kind) {
            candidates.extend(chunk_text(content, CHUNK_CHARS).into_iter().map(|excerpt| {
                Candidate {
                    source: kind.to_string(),
                    excerpt,
                }
            }));
        }
    }

    candidates
}

pub struct SearchContextTool {
    definition: ToolDefinition,
}

impl SearchContextTool {
    pub fn new() -> Self {
        Self {
            definition: definitions::search_context(),
        }
    }
}

#[async_trait]
impl ToolHandler for SearchContextTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, input: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let query = input
            .get("query")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::InvalidInput("'query' must be a string".into()))?;
        let top_k = input
            .get("top_k")
            .and_then(Value::as_u64)
            .map(|k| (k as usize).clamp(1, MAX_TOP_K))
            .unwrap_or(3);

        let candidates = collect_candidates(ctx);
        if candidates.is_empty() {
            return Ok(json!({
                "query": query,
                "results": [],
                "message": "No documents available. Ask the user to upload a resume or paste a job description.",
            }));
        }

        let query_vector = ctx.embeddings.embed(query, None).await?.vector;

        let texts: Vec<String> = candidates.iter().map(|c| c.excerpt.clone()).collect();
        let batch = ctx.embeddings.embed_batch(&texts, None).await?;
        debug!(
            "searchContext scored {} of {} chunks",
            batch.embeddings.len(),
            candidates.len()
        );

        let hits: Vec<SearchHit> = rank(
            &query_vector,
            batch
                .embeddings
                .into_iter()
                .map(|item| (item.index, item.embedding.vector)),
        )
        .into_iter()
        .take(top_k)
        .filter_map(|(index, score)| {
            let candidate = candidates.get(index)?;
            Some(SearchHit {
                source: candidate.source.clone(),
                excerpt: candidate.excerpt.clone(),
                score,
            })
        })
        .collect();

        let mut out = json!({ "query": query, "results": hits });
        if let Some(error) = batch.error {
            out["warning"] = Value::String(format!("some excerpts could not be embedded: {error}"));
        }
        Ok(out)
    }
}
