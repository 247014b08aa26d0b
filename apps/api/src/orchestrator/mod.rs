//! Tool-Call Orchestrator — drives one chat turn to completion.
//!
//! Flow: send conversation + tool schemas → model answers with text (done)
//!       or a tool request → validate → execute → append the request and its
//!       result to the conversation → send again.
//!
//! Only the first content block of a response is acted on. Tool failures are
//! reported back to the model as error results; unknown tools, model errors,
//! timeouts and the iteration bound end the turn.

pub mod prompts;

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::llm_client::{LlmError, ModelClient, ModelRequest, DEFAULT_MAX_TOKENS};
use crate::models::conversation::{ContentBlock, Message, Role};
use crate::models::tool::{ToolInvocation, ToolOutcome, ToolUsage};
use crate::session::ContentKind;
use crate::tools::{schema, ToolContext, ToolHandler, ToolRegistry};

pub const DEFAULT_MAX_ITERATIONS: usize = 8;
pub const DEFAULT_MODEL_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Tool executions allowed per turn.
    pub max_iterations: usize,
    pub model_timeout: Duration,
    pub max_tokens: u32,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            model_timeout: DEFAULT_MODEL_TIMEOUT,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("model communication failed: {0}")]
    Model(#[from] LlmError),

    #[error("model did not respond within {}s", .0.as_secs())]
    ModelTimeout(Duration),

    #[error("model requested unknown tool '{0}'")]
    UnknownTool(String),

    #[error("tool loop exceeded {limit} iterations")]
    ToolLoopExceeded { limit: usize },
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ResponseMeta {
    pub tools_used: Vec<ToolUsage>,
    pub iterations: usize,
}

#[derive(Debug, Clone)]
pub struct OrchestrationResult {
    pub text: String,
    pub meta: ResponseMeta,
    /// The full conversation including tool requests, results and the final answer.
    pub messages: Vec<Message>,
}

pub struct ToolOrchestrator {
    model: Arc<dyn ModelClient>,
    registry: Arc<ToolRegistry>,
    config: OrchestratorConfig,
}

impl ToolOrchestrator {
    pub fn new(
        model: Arc<dyn ModelClient>,
        registry: Arc<ToolRegistry>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            model,
            registry,
            config,
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Runs the tool loop until the model answers without requesting a tool.
    pub async fn run(
        &self,
        mut messages: Vec<Message>,
        ctx: &ToolContext,
    ) -> Result<OrchestrationResult, OrchestratorError> {
        let system = prompts::chat_system(&session_status(ctx));
        let tools = self.registry.schemas();
        let mut meta = ResponseMeta::default();

        loop {
            let request = ModelRequest {
                system: system.clone(),
                messages: messages.clone(),
                tools: tools.clone(),
                max_tokens: self.config.max_tokens,
            };

            let response = tokio::time::timeout(self.config.model_timeout, self.model.send(&request))
                .await
                .map_err(|_| OrchestratorError::ModelTimeout(self.config.model_timeout))??;

            if response.content.len() > 1 {
                let dropped_tools = response.content[1..]
                    .iter()
                    .filter(|b| matches!(b, ContentBlock::ToolUse { .. }))
                    .count();
                if dropped_tools > 0 {
                    warn!(
                        "Model returned {} blocks; ignoring {dropped_tools} tool request(s) after the first block",
                        response.content.len()
                    );
                }
            }

            let invocation = match response.content.into_iter().next() {
                Some(ContentBlock::ToolUse { id, name, input }) => ToolInvocation { id, name, input },
                Some(ContentBlock::Text { text }) => return Ok(self.finish(messages, text, meta)),
                Some(ContentBlock::ToolResult { .. }) | None => {
                    return Ok(self.finish(messages, String::new(), meta))
                }
            };

            let handler = self
                .registry
                .lookup(&invocation.name)
                .ok_or_else(|| OrchestratorError::UnknownTool(invocation.name.clone()))?;

            if meta.iterations >= self.config.max_iterations {
                warn!(
                    "Tool loop hit {} iterations in conversation {}",
                    self.config.max_iterations, ctx.conversation_id
                );
                return Err(OrchestratorError::ToolLoopExceeded {
                    limit: self.config.max_iterations,
                });
            }
            meta.iterations += 1;

            let outcome = execute_tool(handler.as_ref(), &invocation, ctx).await;
            if let Err(e) = &outcome.result {
                warn!("{e}");
            }

            meta.tools_used.push(ToolUsage::record(&invocation, &outcome));
            messages.push(Message::blocks(Role::Assistant, vec![invocation.to_block()]));
            messages.push(Message::blocks(Role::User, vec![outcome.to_block()]));
        }
    }

    fn finish(&self, mut messages: Vec<Message>, text: String, meta: ResponseMeta) -> OrchestrationResult {
        info!(
            "Chat turn finished after {} tool call(s)",
            meta.iterations
        );
        messages.push(Message::assistant(text.clone()));
        OrchestrationResult {
            text,
            meta,
            messages,
        }
    }
}

/// Validates and runs one invocation. Never fails: handler errors and
/// panics become error outcomes.
async fn execute_tool(
    handler: &dyn ToolHandler,
    invocation: &ToolInvocation,
    ctx: &ToolContext,
) -> ToolOutcome {
    debug!("Executing tool {} ({})", invocation.name, invocation.id);

    let result = match schema::validate(handler.definition(), &invocation.input) {
        Err(e) => Err(e.to_string()),
        Ok(input) => match AssertUnwindSafe(handler.execute(input, ctx)).catch_unwind().await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(e.to_string()),
            Err(panic) => Err(format!("panicked: {}", panic_message(panic.as_ref()))),
        },
    };

    ToolOutcome {
        tool_use_id: invocation.id.clone(),
        name: invocation.name.clone(),
        result: result.map_err(|reason| format!("Tool '{}' failed: {reason}", invocation.name)),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// One line per session document plus the uploaded file names.
fn session_status(ctx: &ToolContext) -> String {
    let session = ctx.sessions.get_context(ctx.conversation_id);
    let mut lines: Vec<String> = ContentKind::ALL
        .iter()
        .map(|&kind| {
            let field = session.field(kind);
            match field.content.as_deref() {
                Some(content) => format!(
                    "- {kind}: version {} ({} lines)",
                    field.version,
                    content.lines().count()
                ),
                None => format!("- {kind}: not loaded"),
            }
        })
        .collect();

    if ctx.files.is_empty() {
        lines.push("- uploaded files: none".to_string());
    } else {
        let names: Vec<&str> = ctx.files.iter().map(|f| f.name.as_str()).collect();
        lines.push(format!("- uploaded files: {}", names.join(", ")));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::conversation::UploadedFile;
    use crate::models::tool::ToolDefinition;
    use crate::testutil::{loaded_tool_context, tool_context, ScriptedModel};
    use crate::tools::{default_registry, definitions, ToolError};
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use uuid::Uuid;

    fn orchestrator(model: Arc<ScriptedModel>, config: OrchestratorConfig) -> ToolOrchestrator {
        ToolOrchestrator::new(model, Arc::new(default_registry().unwrap()), config)
    }

    fn files() -> Vec<UploadedFile> {
        vec![UploadedFile {
            id: Uuid::new_v4(),
            name: "notes.txt".into(),
            content: "Built Kafka streaming pipelines for event ingestion.".into(),
        }]
    }

    #[tokio::test]
    async fn test_single_tool_call_then_answer() {
        let model = Arc::new(ScriptedModel::new(vec![
            ScriptedModel::tool_use("tu_1", definitions::SEARCH_CONTEXT, json!({"query": "Kafka"})),
            ScriptedModel::text("You have Kafka streaming experience."),
        ]));
        let ctx = tool_context(model.clone(), files());

        let result = orchestrator(model.clone(), OrchestratorConfig::default())
            .run(vec![Message::user("Do I know Kafka?")], &ctx)
            .await
            .unwrap();

        assert_eq!(result.text, "You have Kafka streaming experience.");
        assert_eq!(result.meta.iterations, 1);
        assert_eq!(result.meta.tools_used.len(), 1);
        assert_eq!(result.meta.tools_used[0].name, definitions::SEARCH_CONTEXT);
        assert_eq!(result.meta.tools_used[0].input, json!({"query": "Kafka"}));
        assert!(result.meta.tools_used[0].error.is_none());
        assert_eq!(model.call_count(), 2);

        // user, assistant tool_use, user tool_result, final assistant
        assert_eq!(result.messages.len(), 4);
        let second = &model.requests()[1];
        assert_eq!(second.messages.len(), 3);
        assert_eq!(second.messages[2].tool_results().len(), 1);
        assert_eq!(second.tools.len(), 5);
    }

    #[tokio::test]
    async fn test_handler_error_is_reported_and_loop_continues() {
        let model = Arc::new(ScriptedModel::new(vec![
            ScriptedModel::tool_use(
                "tu_1",
                definitions::REPLACE_CONTENT,
                json!({"element_id": "resume-line-99", "new_content": "x"}),
            ),
            ScriptedModel::text("That line does not exist."),
        ]));
        let ctx = loaded_tool_context(model.clone());

        let result = orchestrator(model.clone(), OrchestratorConfig::default())
            .run(vec![Message::user("Edit line 99")], &ctx)
            .await
            .unwrap();

        let error = result.meta.tools_used[0].error.as_deref().unwrap();
        assert!(error.starts_with("Tool 'replaceContent' failed:"));

        let requests = model.requests();
        match requests[1].messages[2].tool_results()[0] {
            ContentBlock::ToolResult {
                is_error, content, ..
            } => {
                assert!(*is_error);
                assert!(content.as_str().unwrap().contains("replaceContent"));
            }
            other => panic!("unexpected block {other:?}"),
        }
        assert_eq!(result.text, "That line does not exist.");
    }

    #[tokio::test]
    async fn test_invalid_input_is_reported_not_executed() {
        let model = Arc::new(ScriptedModel::new(vec![
            ScriptedModel::tool_use("tu_1", definitions::FIND_CONTENT, json!({"target": "resume"})),
            ScriptedModel::text("ok"),
        ]));
        let ctx = loaded_tool_context(model.clone());

        let result = orchestrator(model, OrchestratorConfig::default())
            .run(vec![Message::user("find")], &ctx)
            .await
            .unwrap();
        let error = result.meta.tools_used[0].error.as_deref().unwrap();
        assert!(error.contains("missing required field 'pattern'"));
    }

    #[tokio::test]
    async fn test_unknown_tool_stops_immediately() {
        let model = Arc::new(ScriptedModel::new(vec![
            ScriptedModel::tool_use("tu_1", "deleteResume", json!({})),
            ScriptedModel::text("unreachable"),
        ]));
        let ctx = tool_context(model.clone(), Vec::new());

        let err = orchestrator(model.clone(), OrchestratorConfig::default())
            .run(vec![Message::user("hi")], &ctx)
            .await
            .unwrap_err();

        assert!(matches!(err, OrchestratorError::UnknownTool(ref name) if name == "deleteResume"));
        assert_eq!(model.call_count(), 1);
    }

    #[tokio::test]
    async fn test_loop_bound() {
        // The script's last response repeats forever.
        let model = Arc::new(ScriptedModel::new(vec![ScriptedModel::tool_use(
            "tu_1",
            definitions::SEARCH_CONTEXT,
            json!({"query": "Kafka"}),
        )]));
        let ctx = tool_context(model.clone(), files());
        let config = OrchestratorConfig {
            max_iterations: 3,
            ..Default::default()
        };

        let err = orchestrator(model.clone(), config)
            .run(vec![Message::user("loop")], &ctx)
            .await
            .unwrap_err();

        assert!(matches!(err, OrchestratorError::ToolLoopExceeded { limit: 3 }));
        assert_eq!(model.call_count(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_model_timeout() {
        let model = Arc::new(
            ScriptedModel::new(vec![ScriptedModel::text("late")])
                .with_delay(Duration::from_secs(120)),
        );
        let ctx = tool_context(model.clone(), Vec::new());

        let err = orchestrator(model, OrchestratorConfig::default())
            .run(vec![Message::user("hello")], &ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::ModelTimeout(d) if d == DEFAULT_MODEL_TIMEOUT));
    }

    #[tokio::test]
    async fn test_model_error_is_not_retried() {
        let model = Arc::new(ScriptedModel::with_results(vec![Err("overloaded".into())]));
        let ctx = tool_context(model.clone(), Vec::new());

        let err = orchestrator(model.clone(), OrchestratorConfig::default())
            .run(vec![Message::user("hello")], &ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::Model(_)));
        assert_eq!(model.call_count(), 1);
    }

    #[tokio::test]
    async fn test_only_first_block_is_honoured() {
        let mut response = ScriptedModel::text("Here is my answer.");
        response.content.push(ContentBlock::ToolUse {
            id: "tu_2".into(),
            name: definitions::SEARCH_CONTEXT.into(),
            input: json!({"query": "ignored"}),
        });
        let model = Arc::new(ScriptedModel::new(vec![response]));
        let ctx = tool_context(model.clone(), Vec::new());

        let result = orchestrator(model.clone(), OrchestratorConfig::default())
            .run(vec![Message::user("hi")], &ctx)
            .await
            .unwrap();
        assert_eq!(result.text, "Here is my answer.");
        assert!(result.meta.tools_used.is_empty());
        assert_eq!(model.call_count(), 1);
    }

    #[tokio::test]
    async fn test_empty_response_is_empty_answer() {
        let mut response = ScriptedModel::text("");
        response.content.clear();
        let model = Arc::new(ScriptedModel::new(vec![response]));
        let ctx = tool_context(model.clone(), Vec::new());

        let result = orchestrator(model, OrchestratorConfig::default())
            .run(vec![Message::user("hi")], &ctx)
            .await
            .unwrap();
        assert_eq!(result.text, "");
    }

    struct PanickingTool(ToolDefinition);

    #[async_trait]
    impl ToolHandler for PanickingTool {
        fn definition(&self) -> &ToolDefinition {
            &self.0
        }

        async fn execute(&self, _input: Value, _ctx: &ToolContext) -> Result<Value, ToolError> {
            panic!("index out of bounds");
        }
    }

    #[tokio::test]
    async fn test_panicking_handler_becomes_error_outcome() {
        let mut registry = ToolRegistry::new();
        registry
            .register(Arc::new(PanickingTool(ToolDefinition::new("explode", "Panics"))))
            .unwrap();
        let model = Arc::new(ScriptedModel::new(vec![
            ScriptedModel::tool_use("tu_1", "explode", json!({})),
            ScriptedModel::text("recovered"),
        ]));
        let ctx = tool_context(model.clone(), Vec::new());

        let result = ToolOrchestrator::new(model, Arc::new(registry), OrchestratorConfig::default())
            .run(vec![Message::user("go")], &ctx)
            .await
            .unwrap();

        let error = result.meta.tools_used[0].error.as_deref().unwrap();
        assert_eq!(error, "Tool 'explode' failed: panicked: index out of bounds");
        assert_eq!(result.text, "recovered");
    }

    #[tokio::test]
    async fn test_system_prompt_describes_session() {
        let model = Arc::new(ScriptedModel::new(vec![ScriptedModel::text("hi")]));
        let ctx = loaded_tool_context(model.clone());

        orchestrator(model.clone(), OrchestratorConfig::default())
            .run(vec![Message::user("hi")], &ctx)
            .await
            .unwrap();

        let system = &model.requests()[0].system;
        assert!(system.contains("- resume: version 1 (12 lines)"));
        assert!(system.contains("- analysis: not loaded"));
        assert!(system.contains("- uploaded files: none"));
    }
}
