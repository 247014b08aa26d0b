//! generateResumeSection / optimizeForATS — the two resume-writing tools.
//!
//! Section drafting is a single `call_json` round trip grounded in the
//! session's resume. ATS optimization is local: requirements and sections
//! are parsed heuristically (`tools::ats`), embedded, and matched by cosine
//! similarity or a literal keyword hit.

use std::collections::HashSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use crate::embeddings::batch::{
    embed_job_requirements, embed_resume_sections, KeywordPriority, RequirementCategory,
    RequirementEmbedding, SectionCategory, SectionEmbedding,
};
use crate::embeddings::model::tokenize;
use crate::embeddings::EmbeddingProvider;
use crate::llm_client::call_json;
use crate::models::tool::ToolDefinition;
use crate::session::ContentKind;
use crate::tools::ats::{extract_requirements, split_resume_sections};
use crate::tools::prompts::{section_prompt, section_system};
use crate::tools::{definitions, ToolContext, ToolError, ToolHandler};

const SECTION_MAX_TOKENS: u32 = 1024;

/// Similarity at or above which a requirement counts as covered.
pub const STRONG_MATCH: f32 = 0.75;
/// Similarity at or above which a requirement counts as partially covered.
pub const PARTIAL_MATCH: f32 = 0.5;

// ────────────────────────────────────────────────────────────────────────────
// generateResumeSection
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedSection {
    pub content: String,
    #[serde(default)]
    pub keywords_used: Vec<String>,
}

pub struct GenerateSectionTool {
    definition: ToolDefinition,
}

impl GenerateSectionTool {
    pub fn new() -> Self {
        Self {
            definition: definitions::generate_resume_section(),
        }
    }
}

#[async_trait]
impl ToolHandler for GenerateSectionTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, input: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let section = input
            .get("section")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::InvalidInput("'section' must be a string".into()))?;
        let instructions = input.get("instructions").and_then(Value::as_str);

        let session = ctx.sessions.get_context(ctx.conversation_id);
        let resume = session
            .content(ContentKind::Resume)
            .ok_or_else(|| ToolError::NotFound("no resume loaded for this conversation".into()))?;
        let job_description = session.content(ContentKind::JobDescription);

        let prompt = section_prompt(section, resume, job_description, instructions);
        let generated: GeneratedSection =
            call_json(ctx.model.as_ref(), &prompt, &section_system(), SECTION_MAX_TOKENS).await?;

        if generated.content.trim().is_empty() {
            return Err(ToolError::Execution(format!(
                "model returned an empty {section} section"
            )));
        }
        info!(
            "Generated {section} section ({} keywords)",
            generated.keywords_used.len()
        );

        Ok(json!({
            "section": section,
            "content": generated.content,
            "keywords_used": generated.keywords_used,
        }))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// optimizeForATS
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct RequirementMatch {
    pub requirement: String,
    pub category: RequirementCategory,
    pub priority: KeywordPriority,
    pub best_section: Option<SectionCategory>,
    pub evidence: Option<String>,
    pub score: f32,
    pub literal: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct AtsReport {
    /// Weighted requirement coverage, 0-100.
    pub coverage: u32,
    pub strong_matches: Vec<RequirementMatch>,
    pub partial_matches: Vec<RequirementMatch>,
    pub gaps: Vec<RequirementMatch>,
    pub missing_critical: Vec<String>,
    pub recommendation: String,
    pub warnings: Vec<String>,
}

/// Skills are must-haves; qualifications weigh more than responsibilities.
fn effective_priority(requirement: &RequirementEmbedding) -> KeywordPriority {
    requirement.priority.unwrap_or(match requirement.category {
        RequirementCategory::Skill => KeywordPriority::Critical,
        RequirementCategory::Qualification => KeywordPriority::Important,
        RequirementCategory::Responsibility | RequirementCategory::Keyword => {
            KeywordPriority::NiceToHave
        }
    })
}

fn weight(priority: KeywordPriority) -> f32 {
    match priority {
        KeywordPriority::Critical => 3.0,
        KeywordPriority::Important => 2.0,
        KeywordPriority::NiceToHave => 1.0,
    }
}

/// Every token of `term` appears somewhere in the resume.
fn literal_hit(term: &str, resume_tokens: &HashSet<String>) -> bool {
    let tokens = tokenize(term);
    !tokens.is_empty() && tokens.iter().all(|t| resume_tokens.contains(t))
}

/// Scores each requirement against its best-matching section.
///
/// Skills and keywords also count as covered when every one of their tokens
/// appears in the resume.
pub fn score_requirements(
    requirements: &[RequirementEmbedding],
    sections: &[SectionEmbedding],
    resume: &str,
) -> AtsReport {
    let resume_tokens: HashSet<String> = tokenize(resume).into_iter().collect();

    let mut strong_matches = Vec::new();
    let mut partial_matches = Vec::new();
    let mut gaps = Vec::new();
    let mut total_weight = 0.0_f32;
    let mut total_score = 0.0_f32;

    for requirement in requirements {
        let priority = effective_priority(requirement);
        let best = sections
            .iter()
            .map(|s| (s, EmbeddingProvider::similarity(&requirement.vector, &s.vector)))
            .max_by(|a, b| a.1.total_cmp(&b.1));

        let literal = matches!(
            requirement.category,
            RequirementCategory::Skill | RequirementCategory::Keyword
        ) && literal_hit(&requirement.text, &resume_tokens);

        let similarity = best.map(|(_, score)| score).unwrap_or(0.0);
        let strength = if literal { 1.0 } else { similarity.max(0.0) };

        total_weight += weight(priority);
        total_score += weight(priority) * strength;

        let entry = RequirementMatch {
            requirement: requirement.text.clone(),
            category: requirement.category,
            priority,
            best_section: best.map(|(s, _)| s.category),
            evidence: best.map(|(s, _)| s.text.clone()),
            score: strength,
            literal,
        };

        if strength >= STRONG_MATCH {
            strong_matches.push(entry);
        } else if strength >= PARTIAL_MATCH {
            partial_matches.push(entry);
        } else {
            gaps.push(entry);
        }
    }

    let coverage = if total_weight > 0.0 {
        ((total_score / total_weight) * 100.0).round().clamp(0.0, 100.0) as u32
    } else {
        0
    };

    let missing_critical: Vec<String> = gaps
        .iter()
        .filter(|g| g.priority == KeywordPriority::Critical)
        .map(|g| g.requirement.clone())
        .collect();

    let recommendation = build_recommendation(coverage, &missing_critical, &gaps);

    AtsReport {
        coverage,
        strong_matches,
        partial_matches,
        gaps,
        missing_critical,
        recommendation,
        warnings: Vec::new(),
    }
}

fn build_recommendation(coverage: u32, missing_critical: &[String], gaps: &[RequirementMatch]) -> String {
    let top_gaps: Vec<&str> = if missing_critical.is_empty() {
        gaps.iter().take(3).map(|g| g.requirement.as_str()).collect()
    } else {
        missing_critical.iter().take(3).map(String::as_str).collect()
    };

    if coverage >= 80 && missing_critical.is_empty() {
        "Strong ATS match. The resume covers the key requirements.".to_string()
    } else if coverage >= 60 {
        format!(
            "Moderate ATS match ({coverage}/100). Work these in where your experience supports them: {}.",
            top_gaps.join(", ")
        )
    } else {
        format!(
            "Weak ATS match ({coverage}/100). Missing: {}. Rewrite the summary and skills around the job's terminology.",
            top_gaps.join(", ")
        )
    }
}

pub struct OptimizeForAtsTool {
    definition: ToolDefinition,
}

impl OptimizeForAtsTool {
    pub fn new() -> Self {
        Self {
            definition: definitions::optimize_for_ats(),
        }
    }
}

#[async_trait]
impl ToolHandler for OptimizeForAtsTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, input: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let session = ctx.sessions.get_context(ctx.conversation_id);
        let resume = session
            .content(ContentKind::Resume)
            .ok_or_else(|| ToolError::NotFound("no resume loaded for this conversation".into()))?;
        let job_description = input
            .get("job_description")
            .and_then(Value::as_str)
            .filter(|jd| !jd.trim().is_empty())
            .or_else(|| session.content(ContentKind::JobDescription))
            .ok_or_else(|| ToolError::NotFound("no job description available".into()))?;

        let requirements = extract_requirements(job_description);
        if requirements.is_empty() {
            return Err(ToolError::Execution(
                "could not find any requirements in the job description".into(),
            ));
        }
        let sections = split_resume_sections(resume);

        let required = embed_job_requirements(&ctx.embeddings, &requirements).await?;
        let offered = embed_resume_sections(&ctx.embeddings, &sections).await?;

        let mut report = score_requirements(&required.items, &offered.items, resume);
        report.warnings.extend(
            required
                .error
                .map(|e| format!("some requirements could not be embedded: {e}")),
        );
        report.warnings.extend(
            offered
                .error
                .map(|e| format!("some resume sections could not be embedded: {e}")),
        );

        info!(
            "ATS coverage {} for conversation {} ({} gaps)",
            report.coverage,
            ctx.conversation_id,
            report.gaps.len()
        );

        serde_json::to_value(report).map_err(|e| ToolError::Execution(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{loaded_tool_context, tool_context, ScriptedModel};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_generate_section_uses_resume_and_job() {
        let model = Arc::new(ScriptedModel::new(vec![ScriptedModel::text(
            "```json\n{\"content\": \"Rust backend engineer shipping payments APIs.\", \"keywords_used\": [\"Rust\"]}\n```",
        )]));
        let ctx = loaded_tool_context(model.clone());

        let out = GenerateSectionTool::new()
            .execute(json!({"section": "summary", "instructions": "Keep it short"}), &ctx)
            .await
            .unwrap();

        assert_eq!(out["section"], "summary");
        assert_eq!(out["keywords_used"], json!(["Rust"]));

        let requests = model.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].tools.is_empty());
        let prompt = requests[0].messages[0].text();
        assert!(prompt.contains("Built a payments API in Rust"));
        assert!(prompt.contains("Senior Rust Engineer"));
        assert!(prompt.contains("Keep it short"));
        assert!(requests[0].system.contains("valid JSON only"));
    }

    #[tokio::test]
    async fn test_generate_section_without_resume() {
        let model = Arc::new(ScriptedModel::new(vec![]));
        let ctx = tool_context(model.clone(), Vec::new());
        let err = GenerateSectionTool::new()
            .execute(json!({"section": "skills"}), &ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::NotFound(_)));
        assert_eq!(model.call_count(), 0);
    }

    #[tokio::test]
    async fn test_generate_section_rejects_non_json_reply() {
        let model = Arc::new(ScriptedModel::new(vec![ScriptedModel::text("Sure! Here you go.")]));
        let ctx = loaded_tool_context(model);
        let err = GenerateSectionTool::new()
            .execute(json!({"section": "skills"}), &ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Model(_)));
    }

    #[tokio::test]
    async fn test_optimize_reports_literal_skills_and_missing_critical() {
        let ctx = loaded_tool_context(Arc::new(ScriptedModel::new(vec![])));
        let out = OptimizeForAtsTool::new()
            .execute(json!({}), &ctx)
            .await
            .unwrap();

        let strong: Vec<_> = out["strong_matches"]
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["requirement"].as_str().unwrap())
            .collect();
        assert!(strong.contains(&"Rust"));
        assert!(strong.contains(&"Kubernetes"));
        assert_eq!(out["missing_critical"], json!(["Kafka"]));

        let coverage = out["coverage"].as_u64().unwrap();
        assert!(coverage > 0 && coverage < 100);
        assert_eq!(out["warnings"], json!([]));
    }

    #[tokio::test]
    async fn test_optimize_prefers_explicit_job_description() {
        let ctx = loaded_tool_context(Arc::new(ScriptedModel::new(vec![])));
        let out = OptimizeForAtsTool::new()
            .execute(json!({"job_description": "Skills: Docker, Go"}), &ctx)
            .await
            .unwrap();
        assert_eq!(out["coverage"], 100);
        assert_eq!(out["missing_critical"], json!([]));
        assert!(out["recommendation"]
            .as_str()
            .unwrap()
            .starts_with("Strong ATS match"));
    }

    #[tokio::test]
    async fn test_optimize_without_job_description() {
        let ctx = tool_context(Arc::new(ScriptedModel::new(vec![])), Vec::new());
        ctx.sessions
            .update_content(
                ctx.conversation_id,
                crate::session::ContentUpdate {
                    kind: ContentKind::Resume,
                    content: "Summary\nEngineer".into(),
                    version: 1,
                },
            )
            .unwrap();
        let err = OptimizeForAtsTool::new()
            .execute(json!({}), &ctx)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no job description"));
    }

    #[test]
    fn test_score_requirements_without_sections_is_all_gaps() {
        let requirements = vec![RequirementEmbedding {
            category: RequirementCategory::Qualification,
            priority: None,
            text: "Team leadership".into(),
            vector: vec![1.0, 0.0],
        }];
        let report = score_requirements(&requirements, &[], "");
        assert_eq!(report.coverage, 0);
        assert_eq!(report.gaps.len(), 1);
        assert_eq!(report.gaps[0].priority, KeywordPriority::Important);
        assert!(report.missing_critical.is_empty());
        assert!(report.recommendation.contains("Team leadership"));
    }
}
