// LLM prompt constants for the resume tools.
// Reuses cross-cutting fragments from llm_client::prompts.

use crate::llm_client::prompts::{GROUNDING_INSTRUCTION, JSON_ONLY_SYSTEM};

/// Persona prepended to the shared JSON-only system prompt for section drafting.
pub const SECTION_PERSONA: &str = "You are an expert resume writer who tailors resumes \
    to specific job descriptions without embellishing.";

pub fn section_system() -> String {
    format!("{SECTION_PERSONA} {JSON_ONLY_SYSTEM}")
}

/// Section drafting template. Replace `{section}`, `{resume}`,
/// `{job_description}`, `{instructions}` and `{grounding}` before sending.
pub const SECTION_PROMPT_TEMPLATE: &str = r#"Write the {section} section of the candidate's resume.

CURRENT RESUME:
{resume}

TARGET JOB DESCRIPTION:
{job_description}

ADDITIONAL INSTRUCTIONS FROM THE CANDIDATE:
{instructions}

Rules:
- Mirror the job description's terminology where the resume supports it.
- Lead bullets with strong action verbs and keep each bullet to one or two lines.
- Prefer quantified outcomes that already appear in the resume.
- Plain text only. Use "- " for bullets and newlines between bullets.

{grounding}

Return a JSON object with this EXACT schema (no extra fields):
{
  "content": "the section text, ready to paste into the resume",
  "keywords_used": ["job description keywords the section now contains"]
}"#;

pub const NO_JOB_DESCRIPTION: &str = "(none provided; write a strong general-purpose section)";
pub const NO_INSTRUCTIONS: &str = "(none)";

pub fn section_prompt(
    section: &str,
    resume: &str,
    job_description: Option<&str>,
    instructions: Option<&str>,
) -> String {
    SECTION_PROMPT_TEMPLATE
        .replace("{section}", section)
        .replace("{resume}", resume)
        .replace("{job_description}", job_description.unwrap_or(NO_JOB_DESCRIPTION))
        .replace("{instructions}", instructions.unwrap_or(NO_INSTRUCTIONS))
        .replace("{grounding}", GROUNDING_INSTRUCTION)
}
