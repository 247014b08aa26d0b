// Shared prompt constants and prompt-building utilities.
// Each module that needs LLM calls defines its own prompts.rs alongside it.
// This file contains cross-cutting prompt fragments.

/// System prompt fragment that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You are a precise, structured assistant. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Common instruction appended to every prompt that writes resume content.
pub const GROUNDING_INSTRUCTION: &str = "\
    CRITICAL: Only use facts present in the resume and documents provided. \
    Do NOT invent employers, dates, metrics, titles or technologies. \
    If the source material does not support a claim, omit it entirely.";
