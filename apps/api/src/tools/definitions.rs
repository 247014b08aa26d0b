//! Static tool declarations sent to the model. Pure configuration.

use serde_json::json;

use crate::models::tool::{ParameterSpec, ToolDefinition};

pub const SEARCH_CONTEXT: &str = "searchContext";
pub const GENERATE_RESUME_SECTION: &str = "generateResumeSection";
pub const OPTIMIZE_FOR_ATS: &str = "optimizeForATS";
pub const FIND_CONTENT: &str = "findContent";
pub const REPLACE_CONTENT: &str = "replaceContent";

pub const SECTIONS: [&str; 5] = ["summary", "experience", "skills", "education", "projects"];
pub const TARGETS: [&str; 3] = ["resume", "job_description", "analysis"];

pub fn search_context() -> ToolDefinition {
    ToolDefinition::new(
        SEARCH_CONTEXT,
        "Semantic search over the uploaded documents, the current resume and the job \
         description. Returns the most relevant excerpts with similarity scores.",
    )
    .required(
        "query",
        ParameterSpec::string("What to look for, phrased as a short description"),
    )
    .optional(
        "top_k",
        ParameterSpec::integer("Maximum number of excerpts to return").with_default(json!(3)),
    )
}

pub fn generate_resume_section() -> ToolDefinition {
    ToolDefinition::new(
        GENERATE_RESUME_SECTION,
        "Draft one resume section tailored to the job description, using only facts \
         from the current resume.",
    )
    .required(
        "section",
        ParameterSpec::string("Which section to write").one_of(&SECTIONS),
    )
    .optional(
        "instructions",
        ParameterSpec::string("Extra guidance from the user, e.g. tone or length"),
    )
}

pub fn optimize_for_ats() -> ToolDefinition {
    ToolDefinition::new(
        OPTIMIZE_FOR_ATS,
        "Compare the resume against the job description the way an applicant tracking \
         system would: requirement coverage, best matching sections and missing keywords.",
    )
    .optional(
        "job_description",
        ParameterSpec::string("Job description text; defaults to the one in the session"),
    )
}

pub fn find_content() -> ToolDefinition {
    ToolDefinition::new(
        FIND_CONTENT,
        "Find lines in a document matching a case-insensitive regular expression. \
         Each match carries an element_id usable with replaceContent.",
    )
    .required("pattern", ParameterSpec::string("Regular expression to search for"))
    .optional(
        "target",
        ParameterSpec::string("Document to search")
            .one_of(&TARGETS)
            .with_default(json!("resume")),
    )
}

pub fn replace_content() -> ToolDefinition {
    ToolDefinition::new(
        REPLACE_CONTENT,
        "Replace one line of a document, addressed by the element_id returned from \
         findContent. Commits a new version of the document.",
    )
    .required(
        "element_id",
        ParameterSpec::string("Element id such as resume-line-4"),
    )
    .required("new_content", ParameterSpec::string("Replacement text for the line"))
}
