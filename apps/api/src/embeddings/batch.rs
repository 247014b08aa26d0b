//! Job-requirement and resume-section helpers over `embed_batch`.
//!
//! Results are tagged by input position, not by content: the flattened
//! input list is built once and each `BatchItem::index` points back into it.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::embeddings::provider::{EmbeddingProvider, Metadata};
use crate::embeddings::EmbeddingError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequirementCategory {
    Skill,
    Qualification,
    Responsibility,
    Keyword,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeywordPriority {
    Critical,
    Important,
    NiceToHave,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionCategory {
    Summary,
    Experience,
    Skills,
    Education,
    Projects,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyword {
    pub term: String,
    pub priority: KeywordPriority,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobRequirements {
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub qualifications: Vec<String>,
    #[serde(default)]
    pub responsibilities: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<Keyword>,
}

impl JobRequirements {
    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
            && self.qualifications.is_empty()
            && self.responsibilities.is_empty()
            && self.keywords.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResumeSections {
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub experience: Vec<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub education: Vec<String>,
    #[serde(default)]
    pub projects: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RequirementEmbedding {
    pub category: RequirementCategory,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<KeywordPriority>,
    pub text: String,
    pub vector: Vec<f32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SectionEmbedding {
    pub category: SectionCategory,
    pub text: String,
    pub vector: Vec<f32>,
}

/// Tagged embeddings plus the joined error of any items that failed.
#[derive(Debug, Clone, Serialize)]
pub struct TaggedEmbeddings<T> {
    pub items: Vec<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn tag_metadata(category: &str, priority: Option<KeywordPriority>) -> Metadata {
    let mut meta = Metadata::new();
    meta.insert("category".into(), Value::from(category));
    if let Some(priority) = priority {
        meta.insert(
            "priority".into(),
            serde_json::to_value(priority).unwrap_or(Value::Null),
        );
    }
    meta
}

fn non_empty(text: &str) -> bool {
    !text.trim().is_empty()
}

pub async fn embed_job_requirements(
    provider: &EmbeddingProvider,
    requirements: &JobRequirements,
) -> Result<TaggedEmbeddings<RequirementEmbedding>, EmbeddingError> {
    let mut inputs: Vec<(RequirementCategory, Option<KeywordPriority>, String)> = Vec::new();
    let groups = [
        (RequirementCategory::Skill, &requirements.skills),
        (RequirementCategory::Qualification, &requirements.qualifications),
        (RequirementCategory::Responsibility, &requirements.responsibilities),
    ];
    for (category, texts) in groups {
        inputs.extend(
            texts
                .iter()
                .filter(|t| non_empty(t))
                .map(|t| (category, None, t.clone())),
        );
    }
    inputs.extend(
        requirements
            .keywords
            .iter()
            .filter(|k| non_empty(&k.term))
            .map(|k| (RequirementCategory::Keyword, Some(k.priority), k.term.clone())),
    );

    let texts: Vec<String> = inputs.iter().map(|(_, _, t)| t.clone()).collect();
    let metadata: Vec<Metadata> = inputs
        .iter()
        .map(|(category, priority, _)| {
            let name = serde_json::to_value(category)
                .ok()
                .and_then(|v| v.as_str().map(str::to_string))
                .unwrap_or_default();
            tag_metadata(&name, *priority)
        })
        .collect();

    let batch = provider.embed_batch(&texts, Some(&metadata)).await?;
    let items = batch
        .embeddings
        .into_iter()
        .filter_map(|item| {
            let (category, priority, _) = inputs.get(item.index)?;
            Some(RequirementEmbedding {
                category: *category,
                priority: *priority,
                text: item.embedding.text,
                vector: item.embedding.vector,
            })
        })
        .collect();

    Ok(TaggedEmbeddings {
        items,
        error: batch.error,
    })
}

pub async fn embed_resume_sections(
    provider: &EmbeddingProvider,
    sections: &ResumeSections,
) -> Result<TaggedEmbeddings<SectionEmbedding>, EmbeddingError> {
    let mut inputs: Vec<(SectionCategory, String)> = Vec::new();
    if let Some(summary) = sections.summary.as_ref().filter(|s| non_empty(s)) {
        inputs.push((SectionCategory::Summary, summary.clone()));
    }
    let groups = [
        (SectionCategory::Experience, &sections.experience),
        (SectionCategory::Skills, &sections.skills),
        (SectionCategory::Education, &sections.education),
        (SectionCategory::Projects, &sections.projects),
    ];
    for (category, texts) in groups {
        inputs.extend(
            texts
                .iter()
                .filter(|t| non_empty(t))
                .map(|t| (category, t.clone())),
        );
    }

    let texts: Vec<String> = inputs.iter().map(|(_, t)| t.clone()).collect();
    let metadata: Vec<Metadata> = inputs
        .iter()
        .map(|(category, _)| {
            let name = serde_json::to_value(category)
                .ok()
                .and_then(|v| v.as_str().map(str::to_string))
                .unwrap_or_default();
            tag_metadata(&name, None)
        })
        .collect();

    let batch = provider.embed_batch(&texts, Some(&metadata)).await?;
    let items = batch
        .embeddings
        .into_iter()
        .filter_map(|item| {
            let (category, _) = inputs.get(item.index)?;
            Some(SectionEmbedding {
                category: *category,
                text: item.embedding.text,
                vector: item.embedding.vector,
            })
        })
        .collect();

    Ok(TaggedEmbeddings {
        items,
        error: batch.error,
    })
}
