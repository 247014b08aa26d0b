//! Session context — the versioned resume / job description / analysis
//! snapshot visible to one conversation.
//!
//! Writes are optimistic: a caller must present `current + 1` as the new
//! version, otherwise the update is rejected as stale and nothing changes.

pub mod handlers;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Resume,
    JobDescription,
    Analysis,
}

impl ContentKind {
    pub const ALL: [ContentKind; 3] = [
        ContentKind::Resume,
        ContentKind::JobDescription,
        ContentKind::Analysis,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ContentKind::Resume => "resume",
            ContentKind::JobDescription => "job_description",
            ContentKind::Analysis => "analysis",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ContentKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| format!("unknown content type '{s}'"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionedContent {
    pub id: Uuid,
    pub version: u64,
    pub content: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl VersionedContent {
    fn empty() -> Self {
        Self {
            id: Uuid::new_v4(),
            version: 0,
            content: None,
            updated_at: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionContext {
    pub conversation_id: Uuid,
    pub resume: VersionedContent,
    pub job_description: VersionedContent,
    pub analysis: VersionedContent,
}

impl SessionContext {
    pub fn new(conversation_id: Uuid) -> Self {
        Self {
            conversation_id,
            resume: VersionedContent::empty(),
            job_description: VersionedContent::empty(),
            analysis: VersionedContent::empty(),
        }
    }

    pub fn field(&self, kind: ContentKind) -> &VersionedContent {
        match kind {
            ContentKind::Resume => &self.resume,
            ContentKind::JobDescription => &self.job_description,
            ContentKind::Analysis => &self.analysis,
        }
    }

    fn field_mut(&mut self, kind: ContentKind) -> &mut VersionedContent {
        match kind {
            ContentKind::Resume => &mut self.resume,
            ContentKind::JobDescription => &mut self.job_description,
            ContentKind::Analysis => &mut self.analysis,
        }
    }

    /// Current text of a field, if any has been committed.
    pub fn content(&self, kind: ContentKind) -> Option<&str> {
        self.field(kind).content.as_deref()
    }
}

/// Request to replace one field. `version` must be the field's current version + 1.
#[derive(Debug, Clone, Deserialize)]
pub struct ContentUpdate {
    #[serde(rename = "type")]
    pub kind: ContentKind,
    pub content: String,
    pub version: u64,
}

#[derive(Debug, Error, PartialEq)]
pub enum SessionError {
    #[error("Version conflict on {kind}: current version is {current}, update carried {provided} (expected {})", .current + 1)]
    VersionConflict {
        kind: ContentKind,
        current: u64,
        provided: u64,
    },
}

/// In-memory store of session contexts keyed by conversation id.
#[derive(Default)]
pub struct SessionStore {
    contexts: DashMap<Uuid, SessionContext>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the context for a conversation, creating a zero-version one on first access.
    pub fn get_context(&self, conversation_id: Uuid) -> SessionContext {
        self.contexts
            .entry(conversation_id)
            .or_insert_with(|| {
                debug!("Created session context for conversation {conversation_id}");
                SessionContext::new(conversation_id)
            })
            .clone()
    }

    /// Applies an update if it carries exactly the next version for its field.
    /// The check and the write happen under the same entry lock.
    pub fn update_content(
        &self,
        conversation_id: Uuid,
        update: ContentUpdate,
    ) -> Result<SessionContext, SessionError> {
        let mut entry = self
            .contexts
            .entry(conversation_id)
            .or_insert_with(|| SessionContext::new(conversation_id));

        let field = entry.field_mut(update.kind);
        if update.version != field.version + 1 {
            return Err(SessionError::VersionConflict {
                kind: update.kind,
                current: field.version,
                provided: update.version,
            });
        }

        field.version = update.version;
        field.content = Some(update.content);
        field.updated_at = Some(Utc::now());

        info!(
            "Updated {} for conversation {conversation_id} to version {}",
            update.kind, update.version
        );
        Ok(entry.clone())
    }

    pub fn remove(&self, conversation_id: Uuid) -> Option<SessionContext> {
        self.contexts.remove(&conversation_id).map(|(_, ctx)| ctx)
    }
}
