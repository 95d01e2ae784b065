//! Run domain model.
//!
//! A run is one execution of a prompt and model over a fixed, ordered list of
//! sessions. The annotation pipeline owns its lifecycle; this crate only reads
//! session membership and the annotation type.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How annotations are attached to the underlying data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnnotationType {
    /// One annotation per utterance inside a session.
    PerUtterance,
    /// One annotation for the whole session.
    PerSession,
}

impl AnnotationType {
    /// Returns the stored representation (`PER_UTTERANCE` / `PER_SESSION`).
    pub fn as_str(&self) -> &'static str {
        match self {
            AnnotationType::PerUtterance => "PER_UTTERANCE",
            AnnotationType::PerSession => "PER_SESSION",
        }
    }
}

impl std::fmt::Display for AnnotationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AnnotationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().replace('-', "_").as_str() {
            "PER_UTTERANCE" => Ok(AnnotationType::PerUtterance),
            "PER_SESSION" => Ok(AnnotationType::PerSession),
            other => Err(format!("unknown annotation type '{}'", other)),
        }
    }
}

/// Processing status of one session inside a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunSessionStatus {
    #[default]
    Pending,
    Running,
    Done,
    Errored,
}

/// A session reference as stored on a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSession {
    pub session_id: String,
    #[serde(default)]
    pub status: RunSessionStatus,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub file_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl RunSession {
    /// A pending entry carrying nothing but the session id.
    pub fn pending(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            status: RunSessionStatus::Pending,
            name: String::new(),
            file_type: String::new(),
            started_at: None,
            finished_at: None,
        }
    }
}

/// One annotation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Run {
    /// Unique run identifier.
    #[serde(rename = "_id")]
    pub id: String,
    /// Owning project.
    pub project: String,
    pub name: String,
    pub annotation_type: AnnotationType,
    /// Ordered session entries; session ids are unique within a run.
    pub sessions: Vec<RunSession>,
    pub prompt: String,
    pub prompt_version: u32,
    /// Model code, e.g. `GEMINI_2_5_FLASH`.
    pub model: String,
    #[serde(default)]
    pub is_running: bool,
    #[serde(default)]
    pub is_complete: bool,
    #[serde(default)]
    pub has_errored: bool,
    pub created_at: DateTime<Utc>,
}

impl Run {
    /// Iterates the session ids of this run in stored order.
    pub fn session_ids(&self) -> impl Iterator<Item = &str> {
        self.sessions.iter().map(|s| s.session_id.as_str())
    }
}

/// A reference to one version of a prompt.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptReference {
    pub prompt_id: String,
    pub version: u32,
}

impl PromptReference {
    pub fn new(prompt_id: impl Into<String>, version: u32) -> Self {
        Self {
            prompt_id: prompt_id.into(),
            version,
        }
    }
}

impl std::fmt::Display for PromptReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@v{}", self.prompt_id, self.version)
    }
}

impl std::str::FromStr for PromptReference {
    type Err = String;

    /// Parses `prompt-id@version` (a leading `v` on the version is accepted).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (id, version) = s
            .rsplit_once('@')
            .ok_or_else(|| format!("expected <prompt>@<version>, got '{}'", s))?;
        if id.is_empty() {
            return Err(format!("missing prompt id in '{}'", s));
        }
        let version = version
            .trim_start_matches('v')
            .parse::<u32>()
            .map_err(|e| format!("invalid prompt version in '{}': {}", s, e))?;
        Ok(Self::new(id, version))
    }
}
