use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use super::member::MemberRoleView;
use super::stage::{StageStatusView, FIRST_STAGE};
use super::UserId;

pub type ProjectId = Uuid;

/// Free-form project metadata; any JSON object is accepted
pub type Metadata = serde_json::Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    Active,
    Completed,
    Archived,
    Paused,
}

column_enum!(ProjectStatus, "project status", {
    Active => "active",
    Completed => "completed",
    Archived => "archived",
    Paused => "paused",
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub title: String,
    pub description: Option<String>,
    pub status: ProjectStatus,
    pub created_by: UserId,
    pub current_stage: u8,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub metadata: Metadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    /// Builds the initial row for a validated request: active, on the first stage.
    pub fn create(new: NewProject, created_by: UserId, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: new.title,
            description: new.description,
            status: ProjectStatus::Active,
            created_by,
            current_stage: FIRST_STAGE,
            start_date: now,
            end_date: None,
            metadata: new.metadata,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Rejections raised before anything is written
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Title is required")]
    MissingTitle,
    #[error("Metadata must be a JSON object")]
    MetadataNotObject,
    #[error("Invalid JSON body: {0}")]
    MalformedBody(String),
}

/// Body of `POST /projects` as sent by clients
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateProjectRequest {
    /// Kept loose so that a non-string title reads as missing rather than malformed
    #[serde(default)]
    pub title: Option<Value>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub metadata: Option<Value>,
}

impl CreateProjectRequest {
    /// Parses a raw request body. Unknown fields are ignored.
    pub fn from_slice(body: &[u8]) -> Result<Self, ValidationError> {
        serde_json::from_slice(body).map_err(|e| ValidationError::MalformedBody(e.to_string()))
    }

    pub fn validate(self) -> Result<NewProject, ValidationError> {
        let title = match self.title {
            Some(Value::String(title)) if !title.is_empty() => title,
            _ => return Err(ValidationError::MissingTitle),
        };

        let metadata = match self.metadata {
            None | Some(Value::Null) => Metadata::new(),
            Some(Value::Object(map)) => map,
            Some(_) => return Err(ValidationError::MetadataNotObject),
        };

        Ok(NewProject {
            title,
            description: self.description,
            metadata,
        })
    }
}

/// A creation request that passed validation
#[derive(Debug, Clone, PartialEq)]
pub struct NewProject {
    pub title: String,
    pub description: Option<String>,
    pub metadata: Metadata,
}

/// One row of the project listing, annotated for the calling user.
///
/// Serializes as the project fields plus `project_members` (the caller's own
/// membership, empty when none was registered) and `learning_stages`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectSummary {
    #[serde(flatten)]
    pub project: Project,
    pub project_members: Vec<MemberRoleView>,
    pub learning_stages: Vec<StageStatusView>,
}

impl ProjectSummary {
    pub fn caller_role(&self) -> Option<super::MemberRole> {
        self.project_members.first().map(|m| m.role)
    }
}
