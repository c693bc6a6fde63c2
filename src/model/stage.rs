use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ProjectId;

/// Every project moves through exactly this many stages
pub const STAGE_COUNT: u8 = 6;

pub const FIRST_STAGE: u8 = 1;

/// Canonical stage names, indexed by `stage_number - 1`
pub const STAGE_NAMES: [&str; STAGE_COUNT as usize] = [
    "Problem Identification",
    "Research & Inquiry",
    "Planning & Design",
    "Implementation",
    "Testing & Evaluation",
    "Presentation & Reflection",
];

pub fn is_valid_stage(stage_number: u8) -> bool {
    (FIRST_STAGE..=STAGE_COUNT).contains(&stage_number)
}

pub fn stage_name(stage_number: u8) -> Option<&'static str> {
    if is_valid_stage(stage_number) {
        Some(STAGE_NAMES[usize::from(stage_number - 1)])
    } else {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    NotStarted,
    InProgress,
    Completed,
    Blocked,
}

column_enum!(StageStatus, "stage status", {
    NotStarted => "not_started",
    InProgress => "in_progress",
    Completed => "completed",
    Blocked => "blocked",
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningStage {
    pub id: Uuid,
    pub project_id: ProjectId,
    pub stage_number: u8,
    pub stage_name: String,
    pub status: StageStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub time_spent_minutes: u32,
    pub ai_guidance_used: bool,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LearningStage {
    /// The full, not-yet-started stage set for a freshly created project.
    pub fn seed_all(project_id: ProjectId, now: DateTime<Utc>) -> Vec<Self> {
        (FIRST_STAGE..=STAGE_COUNT)
            .zip(STAGE_NAMES)
            .map(|(stage_number, name)| Self {
                id: Uuid::new_v4(),
                project_id,
                stage_number,
                stage_name: name.to_string(),
                status: StageStatus::NotStarted,
                started_at: None,
                completed_at: None,
                time_spent_minutes: 0,
                ai_guidance_used: false,
                notes: None,
                created_at: now,
                updated_at: now,
            })
            .collect()
    }
}

/// Stage progress as embedded in project listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageStatusView {
    pub stage_number: u8,
    pub status: StageStatus,
}
