use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ProjectId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberRole {
    Owner,
    Admin,
    Member,
    Viewer,
}

column_enum!(MemberRole, "member role", {
    Owner => "owner",
    Admin => "admin",
    Member => "member",
    Viewer => "viewer",
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectMember {
    pub id: Uuid,
    pub project_id: ProjectId,
    pub user_id: UserId,
    pub role: MemberRole,
    pub joined_at: DateTime<Utc>,
}

impl ProjectMember {
    pub fn owner(project_id: ProjectId, user_id: UserId, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            project_id,
            user_id,
            role: MemberRole::Owner,
            joined_at: now,
        }
    }
}

/// The caller's role as embedded in project listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberRoleView {
    pub role: MemberRole,
}
