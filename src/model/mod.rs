//! Domain records for the project tracker
//!
//! Plain serde types shared by the store, the workflows and the HTTP layer.
//! Enum columns are stored as their snake_case names.

/// Maps a fieldless enum to and from its snake_case column value.
macro_rules! column_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::model::UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err($crate::model::UnknownVariant {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

pub mod member;
pub mod project;
pub mod stage;

pub use member::{MemberRole, MemberRoleView, ProjectMember};
pub use project::{
    CreateProjectRequest, Metadata, NewProject, Project, ProjectId, ProjectStatus,
    ProjectSummary, ValidationError,
};
pub use stage::{
    is_valid_stage, stage_name, LearningStage, StageStatus, StageStatusView, FIRST_STAGE,
    STAGE_COUNT, STAGE_NAMES,
};

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Opaque user identifier issued by the identity provider
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A stored enum column held a value outside its allowed set
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} value: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}
