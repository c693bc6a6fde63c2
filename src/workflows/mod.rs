// Project workflows: the creation pipeline and the per-user listing

pub mod project_creation;
pub mod project_listing;

pub use project_creation::{
    CreationReport, PostAction, PostActionOutcome, PostActionRecord, ProjectCreationWorkflow,
};
pub use project_listing::ProjectListing;
