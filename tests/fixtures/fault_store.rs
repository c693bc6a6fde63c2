use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use pbl_tracker::model::{Project, ProjectId, ProjectMember, ProjectSummary, UserId};
use pbl_tracker::{ProjectStore, SqliteStore, StoreError};

/// A store operation that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    InsertProject,
    InitializeStages,
    InsertMember,
    ListProjects,
}

/// Wraps a real SQLite store; selected steps fail without touching the database,
/// so partial states are observable through the inner store afterwards.
#[derive(Debug)]
pub struct FaultInjectingStore {
    inner: SqliteStore,
    fail_insert_project: AtomicBool,
    fail_initialize_stages: AtomicBool,
    fail_insert_member: AtomicBool,
    fail_list_projects: AtomicBool,
    calls: AtomicUsize,
}

impl FaultInjectingStore {
    pub fn new(inner: SqliteStore) -> Self {
        Self {
            inner,
            fail_insert_project: AtomicBool::new(false),
            fail_initialize_stages: AtomicBool::new(false),
            fail_insert_member: AtomicBool::new(false),
            fail_list_projects: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn inner(&self) -> &SqliteStore {
        &self.inner
    }

    pub fn fail(&self, step: Step) {
        self.flag(step).store(true, Ordering::SeqCst);
    }

    pub fn heal(&self, step: Step) {
        self.flag(step).store(false, Ordering::SeqCst);
    }

    /// Store calls seen so far, failed ones included
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn flag(&self, step: Step) -> &AtomicBool {
        match step {
            Step::InsertProject => &self.fail_insert_project,
            Step::InitializeStages => &self.fail_initialize_stages,
            Step::InsertMember => &self.fail_insert_member,
            Step::ListProjects => &self.fail_list_projects,
        }
    }

    fn check(&self, step: Step) -> Result<(), StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.flag(step).load(Ordering::SeqCst) {
            Err(StoreError::Database(sqlx::Error::Protocol(format!(
                "injected failure in {step:?}"
            ))))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ProjectStore for FaultInjectingStore {
    async fn insert_project(&self, project: &Project) -> Result<Project, StoreError> {
        self.check(Step::InsertProject)?;
        self.inner.insert_project(project).await
    }

    async fn initialize_stages(&self, project_id: ProjectId) -> Result<(), StoreError> {
        self.check(Step::InitializeStages)?;
        self.inner.initialize_stages(project_id).await
    }

    async fn insert_member(&self, member: &ProjectMember) -> Result<ProjectMember, StoreError> {
        self.check(Step::InsertMember)?;
        self.inner.insert_member(member).await
    }

    async fn list_projects_for_user(
        &self,
        user: &UserId,
    ) -> Result<Vec<ProjectSummary>, StoreError> {
        self.check(Step::ListProjects)?;
        self.inner.list_projects_for_user(user).await
    }
}
