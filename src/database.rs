use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::migrate::MigrateDatabase;
use sqlx::sqlite::{SqlitePoolOptions, SqliteRow};
use sqlx::{Row, Sqlite, SqlitePool};
use std::collections::HashMap;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::DatabaseConfig;
use crate::model::{
    LearningStage, MemberRole, MemberRoleView, Metadata, Project, ProjectId, ProjectMember,
    ProjectSummary, StageStatus, StageStatusView, UserId,
};
use crate::store::{ProjectStore, StoreError};

const PROJECT_COLUMNS: &str = "id, title, description, status, created_by, current_stage, \
     start_date, end_date, metadata, created_at, updated_at";

/// SQLite-backed project store
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if needed) the configured database and optionally migrate it
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let url = config.url.as_str();

        if is_memory_url(url) {
            return Self::in_memory_with(url, config.auto_migrate).await;
        }

        if !Sqlite::database_exists(url).await? {
            info!("Creating database at {}", url);
            Sqlite::create_database(url).await?;
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect(url)
            .await?;

        let store = Self { pool };
        if config.auto_migrate {
            store.migrate().await?;
        }
        Ok(store)
    }

    /// A private, migrated in-memory database
    pub async fn in_memory() -> Result<Self, StoreError> {
        Self::in_memory_with("sqlite::memory:", true).await
    }

    async fn in_memory_with(url: &str, auto_migrate: bool) -> Result<Self, StoreError> {
        // Every in-memory connection is its own database, so pin exactly one.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect(url)
            .await?;

        let store = Self { pool };
        if auto_migrate {
            store.migrate().await?;
        }
        Ok(store)
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        info!("Running database migrations...");
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Database migrations completed");
        Ok(())
    }

    /// Get database pool for queries
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn stages_for_project(
        &self,
        project_id: ProjectId,
    ) -> Result<Vec<LearningStage>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, project_id, stage_number, stage_name, status, started_at, completed_at,
                   time_spent_minutes, ai_guidance_used, notes, created_at, updated_at
            FROM learning_stages
            WHERE project_id = ?1
            ORDER BY stage_number ASC
            "#,
        )
        .bind(project_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(stage_from_row).collect()
    }

    pub async fn members_for_project(
        &self,
        project_id: ProjectId,
    ) -> Result<Vec<ProjectMember>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, project_id, user_id, role, joined_at
            FROM project_members
            WHERE project_id = ?1
            ORDER BY joined_at ASC
            "#,
        )
        .bind(project_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(member_from_row).collect()
    }

    pub async fn project_count(&self) -> Result<u64, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM projects")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }

    /// Close database connections gracefully
    pub async fn shutdown(&self) {
        info!("Shutting down database connections...");
        self.pool.close().await;
        info!("Database connections closed");
    }
}

#[async_trait]
impl ProjectStore for SqliteStore {
    async fn insert_project(&self, project: &Project) -> Result<Project, StoreError> {
        let metadata = serde_json::to_string(&project.metadata)?;
        let sql = format!(
            r#"
            INSERT INTO projects ({PROJECT_COLUMNS})
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            RETURNING {PROJECT_COLUMNS}
            "#
        );

        let row = sqlx::query(&sql)
            .bind(project.id.to_string())
            .bind(&project.title)
            .bind(project.description.as_deref())
            .bind(project.status.as_str())
            .bind(project.created_by.as_str())
            .bind(i64::from(project.current_stage))
            .bind(timestamp(&project.start_date))
            .bind(project.end_date.as_ref().map(timestamp))
            .bind(metadata)
            .bind(timestamp(&project.created_at))
            .bind(timestamp(&project.updated_at))
            .fetch_one(&self.pool)
            .await?;

        project_from_row(&row)
    }

    async fn initialize_stages(&self, project_id: ProjectId) -> Result<(), StoreError> {
        let stages = LearningStage::seed_all(project_id, Utc::now());
        let mut tx = self.pool.begin().await?;

        for stage in &stages {
            sqlx::query(
                r#"
                INSERT INTO learning_stages
                    (id, project_id, stage_number, stage_name, status,
                     time_spent_minutes, ai_guidance_used, created_at, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                ON CONFLICT (project_id, stage_number) DO NOTHING
                "#,
            )
            .bind(stage.id.to_string())
            .bind(stage.project_id.to_string())
            .bind(i64::from(stage.stage_number))
            .bind(&stage.stage_name)
            .bind(stage.status.as_str())
            .bind(i64::from(stage.time_spent_minutes))
            .bind(stage.ai_guidance_used)
            .bind(timestamp(&stage.created_at))
            .bind(timestamp(&stage.updated_at))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        debug!(project.id = %project_id, stages = stages.len(), "Learning stages seeded");
        Ok(())
    }

    async fn insert_member(&self, member: &ProjectMember) -> Result<ProjectMember, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO project_members (id, project_id, user_id, role, joined_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            RETURNING id, project_id, user_id, role, joined_at
            "#,
        )
        .bind(member.id.to_string())
        .bind(member.project_id.to_string())
        .bind(member.user_id.as_str())
        .bind(member.role.as_str())
        .bind(timestamp(&member.joined_at))
        .fetch_one(&self.pool)
        .await?;

        member_from_row(&row)
    }

    async fn list_projects_for_user(
        &self,
        user: &UserId,
    ) -> Result<Vec<ProjectSummary>, StoreError> {
        let sql = format!(
            r#"
            SELECT {columns}, m.role AS member_role
            FROM projects p
            LEFT JOIN project_members m ON m.project_id = p.id AND m.user_id = ?1
            WHERE p.created_by = ?1 OR m.user_id IS NOT NULL
            ORDER BY p.created_at DESC, p.rowid DESC
            "#,
            columns = PROJECT_COLUMNS
                .split(", ")
                .map(|c| format!("p.{c}"))
                .collect::<Vec<_>>()
                .join(", ")
        );

        let project_rows = sqlx::query(&sql)
            .bind(user.as_str())
            .fetch_all(&self.pool)
            .await?;

        let stage_rows = sqlx::query(
            r#"
            SELECT s.project_id, s.stage_number, s.status
            FROM learning_stages s
            JOIN projects p ON p.id = s.project_id
            LEFT JOIN project_members m ON m.project_id = p.id AND m.user_id = ?1
            WHERE p.created_by = ?1 OR m.user_id IS NOT NULL
            ORDER BY s.stage_number ASC
            "#,
        )
        .bind(user.as_str())
        .fetch_all(&self.pool)
        .await?;

        let mut stages: HashMap<ProjectId, Vec<StageStatusView>> = HashMap::new();
        for row in &stage_rows {
            let project_id = parse_uuid("learning_stages", row.try_get("project_id")?)?;
            stages.entry(project_id).or_default().push(StageStatusView {
                stage_number: parse_stage_number("learning_stages", row.try_get("stage_number")?)?,
                status: parse_column::<StageStatus>("learning_stages", row.try_get("status")?)?,
            });
        }

        project_rows
            .iter()
            .map(|row| {
                let project = project_from_row(row)?;
                let role: Option<String> = row.try_get("member_role")?;
                let project_members = role
                    .map(|r| parse_column::<MemberRole>("project_members", r))
                    .transpose()?
                    .map(|role| MemberRoleView { role })
                    .into_iter()
                    .collect();
                let learning_stages = stages.remove(&project.id).unwrap_or_default();

                Ok(ProjectSummary {
                    project,
                    project_members,
                    learning_stages,
                })
            })
            .collect()
    }
}

fn is_memory_url(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}

/// Fixed-width RFC 3339 so that text ordering matches time ordering
pub(crate) fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(table: &'static str, value: String) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(&value)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| StoreError::corrupt(table, format!("bad timestamp {value:?}: {e}")))
}

fn parse_optional_timestamp(
    table: &'static str,
    value: Option<String>,
) -> Result<Option<DateTime<Utc>>, StoreError> {
    value.map(|v| parse_timestamp(table, v)).transpose()
}

fn parse_uuid(table: &'static str, value: String) -> Result<Uuid, StoreError> {
    Uuid::parse_str(&value).map_err(|e| StoreError::corrupt(table, format!("bad id {value:?}: {e}")))
}

fn parse_column<T>(table: &'static str, value: String) -> Result<T, StoreError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e| StoreError::corrupt(table, e))
}

fn parse_stage_number(table: &'static str, value: i64) -> Result<u8, StoreError> {
    u8::try_from(value)
        .ok()
        .filter(|n| crate::model::is_valid_stage(*n))
        .ok_or_else(|| StoreError::corrupt(table, format!("stage {value} out of range")))
}

fn project_from_row(row: &SqliteRow) -> Result<Project, StoreError> {
    const TABLE: &str = "projects";
    let metadata: String = row.try_get("metadata")?;
    let metadata: Metadata = serde_json::from_str(&metadata)
        .map_err(|e| StoreError::corrupt(TABLE, format!("metadata is not an object: {e}")))?;

    Ok(Project {
        id: parse_uuid(TABLE, row.try_get("id")?)?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        status: parse_column(TABLE, row.try_get("status")?)?,
        created_by: UserId::new(row.try_get::<String, _>("created_by")?),
        current_stage: parse_stage_number(TABLE, row.try_get("current_stage")?)?,
        start_date: parse_timestamp(TABLE, row.try_get("start_date")?)?,
        end_date: parse_optional_timestamp(TABLE, row.try_get("end_date")?)?,
        metadata,
        created_at: parse_timestamp(TABLE, row.try_get("created_at")?)?,
        updated_at: parse_timestamp(TABLE, row.try_get("updated_at")?)?,
    })
}

fn member_from_row(row: &SqliteRow) -> Result<ProjectMember, StoreError> {
    const TABLE: &str = "project_members";
    Ok(ProjectMember {
        id: parse_uuid(TABLE, row.try_get("id")?)?,
        project_id: parse_uuid(TABLE, row.try_get("project_id")?)?,
        user_id: UserId::new(row.try_get::<String, _>("user_id")?),
        role: parse_column(TABLE, row.try_get("role")?)?,
        joined_at: parse_timestamp(TABLE, row.try_get("joined_at")?)?,
    })
}

fn stage_from_row(row: &SqliteRow) -> Result<LearningStage, StoreError> {
    const TABLE: &str = "learning_stages";
    let minutes: i64 = row.try_get("time_spent_minutes")?;

    Ok(LearningStage {
        id: parse_uuid(TABLE, row.try_get("id")?)?,
        project_id: parse_uuid(TABLE, row.try_get("project_id")?)?,
        stage_number: parse_stage_number(TABLE, row.try_get("stage_number")?)?,
        stage_name: row.try_get("stage_name")?,
        status: parse_column(TABLE, row.try_get("status")?)?,
        started_at: parse_optional_timestamp(TABLE, row.try_get("started_at")?)?,
        completed_at: parse_optional_timestamp(TABLE, row.try_get("completed_at")?)?,
        time_spent_minutes: u32::try_from(minutes)
            .map_err(|_| StoreError::corrupt(TABLE, format!("negative minutes {minutes}")))?,
        ai_guidance_used: row.try_get("ai_guidance_used")?,
        notes: row.try_get("notes")?,
        created_at: parse_timestamp(TABLE, row.try_get("created_at")?)?,
        updated_at: parse_timestamp(TABLE, row.try_get("updated_at")?)?,
    })
}
