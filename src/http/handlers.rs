use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, warn, Instrument};

use super::AppState;
use crate::error::{AppError, ErrorBody};
use crate::identity::bearer_token;
use crate::model::{CreateProjectRequest, Project, ProjectSummary, UserId};
use crate::telemetry::{create_request_span, generate_correlation_id};

#[derive(Debug, Serialize)]
pub struct ProjectsResponse {
    pub projects: Vec<ProjectSummary>,
}

#[derive(Debug, Serialize)]
pub struct ProjectResponse {
    pub project: Project,
}

/// GET /projects - List all projects for the current user
pub async fn list_projects(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ProjectsResponse>, AppError> {
    let correlation_id = generate_correlation_id();
    let span = create_request_span("list_projects", &correlation_id);

    async move {
        let caller = authenticate(&state, &headers).await?;
        let projects = state.listing.list(&caller).await?;
        Ok::<_, AppError>(Json(ProjectsResponse { projects }))
    }
    .instrument(span)
    .await
}

/// POST /projects - Create a new project
pub async fn create_project(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<(StatusCode, Json<ProjectResponse>), AppError> {
    let correlation_id = generate_correlation_id();
    let span = create_request_span("create_project", &correlation_id);

    async move {
        let caller = authenticate(&state, &headers).await?;

        // Body rejections surface only once the caller is known.
        let body = body.map_err(|rejection| {
            warn!(error = %rejection, "Request body rejected");
            state.metrics.record_validation_rejection();
            AppError::from(rejection)
        })?;

        let request = CreateProjectRequest::from_slice(&body).map_err(|e| {
            state.metrics.record_validation_rejection();
            AppError::from(e)
        })?;

        let report = state.creation.create(&caller, request).await?;
        if !report.is_fully_initialized() {
            debug!(
                project.id = %report.project.id,
                failed = ?report.failed_actions(),
                "Returning partially initialized project"
            );
        }

        Ok::<_, AppError>((
            StatusCode::CREATED,
            Json(ProjectResponse {
                project: report.project,
            }),
        ))
    }
    .instrument(span)
    .await
}

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let metrics = state.metrics_enabled.then(|| state.metrics.get_stats());
    Json(json!({ "status": "ok", "metrics": metrics }))
}

pub async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorBody {
            error: "Not found".to_string(),
        }),
    )
}

/// Resolve the caller before any other work happens
async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<UserId, AppError> {
    let header_value = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    let resolved = match bearer_token(header_value) {
        Ok(token) => state.identity.resolve(token).await,
        Err(e) => Err(e),
    };

    match resolved {
        Ok(user) => {
            tracing::Span::current().record("user.id", user.as_str());
            Ok(user)
        }
        Err(e) => {
            warn!(error = %e, "Rejecting unauthenticated request");
            state.metrics.record_auth_rejection();
            Err(AppError::from(e))
        }
    }
}
