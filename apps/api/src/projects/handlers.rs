use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::models::project::ProjectRow;
use crate::projects::{apply_progress_update, parse_status, ProgressUpdate, ProjectInput};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ProjectQuery {
    pub status: Option<String>,
}

/// Falls back to the linked user's name when the form left it blank.
async fn resolve_client_name(
    state: &AppState,
    client_id: Option<Uuid>,
    client_name: String,
) -> Result<String, AppError> {
    if !client_name.is_empty() {
        return Ok(client_name);
    }
    let Some(client_id) = client_id else {
        return Ok(client_name);
    };
    let name: Option<String> = sqlx::query_scalar("SELECT name FROM users WHERE id = $1")
        .bind(client_id)
        .fetch_optional(&state.db)
        .await?;
    name.ok_or_else(|| AppError::Validation(format!("Client {client_id} does not exist")))
}

async fn fetch_project(state: &AppState, id: Uuid) -> Result<ProjectRow, AppError> {
    sqlx::query_as::<_, ProjectRow>("SELECT * FROM projects WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Project {id} not found")))
}

/// GET /api/v1/projects
pub async fn handle_list_projects(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<ProjectQuery>,
) -> Result<Json<Vec<ProjectRow>>, AppError> {
    auth.require_back_office()?;
    let status = params
        .status
        .as_deref()
        .map(parse_status)
        .transpose()?
        .map(|s| s.as_str());

    let projects = sqlx::query_as::<_, ProjectRow>(
        r#"
        SELECT * FROM projects
        WHERE ($1::TEXT IS NULL OR status = $1)
        ORDER BY updated_at DESC
        "#,
    )
    .bind(status)
    .fetch_all(&state.db)
    .await?;
    Ok(Json(projects))
}

/// GET /api/v1/projects/:id
pub async fn handle_get_project(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ProjectRow>, AppError> {
    let project = fetch_project(&state, id).await?;
    if !auth.role().is_back_office() && project.client_id != Some(auth.user.id) {
        return Err(AppError::NotFound(format!("Project {id} not found")));
    }
    Ok(Json(project))
}

/// POST /api/v1/projects
pub async fn handle_create_project(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(input): Json<ProjectInput>,
) -> Result<(StatusCode, Json<ProjectRow>), AppError> {
    auth.require_back_office()?;
    let input = input.validated()?;
    let client_name = resolve_client_name(&state, input.client_id, input.client_name).await?;

    let project = sqlx::query_as::<_, ProjectRow>(
        r#"
        INSERT INTO projects
            (id, name, client_id, client_name, status, progress, description, started_on)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&input.name)
    .bind(input.client_id)
    .bind(&client_name)
    .bind(input.status.as_str())
    .bind(input.progress)
    .bind(&input.description)
    .bind(input.started_on)
    .fetch_one(&state.db)
    .await?;

    info!("Created project {} ({})", project.id, project.status);
    Ok((StatusCode::CREATED, Json(project)))
}

/// PUT /api/v1/projects/:id
pub async fn handle_update_project(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(input): Json<ProjectInput>,
) -> Result<Json<ProjectRow>, AppError> {
    auth.require_back_office()?;
    let input = input.validated()?;
    let client_name = resolve_client_name(&state, input.client_id, input.client_name).await?;

    let project = sqlx::query_as::<_, ProjectRow>(
        r#"
        UPDATE projects
        SET name = $2, client_id = $3, client_name = $4, status = $5, progress = $6,
            description = $7, started_on = $8, updated_at = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(&input.name)
    .bind(input.client_id)
    .bind(&client_name)
    .bind(input.status.as_str())
    .bind(input.progress)
    .bind(&input.description)
    .bind(input.started_on)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Project {id} not found")))?;

    info!("Updated project {id}");
    Ok(Json(project))
}

/// PATCH /api/v1/projects/:id/progress
pub async fn handle_update_progress(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(update): Json<ProgressUpdate>,
) -> Result<Json<ProjectRow>, AppError> {
    auth.require_back_office()?;
    let current = fetch_project(&state, id).await?;
    let (status, progress) = apply_progress_update(&current.status, current.progress, &update)?;

    // Last write wins; concurrent edits are not detected.
    let project = sqlx::query_as::<_, ProjectRow>(
        r#"
        UPDATE projects SET status = $2, progress = $3, updated_at = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(status.as_str())
    .bind(progress)
    .fetch_one(&state.db)
    .await?;

    info!("Project {id} now {} at {}%", project.status, project.progress);
    Ok(Json(project))
}

/// DELETE /api/v1/projects/:id
pub async fn handle_delete_project(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    auth.require_back_office()?;

    let result = sqlx::query("DELETE FROM projects WHERE id = $1")
        .bind(id)
        .execute(&state.db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Project {id} not found")));
    }

    info!("Deleted project {id}");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_client_projects(
    db: &sqlx::PgPool,
    client_id: Uuid,
) -> Result<Vec<ProjectRow>, AppError> {
    Ok(sqlx::query_as::<_, ProjectRow>(
        "SELECT * FROM projects WHERE client_id = $1 ORDER BY updated_at DESC",
    )
    .bind(client_id)
    .fetch_all(db)
    .await?)
}

/// GET /api/v1/me/projects
pub async fn handle_my_projects(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<ProjectRow>>, AppError> {
    Ok(Json(list_client_projects(&state.db, auth.user.id).await?))
}
