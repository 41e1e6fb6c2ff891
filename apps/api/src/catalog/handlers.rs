use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::catalog::ServiceInput;
use crate::errors::AppError;
use crate::models::service::ServiceRow;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    /// Back-office only: include inactive and hidden services.
    #[serde(default)]
    pub all: bool,
}

#[derive(Debug, Deserialize)]
pub struct VisibilityToggle {
    pub is_visible: bool,
}

pub async fn list_public_services(db: &sqlx::PgPool) -> Result<Vec<ServiceRow>, AppError> {
    Ok(sqlx::query_as::<_, ServiceRow>(
        "SELECT * FROM services WHERE is_active AND is_visible ORDER BY sort_order, name",
    )
    .fetch_all(db)
    .await?)
}

/// GET /api/v1/services
pub async fn handle_list_services(
    State(state): State<AppState>,
    auth: Option<AuthUser>,
    Query(params): Query<ListQuery>,
) -> Result<Json<Vec<ServiceRow>>, AppError> {
    let include_all = params.all && auth.map(|a| a.role().is_back_office()).unwrap_or(false);
    if !include_all {
        return Ok(Json(list_public_services(&state.db).await?));
    }

    let services =
        sqlx::query_as::<_, ServiceRow>("SELECT * FROM services ORDER BY sort_order, name")
            .fetch_all(&state.db)
            .await?;
    Ok(Json(services))
}

/// GET /api/v1/services/:id
pub async fn handle_get_service(
    State(state): State<AppState>,
    auth: Option<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<ServiceRow>, AppError> {
    let service = sqlx::query_as::<_, ServiceRow>("SELECT * FROM services WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Service {id} not found")))?;

    let back_office = auth.map(|a| a.role().is_back_office()).unwrap_or(false);
    if !back_office && !(service.is_active && service.is_visible) {
        return Err(AppError::NotFound(format!("Service {id} not found")));
    }
    Ok(Json(service))
}

/// POST /api/v1/services
pub async fn handle_create_service(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(input): Json<ServiceInput>,
) -> Result<(StatusCode, Json<ServiceRow>), AppError> {
    auth.require_back_office()?;
    let input = input.validated()?;

    let service = sqlx::query_as::<_, ServiceRow>(
        r#"
        INSERT INTO services
            (id, name, description, price, category, features, is_active, is_visible, sort_order)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&input.name)
    .bind(&input.description)
    .bind(input.price)
    .bind(&input.category)
    .bind(&input.features)
    .bind(input.is_active)
    .bind(input.is_visible)
    .bind(input.sort_order)
    .fetch_one(&state.db)
    .await?;

    info!("Created service {}", service.id);
    Ok((StatusCode::CREATED, Json(service)))
}

/// PUT /api/v1/services/:id
pub async fn handle_update_service(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(input): Json<ServiceInput>,
) -> Result<Json<ServiceRow>, AppError> {
    auth.require_back_office()?;
    let input = input.validated()?;

    let service = sqlx::query_as::<_, ServiceRow>(
        r#"
        UPDATE services
        SET name = $2, description = $3, price = $4, category = $5, features = $6,
            is_active = $7, is_visible = $8, sort_order = $9, updated_at = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(&input.name)
    .bind(&input.description)
    .bind(input.price)
    .bind(&input.category)
    .bind(&input.features)
    .bind(input.is_active)
    .bind(input.is_visible)
    .bind(input.sort_order)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Service {id} not found")))?;

    info!("Updated service {id}");
    Ok(Json(service))
}

/// PATCH /api/v1/services/:id/visibility
pub async fn handle_toggle_service_visibility(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<VisibilityToggle>,
) -> Result<Json<ServiceRow>, AppError> {
    auth.require_back_office()?;

    let service = sqlx::query_as::<_, ServiceRow>(
        "UPDATE services SET is_visible = $2, updated_at = now() WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(req.is_visible)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Service {id} not found")))?;

    info!("Service {id} visibility set to {}", req.is_visible);
    Ok(Json(service))
}

/// DELETE /api/v1/services/:id
pub async fn handle_delete_service(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    auth.require_back_office()?;

    let result = sqlx::query("DELETE FROM services WHERE id = $1")
        .bind(id)
        .execute(&state.db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Service {id} not found")));
    }

    info!("Deleted service {id}");
    Ok(StatusCode::NO_CONTENT)
}
