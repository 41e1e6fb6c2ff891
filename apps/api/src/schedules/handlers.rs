use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::models::schedule::{ScheduleRow, ScheduleStatus};
use crate::schedules::{check_cancellable, parse_status, NewSchedule, ScheduleInput};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ScheduleQuery {
    pub status: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct StatusChange {
    pub status: String,
}

pub async fn insert_schedule(db: &PgPool, schedule: &NewSchedule) -> Result<ScheduleRow, AppError> {
    Ok(sqlx::query_as::<_, ScheduleRow>(
        r#"
        INSERT INTO schedules
            (id, client_id, client_name, client_email, client_phone, service_id, service_type,
             description, scheduled_at, is_online, location, meeting_link, status, notes)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(schedule.client_id)
    .bind(&schedule.client_name)
    .bind(&schedule.client_email)
    .bind(&schedule.client_phone)
    .bind(schedule.service_id)
    .bind(&schedule.service_type)
    .bind(&schedule.description)
    .bind(schedule.scheduled_at)
    .bind(schedule.is_online)
    .bind(&schedule.location)
    .bind(&schedule.meeting_link)
    .bind(schedule.status.as_str())
    .bind(&schedule.notes)
    .fetch_one(db)
    .await?)
}

async fn fetch_schedule(state: &AppState, id: Uuid) -> Result<ScheduleRow, AppError> {
    sqlx::query_as::<_, ScheduleRow>("SELECT * FROM schedules WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Schedule {id} not found")))
}

/// GET /api/v1/schedules
pub async fn handle_list_schedules(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<ScheduleQuery>,
) -> Result<Json<Vec<ScheduleRow>>, AppError> {
    auth.require_back_office()?;
    let status = params
        .status
        .as_deref()
        .map(parse_status)
        .transpose()?
        .map(|s| s.as_str());

    let schedules = sqlx::query_as::<_, ScheduleRow>(
        r#"
        SELECT * FROM schedules
        WHERE ($1::TEXT IS NULL OR status = $1)
          AND ($2::TIMESTAMPTZ IS NULL OR scheduled_at >= $2)
          AND ($3::TIMESTAMPTZ IS NULL OR scheduled_at < $3)
        ORDER BY scheduled_at ASC
        "#,
    )
    .bind(status)
    .bind(params.from)
    .bind(params.to)
    .fetch_all(&state.db)
    .await?;
    Ok(Json(schedules))
}

/// GET /api/v1/schedules/:id
pub async fn handle_get_schedule(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ScheduleRow>, AppError> {
    let schedule = fetch_schedule(&state, id).await?;
    if !auth.role().is_back_office() && schedule.client_id != Some(auth.user.id) {
        return Err(AppError::NotFound(format!("Schedule {id} not found")));
    }
    Ok(Json(schedule))
}

/// POST /api/v1/schedules
pub async fn handle_create_schedule(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(input): Json<ScheduleInput>,
) -> Result<(StatusCode, Json<ScheduleRow>), AppError> {
    auth.require_back_office()?;
    let schedule = insert_schedule(&state.db, &input.validated()?).await?;
    info!("Created schedule {} at {}", schedule.id, schedule.scheduled_at);
    Ok((StatusCode::CREATED, Json(schedule)))
}

/// PUT /api/v1/schedules/:id
pub async fn handle_update_schedule(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(input): Json<ScheduleInput>,
) -> Result<Json<ScheduleRow>, AppError> {
    auth.require_back_office()?;
    let s = input.validated()?;

    let schedule = sqlx::query_as::<_, ScheduleRow>(
        r#"
        UPDATE schedules
        SET client_id = $2, client_name = $3, client_email = $4, client_phone = $5,
            service_id = $6, service_type = $7, description = $8, scheduled_at = $9,
            is_online = $10, location = $11, meeting_link = $12, status = $13, notes = $14,
            updated_at = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(s.client_id)
    .bind(&s.client_name)
    .bind(&s.client_email)
    .bind(&s.client_phone)
    .bind(s.service_id)
    .bind(&s.service_type)
    .bind(&s.description)
    .bind(s.scheduled_at)
    .bind(s.is_online)
    .bind(&s.location)
    .bind(&s.meeting_link)
    .bind(s.status.as_str())
    .bind(&s.notes)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Schedule {id} not found")))?;

    info!("Updated schedule {id}");
    Ok(Json(schedule))
}

/// PATCH /api/v1/schedules/:id/status
pub async fn handle_change_schedule_status(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<StatusChange>,
) -> Result<Json<ScheduleRow>, AppError> {
    auth.require_back_office()?;
    let status = parse_status(&req.status)?;

    let schedule = sqlx::query_as::<_, ScheduleRow>(
        "UPDATE schedules SET status = $2, updated_at = now() WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(status.as_str())
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Schedule {id} not found")))?;

    info!("Schedule {id} marked {}", schedule.status);
    Ok(Json(schedule))
}

/// DELETE /api/v1/schedules/:id
pub async fn handle_delete_schedule(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    auth.require_back_office()?;

    let result = sqlx::query("DELETE FROM schedules WHERE id = $1")
        .bind(id)
        .execute(&state.db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Schedule {id} not found")));
    }

    info!("Deleted schedule {id}");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_client_schedules(
    db: &PgPool,
    client_id: Uuid,
    upcoming_only: bool,
) -> Result<Vec<ScheduleRow>, AppError> {
    Ok(sqlx::query_as::<_, ScheduleRow>(
        r#"
        SELECT * FROM schedules
        WHERE client_id = $1
          AND (NOT $2 OR (scheduled_at >= now() AND status = 'scheduled'))
        ORDER BY scheduled_at ASC
        "#,
    )
    .bind(client_id)
    .bind(upcoming_only)
    .fetch_all(db)
    .await?)
}

/// GET /api/v1/me/schedules
pub async fn handle_my_schedules(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<ScheduleRow>>, AppError> {
    Ok(Json(list_client_schedules(&state.db, auth.user.id, false).await?))
}

/// POST /api/v1/me/schedules/:id/cancel
pub async fn handle_cancel_my_schedule(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ScheduleRow>, AppError> {
    let schedule = fetch_schedule(&state, id).await?;
    if schedule.client_id != Some(auth.user.id) {
        return Err(AppError::NotFound(format!("Schedule {id} not found")));
    }
    check_cancellable(id, &schedule.status)?;

    // Only a still-scheduled row transitions.
    let updated = sqlx::query_as::<_, ScheduleRow>(
        r#"
        UPDATE schedules SET status = $2, updated_at = now()
        WHERE id = $1 AND status = $3
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(ScheduleStatus::Cancelled.as_str())
    .bind(ScheduleStatus::Scheduled.as_str())
    .fetch_optional(&state.db)
    .await?;

    let Some(schedule) = updated else {
        let current = fetch_schedule(&state, id).await?;
        check_cancellable(id, &current.status)?;
        return Err(AppError::Conflict(format!("Schedule {id} changed concurrently")));
    };

    info!("Client {} cancelled schedule {id}", auth.user.id);
    Ok(Json(schedule))
}
