use std::collections::BTreeMap;

use axum::{extract::State, Json};
use serde::Serialize;

use crate::auth::AuthUser;
use crate::dashboard::{active_projects, status_counts};
use crate::errors::AppError;
use crate::models::chat::ConversationKind;
use crate::models::project::ProjectRow;
use crate::models::schedule::{ScheduleRow, ScheduleStatus};
use crate::models::user::Role;
use crate::projects::handlers::list_client_projects;
use crate::schedules::handlers::list_client_schedules;
use crate::state::AppState;

const UPCOMING_DAYS: i32 = 7;

#[derive(Debug, Serialize)]
pub struct AdminDashboard {
    pub projects_by_status: BTreeMap<&'static str, i64>,
    pub upcoming_schedules: Vec<ScheduleRow>,
    pub unread_conversations: i64,
    pub client_count: i64,
    pub open_inquiries: i64,
}

#[derive(Debug, Serialize)]
pub struct ClientDashboard {
    pub active_projects: Vec<ProjectRow>,
    pub upcoming_schedules: Vec<ScheduleRow>,
    pub unread_messages: i32,
}

/// GET /api/v1/admin/dashboard
pub async fn handle_admin_dashboard(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<AdminDashboard>, AppError> {
    auth.require_back_office()?;

    let status_rows: Vec<(String, i64)> =
        sqlx::query_as("SELECT status, COUNT(*) FROM projects GROUP BY status")
            .fetch_all(&state.db)
            .await?;

    let upcoming_schedules = sqlx::query_as::<_, ScheduleRow>(
        r#"
        SELECT * FROM schedules
        WHERE status = $1
          AND scheduled_at >= now()
          AND scheduled_at < now() + make_interval(days => $2)
        ORDER BY scheduled_at ASC
        "#,
    )
    .bind(ScheduleStatus::Scheduled.as_str())
    .bind(UPCOMING_DAYS)
    .fetch_all(&state.db)
    .await?;

    let unread_conversations: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM conversations WHERE unread_admin > 0")
            .fetch_one(&state.db)
            .await?;

    let client_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = $1")
        .bind(Role::Client.as_str())
        .fetch_one(&state.db)
        .await?;

    let open_inquiries: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM contact_inquiries WHERE NOT handled")
            .fetch_one(&state.db)
            .await?;

    Ok(Json(AdminDashboard {
        projects_by_status: status_counts(&status_rows),
        upcoming_schedules,
        unread_conversations,
        client_count,
        open_inquiries,
    }))
}

/// GET /api/v1/me/dashboard
pub async fn handle_my_dashboard(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ClientDashboard>, AppError> {
    let user_id = auth.user.id;
    let projects = list_client_projects(&state.db, user_id).await?;
    let upcoming_schedules = list_client_schedules(&state.db, user_id, true).await?;

    let unread_messages: Option<i32> = sqlx::query_scalar(
        "SELECT unread_participant FROM conversations WHERE kind = $1 AND owner_id = $2",
    )
    .bind(ConversationKind::Client.as_str())
    .bind(user_id)
    .fetch_optional(&state.db)
    .await?;

    Ok(Json(ClientDashboard {
        active_projects: active_projects(projects),
        upcoming_schedules,
        unread_messages: unread_messages.unwrap_or(0),
    }))
}
