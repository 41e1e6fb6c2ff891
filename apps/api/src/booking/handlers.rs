use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use serde::Deserialize;
use tracing::info;

use crate::auth::AuthUser;
use crate::booking::wizard::{report, BookingDraft, BookingIdentity, BookingWizard, StepReport, WizardStep};
use crate::errors::AppError;
use crate::models::schedule::{ScheduleRow, ScheduleStatus};
use crate::models::service::ServiceRow;
use crate::schedules::handlers::insert_schedule;
use crate::schedules::NewSchedule;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ValidateStepRequest {
    pub step: WizardStep,
    #[serde(default)]
    pub draft: BookingDraft,
}

#[derive(Debug, Deserialize)]
pub struct SubmitBookingRequest {
    pub draft: BookingDraft,
}

/// POST /api/v1/bookings/validate
///
/// Reports whether `step` is complete so the UI can enable its Next button.
pub async fn handle_validate_step(Json(req): Json<ValidateStepRequest>) -> Json<StepReport> {
    Json(report(req.step, &req.draft, Utc::now()))
}

/// POST /api/v1/bookings
///
/// Anonymous callers get `AUTH_REQUIRED` and nothing is written; the UI then
/// shows its inline login/register step and retries.
pub async fn handle_submit_booking(
    State(state): State<AppState>,
    auth: Option<AuthUser>,
    Json(req): Json<SubmitBookingRequest>,
) -> Result<(StatusCode, Json<ScheduleRow>), AppError> {
    let auth = auth.ok_or(AppError::AuthRequired)?;
    let now = Utc::now();

    let identity = BookingIdentity {
        user_id: auth.user.id,
        name: auth.user.name.clone(),
        email: auth.user.email.clone(),
    };
    let request = BookingWizard::resume(req.draft, now)?.submit(Some(&identity), now)?;

    let service = sqlx::query_as::<_, ServiceRow>(
        "SELECT * FROM services WHERE id = $1 AND is_active",
    )
    .bind(request.service_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::Validation("The selected service is not available".to_string()))?;

    let schedule = insert_schedule(
        &state.db,
        &NewSchedule {
            client_id: Some(request.client_id),
            client_name: request.client_name,
            client_email: Some(request.client_email),
            client_phone: Some(request.client_phone),
            service_id: Some(service.id),
            service_type: service.name,
            description: request.description,
            scheduled_at: request.scheduled_at,
            is_online: request.is_online,
            location: request.location,
            meeting_link: None,
            status: ScheduleStatus::Scheduled,
            notes: request.notes,
        },
    )
    .await?;

    info!(
        "Booking {} created for client {} at {}",
        schedule.id, auth.user.id, schedule.scheduled_at
    );
    Ok((StatusCode::CREATED, Json(schedule)))
}
