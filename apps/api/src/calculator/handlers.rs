use axum::{extract::State, Json};
use tracing::info;

use crate::auth::AuthUser;
use crate::calculator::estimate::{compute_estimate, Estimate, EstimateRequest};
use crate::calculator::settings::{load_or_seed_settings, save_settings, CalculatorSettings};
use crate::errors::AppError;
use crate::state::AppState;

/// GET /api/v1/calculator/settings
pub async fn handle_get_settings(
    State(state): State<AppState>,
) -> Result<Json<CalculatorSettings>, AppError> {
    Ok(Json(load_or_seed_settings(&state.db).await?))
}

/// PUT /api/v1/calculator/settings
pub async fn handle_update_settings(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(settings): Json<CalculatorSettings>,
) -> Result<Json<CalculatorSettings>, AppError> {
    auth.require_back_office()?;
    let settings = settings.validated()?;
    save_settings(&state.db, &settings).await?;
    info!("Calculator settings updated by {}", auth.user.id);
    Ok(Json(settings))
}

/// POST /api/v1/calculator/estimate
pub async fn handle_estimate(
    State(state): State<AppState>,
    Json(request): Json<EstimateRequest>,
) -> Result<Json<Estimate>, AppError> {
    let settings = load_or_seed_settings(&state.db).await?;
    Ok(Json(compute_estimate(&settings, &request)?))
}
