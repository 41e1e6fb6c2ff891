use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::catalog::handlers::list_public_services;
use crate::errors::AppError;
use crate::models::contact::ContactInquiryRow;
use crate::models::portfolio::PortfolioItemRow;
use crate::models::service::ServiceRow;
use crate::portfolio::handlers::list_portfolio;
use crate::site::{ContactInput, HOME_PORTFOLIO_LIMIT};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HomeResponse {
    pub services: Vec<ServiceRow>,
    pub portfolio: Vec<PortfolioItemRow>,
}

#[derive(Debug, Deserialize)]
pub struct HandledUpdate {
    pub handled: bool,
}

/// GET /api/v1/site/home
pub async fn handle_home(State(state): State<AppState>) -> Result<Json<HomeResponse>, AppError> {
    let services = list_public_services(&state.db).await?;
    let portfolio = list_portfolio(&state.db, false, None, Some(HOME_PORTFOLIO_LIMIT)).await?;
    Ok(Json(HomeResponse {
        services,
        portfolio,
    }))
}

/// POST /api/v1/contact
pub async fn handle_submit_contact(
    State(state): State<AppState>,
    Json(body): Json<ContactInput>,
) -> Result<(StatusCode, Json<ContactInquiryRow>), AppError> {
    let inquiry = body.validated()?;

    let row = sqlx::query_as::<_, ContactInquiryRow>(
        r#"
        INSERT INTO contact_inquiries (id, name, email, phone, message)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&inquiry.name)
    .bind(&inquiry.email)
    .bind(&inquiry.phone)
    .bind(&inquiry.message)
    .fetch_one(&state.db)
    .await?;

    info!("Contact inquiry {} received", row.id);
    Ok((StatusCode::CREATED, Json(row)))
}

/// GET /api/v1/contact
pub async fn handle_list_inquiries(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<ContactInquiryRow>>, AppError> {
    auth.require_back_office()?;
    let rows = sqlx::query_as::<_, ContactInquiryRow>(
        "SELECT * FROM contact_inquiries ORDER BY handled ASC, created_at DESC",
    )
    .fetch_all(&state.db)
    .await?;
    Ok(Json(rows))
}

/// PATCH /api/v1/contact/:id
pub async fn handle_mark_inquiry(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<HandledUpdate>,
) -> Result<Json<ContactInquiryRow>, AppError> {
    auth.require_back_office()?;
    let row = sqlx::query_as::<_, ContactInquiryRow>(
        "UPDATE contact_inquiries SET handled = $2 WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(body.handled)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Inquiry {id} not found")))?;
    Ok(Json(row))
}
