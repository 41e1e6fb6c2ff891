use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::models::portfolio::PortfolioItemRow;
use crate::portfolio::PortfolioInput;
use crate::state::AppState;
use crate::storage::{read_image_upload, store_image};

#[derive(Debug, Default, Deserialize)]
pub struct PortfolioQuery {
    pub category: Option<String>,
    /// Back-office only: include hidden items.
    #[serde(default)]
    pub all: bool,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct VisibilityToggle {
    pub is_visible: bool,
}

pub async fn list_portfolio(
    db: &sqlx::PgPool,
    include_hidden: bool,
    category: Option<&str>,
    limit: Option<i64>,
) -> Result<Vec<PortfolioItemRow>, AppError> {
    let category = category
        .map(|c| c.trim().to_lowercase())
        .filter(|c| !c.is_empty());

    Ok(sqlx::query_as::<_, PortfolioItemRow>(
        r#"
        SELECT * FROM portfolio_items
        WHERE ($1 OR is_visible)
          AND ($2::TEXT IS NULL OR category = $2)
        ORDER BY completed_on DESC NULLS LAST, created_at DESC
        LIMIT $3
        "#,
    )
    .bind(include_hidden)
    .bind(category)
    .bind(limit.unwrap_or(500).clamp(1, 500))
    .fetch_all(db)
    .await?)
}

/// GET /api/v1/portfolio
pub async fn handle_list_portfolio(
    State(state): State<AppState>,
    auth: Option<AuthUser>,
    Query(params): Query<PortfolioQuery>,
) -> Result<Json<Vec<PortfolioItemRow>>, AppError> {
    let include_hidden = params.all && auth.map(|a| a.role().is_back_office()).unwrap_or(false);
    let items = list_portfolio(
        &state.db,
        include_hidden,
        params.category.as_deref(),
        params.limit,
    )
    .await?;
    Ok(Json(items))
}

/// GET /api/v1/portfolio/:id
pub async fn handle_get_portfolio_item(
    State(state): State<AppState>,
    auth: Option<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<PortfolioItemRow>, AppError> {
    let item = fetch_item(&state, id).await?;
    let back_office = auth.map(|a| a.role().is_back_office()).unwrap_or(false);
    if !item.is_visible && !back_office {
        return Err(AppError::NotFound(format!("Portfolio item {id} not found")));
    }
    Ok(Json(item))
}

async fn fetch_item(state: &AppState, id: Uuid) -> Result<PortfolioItemRow, AppError> {
    sqlx::query_as::<_, PortfolioItemRow>("SELECT * FROM portfolio_items WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Portfolio item {id} not found")))
}

/// POST /api/v1/portfolio
pub async fn handle_create_portfolio_item(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(input): Json<PortfolioInput>,
) -> Result<(StatusCode, Json<PortfolioItemRow>), AppError> {
    auth.require_back_office()?;
    let input = input.validated()?;

    let item = sqlx::query_as::<_, PortfolioItemRow>(
        r#"
        INSERT INTO portfolio_items
            (id, title, category, image_url, description, completed_on, is_visible)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&input.title)
    .bind(&input.category)
    .bind(&input.image_url)
    .bind(&input.description)
    .bind(input.completed_on)
    .bind(input.is_visible)
    .fetch_one(&state.db)
    .await?;

    info!("Created portfolio item {}", item.id);
    Ok((StatusCode::CREATED, Json(item)))
}

/// PUT /api/v1/portfolio/:id
pub async fn handle_update_portfolio_item(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(input): Json<PortfolioInput>,
) -> Result<Json<PortfolioItemRow>, AppError> {
    auth.require_back_office()?;
    let input = input.validated()?;

    let item = sqlx::query_as::<_, PortfolioItemRow>(
        r#"
        UPDATE portfolio_items
        SET title = $2, category = $3, image_url = COALESCE($4, image_url),
            description = $5, completed_on = $6, is_visible = $7, updated_at = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(&input.title)
    .bind(&input.category)
    .bind(&input.image_url)
    .bind(&input.description)
    .bind(input.completed_on)
    .bind(input.is_visible)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Portfolio item {id} not found")))?;

    info!("Updated portfolio item {id}");
    Ok(Json(item))
}

/// PATCH /api/v1/portfolio/:id/visibility
pub async fn handle_toggle_portfolio_visibility(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<VisibilityToggle>,
) -> Result<Json<PortfolioItemRow>, AppError> {
    auth.require_back_office()?;

    let item = sqlx::query_as::<_, PortfolioItemRow>(
        "UPDATE portfolio_items SET is_visible = $2, updated_at = now() WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(req.is_visible)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Portfolio item {id} not found")))?;

    info!("Portfolio item {id} visibility set to {}", req.is_visible);
    Ok(Json(item))
}

/// POST /api/v1/portfolio/:id/image
pub async fn handle_upload_portfolio_image(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<Json<PortfolioItemRow>, AppError> {
    auth.require_back_office()?;
    fetch_item(&state, id).await?;

    let upload = read_image_upload(multipart).await?;
    let url = store_image(&state, &format!("portfolio/{id}"), upload).await?;

    let item = sqlx::query_as::<_, PortfolioItemRow>(
        "UPDATE portfolio_items SET image_url = $2, updated_at = now() WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(&url)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(item))
}

/// DELETE /api/v1/portfolio/:id
pub async fn handle_delete_portfolio_item(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    auth.require_back_office()?;

    let result = sqlx::query("DELETE FROM portfolio_items WHERE id = $1")
        .bind(id)
        .execute(&state.db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Portfolio item {id} not found")));
    }

    info!("Deleted portfolio item {id}");
    Ok(StatusCode::NO_CONTENT)
}
