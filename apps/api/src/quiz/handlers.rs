use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::models::quiz::{QuizQuestionRow, QuizStyleRow};
use crate::quiz::scoring::{tally, QuizAnswer, QuizResult};
use crate::state::AppState;
use crate::validation::{optional_text, require_text};

#[derive(Debug, Serialize)]
pub struct QuizResponse {
    pub styles: Vec<QuizStyleRow>,
    pub questions: Vec<QuizQuestionRow>,
}

#[derive(Debug, Deserialize)]
pub struct SubmitQuizRequest {
    pub answers: Vec<QuizAnswer>,
}

#[derive(Debug, Deserialize)]
pub struct QuestionInput {
    pub question: String,
    pub image_url: Option<String>,
    pub style_slug: String,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct StyleInput {
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub image_url: Option<String>,
    #[serde(default)]
    pub sort_order: i32,
}

/// Slugs are lower-case ASCII letters, digits and dashes.
pub fn normalize_slug(value: &str) -> Result<String, AppError> {
    let slug = value.trim().to_lowercase();
    if slug.is_empty() || !slug.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(AppError::Validation(format!("'{value}' is not a valid style slug")));
    }
    Ok(slug)
}

async fn load_styles(db: &PgPool) -> Result<Vec<QuizStyleRow>, AppError> {
    Ok(
        sqlx::query_as::<_, QuizStyleRow>("SELECT * FROM quiz_styles ORDER BY sort_order, slug")
            .fetch_all(db)
            .await?,
    )
}

async fn load_questions(db: &PgPool, active_only: bool) -> Result<Vec<QuizQuestionRow>, AppError> {
    Ok(sqlx::query_as::<_, QuizQuestionRow>(
        r#"
        SELECT * FROM quiz_questions
        WHERE (NOT $1 OR is_active)
        ORDER BY sort_order, created_at
        "#,
    )
    .bind(active_only)
    .fetch_all(db)
    .await?)
}

async fn ensure_style_exists(db: &PgPool, slug: &str) -> Result<(), AppError> {
    let exists: Option<Uuid> = sqlx::query_scalar("SELECT id FROM quiz_styles WHERE slug = $1")
        .bind(slug)
        .fetch_optional(db)
        .await?;
    if exists.is_none() {
        return Err(AppError::Validation(format!("Style '{slug}' does not exist")));
    }
    Ok(())
}

/// GET /api/v1/quiz
pub async fn handle_get_quiz(State(state): State<AppState>) -> Result<Json<QuizResponse>, AppError> {
    Ok(Json(QuizResponse {
        styles: load_styles(&state.db).await?,
        questions: load_questions(&state.db, true).await?,
    }))
}

/// POST /api/v1/quiz/submit
pub async fn handle_submit_quiz(
    State(state): State<AppState>,
    Json(req): Json<SubmitQuizRequest>,
) -> Result<Json<QuizResult>, AppError> {
    if req.answers.is_empty() {
        return Err(AppError::Validation("answers cannot be empty".to_string()));
    }
    let styles = load_styles(&state.db).await?;
    let questions = load_questions(&state.db, true).await?;
    Ok(Json(tally(&styles, &questions, &req.answers)))
}

/// GET /api/v1/quiz/questions
pub async fn handle_list_questions(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<QuizQuestionRow>>, AppError> {
    auth.require_back_office()?;
    Ok(Json(load_questions(&state.db, false).await?))
}

/// POST /api/v1/quiz/questions
pub async fn handle_create_question(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(input): Json<QuestionInput>,
) -> Result<(StatusCode, Json<QuizQuestionRow>), AppError> {
    auth.require_back_office()?;
    let question = require_text("question", &input.question)?;
    let style_slug = normalize_slug(&input.style_slug)?;
    ensure_style_exists(&state.db, &style_slug).await?;

    let row = sqlx::query_as::<_, QuizQuestionRow>(
        r#"
        INSERT INTO quiz_questions (id, question, image_url, style_slug, sort_order, is_active)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&question)
    .bind(optional_text(input.image_url.as_deref()))
    .bind(&style_slug)
    .bind(input.sort_order)
    .bind(input.is_active)
    .fetch_one(&state.db)
    .await?;

    info!("Created quiz question {}", row.id);
    Ok((StatusCode::CREATED, Json(row)))
}

/// PUT /api/v1/quiz/questions/:id
pub async fn handle_update_question(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(input): Json<QuestionInput>,
) -> Result<Json<QuizQuestionRow>, AppError> {
    auth.require_back_office()?;
    let question = require_text("question", &input.question)?;
    let style_slug = normalize_slug(&input.style_slug)?;
    ensure_style_exists(&state.db, &style_slug).await?;

    let row = sqlx::query_as::<_, QuizQuestionRow>(
        r#"
        UPDATE quiz_questions
        SET question = $2, image_url = $3, style_slug = $4, sort_order = $5, is_active = $6
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(&question)
    .bind(optional_text(input.image_url.as_deref()))
    .bind(&style_slug)
    .bind(input.sort_order)
    .bind(input.is_active)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Quiz question {id} not found")))?;

    info!("Updated quiz question {id}");
    Ok(Json(row))
}

/// DELETE /api/v1/quiz/questions/:id
pub async fn handle_delete_question(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    auth.require_back_office()?;
    let result = sqlx::query("DELETE FROM quiz_questions WHERE id = $1")
        .bind(id)
        .execute(&state.db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Quiz question {id} not found")));
    }
    info!("Deleted quiz question {id}");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/quiz/styles
pub async fn handle_create_style(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(input): Json<StyleInput>,
) -> Result<(StatusCode, Json<QuizStyleRow>), AppError> {
    auth.require_back_office()?;
    let slug = normalize_slug(&input.slug)?;
    let name = require_text("name", &input.name)?;

    let row = sqlx::query_as::<_, QuizStyleRow>(
        r#"
        INSERT INTO quiz_styles (id, slug, name, description, image_url, sort_order)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&slug)
    .bind(&name)
    .bind(input.description.trim())
    .bind(optional_text(input.image_url.as_deref()))
    .bind(input.sort_order)
    .fetch_one(&state.db)
    .await?;

    info!("Created design style {}", row.slug);
    Ok((StatusCode::CREATED, Json(row)))
}

/// PUT /api/v1/quiz/styles/:id
///
/// Renaming a slug carries its questions along (ON UPDATE CASCADE).
pub async fn handle_update_style(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(input): Json<StyleInput>,
) -> Result<Json<QuizStyleRow>, AppError> {
    auth.require_back_office()?;
    let slug = normalize_slug(&input.slug)?;
    let name = require_text("name", &input.name)?;

    let row = sqlx::query_as::<_, QuizStyleRow>(
        r#"
        UPDATE quiz_styles
        SET slug = $2, name = $3, description = $4, image_url = $5, sort_order = $6
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(&slug)
    .bind(&name)
    .bind(input.description.trim())
    .bind(optional_text(input.image_url.as_deref()))
    .bind(input.sort_order)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Design style {id} not found")))?;

    info!("Updated design style {}", row.slug);
    Ok(Json(row))
}

/// DELETE /api/v1/quiz/styles/:id
///
/// Questions tied to the style are removed with it.
pub async fn handle_delete_style(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    auth.require_back_office()?;
    let result = sqlx::query("DELETE FROM quiz_styles WHERE id = $1")
        .bind(id)
        .execute(&state.db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Design style {id} not found")));
    }
    info!("Deleted design style {id}");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug_normalised() {
        assert_eq!(normalize_slug(" Mid-Century ").unwrap(), "mid-century");
        assert!(normalize_slug("art deco").is_err());
        assert!(normalize_slug("").is_err());
    }
}
