use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::auth::extractor::AuthUser;
use crate::auth::identity::{check_link, ExternalIdentity};
use crate::auth::password::{hash_password, verify_password, MIN_PASSWORD_LEN};
use crate::auth::session::{create_session, revoke_session};
use crate::errors::AppError;
use crate::models::user::{Role, UserRow};
use crate::state::AppState;
use crate::validation::{normalize_email, optional_text, require_text};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct GoogleLoginRequest {
    pub id_token: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserRow,
}

pub fn validate_password(password: &str) -> Result<(), AppError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

async fn issue_session(state: &AppState, user: UserRow) -> Result<Json<AuthResponse>, AppError> {
    let token = create_session(&state.redis, user.id, state.config.session_ttl_secs()).await?;
    Ok(Json(AuthResponse { token, user }))
}

/// POST /api/v1/auth/register
pub async fn handle_register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let name = require_text("name", &req.name)?;
    let email = normalize_email(&req.email)?;
    validate_password(&req.password)?;

    let exists: Option<Uuid> = sqlx::query_scalar("SELECT id FROM users WHERE email = $1")
        .bind(&email)
        .fetch_optional(&state.db)
        .await?;
    if exists.is_some() {
        return Err(AppError::Conflict(format!("An account for {email} already exists")));
    }

    let password_hash = hash_password(&req.password)?;
    let now = Utc::now();
    let user = sqlx::query_as::<_, UserRow>(
        r#"
        INSERT INTO users (id, name, email, role, password_hash, phone, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&name)
    .bind(&email)
    .bind(Role::Client.as_str())
    .bind(password_hash)
    .bind(optional_text(req.phone.as_deref()))
    .bind(now)
    .fetch_one(&state.db)
    .await?;

    info!("Registered client {}", user.id);
    let response = issue_session(&state, user).await?;
    Ok((StatusCode::CREATED, response))
}

/// POST /api/v1/auth/login
pub async fn handle_login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let email = req.email.trim().to_lowercase();

    let user = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE email = $1")
        .bind(&email)
        .fetch_optional(&state.db)
        .await?
        .ok_or(AppError::Unauthorized)?;

    let hash = user.password_hash.as_deref().ok_or(AppError::Unauthorized)?;
    if !verify_password(&req.password, hash) {
        return Err(AppError::Unauthorized);
    }

    info!("User {} signed in", user.id);
    issue_session(&state, user).await
}

/// POST /api/v1/auth/google
pub async fn handle_google_login(
    State(state): State<AppState>,
    Json(req): Json<GoogleLoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let id_token = require_text("id_token", &req.id_token)?;
    let identity = state.identity.verify(&id_token).await?;
    let user = find_or_link_identity(&state, &identity).await?;
    info!("User {} signed in with Google", user.id);
    issue_session(&state, user).await
}

/// Matches by provider subject first, then links an existing account by email,
/// otherwise creates a new client.
async fn find_or_link_identity(
    state: &AppState,
    identity: &ExternalIdentity,
) -> Result<UserRow, AppError> {
    if let Some(user) = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE google_sub = $1")
        .bind(&identity.subject)
        .fetch_optional(&state.db)
        .await?
    {
        return Ok(user);
    }

    let by_email = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE email = $1")
        .bind(&identity.email)
        .fetch_optional(&state.db)
        .await?;

    if let Some(existing) = by_email {
        check_link(existing.google_sub.as_deref(), &identity.subject)?;
        let user = sqlx::query_as::<_, UserRow>(
            r#"
            UPDATE users
            SET google_sub = $2,
                profile_picture = COALESCE(profile_picture, $3),
                updated_at = now()
            WHERE id = $1 AND google_sub IS NULL
            RETURNING *
            "#,
        )
        .bind(existing.id)
        .bind(&identity.subject)
        .bind(&identity.picture)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| {
            AppError::Conflict("This account is already linked to another Google identity".to_string())
        })?;
        info!("Linked Google identity to existing user {}", user.id);
        return Ok(user);
    }

    let now = Utc::now();
    let user = sqlx::query_as::<_, UserRow>(
        r#"
        INSERT INTO users (id, name, email, role, google_sub, profile_picture, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&identity.name)
    .bind(&identity.email)
    .bind(Role::Client.as_str())
    .bind(&identity.subject)
    .bind(&identity.picture)
    .bind(now)
    .fetch_one(&state.db)
    .await?;

    info!("Registered client {} from Google identity", user.id);
    Ok(user)
}

/// POST /api/v1/auth/logout
pub async fn handle_logout(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<StatusCode, AppError> {
    revoke_session(&state.redis, &auth.token).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/auth/me
pub async fn handle_me(auth: AuthUser) -> Json<UserRow> {
    Json(auth.user)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_passwords_rejected() {
        assert!(validate_password("short").is_err());
        assert!(validate_password("long enough").is_ok());
    }

    #[test]
    fn test_password_length_counts_characters() {
        // 8 multi-byte characters
        assert!(validate_password("ééééééé").is_err());
        assert!(validate_password("éééééééé").is_ok());
    }
}
