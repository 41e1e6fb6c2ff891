use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::auth::handlers::validate_password;
use crate::auth::password::hash_password;
use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::models::user::{Role, UserRow};
use crate::state::AppState;
use crate::storage::{read_image_upload, store_image};
use crate::users::{check_role_change, parse_role};
use crate::validation::{normalize_email, optional_text, require_text};

#[derive(Debug, Default, Deserialize)]
pub struct UserQuery {
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    pub role: String,
    /// Optional for accounts that will only sign in through Google.
    pub password: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub name: String,
    pub email: String,
    pub role: String,
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub phone: Option<String>,
}

/// GET /api/v1/users
pub async fn handle_list_users(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<UserQuery>,
) -> Result<Json<Vec<UserRow>>, AppError> {
    auth.require_admin()?;
    let role = params
        .role
        .as_deref()
        .map(parse_role)
        .transpose()?
        .map(|r| r.as_str());

    let users = sqlx::query_as::<_, UserRow>(
        "SELECT * FROM users WHERE ($1::TEXT IS NULL OR role = $1) ORDER BY name",
    )
    .bind(role)
    .fetch_all(&state.db)
    .await?;
    Ok(Json(users))
}

/// GET /api/v1/users/:id
pub async fn handle_get_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<UserRow>, AppError> {
    auth.require_admin()?;
    let user = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {id} not found")))?;
    Ok(Json(user))
}

/// POST /api/v1/users
pub async fn handle_create_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserRow>), AppError> {
    auth.require_admin()?;
    let name = require_text("name", &req.name)?;
    let email = normalize_email(&req.email)?;
    let role = parse_role(&req.role)?;
    let password_hash = match req.password.as_deref() {
        Some(password) => {
            validate_password(password)?;
            Some(hash_password(password)?)
        }
        None => None,
    };

    let user = sqlx::query_as::<_, UserRow>(
        r#"
        INSERT INTO users (id, name, email, role, password_hash, phone)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&name)
    .bind(&email)
    .bind(role.as_str())
    .bind(password_hash)
    .bind(optional_text(req.phone.as_deref()))
    .fetch_one(&state.db)
    .await?;

    info!("Admin {} created user {} as {}", auth.user.id, user.id, user.role);
    Ok((StatusCode::CREATED, Json(user)))
}

/// PUT /api/v1/users/:id
pub async fn handle_update_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateUserRequest>,
) -> Result<Json<UserRow>, AppError> {
    auth.require_admin()?;
    let name = require_text("name", &req.name)?;
    let email = normalize_email(&req.email)?;
    let role = parse_role(&req.role)?;

    let mut tx = state.db.begin().await?;
    // Admin rows stay locked until commit.
    let admins: Vec<Uuid> = sqlx::query_scalar("SELECT id FROM users WHERE role = $1 FOR UPDATE")
        .bind(Role::Admin.as_str())
        .fetch_all(&mut *tx)
        .await?;
    let current: String = sqlx::query_scalar("SELECT role FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {id} not found")))?;
    let current = Role::parse(&current).unwrap_or(Role::Client);
    check_role_change(auth.user.id, id, current, role, admins.len() as i64)?;

    let user = sqlx::query_as::<_, UserRow>(
        r#"
        UPDATE users SET name = $2, email = $3, role = $4, phone = $5, updated_at = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(&name)
    .bind(&email)
    .bind(role.as_str())
    .bind(optional_text(req.phone.as_deref()))
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;

    info!("Updated user {id}");
    Ok(Json(user))
}

/// DELETE /api/v1/users/:id
pub async fn handle_delete_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    auth.require_admin()?;
    if id == auth.user.id {
        return Err(AppError::Validation("You cannot delete your own account".to_string()));
    }

    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(&state.db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("User {id} not found")));
    }

    info!("Deleted user {id}");
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/v1/me/profile
pub async fn handle_update_profile(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<ProfileUpdate>,
) -> Result<Json<UserRow>, AppError> {
    let name = match req.name.as_deref() {
        Some(name) => require_text("name", name)?,
        None => auth.user.name.clone(),
    };
    let phone = match req.phone.as_deref() {
        Some(phone) => optional_text(Some(phone)),
        None => auth.user.phone.clone(),
    };

    let user = sqlx::query_as::<_, UserRow>(
        "UPDATE users SET name = $2, phone = $3, updated_at = now() WHERE id = $1 RETURNING *",
    )
    .bind(auth.user.id)
    .bind(&name)
    .bind(&phone)
    .fetch_one(&state.db)
    .await?;
    Ok(Json(user))
}

/// POST /api/v1/me/avatar
pub async fn handle_upload_avatar(
    State(state): State<AppState>,
    auth: AuthUser,
    multipart: Multipart,
) -> Result<Json<UserRow>, AppError> {
    let upload = read_image_upload(multipart).await?;
    let url = store_image(&state, &format!("avatars/{}", auth.user.id), upload).await?;

    let user = sqlx::query_as::<_, UserRow>(
        "UPDATE users SET profile_picture = $2, updated_at = now() WHERE id = $1 RETURNING *",
    )
    .bind(auth.user.id)
    .bind(&url)
    .fetch_one(&state.db)
    .await?;

    info!("User {} updated profile picture", user.id);
    Ok(Json(user))
}
