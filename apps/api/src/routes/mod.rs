pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, patch, post, put},
    Router,
};

use crate::auth::handlers as auth;
use crate::booking::handlers as booking;
use crate::calculator::handlers as calculator;
use crate::catalog::handlers as catalog;
use crate::chat::handlers as chat;
use crate::dashboard::handlers as dashboard;
use crate::portfolio::handlers as portfolio;
use crate::projects::handlers as projects;
use crate::quiz::handlers as quiz;
use crate::schedules::handlers as schedules;
use crate::site::handlers as site;
use crate::state::AppState;
use crate::storage::MAX_UPLOAD_BYTES;
use crate::users::handlers as users;

/// Multipart framing on top of the largest accepted image.
const BODY_LIMIT_BYTES: usize = MAX_UPLOAD_BYTES + 64 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Auth
        .route("/api/v1/auth/register", post(auth::handle_register))
        .route("/api/v1/auth/login", post(auth::handle_login))
        .route("/api/v1/auth/google", post(auth::handle_google_login))
        .route("/api/v1/auth/logout", post(auth::handle_logout))
        .route("/api/v1/auth/me", get(auth::handle_me))
        // Public site
        .route("/api/v1/site/home", get(site::handle_home))
        .route(
            "/api/v1/contact",
            get(site::handle_list_inquiries).post(site::handle_submit_contact),
        )
        .route("/api/v1/contact/:id", patch(site::handle_mark_inquiry))
        // Services
        .route(
            "/api/v1/services",
            get(catalog::handle_list_services).post(catalog::handle_create_service),
        )
        .route(
            "/api/v1/services/:id",
            get(catalog::handle_get_service)
                .put(catalog::handle_update_service)
                .delete(catalog::handle_delete_service),
        )
        .route(
            "/api/v1/services/:id/visibility",
            patch(catalog::handle_toggle_service_visibility),
        )
        // Portfolio
        .route(
            "/api/v1/portfolio",
            get(portfolio::handle_list_portfolio).post(portfolio::handle_create_portfolio_item),
        )
        .route(
            "/api/v1/portfolio/:id",
            get(portfolio::handle_get_portfolio_item)
                .put(portfolio::handle_update_portfolio_item)
                .delete(portfolio::handle_delete_portfolio_item),
        )
        .route(
            "/api/v1/portfolio/:id/visibility",
            patch(portfolio::handle_toggle_portfolio_visibility),
        )
        .route(
            "/api/v1/portfolio/:id/image",
            post(portfolio::handle_upload_portfolio_image),
        )
        // Projects
        .route(
            "/api/v1/projects",
            get(projects::handle_list_projects).post(projects::handle_create_project),
        )
        .route(
            "/api/v1/projects/:id",
            get(projects::handle_get_project)
                .put(projects::handle_update_project)
                .delete(projects::handle_delete_project),
        )
        .route(
            "/api/v1/projects/:id/progress",
            patch(projects::handle_update_progress),
        )
        // Schedules
        .route(
            "/api/v1/schedules",
            get(schedules::handle_list_schedules).post(schedules::handle_create_schedule),
        )
        .route(
            "/api/v1/schedules/:id",
            get(schedules::handle_get_schedule)
                .put(schedules::handle_update_schedule)
                .delete(schedules::handle_delete_schedule),
        )
        .route(
            "/api/v1/schedules/:id/status",
            patch(schedules::handle_change_schedule_status),
        )
        // Booking wizard
        .route("/api/v1/bookings", post(booking::handle_submit_booking))
        .route("/api/v1/bookings/validate", post(booking::handle_validate_step))
        // Users
        .route(
            "/api/v1/users",
            get(users::handle_list_users).post(users::handle_create_user),
        )
        .route(
            "/api/v1/users/:id",
            get(users::handle_get_user)
                .put(users::handle_update_user)
                .delete(users::handle_delete_user),
        )
        // Calculator
        .route(
            "/api/v1/calculator/settings",
            get(calculator::handle_get_settings).put(calculator::handle_update_settings),
        )
        .route("/api/v1/calculator/estimate", post(calculator::handle_estimate))
        // Quiz
        .route("/api/v1/quiz", get(quiz::handle_get_quiz))
        .route("/api/v1/quiz/submit", post(quiz::handle_submit_quiz))
        .route(
            "/api/v1/quiz/questions",
            get(quiz::handle_list_questions).post(quiz::handle_create_question),
        )
        .route(
            "/api/v1/quiz/questions/:id",
            put(quiz::handle_update_question).delete(quiz::handle_delete_question),
        )
        .route("/api/v1/quiz/styles", post(quiz::handle_create_style))
        .route(
            "/api/v1/quiz/styles/:id",
            put(quiz::handle_update_style).delete(quiz::handle_delete_style),
        )
        // Chat: back-office
        .route("/api/v1/chat/conversations", get(chat::handle_list_conversations))
        .route(
            "/api/v1/chat/conversations/:id",
            delete(chat::handle_delete_conversation),
        )
        .route(
            "/api/v1/chat/conversations/:id/messages",
            get(chat::handle_admin_thread).post(chat::handle_admin_send),
        )
        .route(
            "/api/v1/chat/conversations/:id/messages/:message_id",
            patch(chat::handle_admin_edit).delete(chat::handle_admin_delete_message),
        )
        .route(
            "/api/v1/chat/conversations/:id/read",
            post(chat::handle_admin_mark_read),
        )
        .route("/api/v1/chat/events", get(chat::handle_admin_events))
        // Chat: site widget
        .route(
            "/api/v1/chat/widget/sessions",
            post(chat::handle_start_widget_session),
        )
        .route(
            "/api/v1/chat/widget/sessions/:visitor_id/messages",
            get(chat::handle_widget_thread).post(chat::handle_widget_send),
        )
        .route(
            "/api/v1/chat/widget/sessions/:visitor_id/messages/:message_id",
            patch(chat::handle_widget_edit).delete(chat::handle_widget_delete_message),
        )
        .route(
            "/api/v1/chat/widget/sessions/:visitor_id/read",
            post(chat::handle_widget_mark_read),
        )
        .route(
            "/api/v1/chat/widget/sessions/:visitor_id/events",
            get(chat::handle_widget_events),
        )
        // Client portal
        .route("/api/v1/me/dashboard", get(dashboard::handle_my_dashboard))
        .route("/api/v1/me/profile", put(users::handle_update_profile))
        .route("/api/v1/me/avatar", post(users::handle_upload_avatar))
        .route("/api/v1/me/projects", get(projects::handle_my_projects))
        .route("/api/v1/me/schedules", get(schedules::handle_my_schedules))
        .route(
            "/api/v1/me/schedules/:id/cancel",
            post(schedules::handle_cancel_my_schedule),
        )
        .route("/api/v1/me/conversation", get(chat::handle_my_thread))
        .route(
            "/api/v1/me/conversation/messages",
            post(chat::handle_my_send),
        )
        .route(
            "/api/v1/me/conversation/messages/:message_id",
            patch(chat::handle_my_edit).delete(chat::handle_my_delete_message),
        )
        .route("/api/v1/me/conversation/read", post(chat::handle_my_mark_read))
        .route("/api/v1/me/conversation/events", get(chat::handle_my_events))
        // Back-office dashboard
        .route("/api/v1/admin/dashboard", get(dashboard::handle_admin_dashboard))
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use aws_sdk_s3::config::{BehaviorVersion, Region};
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use serde_json::{json, Value};
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

    use super::*;
    use crate::auth::identity::GoogleTokenVerifier;
    use crate::chat::events;
    use crate::config::test_config;

    /// State whose pool and Redis client never connect unless a handler queries them.
    fn lazy_state() -> AppState {
        let config = test_config();
        let db = PgPoolOptions::new()
            .connect_lazy(&config.database_url)
            .unwrap();
        let redis = redis::Client::open(config.redis_url.clone()).unwrap();
        let s3_config = aws_sdk_s3::config::Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .build();
        AppState {
            db,
            redis,
            s3: aws_sdk_s3::Client::from_conf(s3_config),
            identity: Arc::new(GoogleTokenVerifier::new(None).unwrap()),
            chat_events: events::channel(),
            config,
        }
    }

    async fn send(request: Request<Body>) -> (StatusCode, Value) {
        let response = build_router(lazy_state()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let request = Request::get("/health").body(Body::empty()).unwrap();
        let (status, body) = send(request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "atelier-api");
    }

    #[tokio::test]
    async fn test_me_without_token_is_unauthorized() {
        let request = Request::get("/api/v1/auth/me").body(Body::empty()).unwrap();
        let (status, body) = send(request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn test_admin_routes_require_token() {
        let request = Request::get("/api/v1/chat/conversations")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_anonymous_booking_submit_requires_auth() {
        let draft = json!({
            "draft": {
                "service_id": "00000000-0000-0000-0000-000000000001",
                "description": "Two-bedroom flat",
                "date": "2099-05-01",
                "time": "10:00:00",
                "meeting_mode": "online",
                "phone": "+1 555 0100"
            }
        });
        let (status, body) = send(post_json("/api/v1/bookings", draft)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "AUTH_REQUIRED");
    }

    #[tokio::test]
    async fn test_validate_step_reports_missing_fields() {
        let request = post_json(
            "/api/v1/bookings/validate",
            json!({ "step": "service", "draft": { "description": "  " } }),
        );
        let (status, body) = send(request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["complete"], false);
        assert_eq!(body["missing"], json!(["service_id", "description"]));
    }

    #[tokio::test]
    async fn test_validate_step_complete_points_to_next() {
        let request = post_json(
            "/api/v1/bookings/validate",
            json!({
                "step": "service",
                "draft": {
                    "service_id": "00000000-0000-0000-0000-000000000001",
                    "description": "Kitchen remodel"
                }
            }),
        );
        let (status, body) = send(request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["complete"], true);
        assert_eq!(body["next_step"], "schedule");
    }

    #[tokio::test]
    async fn test_estimate_rejects_bad_json_before_storage() {
        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/calculator/estimate")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, _) = send(request).await;
        assert!(status.is_client_error());
    }
}
