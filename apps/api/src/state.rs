use std::sync::Arc;

use aws_sdk_s3::Client as S3Client;
use redis::Client as RedisClient;
use sqlx::PgPool;
use tokio::sync::broadcast;

use crate::auth::identity::IdentityVerifier;
use crate::chat::events::ChatEvent;
use crate::config::Config;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    /// Session token store.
    pub redis: RedisClient,
    pub s3: S3Client,
    pub config: Config,
    /// Pluggable identity-provider verifier. Default: GoogleTokenVerifier.
    pub identity: Arc<dyn IdentityVerifier>,
    /// Fan-out of chat mutations to SSE subscribers.
    pub chat_events: broadcast::Sender<ChatEvent>,
}
