use redis::Client as RedisClient;
use tracing::debug;
use uuid::Uuid;

use crate::errors::AppError;

const SESSION_PREFIX: &str = "session:";

pub fn session_key(token: &str) -> String {
    format!("{SESSION_PREFIX}{token}")
}

/// 244 random bits from two v4 UUIDs, hex encoded.
pub fn new_session_token() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

pub async fn create_session(
    redis: &RedisClient,
    user_id: Uuid,
    ttl_secs: u64,
) -> Result<String, AppError> {
    let token = new_session_token();
    let mut conn = redis.get_multiplexed_async_connection().await?;
    redis::cmd("SET")
        .arg(session_key(&token))
        .arg(user_id.to_string())
        .arg("EX")
        .arg(ttl_secs)
        .query_async::<_, ()>(&mut conn)
        .await?;
    debug!("Created session for user {user_id}");
    Ok(token)
}

/// Returns the user id behind `token`, or `None` when it is unknown or expired.
pub async fn resolve_session(redis: &RedisClient, token: &str) -> Result<Option<Uuid>, AppError> {
    let mut conn = redis.get_multiplexed_async_connection().await?;
    let value: Option<String> = redis::cmd("GET")
        .arg(session_key(token))
        .query_async(&mut conn)
        .await?;
    Ok(value.and_then(|v| Uuid::parse_str(&v).ok()))
}

pub async fn revoke_session(redis: &RedisClient, token: &str) -> Result<(), AppError> {
    let mut conn = redis.get_multiplexed_async_connection().await?;
    redis::cmd("DEL")
        .arg(session_key(token))
        .query_async::<_, ()>(&mut conn)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_are_long_and_unique() {
        let a = new_session_token();
        let b = new_session_token();
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn test_session_key_prefix() {
        assert_eq!(session_key("abc"), "session:abc");
    }
}
