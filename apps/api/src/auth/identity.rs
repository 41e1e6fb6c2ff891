//! Third-party sign-in. The browser obtains an identity token from the
//! provider's popup; we verify it here and exchange it for a session.

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::errors::AppError;

const GOOGLE_TOKENINFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";
const ACCEPTED_ISSUERS: &[&str] = &["accounts.google.com", "https://accounts.google.com"];

/// A verified identity asserted by the provider.
#[derive(Debug, Clone, PartialEq)]
pub struct ExternalIdentity {
    pub subject: String,
    pub email: String,
    pub name: String,
    pub picture: Option<String>,
}

#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// Fails with `NotImplemented` when the provider is not configured.
    async fn verify(&self, id_token: &str) -> Result<ExternalIdentity, AppError>;
}

/// Claims returned by Google's tokeninfo endpoint.
#[derive(Debug, Deserialize)]
pub struct TokenInfoClaims {
    pub iss: Option<String>,
    pub aud: Option<String>,
    pub sub: Option<String>,
    pub email: Option<String>,
    /// Google returns this as the string "true" but accept a JSON bool too.
    pub email_verified: Option<Value>,
    pub name: Option<String>,
    pub picture: Option<String>,
}

/// Checks issuer, audience and email verification, then maps the claims.
/// An account found by email may take a provider subject only if it has none yet.
pub fn check_link(existing_subject: Option<&str>, subject: &str) -> Result<(), AppError> {
    match existing_subject {
        Some(current) if current != subject => Err(AppError::Conflict(
            "This account is already linked to another Google identity".to_string(),
        )),
        _ => Ok(()),
    }
}

pub fn identity_from_claims(
    claims: TokenInfoClaims,
    expected_audience: &str,
) -> Result<ExternalIdentity, AppError> {
    let issuer_ok = claims
        .iss
        .as_deref()
        .map(|iss| ACCEPTED_ISSUERS.contains(&iss))
        .unwrap_or(false);
    if !issuer_ok {
        return Err(AppError::Unauthorized);
    }
    if claims.aud.as_deref() != Some(expected_audience) {
        return Err(AppError::Unauthorized);
    }

    let verified = match &claims.email_verified {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s == "true",
        _ => false,
    };
    if !verified {
        return Err(AppError::Unauthorized);
    }

    let subject = claims.sub.filter(|s| !s.is_empty()).ok_or(AppError::Unauthorized)?;
    let email = claims
        .email
        .map(|e| e.trim().to_lowercase())
        .filter(|e| !e.is_empty())
        .ok_or(AppError::Unauthorized)?;
    let name = claims
        .name
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| email.split('@').next().unwrap_or_default().to_string());

    Ok(ExternalIdentity {
        subject,
        email,
        name,
        picture: claims.picture,
    })
}

/// Verifies Google ID tokens through the tokeninfo endpoint.
#[derive(Clone)]
pub struct GoogleTokenVerifier {
    client: Client,
    client_id: Option<String>,
}

impl GoogleTokenVerifier {
    pub fn new(client_id: Option<String>) -> Result<Self> {
        Ok(Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(10))
                .build()?,
            client_id,
        })
    }
}

#[async_trait]
impl IdentityVerifier for GoogleTokenVerifier {
    async fn verify(&self, id_token: &str) -> Result<ExternalIdentity, AppError> {
        let client_id = self
            .client_id
            .as_deref()
            .ok_or_else(|| AppError::NotImplemented("Google sign-in is not configured".to_string()))?;

        let response = self
            .client
            .get(GOOGLE_TOKENINFO_URL)
            .query(&[("id_token", id_token)])
            .send()
            .await
            .map_err(|e| AppError::Identity(e.to_string()))?;

        let status = response.status();
        if status.is_client_error() {
            debug!("tokeninfo rejected identity token with {status}");
            return Err(AppError::Unauthorized);
        }
        if !status.is_success() {
            return Err(AppError::Identity(format!("tokeninfo returned {status}")));
        }

        let claims: TokenInfoClaims = response
            .json()
            .await
            .map_err(|e| AppError::Identity(e.to_string()))?;

        identity_from_claims(claims, client_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn claims(value: Value) -> TokenInfoClaims {
        serde_json::from_value(value).unwrap()
    }

    fn valid() -> Value {
        json!({
            "iss": "https://accounts.google.com",
            "aud": "client-123",
            "sub": "1100220033",
            "email": "Dana@Example.com",
            "email_verified": "true",
            "name": "Dana Reyes",
            "picture": "https://lh3.example/p.jpg"
        })
    }

    #[test]
    fn test_link_never_replaces_a_different_subject() {
        assert!(check_link(None, "1100220033").is_ok());
        assert!(check_link(Some("1100220033"), "1100220033").is_ok());
        assert!(matches!(
            check_link(Some("9999"), "1100220033"),
            Err(AppError::Conflict(_))
        ));
    }

    #[test]
    fn test_valid_claims_map_to_identity() {
        let identity = identity_from_claims(claims(valid()), "client-123").unwrap();
        assert_eq!(identity.subject, "1100220033");
        assert_eq!(identity.email, "dana@example.com");
        assert_eq!(identity.name, "Dana Reyes");
        assert!(identity.picture.is_some());
    }

    #[test]
    fn test_wrong_audience_rejected() {
        let result = identity_from_claims(claims(valid()), "other-client");
        assert!(matches!(result, Err(AppError::Unauthorized)));
    }

    #[test]
    fn test_unverified_email_rejected() {
        let mut value = valid();
        value["email_verified"] = json!("false");
        let result = identity_from_claims(claims(value), "client-123");
        assert!(matches!(result, Err(AppError::Unauthorized)));
    }

    #[test]
    fn test_bool_email_verified_accepted() {
        let mut value = valid();
        value["email_verified"] = json!(true);
        assert!(identity_from_claims(claims(value), "client-123").is_ok());
    }

    #[test]
    fn test_missing_name_falls_back_to_local_part() {
        let mut value = valid();
        value.as_object_mut().unwrap().remove("name");
        let identity = identity_from_claims(claims(value), "client-123").unwrap();
        assert_eq!(identity.name, "dana");
    }

    #[tokio::test]
    async fn test_unconfigured_verifier_is_not_implemented() {
        let verifier = GoogleTokenVerifier::new(None).unwrap();
        let result = verifier.verify("token").await;
        assert!(matches!(result, Err(AppError::NotImplemented(_))));
    }
}
