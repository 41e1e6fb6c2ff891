//! Data behind the public marketing pages and the contact form.

pub mod handlers;

use serde::Deserialize;

use crate::errors::AppError;
use crate::validation::{normalize_email, optional_text, require_text};

const MAX_INQUIRY_CHARS: usize = 5000;

/// Number of portfolio items featured on the home page.
pub const HOME_PORTFOLIO_LIMIT: i64 = 6;

#[derive(Debug, Deserialize)]
pub struct ContactInput {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub message: String,
}

#[derive(Debug, PartialEq)]
pub struct ValidatedInquiry {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub message: String,
}

impl ContactInput {
    pub fn validated(self) -> Result<ValidatedInquiry, AppError> {
        let message = require_text("message", &self.message)?;
        if message.chars().count() > MAX_INQUIRY_CHARS {
            return Err(AppError::Validation(format!(
                "message must be at most {MAX_INQUIRY_CHARS} characters"
            )));
        }
        Ok(ValidatedInquiry {
            name: require_text("name", &self.name)?,
            email: normalize_email(&self.email)?,
            phone: optional_text(self.phone.as_deref()),
            message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> ContactInput {
        ContactInput {
            name: " Ana ".to_string(),
            email: "Ana@Example.com".to_string(),
            phone: Some("  ".to_string()),
            message: "We'd like a kitchen redesign.".to_string(),
        }
    }

    #[test]
    fn test_valid_inquiry_is_normalized() {
        let inquiry = input().validated().unwrap();
        assert_eq!(inquiry.name, "Ana");
        assert_eq!(inquiry.email, "ana@example.com");
        assert_eq!(inquiry.phone, None);
    }

    #[test]
    fn test_blank_message_rejected() {
        let mut bad = input();
        bad.message = "   ".to_string();
        assert!(matches!(bad.validated(), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_email_without_at_rejected() {
        let mut bad = input();
        bad.email = "ana.example.com".to_string();
        assert!(matches!(bad.validated(), Err(AppError::Validation(_))));
    }
}
