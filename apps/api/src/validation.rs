//! Field-level checks shared by the request handlers.

use crate::errors::AppError;

/// Trims `value` and rejects it when nothing is left.
pub fn require_text(field: &str, value: &str) -> Result<String, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

/// Trims optional text and folds blanks into `None`.
pub fn optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Lower-cases and trims an email address, rejecting obviously malformed ones.
pub fn normalize_email(value: &str) -> Result<String, AppError> {
    let email = value.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.ends_with('.'),
        None => false,
    };
    if !valid {
        return Err(AppError::Validation(format!("'{}' is not a valid email", value.trim())));
    }
    Ok(email)
}

/// Rejects NaN, infinities and negative amounts.
pub fn require_amount(field: &str, value: f64) -> Result<f64, AppError> {
    if !value.is_finite() || value < 0.0 {
        return Err(AppError::Validation(format!(
            "{field} must be a non-negative number"
        )));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_text_trims() {
        assert_eq!(require_text("name", "  Loft  ").unwrap(), "Loft");
        assert!(require_text("name", "   ").is_err());
    }

    #[test]
    fn test_optional_text_folds_blank() {
        assert_eq!(optional_text(Some("  ")), None);
        assert_eq!(optional_text(Some(" x ")), Some("x".to_string()));
        assert_eq!(optional_text(None), None);
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(
            normalize_email("  Dana@Example.COM ").unwrap(),
            "dana@example.com"
        );
        assert!(normalize_email("dana").is_err());
        assert!(normalize_email("@example.com").is_err());
        assert!(normalize_email("dana@localhost").is_err());
    }

    #[test]
    fn test_require_amount() {
        assert!(require_amount("price", 0.0).is_ok());
        assert!(require_amount("price", -1.0).is_err());
        assert!(require_amount("price", f64::NAN).is_err());
        assert!(require_amount("price", f64::INFINITY).is_err());
    }
}
