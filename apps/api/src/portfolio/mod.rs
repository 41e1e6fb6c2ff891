//! Completed-work showcase for the public portfolio page.

pub mod handlers;

use chrono::NaiveDate;
use serde::Deserialize;

use crate::errors::AppError;
use crate::validation::{optional_text, require_text};

#[derive(Debug, Clone, Deserialize)]
pub struct PortfolioInput {
    pub title: String,
    #[serde(default)]
    pub category: String,
    pub image_url: Option<String>,
    #[serde(default)]
    pub description: String,
    pub completed_on: Option<NaiveDate>,
    #[serde(default = "default_visible")]
    pub is_visible: bool,
}

fn default_visible() -> bool {
    true
}

impl PortfolioInput {
    pub fn validated(self) -> Result<Self, AppError> {
        Ok(Self {
            title: require_text("title", &self.title)?,
            category: self.category.trim().to_lowercase(),
            image_url: optional_text(self.image_url.as_deref()),
            description: self.description.trim().to_string(),
            ..self
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_title_required() {
        let input: PortfolioInput = serde_json::from_value(json!({"title": " "})).unwrap();
        assert!(input.validated().is_err());
    }

    #[test]
    fn test_blank_image_url_dropped() {
        let input: PortfolioInput = serde_json::from_value(json!({
            "title": "Riverside Loft",
            "category": "Residential",
            "image_url": "",
            "completed_on": "2024-05-01"
        }))
        .unwrap();
        let clean = input.validated().unwrap();
        assert_eq!(clean.image_url, None);
        assert_eq!(clean.category, "residential");
        assert!(clean.is_visible);
        assert_eq!(clean.completed_on, NaiveDate::from_ymd_opt(2024, 5, 1));
    }
}
