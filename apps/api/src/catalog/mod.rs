//! Service catalogue shown on the marketing site and used by the booking wizard.

pub mod handlers;

use serde::Deserialize;

use crate::errors::AppError;
use crate::validation::{require_amount, require_text};

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceInput {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default = "default_true")]
    pub is_visible: bool,
    #[serde(default)]
    pub sort_order: i32,
}

fn default_true() -> bool {
    true
}

impl ServiceInput {
    /// Trims text fields and drops blank feature lines.
    pub fn validated(self) -> Result<Self, AppError> {
        Ok(Self {
            name: require_text("name", &self.name)?,
            description: self.description.trim().to_string(),
            price: require_amount("price", self.price)?,
            category: self.category.trim().to_lowercase(),
            features: self
                .features
                .iter()
                .map(|f| f.trim())
                .filter(|f| !f.is_empty())
                .map(str::to_string)
                .collect(),
            ..self
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_are_active_and_visible() {
        let input: ServiceInput = serde_json::from_value(json!({"name": "Interior"})).unwrap();
        assert!(input.is_active);
        assert!(input.is_visible);
        assert_eq!(input.price, 0.0);
    }

    #[test]
    fn test_validated_cleans_fields() {
        let input: ServiceInput = serde_json::from_value(json!({
            "name": "  Interior Design ",
            "price": 120.0,
            "category": " Interior ",
            "features": ["Moodboard", "  ", " 3D "]
        }))
        .unwrap();
        let clean = input.validated().unwrap();
        assert_eq!(clean.name, "Interior Design");
        assert_eq!(clean.category, "interior");
        assert_eq!(clean.features, vec!["Moodboard", "3D"]);
    }

    #[test]
    fn test_negative_price_rejected() {
        let input: ServiceInput =
            serde_json::from_value(json!({"name": "X", "price": -5.0})).unwrap();
        assert!(input.validated().is_err());
    }
}
