use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::PgPool;
use tracing::info;

use crate::errors::AppError;

pub const SETTINGS_KEY: &str = "calculator";

/// Configuration numbers the admin edits in the calculator configurator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CalculatorSettings {
    /// Base rate per square metre, keyed by service.
    pub service_rates: BTreeMap<String, f64>,
    /// Multiplier applied to the area cost, keyed by material grade.
    pub material_multipliers: BTreeMap<String, f64>,
    /// Flat price added per room.
    pub room_rate: f64,
}

impl Default for CalculatorSettings {
    fn default() -> Self {
        Self {
            service_rates: BTreeMap::from([
                ("interior".to_string(), 150.0),
                ("architecture".to_string(), 200.0),
                ("build".to_string(), 450.0),
            ]),
            material_multipliers: BTreeMap::from([
                ("standard".to_string(), 1.0),
                ("premium".to_string(), 1.35),
                ("luxury".to_string(), 1.8),
            ]),
            room_rate: 500.0,
        }
    }
}

impl CalculatorSettings {
    /// Normalises keys to lower case and checks every number.
    pub fn validated(self) -> Result<Self, AppError> {
        let service_rates = normalize_keys("service_rates", self.service_rates)?;
        let material_multipliers = normalize_keys("material_multipliers", self.material_multipliers)?;

        if service_rates.is_empty() {
            return Err(AppError::Validation("at least one service rate is required".to_string()));
        }
        if material_multipliers.is_empty() {
            return Err(AppError::Validation(
                "at least one material multiplier is required".to_string(),
            ));
        }
        for (key, rate) in &service_rates {
            if !rate.is_finite() || *rate < 0.0 {
                return Err(AppError::Validation(format!(
                    "service rate '{key}' must be a non-negative number"
                )));
            }
        }
        for (key, multiplier) in &material_multipliers {
            if !multiplier.is_finite() || *multiplier <= 0.0 {
                return Err(AppError::Validation(format!(
                    "material multiplier '{key}' must be greater than zero"
                )));
            }
        }
        if !self.room_rate.is_finite() || self.room_rate < 0.0 {
            return Err(AppError::Validation(
                "room_rate must be a non-negative number".to_string(),
            ));
        }

        Ok(Self {
            service_rates,
            material_multipliers,
            room_rate: self.room_rate,
        })
    }
}

fn normalize_keys(
    field: &str,
    map: BTreeMap<String, f64>,
) -> Result<BTreeMap<String, f64>, AppError> {
    let mut out = BTreeMap::new();
    for (key, value) in map {
        let key = key.trim().to_lowercase();
        if key.is_empty() {
            return Err(AppError::Validation(format!("{field} contains a blank key")));
        }
        if out.insert(key.clone(), value).is_some() {
            return Err(AppError::Validation(format!("{field} repeats key '{key}'")));
        }
    }
    Ok(out)
}

/// Reads the stored settings, inserting the defaults on first use.
pub async fn load_or_seed_settings(pool: &PgPool) -> Result<CalculatorSettings, AppError> {
    let stored: Option<Value> =
        sqlx::query_scalar("SELECT value FROM site_settings WHERE key = $1")
            .bind(SETTINGS_KEY)
            .fetch_optional(pool)
            .await?;

    if let Some(value) = stored {
        return serde_json::from_value(value)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Corrupt calculator settings: {e}")));
    }

    let defaults = CalculatorSettings::default();
    sqlx::query(
        "INSERT INTO site_settings (key, value) VALUES ($1, $2) ON CONFLICT (key) DO NOTHING",
    )
    .bind(SETTINGS_KEY)
    .bind(serde_json::to_value(&defaults).map_err(|e| AppError::Internal(e.into()))?)
    .execute(pool)
    .await?;

    info!("Seeded default calculator settings");
    Ok(defaults)
}

pub async fn save_settings(
    pool: &PgPool,
    settings: &CalculatorSettings,
) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO site_settings (key, value, updated_at) VALUES ($1, $2, now())
        ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = now()
        "#,
    )
    .bind(SETTINGS_KEY)
    .bind(serde_json::to_value(settings).map_err(|e| AppError::Internal(e.into()))?)
    .execute(pool)
    .await?;
    Ok(())
}
