use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::calculator::settings::CalculatorSettings;
use crate::errors::AppError;

#[derive(Debug, Clone, Deserialize)]
pub struct EstimateRequest {
    pub service: String,
    pub material: String,
    /// Floor area in square metres.
    pub area: f64,
    #[serde(default)]
    pub rooms: u32,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EstimateBreakdown {
    pub base_rate: f64,
    pub material_multiplier: f64,
    pub area_cost: f64,
    pub room_rate: f64,
    pub room_cost: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Estimate {
    pub estimate: f64,
    pub breakdown: EstimateBreakdown,
}

#[derive(Debug, Error, PartialEq)]
pub enum EstimateError {
    #[error("unknown service '{0}'")]
    UnknownService(String),

    #[error("unknown material '{0}'")]
    UnknownMaterial(String),

    #[error("area must be greater than zero")]
    InvalidArea,
}

impl From<EstimateError> for AppError {
    fn from(err: EstimateError) -> Self {
        AppError::Validation(err.to_string())
    }
}

/// `area × service base rate × material multiplier + rooms × room rate`
pub fn compute_estimate(
    settings: &CalculatorSettings,
    request: &EstimateRequest,
) -> Result<Estimate, EstimateError> {
    let service = request.service.trim().to_lowercase();
    let material = request.material.trim().to_lowercase();

    let base_rate = *settings
        .service_rates
        .get(&service)
        .ok_or_else(|| EstimateError::UnknownService(request.service.clone()))?;
    let material_multiplier = *settings
        .material_multipliers
        .get(&material)
        .ok_or_else(|| EstimateError::UnknownMaterial(request.material.clone()))?;

    if !request.area.is_finite() || request.area <= 0.0 {
        return Err(EstimateError::InvalidArea);
    }

    let area_cost = request.area * base_rate * material_multiplier;
    let room_cost = f64::from(request.rooms) * settings.room_rate;

    Ok(Estimate {
        estimate: area_cost + room_cost,
        breakdown: EstimateBreakdown {
            base_rate,
            material_multiplier,
            area_cost,
            room_rate: settings.room_rate,
            room_cost,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(service: &str, material: &str, area: f64, rooms: u32) -> EstimateRequest {
        EstimateRequest {
            service: service.to_string(),
            material: material.to_string(),
            area,
            rooms,
        }
    }

    #[test]
    fn test_formula() {
        let settings = CalculatorSettings::default();
        // 80 × 150 × 1.35 + 3 × 500 = 16200 + 1500
        let estimate = compute_estimate(&settings, &request("interior", "premium", 80.0, 3)).unwrap();
        assert!((estimate.estimate - 17_700.0).abs() < 1e-6, "got {}", estimate.estimate);
        assert!((estimate.breakdown.area_cost - 16_200.0).abs() < 1e-6);
        assert_eq!(estimate.breakdown.room_cost, 1_500.0);
    }

    #[test]
    fn test_keys_case_insensitive() {
        let settings = CalculatorSettings::default();
        let estimate = compute_estimate(&settings, &request(" Build ", "STANDARD", 10.0, 0)).unwrap();
        assert_eq!(estimate.estimate, 4_500.0);
    }

    #[test]
    fn test_unknown_keys() {
        let settings = CalculatorSettings::default();
        assert_eq!(
            compute_estimate(&settings, &request("landscape", "standard", 10.0, 0)),
            Err(EstimateError::UnknownService("landscape".to_string()))
        );
        assert_eq!(
            compute_estimate(&settings, &request("interior", "marble", 10.0, 0)),
            Err(EstimateError::UnknownMaterial("marble".to_string()))
        );
    }

    #[test]
    fn test_non_positive_area_rejected() {
        let settings = CalculatorSettings::default();
        assert_eq!(
            compute_estimate(&settings, &request("interior", "standard", 0.0, 2)),
            Err(EstimateError::InvalidArea)
        );
        assert_eq!(
            compute_estimate(&settings, &request("interior", "standard", f64::NAN, 2)),
            Err(EstimateError::InvalidArea)
        );
    }
}
