//! CO2 emission estimates for freight moved by road, rail or air.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Transport mode with its emission factor in kg CO2 per ton-km.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    #[default]
    Road,
    Rail,
    Air,
}

impl TransportMode {
    pub fn factor(&self) -> f64 {
        match self {
            TransportMode::Road => 0.080,
            TransportMode::Rail => 0.020,
            TransportMode::Air => 0.500,
        }
    }

    /// Resolve a mode name, falling back to road for anything unknown.
    pub fn from_name(name: &str) -> Self {
        match name {
            "rail" => TransportMode::Rail,
            "air" => TransportMode::Air,
            _ => TransportMode::Road,
        }
    }
}

/// Emissions in kg CO2 for `distance_km` carrying `weight_kg` by `mode`.
pub fn calculate_emissions(distance_km: f64, weight_kg: f64, mode: TransportMode) -> f64 {
    let weight_tons = weight_kg / 1000.0;
    distance_km * weight_tons * mode.factor()
}

#[derive(Debug, Error, PartialEq)]
pub enum EmissionError {
    #[error("field '{field}' must be a number")]
    NotANumber { field: &'static str },
    #[error("field '{field}' must be a finite, non-negative number")]
    OutOfRange { field: &'static str },
    #[error("field 'mode' must be a string, got {0}")]
    InvalidMode(String),
}

/// Raw body of a manual calculation request, before validation.
///
/// Missing or `null` fields take the documented defaults: distance 0.0,
/// weight 0.0, mode "road". Numbers may be sent as JSON numbers or numeric
/// strings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ManualRequest {
    pub distance: Option<Value>,
    pub weight: Option<Value>,
    pub mode: Option<Value>,
}

impl ManualRequest {
    pub fn validate(&self) -> Result<ManualCalculation, EmissionError> {
        let distance_km = parse_quantity("distance", self.distance.as_ref())?;
        let weight_kg = parse_quantity("weight", self.weight.as_ref())?;
        let mode = match &self.mode {
            None | Some(Value::Null) => TransportMode::default(),
            Some(Value::String(name)) => TransportMode::from_name(name),
            Some(other) => return Err(EmissionError::InvalidMode(other.to_string())),
        };

        Ok(ManualCalculation {
            distance_km,
            weight_kg,
            mode,
        })
    }
}

fn parse_quantity(field: &'static str, value: Option<&Value>) -> Result<f64, EmissionError> {
    let parsed = match value {
        None | Some(Value::Null) => return Ok(0.0),
        Some(Value::Number(number)) => number.as_f64(),
        Some(Value::String(text)) => text.trim().parse::<f64>().ok(),
        Some(_) => None,
    };

    match parsed {
        Some(v) if v.is_finite() && v >= 0.0 => Ok(v),
        Some(_) => Err(EmissionError::OutOfRange { field }),
        None => Err(EmissionError::NotANumber { field }),
    }
}

/// A validated manual calculation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ManualCalculation {
    pub distance_km: f64,
    pub weight_kg: f64,
    pub mode: TransportMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ManualEstimate {
    pub emission_kg: f64,
    pub baseline_kg: f64,
    pub savings_kg: f64,
}

impl ManualCalculation {
    /// Emissions for the chosen mode compared against shipping the same load by air.
    pub fn evaluate(&self) -> ManualEstimate {
        let emission_kg = calculate_emissions(self.distance_km, self.weight_kg, self.mode);
        let baseline_kg = calculate_emissions(self.distance_km, self.weight_kg, TransportMode::Air);

        ManualEstimate {
            emission_kg,
            baseline_kg,
            savings_kg: (baseline_kg - emission_kg).max(0.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(body: Value) -> ManualRequest {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn test_rail_against_air_baseline() {
        let estimate = request(json!({"distance": 100, "weight": 1000, "mode": "rail"}))
            .validate()
            .unwrap()
            .evaluate();

        assert!((estimate.emission_kg - 2.0).abs() < 1e-9);
        assert!((estimate.baseline_kg - 50.0).abs() < 1e-9);
        assert!((estimate.savings_kg - 48.0).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_mode_uses_road() {
        let calc = request(json!({"distance": 10, "weight": 2000, "mode": "unknown"}))
            .validate()
            .unwrap();
        assert_eq!(calc.mode, TransportMode::Road);
        assert!((calc.evaluate().emission_kg - 10.0 * 2.0 * 0.080).abs() < 1e-9);
    }

    #[test]
    fn test_missing_fields_default() {
        let calc = request(json!({})).validate().unwrap();
        assert_eq!(calc.distance_km, 0.0);
        assert_eq!(calc.weight_kg, 0.0);
        assert_eq!(calc.mode, TransportMode::Road);

        let estimate = calc.evaluate();
        assert_eq!(estimate.emission_kg, 0.0);
        assert_eq!(estimate.savings_kg, 0.0);
    }

    #[test]
    fn test_numeric_strings_accepted() {
        let calc = request(json!({"distance": " 12.5 ", "weight": "400"}))
            .validate()
            .unwrap();
        assert_eq!(calc.distance_km, 12.5);
        assert_eq!(calc.weight_kg, 400.0);
    }

    #[test]
    fn test_malformed_fields_rejected() {
        assert_eq!(
            request(json!({"distance": "far"})).validate(),
            Err(EmissionError::NotANumber { field: "distance" })
        );
        assert_eq!(
            request(json!({"weight": -5})).validate(),
            Err(EmissionError::OutOfRange { field: "weight" })
        );
        assert_eq!(
            request(json!({"weight": [1, 2]})).validate(),
            Err(EmissionError::NotANumber { field: "weight" })
        );
        assert!(matches!(
            request(json!({"mode": 3})).validate(),
            Err(EmissionError::InvalidMode(_))
        ));
    }

    #[test]
    fn test_air_shipment_saves_nothing() {
        let estimate = request(json!({"distance": 300, "weight": 2000, "mode": "air"}))
            .validate()
            .unwrap()
            .evaluate();
        assert!((estimate.emission_kg - 300.0).abs() < 1e-9);
        assert_eq!(estimate.baseline_kg, estimate.emission_kg);
        assert_eq!(estimate.savings_kg, 0.0);
    }
}
