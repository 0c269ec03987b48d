//! Vehicle details submitted at intake
//!
//! Raw request bodies deserialize into [`VehicleDetailsInput`]; the only way
//! to obtain a [`VehicleDetails`] is [`VehicleDetailsInput::validate`].

use serde::Deserialize;
use thiserror::Error;

/// Oldest model year accepted
const MIN_MODEL_YEAR: u64 = 1886;
/// Newest model year accepted
const MAX_MODEL_YEAR: u64 = 2100;

/// Malformed or missing session fields, rejected before any provider call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ValidationError(pub String);

/// Numeric field that clients send either as a JSON number or a string
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum NumericInput {
    Number(serde_json::Number),
    Text(String),
}

impl NumericInput {
    /// Parse into a non-negative integer
    ///
    /// Strings may carry thousands separators (`50,000`, `50_000`, `50 000`).
    /// Fractional values are rounded.
    pub fn to_u64(&self, field: &str) -> Result<u64, ValidationError> {
        let invalid = || ValidationError(format!("{} must be a non-negative number", field));

        match self {
            NumericInput::Number(n) => {
                if let Some(v) = n.as_u64() {
                    return Ok(v);
                }
                match n.as_f64() {
                    Some(v) if v.is_finite() && v >= 0.0 => Ok(v.round() as u64),
                    _ => Err(invalid()),
                }
            }
            NumericInput::Text(s) => {
                let cleaned: String = s
                    .chars()
                    .filter(|c| !matches!(c, ',' | '_') && !c.is_whitespace())
                    .collect();
                if cleaned.is_empty() {
                    return Err(ValidationError(format!("{} is required", field)));
                }
                if let Ok(v) = cleaned.parse::<u64>() {
                    return Ok(v);
                }
                match cleaned.parse::<f64>() {
                    Ok(v) if v.is_finite() && v >= 0.0 => Ok(v.round() as u64),
                    _ => Err(invalid()),
                }
            }
        }
    }
}

/// Unvalidated vehicle details as received over HTTP
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleDetailsInput {
    #[serde(default)]
    pub car_type: Option<String>,
    #[serde(default)]
    pub car_model: Option<String>,
    #[serde(default)]
    pub mileage: Option<NumericInput>,
    #[serde(default)]
    pub year: Option<NumericInput>,
    #[serde(default)]
    pub problem_description: Option<String>,
}

impl VehicleDetailsInput {
    /// Validate required fields and normalize numeric ones
    ///
    /// Text fields are kept exactly as submitted; blank values are rejected.
    pub fn validate(self) -> Result<VehicleDetails, ValidationError> {
        let car_type = required_text(self.car_type, "carType")?;
        let car_model = required_text(self.car_model, "carModel")?;
        let problem_description = required_text(self.problem_description, "problemDescription")?;

        let mileage = self
            .mileage
            .ok_or_else(|| ValidationError("mileage is required".to_string()))?
            .to_u64("mileage")?;

        let year = match self.year {
            Some(raw) => {
                let year = raw.to_u64("year")?;
                if !(MIN_MODEL_YEAR..=MAX_MODEL_YEAR).contains(&year) {
                    return Err(ValidationError(format!(
                        "year must be between {} and {}",
                        MIN_MODEL_YEAR, MAX_MODEL_YEAR
                    )));
                }
                Some(year as u16)
            }
            None => None,
        };

        Ok(VehicleDetails {
            car_type,
            car_model,
            mileage,
            year,
            problem_description,
        })
    }
}

fn required_text(value: Option<String>, field: &str) -> Result<String, ValidationError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ValidationError(format!("{} is required", field))),
    }
}

/// Validated, immutable vehicle details owned by a guided session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VehicleDetails {
    car_type: String,
    car_model: String,
    mileage: u64,
    year: Option<u16>,
    problem_description: String,
}

impl VehicleDetails {
    pub fn car_type(&self) -> &str {
        &self.car_type
    }

    pub fn car_model(&self) -> &str {
        &self.car_model
    }

    pub fn mileage(&self) -> u64 {
        self.mileage
    }

    pub fn year(&self) -> Option<u16> {
        self.year
    }

    /// Problem description exactly as the user wrote it
    pub fn problem_description(&self) -> &str {
        &self.problem_description
    }

    /// "Toyota Camry 2020" style label for prompts and logs
    pub fn display_name(&self) -> String {
        let mut label = format!("{} {}", self.car_type.trim(), self.car_model.trim());
        if let Some(year) = self.year {
            label.push_str(&format!(" ({})", year));
        }
        label
    }
}
