use serde::{Deserialize, Serialize};

use crate::error::WeatherError;

/// Temperature unit preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    Fahrenheit,
    Celsius,
}

impl Unit {
    /// Single-letter label used in response payloads.
    pub fn label(&self) -> &'static str {
        match self {
            Unit::Fahrenheit => "F",
            Unit::Celsius => "C",
        }
    }

    /// Unit-system token expected by the OpenWeatherMap API.
    pub fn api_token(&self) -> &'static str {
        match self {
            Unit::Fahrenheit => "imperial",
            Unit::Celsius => "metric",
        }
    }
}

impl TryFrom<&str> for Unit {
    type Error = WeatherError;

    /// The match is byte-for-byte: only the exact lowercase tokens are
    /// accepted, so `"Fahrenheit"` and `"CELSIUS"` are rejected.
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "fahrenheit" => Ok(Unit::Fahrenheit),
            "celsius" => Ok(Unit::Celsius),
            _ => Err(WeatherError::InvalidInput),
        }
    }
}

/// A validated request for one of the two endpoints.
///
/// Built once per request and discarded after handling; `days` is only
/// set for the averaging endpoint.
#[derive(Debug, Clone)]
pub struct WeatherQuery {
    pub zip_code: String,
    pub unit: Unit,
    pub days: Option<u8>,
}

impl WeatherQuery {
    /// Validate parameters for the current-conditions endpoint.
    pub fn current(zip_code: &str, units: &str) -> Result<Self, WeatherError> {
        if zip_code.trim().is_empty() {
            return Err(WeatherError::InvalidInput);
        }

        let unit = Unit::try_from(units)?;

        Ok(Self { zip_code: zip_code.to_owned(), unit, days: None })
    }

    /// Validate parameters for the averaging endpoint.
    ///
    /// `days` must be within `2..=5`; both 1 and 6 are rejected.
    pub fn average(zip_code: &str, units: &str, days: i64) -> Result<Self, WeatherError> {
        if !(2..=5).contains(&days) {
            return Err(WeatherError::InvalidInput);
        }

        let mut query = Self::current(zip_code, units)?;
        query.days = Some(days as u8);

        Ok(query)
    }
}

/// Response payload for the current-conditions endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentWeatherReport {
    pub current_temperature: i64,
    pub unit: String,
    pub lat: f64,
    pub lon: f64,
    pub rain_possible_today: bool,
}

/// Response payload for the averaging endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AverageWeatherReport {
    pub average_temperature: i64,
    pub unit: String,
    pub lat: f64,
    pub lon: f64,
    pub rain_possible: bool,
}
