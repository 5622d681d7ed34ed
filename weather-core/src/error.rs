use thiserror::Error;

/// The three failure kinds a weather request can end in.
///
/// Transport and parser errors keep their underlying error as a source
/// instead of being flattened into strings, so callers can match on the
/// kind and tests can assert on the detail.
#[derive(Debug, Error)]
pub enum WeatherError {
    /// Ill-formed ZIP code, unit token or day count. Carries no detail
    /// about which field failed.
    #[error("Invalid input.")]
    InvalidInput,

    /// The upstream provider could not be reached, or answered with a
    /// non-success status.
    #[error("Error retrieving weather data: {0}")]
    Unavailable(#[from] reqwest::Error),

    /// The upstream provider answered with a body that is not valid JSON,
    /// or that is missing a required field.
    #[error("Invalid JSON format: {0}")]
    InvalidJson(#[from] serde_json::Error),
}
