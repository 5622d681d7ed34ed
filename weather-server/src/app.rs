use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::{Deserialize, Serialize};
use weather_core::{
    AverageWeatherReport, CurrentWeatherReport, WeatherError, WeatherProvider, WeatherQuery,
};

/// Shared handler state: one provider serves every request.
#[derive(Clone)]
pub struct AppState {
    pub provider: Arc<dyn WeatherProvider>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/current/{zipcode}", get(current_weather))
        .route("/average/{zipcode}", get(average_weather))
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok", version: env!("CARGO_PKG_VERSION") })
}

#[derive(Debug, Deserialize)]
struct CurrentParams {
    units: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AverageParams {
    units: Option<String>,
    #[serde(rename = "timePeriod")]
    time_period: Option<String>,
}

async fn current_weather(
    State(state): State<AppState>,
    Path(zipcode): Path<String>,
    Query(params): Query<CurrentParams>,
) -> Result<Json<CurrentWeatherReport>, ApiError> {
    let units = params.units.unwrap_or_default();
    let query = WeatherQuery::current(&zipcode, &units)?;

    tracing::info!(zip = %query.zip_code, "current weather request");

    let report = state.provider.current_weather(&query).await?;
    Ok(Json(report))
}

async fn average_weather(
    State(state): State<AppState>,
    Path(zipcode): Path<String>,
    Query(params): Query<AverageParams>,
) -> Result<Json<AverageWeatherReport>, ApiError> {
    let units = params.units.unwrap_or_default();

    // A missing or non-numeric timePeriod fails validation the same way
    // an out-of-range one does.
    let days = params.time_period.as_deref().and_then(|v| v.parse::<i64>().ok()).unwrap_or(0);

    let query = WeatherQuery::average(&zipcode, &units, days)?;

    tracing::info!(zip = %query.zip_code, days, "average weather request");

    let report = state.provider.average_weather(&query).await?;
    Ok(Json(report))
}

/// Maps the core error taxonomy onto HTTP statuses: invalid input and bad
/// upstream JSON are the caller's 400s, transport failures are 503.
pub struct ApiError(WeatherError);

impl From<WeatherError> for ApiError {
    fn from(err: WeatherError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            WeatherError::InvalidInput | WeatherError::InvalidJson(_) => StatusCode::BAD_REQUEST,
            WeatherError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };

        if status == StatusCode::SERVICE_UNAVAILABLE {
            tracing::warn!(error = %self.0, "upstream failure");
        }

        (status, self.0.to_string()).into_response()
    }
}
