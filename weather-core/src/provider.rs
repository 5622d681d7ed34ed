use std::fmt::Debug;

use async_trait::async_trait;

use crate::error::WeatherError;
use crate::model::{AverageWeatherReport, CurrentWeatherReport, WeatherQuery};

pub mod openweather;

pub use openweather::OpenWeatherClient;

/// Seam between the request handlers and the upstream weather provider.
///
/// Both operations take an already-validated query; no validation happens
/// past this point.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    /// Current conditions for the query's ZIP code.
    async fn current_weather(
        &self,
        query: &WeatherQuery,
    ) -> Result<CurrentWeatherReport, WeatherError>;

    /// Average temperature and rain outlook over the query's day window.
    async fn average_weather(
        &self,
        query: &WeatherQuery,
    ) -> Result<AverageWeatherReport, WeatherError>;
}
