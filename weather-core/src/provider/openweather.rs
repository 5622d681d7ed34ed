use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::config::Config;
use crate::error::WeatherError;
use crate::model::{AverageWeatherReport, CurrentWeatherReport, WeatherQuery};

use super::WeatherProvider;

const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org";

/// Forecast entries arrive at 3-hour resolution, 8 per calendar day.
const ENTRIES_PER_DAY: usize = 8;

/// Client for the OpenWeatherMap `weather` and `forecast` endpoints.
#[derive(Debug, Clone)]
pub struct OpenWeatherClient {
    api_key: String,
    base_url: String,
    http: Client,
}

impl OpenWeatherClient {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            http: Client::new(),
        }
    }

    pub fn new_with_base_url(api_key: String, base_url: &str) -> Self {
        Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            http: Client::new(),
        }
    }

    /// Build a client from config, applying the base-URL override and the
    /// optional upstream timeout. Without `request_timeout_secs` the call
    /// waits as long as the provider does.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let api_key = config.api_key.clone().ok_or_else(|| {
            anyhow::anyhow!(
                "No OpenWeatherMap API key configured.\n\
                 Hint: run `weather configure` and enter your API key, \
                 or set OPENWEATHER_API_KEY."
            )
        })?;

        let mut builder = Client::builder();
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http = builder.build().context("Failed to build HTTP client")?;

        Ok(Self {
            api_key,
            base_url: config
                .base_url
                .as_deref()
                .unwrap_or(DEFAULT_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            http,
        })
    }

    async fn fetch_current(
        &self,
        query: &WeatherQuery,
    ) -> Result<CurrentWeatherReport, WeatherError> {
        let url = format!("{}/data/2.5/weather", self.base_url);
        let zip = format!("{},us", query.zip_code);

        tracing::debug!(zip = %query.zip_code, units = query.unit.api_token(), "requesting current conditions");

        let res = self
            .http
            .get(&url)
            .query(&[
                ("zip", zip.as_str()),
                ("units", query.unit.api_token()),
                ("appid", self.api_key.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?;

        let body = res.text().await?;

        let parsed: CurrentResponse = serde_json::from_str(&body)?;

        Ok(CurrentWeatherReport {
            // f64::round: half-away-from-zero, so 72.5 becomes 73.
            current_temperature: parsed.main.temp.round() as i64,
            unit: query.unit.label().to_string(),
            lat: parsed.coord.lat,
            lon: parsed.coord.lon,
            rain_possible_today: parsed.rain.is_some(),
        })
    }

    async fn fetch_forecast(
        &self,
        query: &WeatherQuery,
        days: u8,
    ) -> Result<AverageWeatherReport, WeatherError> {
        // The free API has no "give me N days" parameter; the full window
        // comes back and is trimmed during aggregation.
        let url = format!("{}/data/2.5/forecast", self.base_url);
        let zip = format!("{},us", query.zip_code);

        tracing::debug!(zip = %query.zip_code, days, "requesting forecast");

        let res = self
            .http
            .get(&url)
            .query(&[
                ("zip", zip.as_str()),
                ("units", query.unit.api_token()),
                ("appid", self.api_key.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?;

        let body = res.text().await?;

        let parsed: ForecastResponse = serde_json::from_str(&body)?;

        let (average_temperature, rain_possible) = aggregate(&parsed.list, days);

        Ok(AverageWeatherReport {
            average_temperature,
            unit: query.unit.label().to_string(),
            lat: parsed.city.coord.lat,
            lon: parsed.city.coord.lon,
            rain_possible,
        })
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherClient {
    async fn current_weather(
        &self,
        query: &WeatherQuery,
    ) -> Result<CurrentWeatherReport, WeatherError> {
        self.fetch_current(query).await
    }

    async fn average_weather(
        &self,
        query: &WeatherQuery,
    ) -> Result<AverageWeatherReport, WeatherError> {
        let days = query.days.ok_or(WeatherError::InvalidInput)?;
        self.fetch_forecast(query, days).await
    }
}

/// Windowed average with early exit on rain.
///
/// Consumes at most `days * 8` entries in order, stopping right after the
/// first rain-bearing one, so rain on entry `k` truncates the averaging
/// window to `k + 1` entries. An empty window averages to 0.
fn aggregate(entries: &[ForecastEntry], days: u8) -> (i64, bool) {
    let max_items = usize::from(days) * ENTRIES_PER_DAY;

    let mut total = 0.0;
    let mut count = 0usize;
    let mut rain_possible = false;

    for entry in entries.iter().take(max_items) {
        total += entry.main.temp;
        count += 1;

        if entry.signals_rain() {
            rain_possible = true;
            break;
        }
    }

    let average = if count > 0 { total / count as f64 } else { 0.0 };

    (average.round() as i64, rain_possible)
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
}

#[derive(Debug, Deserialize)]
struct OwCoord {
    lat: f64,
    lon: f64,
}

#[derive(Debug, Deserialize)]
struct CurrentResponse {
    main: OwMain,
    coord: OwCoord,
    /// Presence of the key is what matters; the value can be anything,
    /// including `{}` or `null`.
    #[serde(default, deserialize_with = "any_value")]
    rain: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct OwCondition {
    main: String,
}

#[derive(Debug, Deserialize)]
struct ForecastEntry {
    main: OwMain,
    #[serde(default, deserialize_with = "any_value")]
    rain: Option<Value>,
    #[serde(default)]
    weather: Vec<OwCondition>,
}

impl ForecastEntry {
    /// A `rain` object wins outright; otherwise any condition whose `main`
    /// contains "rain" (case-insensitive) counts, so "Rain", "light rain"
    /// and "Thunderstorm with rain" all match.
    fn signals_rain(&self) -> bool {
        if matches!(self.rain, Some(Value::Object(_))) {
            return true;
        }

        self.weather.iter().any(|w| w.main.to_lowercase().contains("rain"))
    }
}

#[derive(Debug, Deserialize)]
struct ForecastCity {
    coord: OwCoord,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    city: ForecastCity,
    list: Vec<ForecastEntry>,
}

/// Deserializes whatever value is present, keeping `null` distinct from an
/// absent key (a plain `Option` field would collapse the two).
fn any_value<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn entry(json: Value) -> ForecastEntry {
        serde_json::from_value(json).expect("test entry deserializes")
    }

    fn clear_entry(temp: f64) -> ForecastEntry {
        entry(serde_json::json!({
            "main": { "temp": temp },
            "weather": [ { "main": "Clear" } ]
        }))
    }

    fn rain_entry(temp: f64) -> ForecastEntry {
        entry(serde_json::json!({
            "main": { "temp": temp },
            "weather": [ { "main": "Rain" } ]
        }))
    }

    #[test]
    fn rain_object_wins_over_weather_list() {
        let e = entry(serde_json::json!({
            "main": { "temp": 10.0 },
            "rain": { "3h": 0.2 },
            "weather": [ { "main": "Clear" } ]
        }));
        assert!(e.signals_rain());
    }

    #[test]
    fn non_object_rain_value_falls_through_to_weather_scan() {
        let e = entry(serde_json::json!({
            "main": { "temp": 10.0 },
            "rain": 0.2,
            "weather": [ { "main": "Clear" } ]
        }));
        assert!(!e.signals_rain());
    }

    #[test]
    fn weather_main_matches_rain_substring_case_insensitively() {
        for main in ["Rain", "light rain", "Thunderstorm with rain"] {
            let e = entry(serde_json::json!({
                "main": { "temp": 10.0 },
                "weather": [ { "main": main } ]
            }));
            assert!(e.signals_rain(), "{main:?} must signal rain");
        }

        let e = entry(serde_json::json!({
            "main": { "temp": 10.0 },
            "weather": [ { "main": "Clear" } ]
        }));
        assert!(!e.signals_rain());
    }

    #[test]
    fn aggregate_consumes_full_window_without_rain() {
        let entries: Vec<ForecastEntry> = (0..20).map(|i| clear_entry(i as f64)).collect();

        // days = 2 caps the window at 16 entries: mean of 0..=15 is 7.5,
        // rounded half-away-from-zero to 8.
        let (avg, rain) = aggregate(&entries, 2);
        assert_eq!(avg, 8);
        assert!(!rain);
    }

    #[test]
    fn aggregate_stops_at_first_rain_entry_inclusive() {
        let entries = vec![clear_entry(10.0), rain_entry(20.0), clear_entry(90.0)];

        // The rain entry is included, everything after it is not.
        let (avg, rain) = aggregate(&entries, 2);
        assert_eq!(avg, 15);
        assert!(rain);
    }

    #[test]
    fn aggregate_handles_list_shorter_than_window() {
        let entries = vec![clear_entry(10.5), rain_entry(11.5)];

        let (avg, rain) = aggregate(&entries, 2);
        assert_eq!(avg, 11);
        assert!(rain);
    }

    #[test]
    fn aggregate_of_empty_list_is_zero() {
        let (avg, rain) = aggregate(&[], 5);
        assert_eq!(avg, 0);
        assert!(!rain);
    }

    fn query(units: &str) -> WeatherQuery {
        WeatherQuery::current("12345", units).expect("valid query")
    }

    fn average_query(units: &str, days: i64) -> WeatherQuery {
        WeatherQuery::average("12345", units, days).expect("valid query")
    }

    #[tokio::test]
    async fn current_weather_extracts_fields_and_ignores_unknown_ones() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .and(query_param("zip", "12345,us"))
            .and(query_param("units", "imperial"))
            .and(query_param("appid", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "main": { "temp": 72.5 },
                "bogus": { "bogusValue": 72.5 },
                "coord": { "lat": 40.71, "lon": -74.01 },
                "rain": { "1h": 0.5 }
            })))
            .mount(&server)
            .await;

        let client = OpenWeatherClient::new_with_base_url("test-key".into(), &server.uri());
        let report = client.current_weather(&query("fahrenheit")).await.expect("current weather");

        assert_eq!(report.current_temperature, 73);
        assert_eq!(report.unit, "F");
        assert_eq!(report.lat, 40.71);
        assert_eq!(report.lon, -74.01);
        assert!(report.rain_possible_today);
    }

    #[tokio::test]
    async fn current_weather_without_rain_key() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .and(query_param("units", "metric"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "main": { "temp": 22.4 },
                "coord": { "lat": 40.71, "lon": -74.01 }
            })))
            .mount(&server)
            .await;

        let client = OpenWeatherClient::new_with_base_url("test-key".into(), &server.uri());
        let report = client.current_weather(&query("celsius")).await.expect("current weather");

        assert_eq!(report.current_temperature, 22);
        assert_eq!(report.unit, "C");
        assert!(!report.rain_possible_today);
    }

    #[tokio::test]
    async fn rain_key_counts_as_present_even_when_empty_or_null() {
        for rain in [serde_json::json!({}), Value::Null] {
            let server = MockServer::start().await;

            Mock::given(method("GET"))
                .and(path("/data/2.5/weather"))
                .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "main": { "temp": 10.0 },
                    "coord": { "lat": 1.0, "lon": 2.0 },
                    "rain": rain.clone()
                })))
                .mount(&server)
                .await;

            let client = OpenWeatherClient::new_with_base_url("test-key".into(), &server.uri());
            let report = client.current_weather(&query("celsius")).await.expect("current weather");

            assert!(report.rain_possible_today, "rain value {rain:?} must count as present");
        }
    }

    #[tokio::test]
    async fn truncated_body_is_a_parse_failure() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string("{\"main\":{\"temp\":72.5}"),
            )
            .mount(&server)
            .await;

        let client = OpenWeatherClient::new_with_base_url("test-key".into(), &server.uri());
        let err = client.current_weather(&query("fahrenheit")).await.unwrap_err();

        assert!(matches!(err, WeatherError::InvalidJson(_)));
        assert!(err.to_string().contains("Invalid JSON format"));
    }

    #[tokio::test]
    async fn missing_required_field_is_a_parse_failure() {
        // Well-formed JSON without main.temp is classified the same way as
        // malformed JSON rather than propagating as a fault.
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "coord": { "lat": 40.71, "lon": -74.01 }
            })))
            .mount(&server)
            .await;

        let client = OpenWeatherClient::new_with_base_url("test-key".into(), &server.uri());
        let err = client.current_weather(&query("fahrenheit")).await.unwrap_err();

        assert!(matches!(err, WeatherError::InvalidJson(_)));
    }

    #[tokio::test]
    async fn unreachable_upstream_is_unavailable() {
        let server = MockServer::start().await;
        let uri = server.uri();
        // Shutting the mock server down leaves nothing listening on the port.
        drop(server);

        let client = OpenWeatherClient::new_with_base_url("test-key".into(), &uri);
        let err = client.current_weather(&query("fahrenheit")).await.unwrap_err();

        assert!(matches!(err, WeatherError::Unavailable(_)));
    }

    #[tokio::test]
    async fn non_success_status_is_unavailable() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .respond_with(ResponseTemplate::new(404).set_body_string("{\"cod\":\"404\"}"))
            .mount(&server)
            .await;

        let client = OpenWeatherClient::new_with_base_url("test-key".into(), &server.uri());
        let err = client.current_weather(&query("fahrenheit")).await.unwrap_err();

        assert!(matches!(err, WeatherError::Unavailable(_)));
        assert!(err.to_string().contains("404"));
    }

    #[tokio::test]
    async fn average_weather_aggregates_forecast_list() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/data/2.5/forecast"))
            .and(query_param("zip", "12345,us"))
            .and(query_param("units", "metric"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "city": { "coord": { "lat": 51.51, "lon": -0.13 } },
                "list": [
                    {
                        "bogus": { "bogusValue": 10.5 },
                        "main": { "temp": 10.5 },
                        "weather": [ { "main": "Clear" } ]
                    },
                    {
                        "main": { "temp": 11.5 },
                        "weather": [ { "main": "Rain" } ]
                    }
                ]
            })))
            .mount(&server)
            .await;

        let client = OpenWeatherClient::new_with_base_url("test-key".into(), &server.uri());
        let report =
            client.average_weather(&average_query("celsius", 2)).await.expect("average weather");

        assert_eq!(report.average_temperature, 11);
        assert_eq!(report.unit, "C");
        assert_eq!(report.lat, 51.51);
        assert_eq!(report.lon, -0.13);
        assert!(report.rain_possible);
    }

    #[tokio::test]
    async fn average_weather_on_empty_forecast_is_zero() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/data/2.5/forecast"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "city": { "coord": { "lat": 51.51, "lon": -0.13 } },
                "list": []
            })))
            .mount(&server)
            .await;

        let client = OpenWeatherClient::new_with_base_url("test-key".into(), &server.uri());
        let report =
            client.average_weather(&average_query("fahrenheit", 5)).await.expect("average weather");

        assert_eq!(report.average_temperature, 0);
        assert_eq!(report.unit, "F");
        assert!(!report.rain_possible);
    }

    #[tokio::test]
    async fn average_weather_requires_a_day_window() {
        let client = OpenWeatherClient::new("test-key".into());
        let err = client.average_weather(&query("celsius")).await.unwrap_err();

        assert!(matches!(err, WeatherError::InvalidInput));
    }
}
