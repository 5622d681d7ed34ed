//! Core library for the ZIP-code weather service.
//!
//! This crate defines:
//! - Request validation and shared domain models (queries, reports)
//! - The error taxonomy surfaced by both endpoints
//! - The OpenWeatherMap-backed provider
//! - Configuration handling
//!
//! It is used by `weather-server` and `weather-cli`, but can also be
//! reused by other binaries or services.

pub mod config;
pub mod error;
pub mod model;
pub mod provider;

pub use config::Config;
pub use error::WeatherError;
pub use model::{AverageWeatherReport, CurrentWeatherReport, Unit, WeatherQuery};
pub use provider::{OpenWeatherClient, WeatherProvider};
