//! Core library for the weather web service.
//!
//! This crate defines:
//! - Configuration loading (file, environment)
//! - The upstream weather provider client and its failure taxonomy
//! - Shared domain models and the fixed placeholder tables
//!
//! It is used by `weather-server`, but carries no HTTP-server concerns itself.

pub mod catalog;
pub mod config;
pub mod model;
pub mod provider;

pub use config::{Config, ProviderConfig, ServerConfig};
pub use model::{GlobalAverageRecord, StaticLocationRecord, WeatherReport};
pub use provider::{ProviderError, WeatherProvider, openweather::OpenWeatherProvider};
