use crate::{
    Config,
    error::Result,
    model::{HourlyRecord, Location},
    provider::openmeteo::OpenMeteoClient,
};
use async_trait::async_trait;
use std::fmt::Debug;

pub mod openmeteo;

/// Resolves a free-text city name to a location.
#[async_trait]
pub trait Geocoder: Send + Sync + Debug {
    async fn geocode(&self, city: &str, country_code: Option<&str>) -> Result<Location>;
}

/// Source of hourly weather series.
#[async_trait]
pub trait WeatherSource: Send + Sync + Debug {
    /// Hourly records covering `past_days` of history plus the current day,
    /// sorted by time with incomplete rows removed.
    async fn fetch_hourly(
        &self,
        latitude: f64,
        longitude: f64,
        past_days: u32,
    ) -> Result<Vec<HourlyRecord>>;
}

/// Construct the Open-Meteo client from the `[api]` section of the config.
pub fn client_from_config(config: &Config) -> Result<OpenMeteoClient> {
    OpenMeteoClient::new(&config.api)
}
