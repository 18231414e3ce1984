use async_trait::async_trait;
use chrono::NaiveDateTime;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::{
    config::ApiConfig,
    error::{Error, Result},
    model::{FEATURE_COLS, Feature, HourlyRecord, Location},
};

use super::{Geocoder, WeatherSource};

/// Client for the Open-Meteo geocoding and forecast endpoints. No API key needed.
#[derive(Debug, Clone)]
pub struct OpenMeteoClient {
    http: Client,
    geocoding_url: String,
    forecast_url: String,
}

impl OpenMeteoClient {
    pub fn new(api: &ApiConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(api.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            geocoding_url: api.geocoding_url.clone(),
            forecast_url: api.forecast_url.clone(),
        })
    }

    pub fn geocoding_url(&self) -> &str {
        &self.geocoding_url
    }

    pub fn forecast_url(&self) -> &str {
        &self.forecast_url
    }
}

#[derive(Debug, Deserialize)]
struct OmGeocodingResponse {
    #[serde(default)]
    results: Option<Vec<OmGeocodingResult>>,
}

#[derive(Debug, Deserialize)]
struct OmGeocodingResult {
    name: Option<String>,
    admin1: Option<String>,
    country: Option<String>,
    latitude: f64,
    longitude: f64,
}

#[derive(Debug, Deserialize)]
struct OmForecastResponse {
    #[serde(default)]
    hourly: Option<OmHourly>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OmHourly {
    time: Vec<String>,
    temperature_2m: Vec<Option<f64>>,
    relative_humidity_2m: Vec<Option<f64>>,
    surface_pressure: Vec<Option<f64>>,
    cloud_cover: Vec<Option<f64>>,
    wind_speed_10m: Vec<Option<f64>>,
    precipitation: Vec<Option<f64>>,
}

impl OmHourly {
    fn column(&self, feature: Feature) -> &[Option<f64>] {
        match feature {
            Feature::Temperature => &self.temperature_2m,
            Feature::RelativeHumidity => &self.relative_humidity_2m,
            Feature::SurfacePressure => &self.surface_pressure,
            Feature::CloudCover => &self.cloud_cover,
            Feature::WindSpeed => &self.wind_speed_10m,
            Feature::Precipitation => &self.precipitation,
        }
    }

    /// Value at `row`; absent columns, short columns and nulls are all `None`.
    fn cell(&self, feature: Feature, row: usize) -> Option<f64> {
        self.column(feature).get(row).copied().flatten()
    }
}

fn display_name(result: &OmGeocodingResult, city: &str) -> String {
    let name = result.name.as_deref().unwrap_or(city);
    let region = result.admin1.as_deref();
    let country = result.country.as_deref();

    [Some(name), region, country]
        .into_iter()
        .flatten()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

fn parse_time(raw: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M")
        .or_else(|_| raw.parse::<NaiveDateTime>())
        .map_err(|e| Error::data(format!("Invalid hourly timestamp '{raw}': {e}")))
}

/// Turn the column-oriented `hourly` block into sorted, complete records.
fn parse_hourly(hourly: &OmHourly) -> Result<Vec<HourlyRecord>> {
    if hourly.time.is_empty() {
        return Err(Error::data("API response missing hourly time series."));
    }

    let mut records = Vec::with_capacity(hourly.time.len());
    let mut dropped = 0usize;

    for (row, raw_time) in hourly.time.iter().enumerate() {
        let time = parse_time(raw_time)?;
        let values: Option<Vec<f64>> =
            FEATURE_COLS.iter().map(|f| hourly.cell(*f, row)).collect();

        let Some(v) = values else {
            dropped += 1;
            continue;
        };

        records.push(HourlyRecord {
            time,
            temperature_2m: v[0],
            relative_humidity_2m: v[1],
            surface_pressure: v[2],
            cloud_cover: v[3],
            wind_speed_10m: v[4],
            precipitation: v[5],
        });
    }

    if dropped > 0 {
        tracing::warn!(dropped, kept = records.len(), "Dropped incomplete rows");
    }

    records.sort_by_key(|r| r.time);
    records.dedup_by_key(|r| r.time);

    Ok(records)
}

#[async_trait]
impl Geocoder for OpenMeteoClient {
    async fn geocode(&self, city: &str, country_code: Option<&str>) -> Result<Location> {
        let mut params = vec![
            ("name", city),
            ("count", "1"),
            ("language", "en"),
            ("format", "json"),
        ];
        if let Some(code) = country_code.filter(|c| !c.is_empty()) {
            params.push(("country_code", code));
        }

        tracing::debug!(city, ?country_code, "Geocoding city");

        let request = self.http.get(&self.geocoding_url).query(&params);
        let body = request.send().await?.error_for_status()?.text().await?;

        let parsed: OmGeocodingResponse = serde_json::from_str(&body)
            .map_err(|e| Error::data(format!("Failed to parse geocoding JSON: {e}")))?;

        let best = parsed
            .results
            .and_then(|r| r.into_iter().next())
            .ok_or_else(|| Error::Lookup {
                city: city.to_string(),
            })?;

        let location = Location {
            name: display_name(&best, city),
            latitude: best.latitude,
            longitude: best.longitude,
        };

        tracing::info!(name = %location.name, "Resolved location");
        Ok(location)
    }
}

#[async_trait]
impl WeatherSource for OpenMeteoClient {
    async fn fetch_hourly(
        &self,
        latitude: f64,
        longitude: f64,
        past_days: u32,
    ) -> Result<Vec<HourlyRecord>> {
        let hourly_vars = FEATURE_COLS.map(|f| f.as_str()).join(",");

        let params = [
            ("latitude", latitude.to_string()),
            ("longitude", longitude.to_string()),
            ("hourly", hourly_vars),
            ("past_days", past_days.to_string()),
            ("forecast_days", "1".to_string()),
            ("timezone", "auto".to_string()),
        ];

        tracing::debug!(latitude, longitude, past_days, "Fetching hourly weather");

        let request = self.http.get(&self.forecast_url).query(&params);
        let body = request.send().await?.error_for_status()?.text().await?;

        let parsed: OmForecastResponse = serde_json::from_str(&body)
            .map_err(|e| Error::data(format!("Failed to parse forecast JSON: {e}")))?;

        parse_hourly(&parsed.hourly.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param, query_param_is_missing};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> OpenMeteoClient {
        OpenMeteoClient::new(&ApiConfig {
            geocoding_url: format!("{}/v1/search", server.uri()),
            forecast_url: format!("{}/v1/forecast", server.uri()),
            timeout_secs: 5,
        })
        .unwrap()
    }

    fn hourly_json(times: &[&str], precipitation: serde_json::Value) -> serde_json::Value {
        let n = times.len();
        json!({
            "timezone": "Europe/Stockholm",
            "hourly": {
                "time": times,
                "temperature_2m": vec![10.0; n],
                "relative_humidity_2m": vec![80.0; n],
                "surface_pressure": vec![1005.0; n],
                "cloud_cover": vec![90.0; n],
                "wind_speed_10m": vec![12.0; n],
                "precipitation": precipitation,
            }
        })
    }

    async fn mount_json(server: &MockServer, route: &str, body: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn geocode_builds_display_name_and_sends_expected_query() {
        let server = MockServer::start().await;
        let body = json!({
            "results": [{
                "name": "Stockholm",
                "admin1": "Stockholm County",
                "country": "Sweden",
                "latitude": 59.33,
                "longitude": 18.07
            }]
        });

        Mock::given(method("GET"))
            .and(path("/v1/search"))
            .and(query_param("name", "Stockholm"))
            .and(query_param("count", "1"))
            .and(query_param("language", "en"))
            .and(query_param("format", "json"))
            .and(query_param("country_code", "SE"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let loc = client.geocode("Stockholm", Some("SE")).await.unwrap();

        assert_eq!(loc.name, "Stockholm, Stockholm County, Sweden");
        assert_eq!(loc.latitude, 59.33);
        assert_eq!(loc.longitude, 18.07);
    }

    #[tokio::test]
    async fn geocode_skips_missing_name_parts() {
        let server = MockServer::start().await;
        let body = json!({
            "results": [{ "admin1": "", "country": "Monaco", "latitude": 43.7, "longitude": 7.4 }]
        });
        mount_json(&server, "/v1/search", body).await;

        let loc = client_for(&server).geocode("Monaco", None).await.unwrap();
        assert_eq!(loc.name, "Monaco, Monaco");
    }

    #[tokio::test]
    async fn geocode_without_country_omits_the_filter() {
        let server = MockServer::start().await;
        let body = json!({
            "results": [{ "name": "Paris", "latitude": 48.85, "longitude": 2.35 }]
        });

        Mock::given(method("GET"))
            .and(path("/v1/search"))
            .and(query_param("name", "Paris"))
            .and(query_param_is_missing("country_code"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .expect(2)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let loc = client.geocode("Paris", None).await.unwrap();
        assert_eq!(loc.name, "Paris");

        // A blank code is treated the same as no code.
        client.geocode("Paris", Some("")).await.unwrap();
    }

    #[tokio::test]
    async fn geocode_missing_results_key_is_lookup_error() {
        let server = MockServer::start().await;
        mount_json(&server, "/v1/search", json!({ "generationtime_ms": 0.5 })).await;

        let client = client_for(&server);
        let err = client.geocode("Nowhereville", None).await.unwrap_err();

        assert!(matches!(err, Error::Lookup { .. }));
        assert!(err.to_string().contains("Nowhereville"));
    }

    #[tokio::test]
    async fn geocode_empty_results_list_is_lookup_error() {
        let server = MockServer::start().await;
        mount_json(&server, "/v1/search", json!({ "results": [] })).await;

        let client = client_for(&server);
        let err = client.geocode("Atlantis", Some("GR")).await.unwrap_err();

        match err {
            Error::Lookup { city } => assert_eq!(city, "Atlantis"),
            other => panic!("expected a lookup error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn geocode_http_failure_is_transport_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/search"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.geocode("Stockholm", None).await.unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
    }

    #[tokio::test]
    async fn fetch_hourly_sends_expected_query_and_parses_rows() {
        let server = MockServer::start().await;
        let times = ["2024-05-01T00:00", "2024-05-01T01:00"];
        let body = hourly_json(&times, json!([0.0, 0.4]));

        Mock::given(method("GET"))
            .and(path("/v1/forecast"))
            .and(query_param("latitude", "59.33"))
            .and(query_param("longitude", "18.07"))
            .and(query_param(
                "hourly",
                "temperature_2m,relative_humidity_2m,surface_pressure,\
                 cloud_cover,wind_speed_10m,precipitation",
            ))
            .and(query_param("past_days", "7"))
            .and(query_param("forecast_days", "1"))
            .and(query_param("timezone", "auto"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let records = client.fetch_hourly(59.33, 18.07, 7).await.unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[1].precipitation, 0.4);
        assert_eq!(records[0].surface_pressure, 1005.0);
    }

    #[tokio::test]
    async fn fetch_hourly_empty_series_is_data_error() {
        let server = MockServer::start().await;
        mount_json(&server, "/v1/forecast", json!({ "hourly": { "time": [] } })).await;

        let client = client_for(&server);
        let err = client.fetch_hourly(0.0, 0.0, 2).await.unwrap_err();
        assert!(matches!(err, Error::Data(_)));
    }

    #[tokio::test]
    async fn fetch_hourly_missing_hourly_block_is_data_error() {
        let server = MockServer::start().await;
        mount_json(&server, "/v1/forecast", json!({ "error": false })).await;

        let client = client_for(&server);
        let err = client.fetch_hourly(0.0, 0.0, 2).await.unwrap_err();
        assert!(err.to_string().contains("missing hourly time series"));
    }

    #[test]
    fn parse_hourly_drops_incomplete_rows_and_sorts() {
        let hourly = OmHourly {
            time: vec![
                "2024-05-01T02:00".into(),
                "2024-05-01T00:00".into(),
                "2024-05-01T01:00".into(),
            ],
            temperature_2m: vec![Some(3.0), Some(1.0), Some(2.0)],
            relative_humidity_2m: vec![Some(70.0); 3],
            surface_pressure: vec![Some(1000.0); 3],
            cloud_cover: vec![Some(50.0), None, Some(50.0)],
            wind_speed_10m: vec![Some(5.0); 3],
            precipitation: vec![Some(0.0); 3],
        };

        let records = parse_hourly(&hourly).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].temperature_2m, 2.0);
        assert_eq!(records[1].temperature_2m, 3.0);
        assert!(records.windows(2).all(|w| w[0].time < w[1].time));
    }

    #[test]
    fn parse_hourly_treats_absent_column_as_missing() {
        let hourly = OmHourly {
            time: vec!["2024-05-01T00:00".into()],
            temperature_2m: vec![Some(1.0)],
            relative_humidity_2m: vec![Some(70.0)],
            surface_pressure: vec![Some(1000.0)],
            cloud_cover: vec![Some(50.0)],
            wind_speed_10m: vec![Some(5.0)],
            precipitation: vec![],
        };

        assert!(parse_hourly(&hourly).unwrap().is_empty());
    }

    #[test]
    fn parse_hourly_keeps_first_of_duplicate_timestamps() {
        let hourly = OmHourly {
            time: vec!["2024-05-01T00:00".into(), "2024-05-01T00:00".into()],
            temperature_2m: vec![Some(1.0), Some(9.0)],
            relative_humidity_2m: vec![Some(70.0); 2],
            surface_pressure: vec![Some(1000.0); 2],
            cloud_cover: vec![Some(50.0); 2],
            wind_speed_10m: vec![Some(5.0); 2],
            precipitation: vec![Some(0.0); 2],
        };

        let records = parse_hourly(&hourly).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].temperature_2m, 1.0);
    }

    #[test]
    fn parse_hourly_rejects_bad_timestamp() {
        let hourly = OmHourly {
            time: vec!["yesterday".into()],
            ..Default::default()
        };

        let err = parse_hourly(&hourly).unwrap_err();
        assert!(err.to_string().contains("Invalid hourly timestamp"));
    }
}
