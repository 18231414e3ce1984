use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Error;

/// A resolved place: display name plus coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// One of the six hourly weather variables used as model inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Feature {
    #[serde(rename = "temperature_2m")]
    Temperature,
    #[serde(rename = "relative_humidity_2m")]
    RelativeHumidity,
    #[serde(rename = "surface_pressure")]
    SurfacePressure,
    #[serde(rename = "cloud_cover")]
    CloudCover,
    #[serde(rename = "wind_speed_10m")]
    WindSpeed,
    #[serde(rename = "precipitation")]
    Precipitation,
}

/// Column order the classifier is trained on. Current-hour precipitation is
/// an input in its own right, separate from the next-hour label.
pub const FEATURE_COLS: [Feature; 6] = [
    Feature::Temperature,
    Feature::RelativeHumidity,
    Feature::SurfacePressure,
    Feature::CloudCover,
    Feature::WindSpeed,
    Feature::Precipitation,
];

impl Feature {
    /// Name as used by the Open-Meteo API and in persisted bundles.
    pub fn as_str(&self) -> &'static str {
        match self {
            Feature::Temperature => "temperature_2m",
            Feature::RelativeHumidity => "relative_humidity_2m",
            Feature::SurfacePressure => "surface_pressure",
            Feature::CloudCover => "cloud_cover",
            Feature::WindSpeed => "wind_speed_10m",
            Feature::Precipitation => "precipitation",
        }
    }

    pub const fn all() -> &'static [Feature] {
        &FEATURE_COLS
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Feature {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Feature::all()
            .iter()
            .copied()
            .find(|f| f.as_str() == value)
            .ok_or_else(|| Error::data(format!("Unknown weather variable '{value}'")))
    }
}

/// One hour of observations. Series of records are kept sorted by `time`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyRecord {
    pub time: NaiveDateTime,
    pub temperature_2m: f64,
    pub relative_humidity_2m: f64,
    pub surface_pressure: f64,
    pub cloud_cover: f64,
    pub wind_speed_10m: f64,
    pub precipitation: f64,
}

impl HourlyRecord {
    pub fn value(&self, feature: Feature) -> f64 {
        match feature {
            Feature::Temperature => self.temperature_2m,
            Feature::RelativeHumidity => self.relative_humidity_2m,
            Feature::SurfacePressure => self.surface_pressure,
            Feature::CloudCover => self.cloud_cover,
            Feature::WindSpeed => self.wind_speed_10m,
            Feature::Precipitation => self.precipitation,
        }
    }

    /// Values for `columns`, in exactly that order.
    pub fn feature_vector(&self, columns: &[Feature]) -> Vec<f64> {
        columns.iter().map(|f| self.value(*f)).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureValue {
    pub feature: Feature,
    pub value: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Timestamp of the observation the prediction was made from.
    pub time_used: NaiveDateTime,
    pub prob_rain_next_hour: f64,
    pub pred_rain_next_hour: u8,
    /// Inputs in the order the model consumed them.
    pub features_used: Vec<FeatureValue>,
    pub recent: Vec<HourlyRecord>,
}

impl PredictionResult {
    pub fn rain_likely(&self) -> bool {
        self.pred_rain_next_hour == 1
    }
}
