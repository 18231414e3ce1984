//! Core library for the `rain` CLI.
//!
//! This crate defines:
//! - Configuration handling
//! - Geocoding and hourly weather retrieval (Open-Meteo)
//! - Supervised example construction from hourly series
//! - Training, evaluation and persistence of the rain-next-hour classifier
//! - Inference against the latest available hour
//!
//! It is used by `rain-cli`, but can also be reused by other binaries or services.

pub mod bundle;
pub mod classifier;
pub mod config;
pub mod error;
pub mod features;
pub mod metrics;
pub mod model;
pub mod predict;
pub mod provider;
pub mod train;

pub use bundle::ModelBundle;
pub use config::{ApiConfig, Config, PredictConfig, TrainingConfig};
pub use error::{Error, Result};
pub use features::{SupervisedSet, build_supervised};
pub use model::{FEATURE_COLS, Feature, FeatureValue, HourlyRecord, Location, PredictionResult};
pub use predict::{Predictor, predict_rain_next_hour};
pub use provider::{Geocoder, WeatherSource, openmeteo::OpenMeteoClient};
pub use train::{Evaluation, TrainOptions, TrainOutcome, train};
