use std::path::Path;

use crate::{
    bundle::ModelBundle,
    classifier::decide,
    config::PredictConfig,
    error::{Error, Result},
    model::{FeatureValue, PredictionResult},
    provider::WeatherSource,
};

/// Inference over a loaded, read-only bundle. Safe to share between callers.
#[derive(Debug, Clone)]
pub struct Predictor {
    bundle: ModelBundle,
    settings: PredictConfig,
}

impl Predictor {
    pub fn new(bundle: ModelBundle, settings: PredictConfig) -> Self {
        Self { bundle, settings }
    }

    pub fn load(model_path: &Path, settings: PredictConfig) -> Result<Self> {
        Ok(Self::new(ModelBundle::load(model_path)?, settings))
    }

    pub fn bundle(&self) -> &ModelBundle {
        &self.bundle
    }

    /// Probability of rain in the hour after the latest available observation.
    ///
    /// The latest row may be a provider estimate for the current day rather
    /// than a completed measurement; no freshness check is applied.
    pub async fn predict(
        &self,
        source: &dyn WeatherSource,
        latitude: f64,
        longitude: f64,
    ) -> Result<PredictionResult> {
        let past_days = self.settings.past_days;
        let records = source.fetch_hourly(latitude, longitude, past_days).await?;

        let latest = records
            .iter()
            .max_by_key(|r| r.time)
            .ok_or_else(|| Error::data("No complete hourly observations to predict from"))?;

        // Bundle order, not the order the fetcher happens to produce.
        let columns = &self.bundle.feature_cols;
        let row = latest.feature_vector(columns);

        let prob = self.bundle.model.predict_proba(&row)?;
        let pred = decide(prob);

        tracing::info!(time = %latest.time, prob, pred, "Predicted rain next hour");

        let features_used = columns
            .iter()
            .zip(&row)
            .map(|(&feature, &value)| FeatureValue { feature, value })
            .collect();

        let skip = records.len().saturating_sub(self.settings.recent_hours);
        let recent = records[skip..].to_vec();

        Ok(PredictionResult {
            time_used: latest.time,
            prob_rain_next_hour: prob,
            pred_rain_next_hour: pred,
            features_used,
            recent,
        })
    }
}

/// Load the bundle at `model_path` and predict for the given coordinates.
pub async fn predict_rain_next_hour(
    model_path: &Path,
    settings: &PredictConfig,
    source: &dyn WeatherSource,
    latitude: f64,
    longitude: f64,
) -> Result<PredictionResult> {
    let predictor = Predictor::load(model_path, settings.clone())?;
    predictor.predict(source, latitude, longitude).await
}
