use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{collections::HashSet, fs, path::Path};

use crate::{
    classifier::RainClassifier,
    error::{Error, Result},
    model::{Feature, Location},
};

/// The fitted pipeline together with everything needed to use it later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelBundle {
    pub model: RainClassifier,
    /// Column order the model was fit on.
    pub feature_cols: Vec<Feature>,
    pub train_location: Location,
    pub rain_threshold_mm: f64,
    pub trained_at: DateTime<Utc>,
}

impl ModelBundle {
    fn validate(&self) -> std::result::Result<(), String> {
        if self.feature_cols.is_empty() {
            return Err("bundle lists no feature columns".to_string());
        }

        let unique: HashSet<_> = self.feature_cols.iter().collect();
        if unique.len() != self.feature_cols.len() {
            return Err("bundle lists a feature column more than once".to_string());
        }

        let fitted = self.model.n_features();
        if fitted != self.feature_cols.len() {
            return Err(format!(
                "model was fit on {fitted} features but bundle lists {}",
                self.feature_cols.len()
            ));
        }

        let scaler = &self.model.scaler;
        if scaler.mean.len() != fitted || scaler.scale.len() != fitted {
            return Err(format!(
                "scaler holds {} means and {} scales for {fitted} features",
                scaler.mean.len(),
                scaler.scale.len()
            ));
        }
        if scaler.scale.iter().any(|s| !(s.is_finite() && *s > 0.0)) {
            return Err("scaler scales must be finite and positive".to_string());
        }

        let logistic = &self.model.logistic;
        let params = scaler.mean.iter().chain(&logistic.coef);
        if params.chain([&logistic.intercept]).any(|v| !v.is_finite()) {
            return Err("model parameters must be finite".to_string());
        }

        Ok(())
    }

    /// Read and validate a bundle written by [`ModelBundle::save`].
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| Error::model_load(path, e))?;
        let bundle: ModelBundle =
            serde_json::from_str(&contents).map_err(|e| Error::model_load(path, e))?;
        bundle.validate().map_err(|r| Error::model_load(path, r))?;

        tracing::debug!(path = %path.display(), "Loaded model bundle");
        Ok(bundle)
    }

    /// Write the bundle to a temporary sibling and rename it into place, so
    /// readers never observe a partially written file.
    pub fn save(&self, path: &Path) -> Result<()> {
        self.validate().map_err(|r| Error::model_save(path, r))?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| Error::model_save(path, e))?;
        }

        let json = serde_json::to_string_pretty(self).map_err(|e| Error::model_save(path, e))?;

        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        fs::write(&tmp, json).map_err(|e| Error::model_save(path, e))?;
        if let Err(e) = fs::rename(&tmp, path) {
            if let Err(cleanup) = fs::remove_file(&tmp) {
                tracing::warn!(error = %cleanup, "Could not remove temporary bundle file");
            }
            return Err(Error::model_save(path, e));
        }

        tracing::info!(path = %path.display(), "Saved model bundle");
        Ok(())
    }
}
