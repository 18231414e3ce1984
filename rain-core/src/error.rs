//! Error taxonomy shared by every stage of the pipeline.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Geocoding returned no match for the requested city.
    #[error("Could not find location for city='{city}'. Try a more specific name.")]
    Lookup { city: String },

    /// Weather response was empty or malformed, or the data cannot be trained on.
    #[error("{0}")]
    Data(String),

    /// Network or HTTP status failure, passed through unchanged.
    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    #[error("Failed to load model bundle from {}: {reason}", path.display())]
    ModelLoad { path: PathBuf, reason: String },

    #[error("Failed to save model bundle to {}: {reason}", path.display())]
    ModelSave { path: PathBuf, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn data(msg: impl Into<String>) -> Self {
        Self::Data(msg.into())
    }

    pub(crate) fn model_load(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::ModelLoad {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn model_save(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::ModelSave {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
