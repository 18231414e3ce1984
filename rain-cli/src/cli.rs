use clap::{Parser, Subcommand};
use inquire::{CustomType, Text};
use rain_core::{
    Config, Geocoder, Predictor, TrainOptions, WeatherSource, config::normalize_country_code,
    provider::client_from_config, train,
};
use std::path::PathBuf;

use crate::{plot, render};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "rain", version, about = "Will it rain in the next hour?")]
pub struct Cli {
    /// Config file to use instead of the one in the platform config directory.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Interactively set the training location and model path.
    Configure,

    /// Fetch recent history, train the classifier and save the model bundle.
    Train {
        /// City to train on; defaults to the configured training city.
        #[arg(long)]
        city: Option<String>,

        /// ISO country code filter for the city lookup, e.g. "SE".
        #[arg(long)]
        country: Option<String>,

        /// Days of hourly history to fetch.
        #[arg(long)]
        past_days: Option<u32>,
    },

    /// Predict whether it will rain in the next hour for a city.
    Predict {
        /// City name.
        city: String,

        /// Optional ISO country code, e.g. "SE".
        #[arg(long)]
        country: Option<String>,
    },
}

impl Cli {
    fn config_path(&self) -> anyhow::Result<PathBuf> {
        match &self.config {
            Some(path) => Ok(path.clone()),
            None => Ok(Config::config_file_path()?),
        }
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let config_path = self.config_path()?;
        let mut config = Config::load_from(&config_path)?;
        tracing::debug!(path = %config_path.display(), "Loaded configuration");

        match self.command {
            Command::Configure => {
                configure(&mut config)?;
                config.save_to(&config_path)?;
                println!("Saved configuration to {}", config_path.display());
            }
            Command::Train {
                city,
                country,
                past_days,
            } => {
                if let Some(city) = city {
                    config.set_training_location(city, country);
                } else if country.is_some() {
                    config.training.country_code = normalize_country_code(country);
                }
                if let Some(days) = past_days {
                    config.training.past_days = days;
                }
                run_training(&config).await?;
            }
            Command::Predict { city, country } => {
                run_prediction(&config, &city, normalize_country_code(country)).await?;
            }
        }

        Ok(())
    }
}

fn configure(config: &mut Config) -> anyhow::Result<()> {
    let city = Text::new("Training city:")
        .with_default(&config.training.city)
        .prompt()?;

    let country = Text::new("Country code (optional, e.g. SE):")
        .with_default(config.training.country_code.as_deref().unwrap_or(""))
        .with_help_message("Leave blank to search all countries")
        .prompt()?;

    let past_days = CustomType::<u32>::new("Days of history to train on:")
        .with_default(config.training.past_days)
        .with_error_message("Please enter a whole number of days")
        .prompt()?;

    let model_path = Text::new("Model bundle path:")
        .with_default(&config.model_path.display().to_string())
        .prompt()?;

    config.set_training_location(city, Some(country));
    config.training.past_days = past_days;
    config.model_path = PathBuf::from(model_path);

    Ok(())
}

async fn run_training(config: &Config) -> anyhow::Result<()> {
    let client = client_from_config(config)?;
    let training = &config.training;

    let location = client
        .geocode(&training.city, training.country_code.as_deref())
        .await?;
    let days = training.past_days;
    println!("Training on {} (past {days} days)", location.name);

    let records = client
        .fetch_hourly(location.latitude, location.longitude, days)
        .await?;

    let outcome = train(&records, &location, &TrainOptions::from(training))?;
    let evaluation = &outcome.evaluation;

    let summary = render::training_summary(&outcome.bundle.feature_cols, evaluation);
    print!("{summary}");

    let roc_path = &config.roc_curve_path;
    if evaluation.roc_curve.is_empty() {
        println!("No ROC curve plotted (test split has a single class).");
    } else {
        // A plotting failure is reported but does not fail training.
        match plot::roc_curve_png(roc_path, &evaluation.roc_curve) {
            Ok(()) => println!("Saved ROC curve to: {}", roc_path.display()),
            Err(e) => println!("Could not save ROC curve plot: {e:#}"),
        }
    }

    outcome.bundle.save(&config.model_path)?;
    println!("\nSaved model to: {}", config.model_path.display());

    Ok(())
}

async fn run_prediction(
    config: &Config,
    city: &str,
    country: Option<String>,
) -> anyhow::Result<()> {
    let client = client_from_config(config)?;

    let location = client.geocode(city, country.as_deref()).await?;
    println!("{}\n", render::location_header(&location));

    let predictor = Predictor::load(&config.model_path, config.predict.clone())?;
    let result = predictor
        .predict(&client, location.latitude, location.longitude)
        .await?;

    print!("{}", render::prediction(&result));
    println!("\n{}", render::model_origin(predictor.bundle()));
    Ok(())
}
