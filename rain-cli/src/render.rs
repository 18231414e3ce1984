//! Plain-text formatting for terminal output.

use rain_core::{
    Evaluation, Feature, HourlyRecord, Location, ModelBundle, PredictionResult,
    metrics::{ClassMetrics, ClassificationReport},
};

const CHART_WIDTH: usize = 40;
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

const REPORT_HEADER: &str = "             precision    recall  f1-score   support";
const NO_AUC: &str = "ROC-AUC could not be computed (only one class present in the test split).";
const TABLE_HEADER: &str = "time               precip    cloud    humid     temp     wind";

pub fn location_header(location: &Location) -> String {
    let (lat, lon) = (location.latitude, location.longitude);
    format!("Location: {} ({lat:.4}, {lon:.4})", location.name)
}

pub fn model_origin(bundle: &ModelBundle) -> String {
    let place = &bundle.train_location.name;
    let trained_at = bundle.trained_at.format(TIME_FORMAT);
    format!("Model trained on {place} at {trained_at}")
}

pub fn verdict(rain_likely: bool) -> &'static str {
    if rain_likely {
        "Rain likely"
    } else {
        "Rain unlikely"
    }
}

fn report_row(label: &str, m: &ClassMetrics) -> String {
    let (p, r, f1, n) = (m.precision, m.recall, m.f1, m.support);
    format!("{label:>12} {p:>9.3} {r:>9.3} {f1:>9.3} {n:>9}\n")
}

/// Per-class report laid out like the usual precision/recall/f1 table.
pub fn classification_report(report: &ClassificationReport) -> String {
    let mut out = format!("{REPORT_HEADER}\n\n");
    for (label, metrics) in report.classes.iter().enumerate() {
        out.push_str(&report_row(&label.to_string(), metrics));
    }

    let (accuracy, n) = (report.accuracy, report.macro_avg.support);
    out.push_str(&format!("\n    accuracy {accuracy:>29.3} {n:>9}\n"));
    out.push_str(&report_row("macro avg", &report.macro_avg));
    out.push_str(&report_row("weighted avg", &report.weighted_avg));
    out
}

pub fn training_summary(features: &[Feature], evaluation: &Evaluation) -> String {
    let names: Vec<&str> = features.iter().map(Feature::as_str).collect();
    let names = names.join(", ");
    let (n_train, n_test) = (evaluation.n_train, evaluation.n_test);
    let report = classification_report(&evaluation.report);

    let auc = match evaluation.roc_auc {
        Some(auc) => format!("ROC-AUC: {auc:.4}"),
        None => NO_AUC.to_string(),
    };

    format!(
        "Features: {names}\nTrain/test examples: {n_train}/{n_test}\n\n\
         Classification report:\n\n{report}\n{auc}\n"
    )
}

fn table_row(r: &HourlyRecord) -> String {
    let time = r.time.format(TIME_FORMAT).to_string();
    let (precip, cloud, humid) = (r.precipitation, r.cloud_cover, r.relative_humidity_2m);
    let (temp, wind) = (r.temperature_2m, r.wind_speed_10m);
    let rest = format!("{cloud:>8.0} {humid:>8.0} {temp:>8.1} {wind:>8.1}");
    format!("{time:<16} {precip:>8.1} {rest}\n")
}

/// Recent hours as a fixed-width table, oldest first.
pub fn recent_table(records: &[HourlyRecord]) -> String {
    let rows: String = records.iter().map(table_row).collect();
    format!("{TABLE_HEADER}\n{rows}")
}

/// Horizontal bars scaled to the wettest hour in `records`.
pub fn precipitation_chart(records: &[HourlyRecord], width: usize) -> String {
    let max = records
        .iter()
        .map(|r| r.precipitation)
        .fold(0.0_f64, f64::max);

    records
        .iter()
        .map(|r| {
            let len = if max > 0.0 {
                ((r.precipitation / max) * width as f64).round() as usize
            } else {
                0
            };
            let bar = "#".repeat(len);
            let time = r.time.format("%d %H:%M");
            format!("{time} |{bar:<width$}| {:.1} mm\n", r.precipitation)
        })
        .collect()
}

pub fn prediction(result: &PredictionResult) -> String {
    let percent = result.prob_rain_next_hour * 100.0;
    let label = verdict(result.rain_likely());
    let time = result.time_used.format(TIME_FORMAT);
    let hours = result.recent.len();

    let inputs: String = result
        .features_used
        .iter()
        .map(|fv| format!("  {:<22} {:>9.2}\n", fv.feature.as_str(), fv.value))
        .collect();
    let table = recent_table(&result.recent);
    let chart = precipitation_chart(&result.recent, CHART_WIDTH);

    format!(
        "Probability of rain in the next hour: {percent:.1}% ({label})\n\
         Latest hour used for prediction: {time}\n\
         \nInputs used (latest hour):\n{inputs}\
         \nRecent weather (last {hours} hours):\n{table}\
         \nPrecipitation history (last {hours} hours):\n{chart}"
    )
}
