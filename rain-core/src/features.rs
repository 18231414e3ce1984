//! Supervised example construction: features at hour `t`, label from hour `t + 1`.

use chrono::NaiveDateTime;

use crate::model::{FEATURE_COLS, HourlyRecord};

pub const DEFAULT_RAIN_THRESHOLD_MM: f64 = 0.1;

/// Feature rows and labels, aligned by index.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SupervisedSet {
    /// Each row holds values in `FEATURE_COLS` order.
    pub features: Vec<Vec<f64>>,
    /// 1 if the following hour's precipitation exceeded the threshold.
    pub labels: Vec<u8>,
    /// Timestamp of the hour each feature row was taken from.
    pub times: Vec<NaiveDateTime>,
}

impl SupervisedSet {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Number of positive (rain) labels.
    pub fn positives(&self) -> usize {
        self.labels.iter().filter(|&&y| y == 1).count()
    }

    /// True when both classes occur in the labels.
    pub fn has_both_classes(&self) -> bool {
        let pos = self.positives();
        pos > 0 && pos < self.len()
    }
}

/// Pair each record with its successor and label it by the successor's precipitation.
///
/// The last record has no successor and produces no example. Pairs with a
/// non-finite feature or next-hour precipitation are skipped.
pub fn build_supervised(records: &[HourlyRecord], rain_threshold_mm: f64) -> SupervisedSet {
    let mut set = SupervisedSet::default();

    for i in 0..records.len().saturating_sub(1) {
        let current = &records[i];
        let next_precip = records[i + 1].precipitation;

        let row = current.feature_vector(&FEATURE_COLS);
        if !next_precip.is_finite() || row.iter().any(|v| !v.is_finite()) {
            continue;
        }

        set.features.push(row);
        set.labels.push(u8::from(next_precip > rain_threshold_mm));
        set.times.push(current.time);
    }

    set
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn series(precip: &[f64]) -> Vec<HourlyRecord> {
        let start = NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();

        precip
            .iter()
            .enumerate()
            .map(|(i, &p)| HourlyRecord {
                time: start + Duration::hours(i as i64),
                temperature_2m: 10.0 + i as f64,
                relative_humidity_2m: 80.0,
                surface_pressure: 1010.0,
                cloud_cover: 75.0,
                wind_speed_10m: 4.0,
                precipitation: p,
            })
            .collect()
    }

    #[test]
    fn labels_come_from_next_hour() {
        let set = build_supervised(&series(&[0.0, 0.2, 0.0]), 0.1);

        assert_eq!(set.labels, vec![1, 0]);
        assert_eq!(set.len(), 2);
        // Features are those of the current hour, not the labelled one.
        assert_eq!(set.features[0][5], 0.0);
        assert_eq!(set.features[1][5], 0.2);
    }

    #[test]
    fn threshold_is_strict() {
        let set = build_supervised(&series(&[0.0, 0.1, 0.1000001]), 0.1);
        assert_eq!(set.labels, vec![0, 1]);
    }

    #[test]
    fn produces_one_fewer_example_than_rows() {
        let records = series(&[0.0; 10]);
        let set = build_supervised(&records, DEFAULT_RAIN_THRESHOLD_MM);

        assert_eq!(set.len(), records.len() - 1);
        assert_eq!(set.times.first(), Some(&records[0].time));
        assert_eq!(set.times.last(), Some(&records[8].time));
    }

    #[test]
    fn short_series_yield_nothing() {
        assert!(build_supervised(&[], 0.1).is_empty());
        assert!(build_supervised(&series(&[1.0]), 0.1).is_empty());
    }

    #[test]
    fn non_finite_values_are_skipped() {
        let mut records = series(&[0.0, 0.5, 0.0, 0.0]);
        records[1].cloud_cover = f64::NAN;
        records[3].precipitation = f64::NAN;

        let set = build_supervised(&records, 0.1);

        // Row 0 labels from row 1 (finite precip), row 1 has a NaN feature,
        // row 2 labels from a NaN precipitation.
        assert_eq!(set.labels, vec![1]);
        assert_eq!(set.times, vec![records[0].time]);
    }

    #[test]
    fn is_deterministic_and_leaves_input_untouched() {
        let records = series(&[0.0, 0.3, 0.0, 2.0, 0.0]);
        let before = records.clone();

        let a = build_supervised(&records, 0.1);
        let b = build_supervised(&records, 0.1);

        assert_eq!(a, b);
        assert_eq!(records, before);
        assert_eq!(a.labels, vec![1, 0, 1, 0]);
        assert!(a.has_both_classes());
        assert_eq!(a.positives(), 2);
    }
}
