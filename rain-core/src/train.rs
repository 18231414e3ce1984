use chrono::Utc;
use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};

use crate::{
    bundle::ModelBundle,
    classifier::{LogisticParams, RainClassifier, decide},
    config::TrainingConfig,
    error::{Error, Result},
    features::{DEFAULT_RAIN_THRESHOLD_MM, build_supervised},
    metrics::{ClassificationReport, RocPoint, roc_auc, roc_curve},
    model::{FEATURE_COLS, HourlyRecord, Location},
};

#[derive(Debug, Clone, PartialEq)]
pub struct TrainOptions {
    pub test_fraction: f64,
    pub seed: u64,
    pub rain_threshold_mm: f64,
    pub logistic: LogisticParams,
}

impl Default for TrainOptions {
    fn default() -> Self {
        Self {
            test_fraction: 0.25,
            seed: 42,
            rain_threshold_mm: DEFAULT_RAIN_THRESHOLD_MM,
            logistic: LogisticParams::default(),
        }
    }
}

impl From<&TrainingConfig> for TrainOptions {
    fn from(cfg: &TrainingConfig) -> Self {
        Self {
            test_fraction: cfg.test_fraction,
            seed: cfg.seed,
            rain_threshold_mm: cfg.rain_threshold_mm,
            ..Default::default()
        }
    }
}

/// Held-out results. Informational only; nothing here feeds back into the bundle.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub report: ClassificationReport,
    /// `None` when the test split holds a single class.
    pub roc_auc: Option<f64>,
    pub roc_curve: Vec<RocPoint>,
    pub n_train: usize,
    pub n_test: usize,
}

#[derive(Debug, Clone)]
pub struct TrainOutcome {
    pub bundle: ModelBundle,
    pub evaluation: Evaluation,
}

/// Shuffled train/test index split, stratified by label when `stratify` is set.
///
/// The test split holds `ceil(test_fraction * n)` indices. When stratifying,
/// each class keeps at least one index in the training split.
pub fn train_test_split(
    labels: &[u8],
    test_fraction: f64,
    seed: u64,
    stratify: bool,
) -> Result<(Vec<usize>, Vec<usize>)> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(Error::data(format!("test_fraction must be in (0, 1), got {test_fraction}")));
    }

    let n = labels.len();
    let n_test = (test_fraction * n as f64).ceil() as usize;
    if n_test == 0 || n_test >= n {
        return Err(Error::data(format!(
            "Cannot split {n} examples into non-empty train and test sets"
        )));
    }

    let mut rng = StdRng::seed_from_u64(seed);

    if !stratify {
        let mut idx: Vec<usize> = (0..n).collect();
        idx.shuffle(&mut rng);
        let train = idx.split_off(n_test);
        return Ok((train, idx));
    }

    let mut by_class: [Vec<usize>; 2] = [Vec::new(), Vec::new()];
    for (i, &y) in labels.iter().enumerate() {
        by_class[usize::from(y == 1)].push(i);
    }

    let n_pos = by_class[1].len();
    let n_neg = by_class[0].len();
    let test_pos = ((n_test * n_pos) as f64 / n as f64).round() as usize;
    let test_pos = test_pos.min(n_pos.saturating_sub(1));
    let test_neg = (n_test - test_pos).min(n_neg.saturating_sub(1));

    let mut train = Vec::with_capacity(n - n_test);
    let mut test = Vec::with_capacity(n_test);
    for (class, take) in [(0, test_neg), (1, test_pos)] {
        let members = &mut by_class[class];
        members.shuffle(&mut rng);
        test.extend_from_slice(&members[..take]);
        train.extend_from_slice(&members[take..]);
    }
    train.shuffle(&mut rng);
    test.shuffle(&mut rng);

    Ok((train, test))
}

fn gather<T: Clone>(items: &[T], idx: &[usize]) -> Vec<T> {
    idx.iter().map(|&i| items[i].clone()).collect()
}

/// Build labelled examples from `records`, fit the pipeline on a training
/// split and evaluate it on the held-out split.
pub fn train(
    records: &[HourlyRecord],
    location: &Location,
    options: &TrainOptions,
) -> Result<TrainOutcome> {
    let set = build_supervised(records, options.rain_threshold_mm);
    if set.len() < 2 {
        return Err(Error::data(format!(
            "Need at least 2 labelled hours to train, got {}",
            set.len()
        )));
    }

    let stratify = set.has_both_classes();
    if !stratify {
        tracing::warn!(
            examples = set.len(),
            "Only one class present; splitting without stratification"
        );
    }

    let (train_idx, test_idx) =
        train_test_split(&set.labels, options.test_fraction, options.seed, stratify)?;

    let x_train = gather(&set.features, &train_idx);
    let y_train = gather(&set.labels, &train_idx);
    let x_test = gather(&set.features, &test_idx);
    let y_test = gather(&set.labels, &test_idx);

    let model = RainClassifier::fit(&x_train, &y_train, &options.logistic)?;

    let probs = x_test
        .iter()
        .map(|row| model.predict_proba(row))
        .collect::<Result<Vec<_>>>()?;
    let preds: Vec<u8> = probs.iter().copied().map(decide).collect();

    let auc = roc_auc(&y_test, &probs);
    if auc.is_none() {
        tracing::warn!("ROC-AUC skipped: test split contains a single class");
    }

    let evaluation = Evaluation {
        report: ClassificationReport::compute(&y_test, &preds),
        roc_auc: auc,
        roc_curve: roc_curve(&y_test, &probs),
        n_train: train_idx.len(),
        n_test: test_idx.len(),
    };

    tracing::info!(
        location = %location.name,
        n_train = evaluation.n_train,
        n_test = evaluation.n_test,
        rain_hours = set.positives(),
        "Trained rain classifier"
    );

    let bundle = ModelBundle {
        model,
        feature_cols: FEATURE_COLS.to_vec(),
        train_location: location.clone(),
        rain_threshold_mm: options.rain_threshold_mm,
        trained_at: Utc::now(),
    };

    Ok(TrainOutcome { bundle, evaluation })
}
