//! Measures how much a classifier's predictions depend on each input feature.
//!
//! Every audit run perturbs one feature at a time and compares the resulting
//! predictions with the unperturbed baseline. Before perturbing, the other
//! features are made orthogonal to the audited one, so that information about
//! it leaking through correlated columns is removed as well.
use crate::functions;
use crate::perturbation::{self, PerturbationStrategy};
use crate::table::FeatureMatrix;
use itertools::Itertools as _;
use ordered_float::OrderedFloat;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use serde::ser::{Serialize, SerializeMap, Serializer};
use thiserror::Error;

/// A prediction function `row -> label`.
pub trait Predictor: Sync {
    fn predict(&self, row: &[f64]) -> f64;
}

impl<F> Predictor for F
where
    F: Fn(&[f64]) -> f64 + Sync,
{
    fn predict(&self, row: &[f64]) -> f64 {
        self(row)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum DistanceMetric {
    /// Mean squared difference of predictions.
    Mse,

    /// Fraction of rows whose predicted label changed.
    Accuracy,
}

impl DistanceMetric {
    fn distance(self, baseline: &[f64], perturbed: &[f64]) -> f64 {
        let xs = baseline.iter().copied();
        let ys = perturbed.iter().copied();
        match self {
            Self::Mse => functions::mse(xs, ys),
            Self::Accuracy => functions::mismatch_rate(xs, ys),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AuditOptions {
    runs: usize,
    seed: Option<u64>,
    strategy: PerturbationStrategy,
    metric: DistanceMetric,
    sample_fraction: f64,
    parallel: bool,
}

impl AuditOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn runs(mut self, runs: usize) -> Self {
        self.runs = runs;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn strategy(mut self, strategy: PerturbationStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn metric(mut self, metric: DistanceMetric) -> Self {
        self.metric = metric;
        self
    }

    /// Size of each run's bootstrap sample relative to the row count, in `(0, 1]`.
    pub fn sample_fraction(mut self, fraction: f64) -> Self {
        self.sample_fraction = fraction;
        self
    }

    pub fn parallel(mut self, enabled: bool) -> Self {
        self.parallel = enabled;
        self
    }

    pub fn audit<P>(&self, predictor: &P, features: &FeatureMatrix) -> Result<Audit, AuditError>
    where
        P: Predictor + ?Sized,
    {
        if self.runs == 0 {
            return Err(AuditError::ZeroRuns);
        }
        if !(self.sample_fraction > 0.0 && self.sample_fraction <= 1.0) {
            return Err(AuditError::InvalidSampleFraction(self.sample_fraction));
        }

        let features_len = features.features_len();
        for i in 0..features_len {
            if features.column(i).iter().all(|&x| x == 0.0) {
                log::warn!(
                    "feature {:?} is all zeros; other features are left as is when auditing it",
                    features.names()[i]
                );
            }
        }

        let baseline = predict_all(predictor, features.columns());
        let signs = feature_signs(predictor, features, &baseline);
        let sample_len =
            ((features.rows_len() as f64 * self.sample_fraction).round() as usize).max(1);

        let mut orthogonal = vec![Vec::with_capacity(self.runs); features_len];
        let mut direct = vec![Vec::with_capacity(self.runs); features_len];
        for (run, mut rng) in self.run_rngs().enumerate() {
            let sample = (0..sample_len)
                .map(|_| rng.gen_range(0..features.rows_len()))
                .collect::<Vec<_>>();
            let feature_seeds = (0..features_len).map(|_| rng.gen()).collect::<Vec<u64>>();

            let task = |feature: usize| {
                let mut rng = StdRng::seed_from_u64(feature_seeds[feature]);
                let context = RunContext {
                    predictor,
                    features,
                    baseline: &baseline,
                    sample: &sample,
                };
                let sign = signs[feature];
                let o = sign * self.dependence(&context, feature, true, &mut rng);
                let d = sign * self.dependence(&context, feature, false, &mut rng);
                (o, d)
            };
            let results = if self.parallel {
                (0..features_len).into_par_iter().map(task).collect::<Vec<_>>()
            } else {
                (0..features_len).map(task).collect::<Vec<_>>()
            };

            for (feature, (o, d)) in results.into_iter().enumerate() {
                log::debug!(
                    "run {}: {:?} orthogonal={} direct={}",
                    run,
                    features.names()[feature],
                    o,
                    d
                );
                orthogonal[feature].push(o);
                direct[feature].push(d);
            }
        }

        let names = features.names().to_vec();
        Ok(Audit {
            importances: ImportanceTable {
                names: names.clone(),
                values: orthogonal,
            },
            direct: ImportanceTable {
                names,
                values: direct,
            },
        })
    }

    fn run_rngs(&self) -> impl Iterator<Item = StdRng> {
        let seed = self.seed.unwrap_or_else(|| rand::thread_rng().gen());
        let mut rng = StdRng::seed_from_u64(seed);
        (0..self.runs).map(move |_| {
            let mut seed = [0u8; 32];
            rng.fill(&mut seed);
            StdRng::from_seed(seed)
        })
    }

    fn dependence<P, R>(
        &self,
        context: &RunContext<P>,
        feature: usize,
        orthogonal: bool,
        rng: &mut R,
    ) -> f64
    where
        P: Predictor + ?Sized,
        R: Rng + ?Sized,
    {
        let mut columns = context.features.columns().to_vec();
        if orthogonal {
            perturbation::orthogonalize(&mut columns, feature);
        }
        self.strategy.perturb(&mut columns[feature], rng);

        let mut row = vec![0.0; columns.len()];
        let (baseline, perturbed): (Vec<f64>, Vec<f64>) = context
            .sample
            .iter()
            .map(|&i| {
                fill_row(&columns, i, &mut row);
                (context.baseline[i], context.predictor.predict(&row))
            })
            .unzip();

        self.metric.distance(&baseline, &perturbed)
    }
}

impl Default for AuditOptions {
    fn default() -> Self {
        Self {
            runs: 10,
            seed: None,
            strategy: PerturbationStrategy::default(),
            metric: DistanceMetric::Mse,
            sample_fraction: 1.0,
            parallel: false,
        }
    }
}

/// Runs an audit with [`AuditOptions::default`].
pub fn audit_model<P>(predictor: &P, features: &FeatureMatrix) -> Result<Audit, AuditError>
where
    P: Predictor + ?Sized,
{
    AuditOptions::default().audit(predictor, features)
}

struct RunContext<'a, P: ?Sized> {
    predictor: &'a P,
    features: &'a FeatureMatrix,
    baseline: &'a [f64],
    sample: &'a [usize],
}

fn fill_row(columns: &[Vec<f64>], index: usize, row: &mut [f64]) {
    for (x, column) in row.iter_mut().zip(columns.iter()) {
        *x = column[index];
    }
}

/// `+1` if shifting a column up by its range does not lower the mean
/// prediction, `-1` otherwise.
fn feature_signs<P>(predictor: &P, features: &FeatureMatrix, baseline: &[f64]) -> Vec<f64>
where
    P: Predictor + ?Sized,
{
    let baseline_mean = functions::mean(baseline.iter().copied());
    (0..features.features_len())
        .map(|feature| {
            let mut columns = features.columns().to_vec();
            let column = &mut columns[feature];
            let low = column.iter().copied().fold(f64::INFINITY, f64::min);
            let high = column.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            column.iter_mut().for_each(|x| *x += high - low);

            let shifted_mean = functions::mean(predict_all(predictor, &columns).into_iter());
            if shifted_mean < baseline_mean {
                -1.0
            } else {
                1.0
            }
        })
        .collect()
}

fn predict_all<P: Predictor + ?Sized>(predictor: &P, columns: &[Vec<f64>]) -> Vec<f64> {
    let mut row = vec![0.0; columns.len()];
    (0..columns[0].len())
        .map(|i| {
            fill_row(columns, i, &mut row);
            predictor.predict(&row)
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct Audit {
    importances: ImportanceTable,
    direct: ImportanceTable,
}

impl Audit {
    /// Dependence measured after orthogonal projection.
    pub fn importances(&self) -> &ImportanceTable {
        &self.importances
    }

    /// Dependence measured by perturbing each feature alone.
    pub fn direct(&self) -> &ImportanceTable {
        &self.direct
    }
}

/// Feature name to one importance value per audit run.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportanceTable {
    names: Vec<String>,
    values: Vec<Vec<f64>>,
}

impl ImportanceTable {
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn get(&self, name: &str) -> Option<&[f64]> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| &self.values[i][..])
    }

    pub fn iter(&self) -> impl '_ + Iterator<Item = (&str, &[f64])> {
        self.names
            .iter()
            .map(|n| n.as_str())
            .zip(self.values.iter().map(|v| &v[..]))
    }

    pub fn runs(&self) -> usize {
        self.values.first().map_or(0, |v| v.len())
    }

    pub fn median(&self) -> Dependencies {
        Dependencies::new(
            self.iter()
                .map(|(n, v)| (n.to_owned(), functions::median(v.iter().copied())))
                .collect(),
        )
    }
}

/// Ordered feature name to single dependence value.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dependencies(Vec<(String, f64)>);

impl Dependencies {
    pub fn new(entries: Vec<(String, f64)>) -> Self {
        Self(entries)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, v)| *v)
    }

    pub fn iter(&self) -> impl '_ + Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(n, v)| (n.as_str(), *v))
    }

    /// Entries ordered by value; ascending unless `descending` is set.
    pub fn sorted(&self, descending: bool) -> Vec<(&str, f64)> {
        self.iter()
            .sorted_by_key(|&(_, v)| {
                if descending {
                    OrderedFloat(-v)
                } else {
                    OrderedFloat(v)
                }
            })
            .collect()
    }
}

impl Serialize for Dependencies {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, value) in &self.0 {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum AuditError {
    #[error("an audit needs at least one run")]
    ZeroRuns,

    #[error("sample fraction must be in (0, 1], got {0}")]
    InvalidSampleFraction(f64),
}
