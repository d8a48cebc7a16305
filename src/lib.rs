//! Fit a logistic regression classifier on a CSV dataset and audit how much
//! its predictions depend on each feature.
pub use audit::{audit_model, Audit, AuditOptions, Dependencies, DistanceMetric, ImportanceTable};
pub use audit::{AuditError, Predictor};
pub use loader::{load_csv, LoadError, LoadOptions};
pub use logistic::{FitError, LogisticRegression, LogisticRegressionOptions, Penalty};
pub use perturbation::PerturbationStrategy;
pub use plot::{Backend, PlotError, PlotOptions};
pub use table::{FeatureMatrix, Table, TableError};

pub mod pipeline;

mod audit;
mod functions;
mod loader;
mod logistic;
mod perturbation;
mod plot;
mod table;
