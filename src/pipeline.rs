use crate::audit::{Audit, AuditError, AuditOptions, Dependencies};
use crate::loader::{LoadError, LoadOptions};
use crate::logistic::{FitError, LogisticRegression, LogisticRegressionOptions};
use crate::plot::{Backend, PlotError, PlotOptions};
use crate::table::TableError;
use std::path::PathBuf;
use thiserror::Error;

/// Everything needed to go from a CSV file to a dependency chart.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub dataset: PathBuf,
    pub target: String,
    pub load: LoadOptions,
    pub model: LogisticRegressionOptions,
    pub audit: AuditOptions,
    pub plot: PlotOptions,
    pub backend: Backend,
}

#[derive(Debug)]
pub struct PipelineOutput {
    pub model: LogisticRegression,
    pub audit: Audit,
    pub dependencies: Dependencies,
}

/// Load, split, fit, audit and plot, stopping at the first failure.
pub fn run(config: &PipelineConfig) -> Result<PipelineOutput, PipelineError> {
    let table = config.load.load(&config.dataset)?;
    let (target, features) = table.split_target(&config.target)?;
    log::info!(
        "target {:?}, {} features: {:?}",
        config.target,
        features.features_len(),
        features.names()
    );

    let model = config.model.fit(&features, &target)?;
    log::info!(
        "model fitted in {} iterations, training accuracy {:.4}",
        model.iterations(),
        model.score(&features, &target)
    );

    let audit = config.audit.audit(&model, &features)?;
    let dependencies = audit.importances().median();
    log::info!("audited {} runs", audit.importances().runs());

    config.plot.render(&dependencies, &config.backend)?;
    Ok(PipelineOutput {
        model,
        audit,
        dependencies,
    })
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Table(#[from] TableError),

    #[error(transparent)]
    Fit(#[from] FitError),

    #[error(transparent)]
    Audit(#[from] AuditError),

    #[error(transparent)]
    Plot(#[from] PlotError),
}
