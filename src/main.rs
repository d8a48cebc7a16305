use anyhow::{ensure, Context as _};
use clap::Parser;
use fairaudit::pipeline::{self, PipelineConfig};
use fairaudit::{
    AuditOptions, Backend, DistanceMetric, LoadOptions, LogisticRegressionOptions, Penalty,
    PerturbationStrategy, PlotOptions,
};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum BackendKind {
    /// Write an SVG file to `--output`.
    Svg,

    /// Draw character bars on standard error.
    Text,
}

/// Fit a logistic regression on a CSV dataset and chart how much its
/// predictions depend on each feature.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Opt {
    #[arg(long, env = "FAIRAUDIT_INPUT_DIR", default_value = "/working/input")]
    input_dir: PathBuf,

    /// Dataset path, relative to the input directory.
    #[arg(long, default_value = "propublica/propublica_data_for_fairml.csv")]
    dataset: PathBuf,

    #[arg(long, default_value = ",")]
    delimiter: char,

    #[arg(long, default_value = "Two_yr_Recidivism")]
    target: String,

    #[arg(long, value_enum, default_value_t = Penalty::L2)]
    penalty: Penalty,

    /// Inverse regularization strength.
    #[arg(long, default_value_t = 0.01)]
    c: f64,

    #[arg(long, default_value_t = 10_000)]
    max_iter: usize,

    #[arg(long, default_value_t = 10)]
    runs: usize,

    #[arg(long)]
    seed: Option<u64>,

    #[arg(long, value_enum, default_value_t = PerturbationStrategy::ConstantZero)]
    strategy: PerturbationStrategy,

    #[arg(long, value_enum, default_value_t = DistanceMetric::Mse)]
    metric: DistanceMetric,

    /// Audit features on all cores.
    #[arg(long)]
    parallel: bool,

    #[arg(long, value_enum, default_value_t = BackendKind::Svg)]
    backend: BackendKind,

    #[arg(long, default_value = "fairml.svg")]
    output: PathBuf,

    #[arg(long, default_value = "FairML")]
    title: String,

    /// Sort bars by descending value.
    #[arg(long)]
    reverse_values: bool,
}

impl Opt {
    fn to_config(&self) -> anyhow::Result<PipelineConfig> {
        ensure!(
            self.delimiter.is_ascii(),
            "delimiter must be an ASCII character"
        );

        let mut audit = AuditOptions::new()
            .runs(self.runs)
            .strategy(self.strategy)
            .metric(self.metric)
            .parallel(self.parallel);
        if let Some(seed) = self.seed {
            audit = audit.seed(seed);
        }

        let backend = match self.backend {
            BackendKind::Svg => Backend::svg(&self.output),
            BackendKind::Text => Backend::Text,
        };

        Ok(PipelineConfig {
            dataset: self.input_dir.join(&self.dataset),
            target: self.target.clone(),
            load: LoadOptions::new().delimiter(self.delimiter as u8),
            model: LogisticRegressionOptions::new()
                .penalty(self.penalty)
                .c(self.c)
                .max_iter(self.max_iter),
            audit,
            plot: PlotOptions::new()
                .title(&self.title)
                .reverse_values(self.reverse_values),
            backend,
        })
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let opt = Opt::parse();
    let config = opt.to_config()?;

    let output = pipeline::run(&config)
        .with_context(|| format!("failed to audit {}", config.dataset.display()))?;
    serde_json::to_writer_pretty(std::io::stdout().lock(), &output.dependencies)?;
    println!();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fairaudit::{Dependencies, FeatureMatrix};

    fn parse(args: &[&str]) -> anyhow::Result<PipelineConfig> {
        let opt = Opt::try_parse_from(std::iter::once("fairaudit").chain(args.iter().copied()))?;
        opt.to_config()
    }

    #[test]
    fn defaults_point_at_propublica() -> anyhow::Result<()> {
        let config = parse(&["--input-dir", "/data"])?;
        assert_eq!(
            config.dataset,
            PathBuf::from("/data/propublica/propublica_data_for_fairml.csv")
        );
        assert_eq!(config.target, "Two_yr_Recidivism");
        assert_eq!(config.backend, Backend::svg("fairml.svg"));
        Ok(())
    }

    #[test]
    fn flags_reach_every_stage() -> anyhow::Result<()> {
        let config = parse(&[
            "--input-dir",
            "/data",
            "--dataset",
            "credit.csv",
            "--target",
            "default",
            "--delimiter",
            ";",
            "--runs",
            "4",
            "--seed",
            "9",
            "--strategy",
            "global-permutation",
            "--backend",
            "text",
            "--reverse-values",
        ])?;
        assert_eq!(config.dataset, PathBuf::from("/data/credit.csv"));
        assert_eq!(config.target, "default");
        assert_eq!(config.backend, Backend::Text);

        let table = config.load.load_from_reader("a;b\n1;2\n".as_bytes())?;
        assert_eq!(table.columns_len(), 2);

        let dependencies =
            Dependencies::new(vec![("low".to_owned(), -1.0), ("high".to_owned(), 2.0)]);
        let mut chart = Vec::new();
        config.plot.render_text(&dependencies, &mut chart)?;
        let chart = String::from_utf8(chart)?;
        let high = chart.find("high").expect("high");
        let low = chart.find("low").expect("low");
        assert!(high < low, "{}", chart);

        let features =
            FeatureMatrix::new(vec!["x".to_owned()], vec![(1..=20).map(f64::from).collect()])?;
        let predict = |row: &[f64]| if row[0] > 10.0 { 1.0 } else { 0.0 };
        let first = config.audit.audit(&predict, &features)?;
        let second = config.audit.audit(&predict, &features)?;
        assert_eq!(first.importances().runs(), 4);
        assert_eq!(first.importances().get("x"), second.importances().get("x"));
        Ok(())
    }

    #[test]
    fn non_ascii_delimiter_is_rejected() {
        assert!(parse(&["--input-dir", "/data", "--delimiter", "é"]).is_err());
    }
}
