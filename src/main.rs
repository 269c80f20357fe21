use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::{info, warn};

use arbor_io::{
    ClassEntry, DatasetReader, FeatureEntry, ImputationEntry, PreparedData, ReportWriter,
    TrainingReport, prepare,
};
use arbor_rf::{
    ClassLabels, DEFAULT_N_TREES, DEFAULT_TEST_SIZE, Holdout, HoldoutResult, RandomForestConfig,
    SplitCriterion,
};

#[derive(Parser)]
#[command(name = "arbor")]
#[command(about = "Train and persist a Random Forest classifier from a CSV dataset")]
#[command(version)]
struct Cli {
    /// Path to the input CSV file
    #[arg(long, default_value = "data/raw/data_export.csv")]
    data: PathBuf,

    /// Where to write the trained model
    #[arg(long, default_value = "models/random_forest.bin")]
    model_out: PathBuf,

    /// Fraction of rows held out for evaluation, in (0, 1)
    #[arg(long, default_value_t = DEFAULT_TEST_SIZE)]
    test_size: f64,

    /// RNG seed for the split and the forest
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Number of trees in the Random Forest
    #[arg(long, default_value_t = DEFAULT_N_TREES)]
    n_trees: usize,

    /// Maximum tree depth (unlimited if not set)
    #[arg(long)]
    max_depth: Option<usize>,

    /// Split quality criterion
    #[arg(long, value_enum, default_value_t = CriterionArg::Gini)]
    criterion: CriterionArg,

    /// Also write a JSON training report to this path
    #[arg(long)]
    report: Option<PathBuf>,

    /// Enable verbose (debug-level) logging
    #[arg(long)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(long)]
    quiet: bool,

    /// Number of threads for parallel computation (defaults to all cores)
    #[arg(long)]
    threads: Option<usize>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum CriterionArg {
    Gini,
    Entropy,
}

impl From<CriterionArg> for SplitCriterion {
    fn from(arg: CriterionArg) -> Self {
        match arg {
            CriterionArg::Gini => SplitCriterion::Gini,
            CriterionArg::Entropy => SplitCriterion::Entropy,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match (cli.verbose, cli.quiet) {
        (true, _) => "debug",
        (_, true) => "error",
        _ => "info",
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // Configure Rayon thread pool
    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to configure thread pool")?;
        info!(threads, "thread pool configured");
    }

    let dataset = DatasetReader::new(&cli.data)
        .read()
        .with_context(|| format!("failed to load dataset from {}", cli.data.display()))?;
    let prepared = prepare(&dataset).context("failed to prepare features")?;
    let features = prepared
        .features
        .to_rows()
        .context("failed to build feature matrix")?;
    let feature_names = prepared.features.feature_names();
    let class_labels = ClassLabels::new(prepared.target.classes.clone());

    let rf_config = RandomForestConfig::new(cli.n_trees)?
        .with_max_depth(cli.max_depth)
        .with_criterion(cli.criterion.into())
        .with_seed(cli.seed);
    let holdout = Holdout::new(cli.test_size)?.with_seed(cli.seed);

    let result = holdout
        .evaluate(
            &rf_config,
            &features,
            &prepared.target.labels,
            &feature_names,
            &class_labels,
        )
        .context("training failed")?;

    // Report directory must exist before the model is written.
    let report_writer = cli
        .report
        .as_deref()
        .map(ReportWriter::new)
        .transpose()
        .context("failed to prepare report output")?;

    result
        .forest
        .save(&cli.model_out)
        .with_context(|| format!("failed to save model to {}", cli.model_out.display()))?;

    if let Some(writer) = &report_writer {
        let report = build_report(&cli, &prepared, &result);
        if let Err(err) = writer.write(&report) {
            if let Err(remove_err) = std::fs::remove_file(&cli.model_out) {
                warn!(
                    path = %cli.model_out.display(),
                    error = %remove_err,
                    "failed to remove model after report error"
                );
            }
            return Err(err).with_context(|| {
                format!("failed to write report to {}", writer.path().display())
            });
        }
    }

    println!("Training finished.");
    println!("Accuracy: {:.4}", result.accuracy);
    println!("Confusion Matrix:");
    println!("{}", result.confusion_matrix);
    println!("Model saved to: {}", cli.model_out.display());

    Ok(())
}

/// Flatten the evaluation into the report's primitive shape.
fn build_report(cli: &Cli, prepared: &PreparedData, result: &HoldoutResult) -> TrainingReport {
    let classes = &prepared.target.classes;
    let label = |class: usize| classes.get(class).cloned().unwrap_or_else(|| class.to_string());

    TrainingReport {
        data_path: cli.data.clone(),
        model_path: cli.model_out.clone(),
        n_trees: cli.n_trees,
        seed: cli.seed,
        test_size: cli.test_size,
        n_train: result.n_train,
        n_test: result.n_test,
        stratified: result.stratified,
        accuracy: result.accuracy,
        matrix_labels: result.confusion_matrix.classes().iter().map(|&c| label(c)).collect(),
        confusion_matrix: result.confusion_matrix.as_rows().to_vec(),
        class_metrics: result
            .class_metrics
            .iter()
            .map(|m| ClassEntry {
                label: label(m.class),
                precision: m.precision,
                recall: m.recall,
                f1: m.f1,
                support: m.support,
            })
            .collect(),
        feature_importances: result
            .feature_importances
            .iter()
            .map(|f| FeatureEntry {
                name: f.name.clone(),
                importance: f.importance,
                rank: f.rank,
            })
            .collect(),
        imputations: prepared
            .features
            .imputations()
            .iter()
            .map(ImputationEntry::from)
            .collect(),
    }
}
