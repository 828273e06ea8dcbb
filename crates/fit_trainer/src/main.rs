//! FitCheck trainer CLI
//!
//! Running with no arguments rebuilds the corpus from the built-in rule
//! table and writes `models/fit_model.json` plus its hash.

use anyhow::{bail, Context, Result};
use clap::Parser;
use fitcheck_core::{RuleEngine, RuleTable};
use fitcheck_trainer::{
    default_cases, stage_and_publish, train_artifact, GeneratorConfig, TrainingParams,
};
use std::path::PathBuf;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "fit-trainer")]
#[command(author = "FitCheck Contributors")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Generate the synthetic fit corpus and train the fit classifier", long_about = None)]
struct Args {
    /// Rule table TOML (defaults to the built-in table)
    #[arg(long)]
    rules: Option<PathBuf>,

    /// Output directory for model and hash (candidates are staged in `.staging` inside it)
    #[arg(short, long, default_value = "models")]
    output: PathBuf,

    /// Boosting rounds (trees per class)
    #[arg(long, default_value = "60")]
    trees: usize,

    /// Maximum tree depth
    #[arg(long, default_value = "8")]
    max_depth: usize,

    /// Minimum samples per leaf
    #[arg(long, default_value = "4")]
    min_samples_leaf: usize,

    /// Shrinkage applied to every leaf
    #[arg(long, default_value = "0.2")]
    learning_rate: f64,

    /// Noisy samples drawn per (size, waist) grid point
    #[arg(long, default_value = "4")]
    samples_per_point: usize,

    /// Uniformly drawn background rows per category
    #[arg(long, default_value = "2000")]
    background_per_category: usize,

    /// Seed for corpus generation and shuffling
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Also write the generated corpus as CSV
    #[arg(long)]
    dump_corpus: Option<PathBuf>,

    /// Also write the rule-coverage report as JSON
    #[arg(long)]
    report: Option<PathBuf>,

    /// Exit with an error when the rule-coverage check fails
    #[arg(long)]
    strict: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    info!("FitCheck trainer v{}", env!("CARGO_PKG_VERSION"));

    let table = match &args.rules {
        Some(path) => {
            info!("Loading rule table from: {}", path.display());
            RuleTable::load(path)
                .with_context(|| format!("Failed to load rule table {}", path.display()))?
        }
        None => RuleTable::default(),
    };
    let engine = RuleEngine::new(table).context("Invalid rule table")?;
    info!(
        "Rule table v{}: sizes {}..={}, waist {}..={} cm, categories [{}]",
        engine.table().version,
        engine.table().grid.min_size,
        engine.table().grid.max_size,
        engine.table().grid.min_waist,
        engine.table().grid.max_waist,
        engine
            .table()
            .tolerances
            .category_names()
            .collect::<Vec<_>>()
            .join(", ")
    );

    let generator = GeneratorConfig {
        samples_per_point: args.samples_per_point,
        background_per_category: args.background_per_category,
        seed: args.seed,
        ..GeneratorConfig::default()
    };
    let anchors = generator.anchors.clone();

    let params = TrainingParams {
        trees_per_class: args.trees,
        max_depth: args.max_depth,
        min_samples_leaf: args.min_samples_leaf,
        learning_rate: args.learning_rate,
        ..TrainingParams::default()
    };

    info!("Training configuration:");
    info!("  Trees per class: {}", params.trees_per_class);
    info!("  Max depth: {}", params.max_depth);
    info!("  Min samples per leaf: {}", params.min_samples_leaf);
    info!("  Learning rate: {}", params.learning_rate);
    info!("  Lambda: {}", params.lambda);
    info!("  Quantization step: {} std", params.quant_step);
    info!("  Seed: {}", generator.seed);

    let run = train_artifact(&engine, generator, params).context("Training failed")?;

    if let Some(path) = &args.dump_corpus {
        info!("Writing corpus to: {}", path.display());
        run.corpus
            .write_csv(path)
            .with_context(|| format!("Failed to write corpus {}", path.display()))?;
    }

    let hash = run.artifact.hash_hex().context("Failed to hash model")?;
    let cases = default_cases(&engine, &anchors);
    let publication = stage_and_publish(&run.artifact, &args.output, &cases, args.strict)
        .with_context(|| format!("Failed to publish model to {}", args.output.display()))?;

    if let Some(path) = &args.report {
        publication
            .report
            .write_json(path)
            .with_context(|| format!("Failed to write report {}", path.display()))?;
    }

    let failed = publication.report.outcomes.len() - publication.report.passed();
    if !publication.published {
        bail!(
            "{failed} rule-coverage case(s) failed; candidate kept at {}",
            publication.model_path.display()
        );
    }
    if failed > 0 {
        warn!("{failed} rule-coverage case(s) failed; rerun with --strict to gate on them");
    }

    info!("Model: {}", publication.model_path.display());
    info!("Hash: {} ({})", publication.hash_path.display(), hash);

    info!("Training completed successfully");
    Ok(())
}
