//! FitCheck Trainer - synthetic corpus generation and offline GBDT training
//!
//! The pipeline is a single batch job: generate a corpus from the rule
//! engine, fit the encoder, boost a three-class ensemble and wrap both in a
//! [`ModelArtifact`]. The same configuration and seed always give the same
//! artifact hash.

pub mod cart;
pub mod coverage;
pub mod dataset;
pub mod deterministic;
pub mod errors;
pub mod generator;
pub mod publish;
pub mod trainer;

use fitcheck_core::{ModelArtifact, RuleEngine, TrainingSummary};
use tracing::info;

pub use coverage::{check_coverage, default_cases, CoverageCase, CoverageReport};
pub use dataset::{Corpus, EncodedDataset, TrainingSample};
pub use deterministic::{derive_seed, SplitTieBreaker};
pub use errors::TrainerError;
pub use generator::{default_anchors, AnchorPoint, GeneratorConfig, SampleGenerator};
pub use publish::{stage_and_publish, Publication, STAGING_DIR_NAME};
pub use trainer::{GbdtTrainer, TrainingParams};

/// Artifact plus the corpus it was trained on
#[derive(Debug)]
pub struct TrainingRun {
    pub artifact: ModelArtifact,
    pub corpus: Corpus,
}

/// Generate, encode and train in one step
pub fn train_artifact(
    engine: &RuleEngine,
    generator: GeneratorConfig,
    params: TrainingParams,
) -> Result<TrainingRun, TrainerError> {
    let seed = generator.seed;
    let trainer = GbdtTrainer::new(params)?;
    let corpus = SampleGenerator::new(engine, generator)?.generate();

    for (label, count) in corpus.label_counts() {
        info!("  {label}: {count} rows");
    }
    for (category, count) in corpus.category_counts() {
        info!("  {category}: {count} rows");
    }

    let (encoder, dataset) = corpus.encode()?;
    info!(
        "Encoded {} rows into {} features",
        dataset.len(),
        dataset.feature_count
    );

    let ensemble = trainer.train(&dataset)?;

    let params = trainer.params();
    let summary = TrainingSummary {
        sample_count: corpus.len(),
        anchor_count: corpus.anchor_count(),
        seed,
        trees_per_class: params.trees_per_class,
        max_depth: params.max_depth,
        learning_rate: params.learning_rate,
    };
    let artifact = ModelArtifact::new(encoder, ensemble, engine.table().version, summary);
    artifact.validate()?;

    Ok(TrainingRun { artifact, corpus })
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
