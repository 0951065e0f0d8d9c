use std::path::PathBuf;

use anyhow::Context;
use slova_core::Config;
use slova_extract::report::{log_summary, write_stats};
use slova_extract::{BatchOrchestrator, DocumentProcessor, ExtractorRegistry};
use slova_models::{SizeComparison, split_blocks, write_model_configs};
use slova_text::{Normalizer, TextChunker};
use slova_tokenize::{
    UniteCleaning, chunk_directory, pack_corpus, save_tokenizer, self_check, train_tokenizer,
    unite_corpora,
};

#[derive(clap::Subcommand, Debug)]
pub enum Command {
    /// Extract, triage and clean every pending document in the input dir.
    Extract,

    /// Chunk the cleaned texts into the JSON-lines corpus.
    Chunk,

    /// Merge several corpora (JSON-lines or plain text) into one.
    Unite(UniteArgs),

    /// Train the BPE tokenizer on the corpus.
    TrainTokenizer,

    /// Tokenize the corpus and pack it into fixed-length blocks.
    Pack,

    /// Size the model presets and write their configuration files.
    Models(ModelsArgs),
}

#[derive(clap::Args, Debug)]
pub struct UniteArgs {
    /// Merged corpus path.
    #[arg(long)]
    pub output: PathBuf,

    /// Re-run the normalizer on every record and drop short results.
    #[arg(long)]
    pub clean: bool,

    /// Input files, merged in order.
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,
}

#[derive(clap::Args, Debug)]
pub struct ModelsArgs {
    /// Also split the packed blocks into train and eval files.
    #[arg(long)]
    pub split: bool,
}

impl Command {
    pub async fn run(&self, config: &Config) -> anyhow::Result<()> {
        match self {
            Self::Extract => extract(config).await,
            Self::Chunk => chunk(config),
            Self::Unite(args) => unite(config, args),
            Self::TrainTokenizer => train(config),
            Self::Pack => pack(config),
            Self::Models(args) => models(config, args),
        }
    }
}

async fn extract(config: &Config) -> anyhow::Result<()> {
    let paths = &config.paths;
    let registry = ExtractorRegistry::with_defaults();
    tracing::info!(
        input = %paths.input_dir.display(),
        extensions = ?registry.extensions(),
        "scanning input directory"
    );
    let processor = DocumentProcessor::new(registry, &paths.output_dir)
        .with_quality(config.quality.clone())
        .with_normalizer(Normalizer::new(config.normalizer.clone()))
        .with_max_file_size_mb(config.extraction.max_file_size_mb);
    let orchestrator = BatchOrchestrator::new(
        &paths.input_dir,
        &paths.checkpoint_path,
        processor,
        config.extraction.memory.clone(),
    );

    let summary = orchestrator.run().await.context("extraction failed")?;
    log_summary(&summary.checkpoint);
    write_stats(&summary.checkpoint, &paths.stats_path).context("failed to write stats file")?;
    tracing::info!(
        documents = summary.documents,
        batches = summary.batches,
        duration_ms = summary.duration_ms,
        "extraction finished"
    );
    Ok(())
}

fn chunk(config: &Config) -> anyhow::Result<()> {
    let chunker = TextChunker::new(config.chunker.clone());
    let report = chunk_directory(&config.paths.output_dir, &config.paths.corpus_path, &chunker)
        .context("chunking failed")?;
    tracing::info!(files = report.files, records = report.records, chars = report.chars, "corpus ready");
    Ok(())
}

fn unite(config: &Config, args: &UniteArgs) -> anyhow::Result<()> {
    let normalizer = args
        .clean
        .then(|| Normalizer::new(config.normalizer.clone()));
    let cleaning = normalizer.as_ref().map(|normalizer| UniteCleaning {
        normalizer,
        min_chars: config.corpus.unite_min_chars,
    });
    let report = unite_corpora(&args.inputs, &args.output, cleaning).context("unite failed")?;
    #[allow(clippy::cast_precision_loss)]
    let size_mb = report.bytes_written as f64 / (1024.0 * 1024.0);
    tracing::info!(
        records = report.records,
        skipped = report.skipped,
        size_mb = format_args!("{size_mb:.1}"),
        "corpora united"
    );
    Ok(())
}

fn train(config: &Config) -> anyhow::Result<()> {
    let tokenizer = train_tokenizer(&config.paths.corpus_path, &config.tokenizer)
        .context("tokenizer training failed")?;
    save_tokenizer(&tokenizer, &config.paths.tokenizer_path)?;
    let counts = self_check(&tokenizer)?;
    tracing::info!(tokens = ?counts, "tokenizer self-check passed");
    Ok(())
}

fn pack(config: &Config) -> anyhow::Result<()> {
    let paths = &config.paths;
    pack_corpus(
        &paths.corpus_path,
        &paths.tokenizer_path,
        &paths.packed_path,
        &config.packing,
    )
    .context("packing failed")?;
    Ok(())
}

fn models(config: &Config, args: &ModelsArgs) -> anyhow::Result<()> {
    let models = &config.models;
    SizeComparison::compute(&models.presets, &models.dims, models.max_spread_pct).log();
    write_model_configs(&config.paths.models_dir, models)?;

    if args.split {
        let dir = &config.paths.models_dir;
        split_blocks(
            &config.paths.packed_path,
            &dir.join("train.jsonl"),
            &dir.join("eval.jsonl"),
            models.eval_fraction,
            models.seed,
        )
        .context("split failed")?;
    }
    Ok(())
}
