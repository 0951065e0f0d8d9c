use std::path::PathBuf;

use serde::Deserialize;
use slova_extract::ExtractionConfig;
use slova_models::ModelsConfig;
use slova_text::{ChunkerConfig, NormalizerConfig, QualityConfig};
use slova_tokenize::{CorpusConfig, PackingConfig, TokenizerConfig};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub quality: QualityConfig,
    #[serde(default)]
    pub normalizer: NormalizerConfig,
    #[serde(default)]
    pub chunker: ChunkerConfig,
    #[serde(default)]
    pub corpus: CorpusConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub tokenizer: TokenizerConfig,
    #[serde(default)]
    pub packing: PackingConfig,
    #[serde(default)]
    pub models: ModelsConfig,
}

fn default_input_dir() -> PathBuf {
    PathBuf::from("data/raw")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("data/texts")
}

fn default_checkpoint_path() -> PathBuf {
    PathBuf::from("data/checkpoint.json")
}

fn default_stats_path() -> PathBuf {
    PathBuf::from("data/extraction_stats.txt")
}

fn default_corpus_path() -> PathBuf {
    PathBuf::from("data/corpus.jsonl")
}

fn default_tokenizer_path() -> PathBuf {
    PathBuf::from("data/tokenizer/tokenizer.json")
}

fn default_packed_path() -> PathBuf {
    PathBuf::from("data/packed.jsonl")
}

fn default_models_dir() -> PathBuf {
    PathBuf::from("models")
}

/// Where each stage reads and writes. Relative paths resolve against the
/// working directory.
#[derive(Debug, Clone, Deserialize)]
pub struct PathsConfig {
    /// Source documents, scanned without recursion.
    #[serde(default = "default_input_dir")]
    pub input_dir: PathBuf,
    /// One cleaned `<id>.txt` per accepted document; the chunker reads it.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_checkpoint_path")]
    pub checkpoint_path: PathBuf,
    #[serde(default = "default_stats_path")]
    pub stats_path: PathBuf,
    #[serde(default = "default_corpus_path")]
    pub corpus_path: PathBuf,
    #[serde(default = "default_tokenizer_path")]
    pub tokenizer_path: PathBuf,
    #[serde(default = "default_packed_path")]
    pub packed_path: PathBuf,
    #[serde(default = "default_models_dir")]
    pub models_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            input_dir: default_input_dir(),
            output_dir: default_output_dir(),
            checkpoint_path: default_checkpoint_path(),
            stats_path: default_stats_path(),
            corpus_path: default_corpus_path(),
            tokenizer_path: default_tokenizer_path(),
            packed_path: default_packed_path(),
            models_dir: default_models_dir(),
        }
    }
}
