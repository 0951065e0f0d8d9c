use std::path::PathBuf;
use std::str::FromStr;

use super::Config;

fn parsed<T: FromStr>(key: &str) -> Option<T> {
    let v = std::env::var(key).ok()?;
    if let Ok(parsed) = v.trim().parse() {
        Some(parsed)
    } else {
        tracing::warn!("ignoring invalid {key} value: {v}");
        None
    }
}

fn path(key: &str) -> Option<PathBuf> {
    std::env::var_os(key)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

impl Config {
    pub(crate) fn apply_env_overrides(&mut self) {
        self.apply_env_overrides_paths();
        self.apply_env_overrides_text();
        self.apply_env_overrides_stages();
    }

    fn apply_env_overrides_paths(&mut self) {
        let paths = &mut self.paths;
        if let Some(p) = path("SLOVA_INPUT_DIR") {
            paths.input_dir = p;
        }
        if let Some(p) = path("SLOVA_OUTPUT_DIR") {
            paths.output_dir = p;
        }
        if let Some(p) = path("SLOVA_CHECKPOINT_PATH") {
            paths.checkpoint_path = p;
        }
        if let Some(p) = path("SLOVA_STATS_PATH") {
            paths.stats_path = p;
        }
        if let Some(p) = path("SLOVA_CORPUS_PATH") {
            paths.corpus_path = p;
        }
        if let Some(p) = path("SLOVA_TOKENIZER_PATH") {
            paths.tokenizer_path = p;
        }
        if let Some(p) = path("SLOVA_PACKED_PATH") {
            paths.packed_path = p;
        }
        if let Some(p) = path("SLOVA_MODELS_DIR") {
            paths.models_dir = p;
        }
    }

    fn apply_env_overrides_text(&mut self) {
        if let Some(n) = parsed("SLOVA_MIN_TEXT_LENGTH") {
            self.quality.min_text_length = n;
        }
        if let Some(r) = parsed("SLOVA_MAX_NON_LETTER_RATIO") {
            self.quality.max_non_letter_ratio = r;
        }
        if let Some(r) = parsed("SLOVA_MAX_NEWLINE_RATIO") {
            self.quality.max_newline_ratio = r;
        }
        if let Some(r) = parsed("SLOVA_MAX_NOISE_RATIO") {
            self.normalizer.max_noise_ratio = r;
        }
        if let Some(r) = parsed("SLOVA_MAX_RARE_RATIO") {
            self.normalizer.max_rare_ratio = r;
        }
        if let Ok(v) = std::env::var("SLOVA_ALLOWED_PUNCTUATION") {
            self.normalizer.allowed_punctuation = v;
        }
        if let Some(n) = parsed("SLOVA_MAX_CHUNK_CHARS") {
            self.chunker.max_chunk_chars = n;
        }
        if let Some(n) = parsed("SLOVA_MIN_CHUNK_CHARS") {
            self.chunker.min_chunk_chars = n;
        }
    }

    fn apply_env_overrides_stages(&mut self) {
        if let Some(mb) = parsed("SLOVA_MAX_FILE_SIZE_MB") {
            self.extraction.max_file_size_mb = mb;
        }
        let memory = &mut self.extraction.memory;
        if let Some(n) = parsed("SLOVA_MAX_WORKERS") {
            memory.max_workers = n;
        }
        if let Some(mb) = parsed("SLOVA_LOW_MEMORY_MB") {
            memory.low_memory_mb = mb;
        }
        if let Some(mb) = parsed("SLOVA_HIGH_MEMORY_MB") {
            memory.high_memory_mb = mb;
        }
        if let Some(mb) = parsed("SLOVA_CRITICAL_MEMORY_MB") {
            memory.critical_memory_mb = mb;
        }
        if let Some(n) = parsed("SLOVA_VOCAB_SIZE") {
            self.tokenizer.vocab_size = n;
        }
        if let Some(n) = parsed("SLOVA_MIN_FREQUENCY") {
            self.tokenizer.min_frequency = n;
        }
        if let Ok(v) = std::env::var("SLOVA_SPECIAL_TOKENS") {
            self.tokenizer.special_tokens = v
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(n) = parsed("SLOVA_BLOCK_LENGTH") {
            self.packing.block_length = n;
        }
        if let Some(seed) = parsed("SLOVA_SPLIT_SEED") {
            self.models.seed = seed;
        }
    }
}
