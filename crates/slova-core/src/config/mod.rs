mod env;
mod types;


pub use types::*;

use std::path::Path;

use anyhow::{Context, bail};
use slova_tokenize::{BOS_TOKEN, EOS_TOKEN, UNK_TOKEN};

fn check_ratio(name: &str, value: f64) -> anyhow::Result<()> {
    if !(0.0..=1.0).contains(&value) {
        bail!("{name} must be within [0, 1], got {value}");
    }
    Ok(())
}

impl Config {
    /// Load configuration from a TOML file with env var overrides.
    ///
    /// Falls back to defaults when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str::<Self>(&content).context("failed to parse config file")?
        } else {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Reject values no stage can run with.
    ///
    /// # Errors
    ///
    /// Returns an error describing the first invalid value.
    pub fn validate(&self) -> anyhow::Result<()> {
        check_ratio("quality.max_non_letter_ratio", self.quality.max_non_letter_ratio)?;
        check_ratio("quality.max_newline_ratio", self.quality.max_newline_ratio)?;
        check_ratio("normalizer.max_noise_ratio", self.normalizer.max_noise_ratio)?;
        check_ratio("normalizer.max_rare_ratio", self.normalizer.max_rare_ratio)?;
        if let Some(ratio) = self.normalizer.min_letter_ratio {
            check_ratio("normalizer.min_letter_ratio", ratio)?;
        }

        if self.chunker.max_chunk_chars == 0 {
            bail!("chunker.max_chunk_chars must be positive");
        }
        if self.chunker.min_chunk_chars > self.chunker.max_chunk_chars {
            bail!(
                "chunker.min_chunk_chars ({}) exceeds max_chunk_chars ({})",
                self.chunker.min_chunk_chars,
                self.chunker.max_chunk_chars
            );
        }

        let memory = &self.extraction.memory;
        if memory.max_workers == 0 {
            bail!("extraction.memory.max_workers must be at least 1");
        }
        if memory.batch_multiplier == 0 {
            bail!("extraction.memory.batch_multiplier must be at least 1");
        }
        if memory.low_memory_mb > memory.high_memory_mb {
            bail!(
                "extraction.memory.low_memory_mb ({}) exceeds high_memory_mb ({})",
                memory.low_memory_mb,
                memory.high_memory_mb
            );
        }
        if memory.critical_memory_mb > memory.low_memory_mb {
            bail!(
                "extraction.memory.critical_memory_mb ({}) exceeds low_memory_mb ({})",
                memory.critical_memory_mb,
                memory.low_memory_mb
            );
        }

        for required in [BOS_TOKEN, EOS_TOKEN, UNK_TOKEN] {
            if !self.tokenizer.special_tokens.iter().any(|t| t == required) {
                bail!("tokenizer.special_tokens must include {required}");
            }
        }
        if self.tokenizer.vocab_size <= self.tokenizer.special_tokens.len() {
            bail!(
                "tokenizer.vocab_size ({}) leaves no room beyond the special tokens",
                self.tokenizer.vocab_size
            );
        }

        if self.packing.block_length == 0 {
            bail!("packing.block_length must be positive");
        }
        if !self.tokenizer.special_tokens.contains(&self.packing.eos_token) {
            bail!(
                "packing.eos_token {:?} is not a tokenizer special token",
                self.packing.eos_token
            );
        }

        self.models.validate().context("invalid [models] section")?;
        Ok(())
    }
}
