use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Deserialize;
use tokenizers::Tokenizer;

use crate::corpus::CorpusReader;
use crate::error::{Result, TokenizeError};
use crate::packer::BlockPacker;
use crate::trainer::{EOS_TOKEN, load_tokenizer};

fn default_block_length() -> usize {
    2048
}

fn default_eos_token() -> String {
    EOS_TOKEN.to_owned()
}

#[derive(Debug, Clone, Deserialize)]
pub struct PackingConfig {
    #[serde(default = "default_block_length")]
    pub block_length: usize,
    #[serde(default = "default_eos_token")]
    pub eos_token: String,
}

impl Default for PackingConfig {
    fn default() -> Self {
        Self {
            block_length: default_block_length(),
            eos_token: default_eos_token(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PackReport {
    pub documents: usize,
    pub blocks: usize,
    /// Ids written, eos markers included.
    pub tokens: usize,
    /// Malformed corpus lines plus records the tokenizer failed on.
    pub skipped: usize,
}

/// Tokenize `corpus` with the tokenizer at `tokenizer_path` and write
/// fixed-length blocks to `output` as `{"input_ids": [...]}` lines.
///
/// # Errors
///
/// Returns an error if the tokenizer cannot be loaded, lacks the eos token,
/// or the corpus or output file fails.
pub fn pack_corpus(
    corpus: &Path,
    tokenizer_path: &Path,
    output: &Path,
    config: &PackingConfig,
) -> Result<PackReport> {
    let tokenizer = load_tokenizer(tokenizer_path)?;
    pack_with(&tokenizer, corpus, output, config)
}

/// Same as [`pack_corpus`] with an already loaded tokenizer.
///
/// # Errors
///
/// See [`pack_corpus`].
pub fn pack_with(
    tokenizer: &Tokenizer,
    corpus: &Path,
    output: &Path,
    config: &PackingConfig,
) -> Result<PackReport> {
    let eos_id = tokenizer
        .token_to_id(&config.eos_token)
        .ok_or_else(|| TokenizeError::MissingToken(config.eos_token.clone()))?;
    let mut reader = CorpusReader::open(corpus)?;

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut out = BufWriter::new(File::create(output)?);
    let mut report = PackReport::default();
    let mut encode_failures = 0usize;

    {
        let documents = reader.by_ref().filter_map(|record| {
            match tokenizer.encode(record.text.as_str(), false) {
                Ok(encoding) => Some(encoding.get_ids().to_vec()),
                Err(e) => {
                    encode_failures += 1;
                    tracing::warn!(source = ?record.source, "encoding failed, skipping record: {e}");
                    None
                }
            }
        });
        let mut packer = BlockPacker::new(documents, config.block_length, eos_id)?;
        for block in packer.by_ref() {
            serde_json::to_writer(&mut out, &block)?;
            out.write_all(b"\n")?;
            report.blocks += 1;
            if report.blocks % 10_000 == 0 {
                tracing::info!(blocks = report.blocks, "packing");
            }
        }
        report.documents = packer.documents_seen();
        report.tokens = packer.tokens_seen();
    }
    out.flush()?;
    report.skipped = reader.skipped() + encode_failures;

    tracing::info!(
        documents = report.documents,
        blocks = report.blocks,
        tokens = report.tokens,
        skipped = report.skipped,
        block_length = config.block_length,
        output = %output.display(),
        "corpus packed"
    );
    Ok(report)
}
