//! Byte-level BPE tokenizer training over a JSON-lines corpus.

use std::path::Path;

use serde::Deserialize;
use tokenizers::decoders::DecoderWrapper;
use tokenizers::models::bpe::{BPE, BpeTrainerBuilder};
use tokenizers::normalizers::{NFD, NormalizerWrapper};
use tokenizers::pre_tokenizers::PreTokenizerWrapper;
use tokenizers::pre_tokenizers::byte_level::ByteLevel;
use tokenizers::processors::PostProcessorWrapper;
use tokenizers::processors::template::TemplateProcessing;
use tokenizers::{AddedToken, Tokenizer, TokenizerBuilder, TokenizerImpl};

use crate::corpus::CorpusReader;
use crate::error::{Result, TokenizeError};

type BpeTokenizer =
    TokenizerImpl<BPE, NormalizerWrapper, PreTokenizerWrapper, PostProcessorWrapper, DecoderWrapper>;

pub const BOS_TOKEN: &str = "<s>";
pub const EOS_TOKEN: &str = "</s>";
pub const UNK_TOKEN: &str = "<unk>";

const SELF_CHECK_SENTENCES: [&str; 3] = [
    "Acesta este un test al tokenizer-ului nostru pentru limba română.",
    "Competențele sociale și emoționale sunt esențiale în educație.",
    "Literatura română are o istorie bogată și fascinantă.",
];

fn default_vocab_size() -> usize {
    40_000
}

fn default_min_frequency() -> u64 {
    3
}

fn default_special_tokens() -> Vec<String> {
    ["<s>", "</s>", "<unk>", "<pad>", "<mask>", "<cls>", "<sep>"]
        .into_iter()
        .map(str::to_owned)
        .collect()
}

fn default_add_prefix_space() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenizerConfig {
    #[serde(default = "default_vocab_size")]
    pub vocab_size: usize,
    /// Pairs seen fewer times than this are never merged.
    #[serde(default = "default_min_frequency")]
    pub min_frequency: u64,
    /// Reserved ids, assigned in order starting at 0. Must include `<s>`,
    /// `</s>` and `<unk>`.
    #[serde(default = "default_special_tokens")]
    pub special_tokens: Vec<String>,
    #[serde(default = "default_add_prefix_space")]
    pub add_prefix_space: bool,
    #[serde(default)]
    pub show_progress: bool,
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self {
            vocab_size: default_vocab_size(),
            min_frequency: default_min_frequency(),
            special_tokens: default_special_tokens(),
            add_prefix_space: default_add_prefix_space(),
            show_progress: false,
        }
    }
}

fn tk_err(e: impl std::fmt::Display) -> TokenizeError {
    TokenizeError::Tokenizer(e.to_string())
}

fn token_id(tokenizer: &BpeTokenizer, token: &str) -> Result<u32> {
    tokenizer
        .token_to_id(token)
        .ok_or_else(|| TokenizeError::MissingToken(token.to_owned()))
}

fn untrained(config: &TokenizerConfig) -> Result<BpeTokenizer> {
    let model = BPE::builder()
        .unk_token(UNK_TOKEN.to_owned())
        .byte_fallback(true)
        .build()
        .map_err(tk_err)?;
    let byte_level = ByteLevel::default().add_prefix_space(config.add_prefix_space);

    TokenizerBuilder::new()
        .with_model(model)
        .with_normalizer(Some(NormalizerWrapper::from(NFD)))
        .with_pre_tokenizer(Some(PreTokenizerWrapper::from(byte_level)))
        .with_post_processor(None)
        .with_decoder(Some(DecoderWrapper::from(ByteLevel::default())))
        .build()
        .map_err(tk_err)
}

fn template(tokenizer: &BpeTokenizer) -> Result<TemplateProcessing> {
    let bos = token_id(tokenizer, BOS_TOKEN)?;
    let eos = token_id(tokenizer, EOS_TOKEN)?;
    TemplateProcessing::builder()
        .try_single(format!("{BOS_TOKEN} $A {EOS_TOKEN}"))
        .map_err(tk_err)?
        .try_pair(format!("{BOS_TOKEN} $A {EOS_TOKEN} $B:1 {EOS_TOKEN}:1"))
        .map_err(tk_err)?
        .special_tokens(vec![(BOS_TOKEN, bos), (EOS_TOKEN, eos)])
        .build()
        .map_err(tk_err)
}

/// Train on every record of the corpus, streaming it from disk.
///
/// # Errors
///
/// Returns an error if the corpus cannot be opened, training fails, or a
/// required special token is missing from the trained vocabulary.
pub fn train_tokenizer(corpus: &Path, config: &TokenizerConfig) -> Result<Tokenizer> {
    let mut tokenizer = untrained(config)?;
    let special_tokens: Vec<AddedToken> = config
        .special_tokens
        .iter()
        .map(|t| AddedToken::from(t.clone(), true))
        .collect();
    let mut trainer = BpeTrainerBuilder::new()
        .vocab_size(config.vocab_size)
        .min_frequency(config.min_frequency)
        .show_progress(config.show_progress)
        .special_tokens(special_tokens)
        .initial_alphabet(ByteLevel::alphabet().into_iter().collect())
        .build();

    tracing::info!(
        corpus = %corpus.display(),
        vocab_size = config.vocab_size,
        min_frequency = config.min_frequency,
        "training tokenizer"
    );
    let mut reader = CorpusReader::open(corpus)?;
    tokenizer
        .train(&mut trainer, reader.by_ref().map(|r| r.text))
        .map_err(tk_err)?;
    let records = reader.records();
    if records == 0 {
        return Err(TokenizeError::NoInput(corpus.display().to_string()));
    }

    let template = template(&tokenizer)?;
    tokenizer.with_post_processor(Some(template));
    tracing::info!(
        records,
        skipped = reader.skipped(),
        vocab = tokenizer.get_vocab_size(true),
        "tokenizer trained"
    );
    Ok(Tokenizer::from(tokenizer))
}

/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn save_tokenizer(tokenizer: &Tokenizer, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    tokenizer.save(path, true).map_err(tk_err)?;
    tracing::info!(path = %path.display(), "tokenizer saved");
    Ok(())
}

/// # Errors
///
/// Returns an error if the file is missing or not a valid tokenizer.
pub fn load_tokenizer(path: &Path) -> Result<Tokenizer> {
    Tokenizer::from_file(path).map_err(tk_err)
}

/// Encode and decode a few Romanian sentences, logging the result at debug
/// level. Returns the token count per sentence.
///
/// # Errors
///
/// Returns an error if encoding or decoding fails.
pub fn self_check(tokenizer: &Tokenizer) -> Result<Vec<usize>> {
    let mut counts = Vec::with_capacity(SELF_CHECK_SENTENCES.len());
    for sentence in SELF_CHECK_SENTENCES {
        let encoding = tokenizer.encode(sentence, true).map_err(tk_err)?;
        let decoded = tokenizer.decode(encoding.get_ids(), true).map_err(tk_err)?;
        tracing::debug!(
            original = sentence,
            tokens = ?encoding.get_tokens(),
            decoded = %decoded,
            "tokenizer self-check"
        );
        counts.push(encoding.get_ids().len());
    }
    Ok(counts)
}
