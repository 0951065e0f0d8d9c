//! Corpus assembly, tokenizer training and sequence packing.
//!
//! Cleaned texts become a JSON-lines corpus ([`chunk_directory`],
//! [`unite_corpora`]), the corpus trains a byte-level BPE tokenizer
//! ([`train_tokenizer`]), and the tokenized corpus is packed into
//! fixed-length blocks for causal language model training ([`pack_corpus`]).

pub mod corpus;
pub mod error;
pub mod pack;
pub mod packer;
pub mod trainer;

pub use corpus::{
    ChunkReport, CorpusConfig, CorpusReader, CorpusWriter, UniteCleaning, UniteReport,
    WriteStats, chunk_directory, unite_corpora,
};
pub use error::{Result, TokenizeError};
pub use pack::{PackReport, PackingConfig, pack_corpus, pack_with};
pub use packer::{BlockPacker, TokenBlock};
pub use trainer::{
    BOS_TOKEN, EOS_TOKEN, TokenizerConfig, UNK_TOKEN, load_tokenizer, save_tokenizer, self_check,
    train_tokenizer,
};
