//! Text-level stages of the corpus pipeline: the quality gate applied to raw
//! extracted text, OCR cleanup with paragraph reconstruction, and
//! paragraph-aligned chunking into corpus records.

pub mod chunker;
pub mod normalize;
pub mod quality;
pub mod status;
pub mod types;
pub mod unicode;

pub use chunker::{ChunkerConfig, TextChunker, chunk_text};
pub use normalize::{Normalizer, NormalizerConfig, normalize};
pub use quality::{QualityConfig, QualityDiagnostics, QualityVerdict, classify};
pub use status::DocumentStatus;
pub use types::TextRecord;
pub use unicode::decode_utf8_dropping_invalid;
