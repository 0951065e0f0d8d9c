//! Batch extraction of raw text from source documents.
//!
//! Documents are processed on a bounded blocking pool whose size follows
//! available memory. Every finished batch is folded into a [`Checkpoint`] and
//! persisted, so an interrupted run resumes where it stopped.

pub mod checkpoint;
pub mod error;
pub mod extractor;
pub mod memory;
pub mod orchestrator;
pub mod pool;
pub mod report;

pub use checkpoint::Checkpoint;
pub use error::{ExtractError, Result};
pub use extractor::{DocumentExtractor, ExtractorRegistry, TextExtractor};
pub use memory::{BatchPlan, FixedProbe, MemoryPolicy, MemoryProbe, SysinfoProbe};
pub use orchestrator::{
    BatchOrchestrator, BatchReport, Document, DocumentOutcome, DocumentProcessor,
    ExtractionConfig, RunSummary,
};
pub use pool::WorkerPool;

#[cfg(feature = "pdf")]
pub use extractor::PdfExtractor;
