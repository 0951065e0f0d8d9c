//! Extraction driver: enumerate → size batches by memory → process on the
//! worker pool → checkpoint after every batch.

use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use serde::Deserialize;
use slova_text::{DocumentStatus, Normalizer, QualityConfig, classify};

use crate::checkpoint::{Checkpoint, write_atomic};
use crate::error::{ExtractError, Result};
use crate::extractor::ExtractorRegistry;
use crate::memory::{BatchPlan, MemoryPolicy, MemoryProbe, SysinfoProbe};
use crate::pool::WorkerPool;

/// Diagnostics attached to `error` outcomes are cut to this many chars.
pub const ERROR_DETAIL_CHARS: usize = 30;

const BYTES_PER_MB: u64 = 1024 * 1024;

fn default_max_file_size_mb() -> u64 {
    500
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExtractionConfig {
    /// Larger source files are skipped without being opened.
    #[serde(default = "default_max_file_size_mb")]
    pub max_file_size_mb: u64,
    #[serde(default)]
    pub memory: MemoryPolicy,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            max_file_size_mb: default_max_file_size_mb(),
            memory: MemoryPolicy::default(),
        }
    }
}

/// One source file awaiting extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// File stem; names the output file and the checkpoint entry.
    pub id: String,
    pub file_name: String,
    pub path: PathBuf,
}

impl Document {
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        let id = path.file_stem()?.to_str()?.to_owned();
        let file_name = path.file_name()?.to_str()?.to_owned();
        Some(Self {
            id,
            file_name,
            path: path.to_path_buf(),
        })
    }

    fn outcome(&self, status: DocumentStatus, detail: Option<String>) -> DocumentOutcome {
        DocumentOutcome {
            id: self.id.clone(),
            file_name: self.file_name.clone(),
            status,
            detail,
            chars_written: 0,
        }
    }
}

/// Terminal result for one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentOutcome {
    pub id: String,
    pub file_name: String,
    pub status: DocumentStatus,
    pub detail: Option<String>,
    /// Chars of cleaned text written; zero unless `Success`.
    pub chars_written: usize,
}

/// macOS resource forks (`._name`) and other dot files.
#[must_use]
pub fn is_system_artifact(file_name: &str) -> bool {
    file_name.starts_with('.')
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_owned()
    }
}

/// Extract → classify → normalize → write, for a single document.
pub struct DocumentProcessor {
    extractors: ExtractorRegistry,
    quality: QualityConfig,
    normalizer: Normalizer,
    output_dir: PathBuf,
    max_file_size: u64,
}

impl std::fmt::Debug for DocumentProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentProcessor")
            .field("extractors", &self.extractors)
            .field("output_dir", &self.output_dir)
            .field("max_file_size", &self.max_file_size)
            .finish_non_exhaustive()
    }
}

impl DocumentProcessor {
    #[must_use]
    pub fn new(extractors: ExtractorRegistry, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            extractors,
            quality: QualityConfig::default(),
            normalizer: Normalizer::default(),
            output_dir: output_dir.into(),
            max_file_size: default_max_file_size_mb() * BYTES_PER_MB,
        }
    }

    #[must_use]
    pub fn with_quality(mut self, quality: QualityConfig) -> Self {
        self.quality = quality;
        self
    }

    #[must_use]
    pub fn with_normalizer(mut self, normalizer: Normalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    #[must_use]
    pub fn with_max_file_size_mb(mut self, mb: u64) -> Self {
        self.max_file_size = mb.saturating_mul(BYTES_PER_MB);
        self
    }

    #[must_use]
    pub fn extractors(&self) -> &ExtractorRegistry {
        &self.extractors
    }

    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    #[must_use]
    pub fn output_path(&self, id: &str) -> PathBuf {
        self.output_dir.join(format!("{id}.txt"))
    }

    /// Never fails: errors and panics become an `Error` outcome.
    #[must_use]
    pub fn process_document(&self, doc: &Document) -> DocumentOutcome {
        let outcome = match std::panic::catch_unwind(AssertUnwindSafe(|| self.run_stages(doc))) {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => doc.outcome(
                DocumentStatus::Error,
                Some(truncate_chars(&e.to_string(), ERROR_DETAIL_CHARS)),
            ),
            Err(payload) => {
                let e = ExtractError::Panicked(panic_message(payload.as_ref()));
                doc.outcome(
                    DocumentStatus::Error,
                    Some(truncate_chars(&e.to_string(), ERROR_DETAIL_CHARS)),
                )
            }
        };
        tracing::debug!(
            id = %doc.id,
            status = %outcome.status,
            detail = outcome.detail.as_deref().unwrap_or(""),
            "document processed"
        );
        outcome
    }

    fn run_stages(&self, doc: &Document) -> Result<DocumentOutcome> {
        if is_system_artifact(&doc.file_name) {
            return Ok(doc.outcome(DocumentStatus::Skip, Some("system file".into())));
        }

        let size = std::fs::metadata(&doc.path)?.len();
        if size > self.max_file_size {
            let detail = ExtractError::FileTooLarge(size).to_string();
            return Ok(doc.outcome(DocumentStatus::Skip, Some(detail)));
        }

        let raw = self.extractors.extract(&doc.path)?;
        if raw.trim().is_empty() {
            return Ok(doc.outcome(DocumentStatus::NoText, Some("no extractable text".into())));
        }

        let verdict = classify(&raw, &self.quality);
        if !verdict.accepted {
            let d = verdict.diagnostics;
            let detail = format!(
                "len={} non_letter={:.3} newline={:.3}",
                d.length,
                d.non_letter_ratio.unwrap_or_default(),
                d.newline_ratio.unwrap_or_default(),
            );
            return Ok(doc.outcome(verdict.reason, Some(detail)));
        }

        let clean = self.normalizer.normalize(&raw);
        drop(raw);
        if clean.is_empty() {
            return Ok(doc.outcome(DocumentStatus::NoText, Some("empty after cleanup".into())));
        }

        write_atomic(&self.output_path(&doc.id), clean.as_bytes())?;
        let mut outcome = doc.outcome(DocumentStatus::Success, None);
        outcome.chars_written = clean.chars().count();
        Ok(outcome)
    }
}

/// Outcomes of one completed batch.
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub plan: BatchPlan,
    pub outcomes: Vec<DocumentOutcome>,
    pub duration_ms: u64,
}

impl BatchReport {
    #[must_use]
    pub fn count(&self, status: DocumentStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }
}

/// Summary of a full `run`.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub checkpoint: Checkpoint,
    /// Candidates found pending at start.
    pub pending: usize,
    pub batches: usize,
    pub documents: usize,
    pub duration_ms: u64,
}

pub struct BatchOrchestrator {
    input_dir: PathBuf,
    checkpoint_path: PathBuf,
    processor: Arc<DocumentProcessor>,
    policy: MemoryPolicy,
    probe: Box<dyn MemoryProbe>,
}

impl std::fmt::Debug for BatchOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchOrchestrator")
            .field("input_dir", &self.input_dir)
            .field("checkpoint_path", &self.checkpoint_path)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl BatchOrchestrator {
    #[must_use]
    pub fn new(
        input_dir: impl Into<PathBuf>,
        checkpoint_path: impl Into<PathBuf>,
        processor: DocumentProcessor,
        policy: MemoryPolicy,
    ) -> Self {
        Self {
            input_dir: input_dir.into(),
            checkpoint_path: checkpoint_path.into(),
            processor: Arc::new(processor),
            policy,
            probe: Box::new(SysinfoProbe),
        }
    }

    #[must_use]
    pub fn with_probe(mut self, probe: impl MemoryProbe + 'static) -> Self {
        self.probe = Box::new(probe);
        self
    }

    #[must_use]
    pub fn checkpoint_path(&self) -> &Path {
        &self.checkpoint_path
    }

    /// Supported, non-hidden files directly under the input directory that
    /// have neither a checkpoint entry nor an output file. Sorted by path.
    ///
    /// # Errors
    ///
    /// Returns an error if the input directory does not exist.
    pub fn pending(&self, checkpoint: &Checkpoint) -> Result<Vec<Document>> {
        if !self.input_dir.is_dir() {
            return Err(ExtractError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("input directory {} not found", self.input_dir.display()),
            )));
        }

        let mut docs: Vec<Document> = ignore::WalkBuilder::new(&self.input_dir)
            .max_depth(Some(1))
            .hidden(true)
            .git_ignore(false)
            .git_exclude(false)
            .git_global(false)
            .ignore(false)
            .parents(false)
            .build()
            .flatten()
            .filter(|e| e.file_type().is_some_and(|ft| ft.is_file()))
            .filter(|e| self.processor.extractors().supports(e.path()))
            .filter_map(|e| {
                let doc = Document::from_path(e.path());
                if doc.is_none() {
                    tracing::warn!(path = %e.path().display(), "file name is not valid UTF-8, ignoring");
                }
                doc
            })
            .filter(|d| !is_system_artifact(&d.file_name))
            .collect();
        docs.sort_by(|a, b| a.path.cmp(&b.path));

        let found = docs.len();
        docs.retain(|d| {
            !checkpoint.is_processed(&d.id) && !self.processor.output_path(&d.id).exists()
        });
        tracing::debug!(found, pending = docs.len(), "enumerated input documents");
        Ok(docs)
    }

    /// Process one batch on a pool sized by `plan` and fold the outcomes into
    /// `checkpoint`. Persisting the result is left to the caller.
    pub async fn run_batch(
        &self,
        mut checkpoint: Checkpoint,
        batch: Vec<Document>,
        plan: BatchPlan,
    ) -> (Checkpoint, BatchReport) {
        let start = Instant::now();
        let mut pool = WorkerPool::new(plan.workers);
        for doc in batch {
            let processor = Arc::clone(&self.processor);
            pool.submit(move || processor.process_document(&doc));
        }

        let outcomes = pool.collect().await;
        checkpoint.merge(&outcomes);

        let report = BatchReport {
            plan,
            outcomes,
            duration_ms: start.elapsed().as_millis().try_into().unwrap_or(u64::MAX),
        };
        (checkpoint, report)
    }

    /// Run batches until nothing is pending, saving the checkpoint after each.
    ///
    /// # Errors
    ///
    /// Returns an error if the checkpoint cannot be loaded or saved, or the
    /// input/output directories are unusable. Per-document failures are
    /// recorded, not returned.
    pub async fn run(&self) -> Result<RunSummary> {
        let start = Instant::now();
        let mut checkpoint = Checkpoint::load(&self.checkpoint_path)?;
        std::fs::create_dir_all(self.processor.output_dir())?;

        let mut pending: VecDeque<Document> = self.pending(&checkpoint)?.into();
        let total = pending.len();
        tracing::info!(
            pending = total,
            already_processed = checkpoint.processed.len(),
            "extraction started"
        );

        let mut batches = 0usize;
        let mut documents = 0usize;
        while !pending.is_empty() {
            let available_mb = self.probe.available_mb();
            let plan = self.policy.plan(available_mb);
            let take = plan.batch_size.min(pending.len());
            let batch: Vec<Document> = pending.drain(..take).collect();

            let (next, report) = self.run_batch(checkpoint, batch, plan).await;
            checkpoint = next;
            checkpoint.save(&self.checkpoint_path)?;

            batches += 1;
            documents += report.outcomes.len();
            tracing::info!(
                batch = batches,
                progress = format_args!("{}/{total}", total - pending.len()),
                workers = plan.workers,
                available_mb,
                success = report.count(DocumentStatus::Success),
                errors = report.count(DocumentStatus::Error),
                duration_ms = report.duration_ms,
                "batch complete"
            );
            drop(report);
            self.wait_for_memory().await;
        }

        let duration_ms = start.elapsed().as_millis().try_into().unwrap_or(u64::MAX);
        tracing::info!(batches, documents, duration_ms, "extraction finished");
        Ok(RunSummary {
            checkpoint,
            pending: total,
            batches,
            documents,
            duration_ms,
        })
    }

    /// Re-probe after a batch and pause while memory stays critical, up to
    /// `max_pauses` times. Never aborts.
    async fn wait_for_memory(&self) -> u64 {
        let mut available = self.probe.available_mb();
        let mut pauses = 0u32;
        while self.policy.is_critical(available) && pauses < self.policy.max_pauses {
            tracing::warn!(
                available_mb = available,
                critical_mb = self.policy.critical_memory_mb,
                pause_secs = self.policy.pause_secs,
                "memory critical, pausing"
            );
            tokio::time::sleep(self.policy.pause()).await;
            pauses += 1;
            available = self.probe.available_mb();
        }
        if self.policy.is_critical(available) {
            tracing::warn!(available_mb = available, pauses, "memory still critical, continuing");
        }
        available
    }
}
