use std::path::Path;
use std::sync::Arc;

use slova_text::decode_utf8_dropping_invalid;

use crate::error::{ExtractError, Result};

/// Turns one source file into raw text.
///
/// Implementations are synchronous and run on the blocking pool, one call
/// per document.
pub trait DocumentExtractor: Send + Sync {
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or decoded.
    fn extract(&self, path: &Path) -> Result<String>;

    /// Lowercase extensions without the leading dot.
    fn supported_extensions(&self) -> &[&str];
}

/// Plain text files, decoded as UTF-8 with invalid sequences dropped.
#[derive(Debug, Default)]
pub struct TextExtractor;

impl DocumentExtractor for TextExtractor {
    fn extract(&self, path: &Path) -> Result<String> {
        let bytes = std::fs::read(path)?;
        Ok(decode_utf8_dropping_invalid(&bytes))
    }

    fn supported_extensions(&self) -> &[&str] {
        &["txt"]
    }
}

/// PDF text layer, page by page. Empty pages are dropped and the rest are
/// joined with a newline.
#[cfg(feature = "pdf")]
#[derive(Debug, Default)]
pub struct PdfExtractor;

#[cfg(feature = "pdf")]
impl DocumentExtractor for PdfExtractor {
    fn extract(&self, path: &Path) -> Result<String> {
        let pages =
            pdf_extract::extract_text_by_pages(path).map_err(|e| ExtractError::Pdf(e.to_string()))?;
        let total = pages.len();
        let text = join_pages(pages);
        tracing::trace!(path = %path.display(), pages = total, chars = text.len(), "pdf extracted");
        Ok(text)
    }

    fn supported_extensions(&self) -> &[&str] {
        &["pdf"]
    }
}

#[cfg_attr(not(feature = "pdf"), allow(dead_code))]
fn join_pages(pages: Vec<String>) -> String {
    let mut text = String::new();
    for page in pages.into_iter().filter(|p| !p.trim().is_empty()) {
        if !text.is_empty() {
            text.push('\n');
        }
        text.push_str(&page);
    }
    text
}

/// Extension-based dispatch over the available extractors.
#[derive(Clone, Default)]
pub struct ExtractorRegistry {
    extractors: Vec<Arc<dyn DocumentExtractor>>,
}

impl std::fmt::Debug for ExtractorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractorRegistry")
            .field("extensions", &self.extensions())
            .finish()
    }
}

impl ExtractorRegistry {
    /// Text extractor plus the PDF extractor when built with `pdf`.
    #[must_use]
    pub fn with_defaults() -> Self {
        let registry = Self::default().with(TextExtractor);
        #[cfg(feature = "pdf")]
        let registry = registry.with(PdfExtractor);
        registry
    }

    #[must_use]
    pub fn with(mut self, extractor: impl DocumentExtractor + 'static) -> Self {
        self.extractors.push(Arc::new(extractor));
        self
    }

    /// Extractors handling the extension of `path`, most recently registered
    /// first.
    pub fn candidates<'a>(
        &'a self,
        path: &Path,
    ) -> impl Iterator<Item = &'a dyn DocumentExtractor> + use<'a> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        self.extractors
            .iter()
            .rev()
            .filter(move |e| {
                ext.as_deref()
                    .is_some_and(|ext| e.supported_extensions().contains(&ext))
            })
            .map(AsRef::as_ref)
    }

    /// Later registrations win for a shared extension.
    #[must_use]
    pub fn for_path(&self, path: &Path) -> Option<&dyn DocumentExtractor> {
        self.candidates(path).next()
    }

    #[must_use]
    pub fn supports(&self, path: &Path) -> bool {
        self.for_path(path).is_some()
    }

    #[must_use]
    pub fn extensions(&self) -> Vec<&str> {
        let mut exts: Vec<&str> = self
            .extractors
            .iter()
            .flat_map(|e| e.supported_extensions().iter().copied())
            .collect();
        exts.sort_unstable();
        exts.dedup();
        exts
    }

    /// Try each candidate in turn until one returns non-blank text. When all
    /// of them come up blank the last blank text is returned, so the caller
    /// can report `no_text`.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedFormat` when no extractor handles the extension,
    /// otherwise the last error when every candidate failed.
    pub fn extract(&self, path: &Path) -> Result<String> {
        let mut blank = None;
        let mut last_err = None;
        for extractor in self.candidates(path) {
            match extractor.extract(path) {
                Ok(text) if !text.trim().is_empty() => return Ok(text),
                Ok(text) => {
                    tracing::debug!(path = %path.display(), "extractor returned blank text, trying next");
                    blank = Some(text);
                }
                Err(e) => {
                    tracing::debug!(path = %path.display(), "extractor failed, trying next: {e}");
                    last_err = Some(e);
                }
            }
        }
        if let Some(text) = blank {
            return Ok(text);
        }
        Err(last_err
            .unwrap_or_else(|| ExtractError::UnsupportedFormat(path.display().to_string())))
    }
}
