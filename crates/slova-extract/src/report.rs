//! Human-readable run summary for manual review of rejected documents.

use std::fmt::Write as _;
use std::path::Path;

use slova_text::DocumentStatus;

use crate::checkpoint::Checkpoint;
use crate::error::Result;

/// Statuses listed with sample file names, in output order.
const AUDITED: [DocumentStatus; 4] = [
    DocumentStatus::Gibberish,
    DocumentStatus::NoText,
    DocumentStatus::Error,
    DocumentStatus::Skip,
];

#[must_use]
pub fn render_stats(checkpoint: &Checkpoint) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "extraction summary");
    let _ = writeln!(out, "total documents: {}", checkpoint.total());
    for status in DocumentStatus::ALL {
        let _ = writeln!(out, "{status}: {}", checkpoint.count(status));
    }

    for status in AUDITED {
        let _ = writeln!(out, "\n{status} files:");
        for name in checkpoint.samples.get(&status).into_iter().flatten() {
            let _ = writeln!(out, " {name}");
        }
    }
    out
}

/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_stats(checkpoint: &Checkpoint, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, render_stats(checkpoint))?;
    tracing::info!(path = %path.display(), "stats written");
    Ok(())
}

/// One `info!` line per status.
pub fn log_summary(checkpoint: &Checkpoint) {
    for status in DocumentStatus::ALL {
        tracing::info!(status = %status, count = checkpoint.count(status), "extraction total");
    }
}
