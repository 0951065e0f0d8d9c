use serde::{Deserialize, Serialize};

/// Terminal outcome for one source document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Success,
    /// Deliberately excluded: system artifact or oversized file.
    Skip,
    /// Extraction produced nothing usable.
    NoText,
    /// Extraction worked but the text failed the quality gate.
    Gibberish,
    /// Unexpected failure in any stage.
    Error,
}

impl DocumentStatus {
    pub const ALL: [Self; 5] = [
        Self::Success,
        Self::Skip,
        Self::NoText,
        Self::Gibberish,
        Self::Error,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Skip => "skip",
            Self::NoText => "no_text",
            Self::Gibberish => "gibberish",
            Self::Error => "error",
        }
    }

    /// Statuses worth a manual look in the run summary.
    #[must_use]
    pub fn is_problem(self) -> bool {
        !matches!(self, Self::Success)
    }
}

impl std::fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
