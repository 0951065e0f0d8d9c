//! Accept/reject gate applied to raw extracted text.

use serde::Deserialize;

use crate::status::DocumentStatus;
use crate::unicode::is_letter;

fn default_min_text_length() -> usize {
    500
}

fn default_max_non_letter_ratio() -> f64 {
    0.2
}

fn default_max_newline_ratio() -> f64 {
    0.25
}

/// Thresholds for the quality gate.
#[derive(Debug, Clone, Deserialize)]
pub struct QualityConfig {
    /// Texts shorter than this many chars are `no_text`.
    #[serde(default = "default_min_text_length")]
    pub min_text_length: usize,
    /// Ceiling for non-ASCII, non-letter chars per char (OCR noise, mojibake).
    #[serde(default = "default_max_non_letter_ratio")]
    pub max_non_letter_ratio: f64,
    /// Ceiling for `\n` per char (one word per line layouts).
    #[serde(default = "default_max_newline_ratio")]
    pub max_newline_ratio: f64,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            min_text_length: default_min_text_length(),
            max_non_letter_ratio: default_max_non_letter_ratio(),
            max_newline_ratio: default_max_newline_ratio(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualityDiagnostics {
    /// Length in chars.
    pub length: usize,
    /// `None` when the text was rejected before ratios were computed.
    pub non_letter_ratio: Option<f64>,
    pub newline_ratio: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualityVerdict {
    pub accepted: bool,
    /// `Success` when accepted, otherwise `NoText` or `Gibberish`.
    pub reason: DocumentStatus,
    pub diagnostics: QualityDiagnostics,
}

impl QualityVerdict {
    fn reject(reason: DocumentStatus, diagnostics: QualityDiagnostics) -> Self {
        Self {
            accepted: false,
            reason,
            diagnostics,
        }
    }
}

/// Score raw text against the configured thresholds.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn classify(text: &str, config: &QualityConfig) -> QualityVerdict {
    let mut length = 0usize;
    let mut non_letter = 0usize;
    let mut newlines = 0usize;
    for c in text.chars() {
        length += 1;
        if c == '\n' {
            newlines += 1;
        } else if u32::from(c) > 127 && !is_letter(c) {
            non_letter += 1;
        }
    }

    let mut diagnostics = QualityDiagnostics {
        length,
        non_letter_ratio: None,
        newline_ratio: None,
    };

    if length == 0 || length < config.min_text_length {
        return QualityVerdict::reject(DocumentStatus::NoText, diagnostics);
    }

    let non_letter_ratio = non_letter as f64 / length as f64;
    let newline_ratio = newlines as f64 / length as f64;
    diagnostics.non_letter_ratio = Some(non_letter_ratio);
    diagnostics.newline_ratio = Some(newline_ratio);

    if non_letter_ratio > config.max_non_letter_ratio
        || newline_ratio > config.max_newline_ratio
    {
        return QualityVerdict::reject(DocumentStatus::Gibberish, diagnostics);
    }

    QualityVerdict {
        accepted: true,
        reason: DocumentStatus::Success,
        diagnostics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(min_text_length: usize) -> QualityConfig {
        QualityConfig {
            min_text_length,
            ..QualityConfig::default()
        }
    }

    fn prose(len: usize) -> String {
        "Ana are mere și pere. ".chars().cycle().take(len).collect()
    }

    #[test]
    fn empty_text_is_no_text() {
        let verdict = classify("", &QualityConfig::default());
        assert!(!verdict.accepted);
        assert_eq!(verdict.reason, DocumentStatus::NoText);
        assert_eq!(verdict.diagnostics.length, 0);
        assert!(verdict.diagnostics.non_letter_ratio.is_none());
    }

    #[test]
    fn empty_text_rejected_even_without_minimum() {
        let verdict = classify("", &config(0));
        assert_eq!(verdict.reason, DocumentStatus::NoText);
    }

    #[test]
    fn short_text_is_no_text() {
        let verdict = classify(&prose(499), &QualityConfig::default());
        assert_eq!(verdict.reason, DocumentStatus::NoText);
    }

    #[test]
    fn length_counts_chars_not_bytes() {
        let text: String = "ș".repeat(500);
        let verdict = classify(&text, &QualityConfig::default());
        assert_eq!(verdict.diagnostics.length, 500);
        assert!(verdict.accepted);
    }

    #[test]
    fn clean_prose_is_accepted() {
        let verdict = classify(&prose(2000), &QualityConfig::default());
        assert!(verdict.accepted);
        assert_eq!(verdict.reason, DocumentStatus::Success);
    }

    #[test]
    fn mojibake_over_ratio_is_gibberish() {
        let noisy: String = "ab€€".repeat(200);
        let verdict = classify(&noisy, &QualityConfig::default());
        assert_eq!(verdict.reason, DocumentStatus::Gibberish);
        let ratio = verdict.diagnostics.non_letter_ratio.unwrap();
        assert!((ratio - 0.5).abs() < 1e-9);
    }

    #[test]
    fn non_letter_ratio_at_threshold_is_accepted() {
        // 1 of every 5 chars is a high non-letter: exactly 0.2.
        let text: String = "abcd€".repeat(200);
        let verdict = classify(&text, &QualityConfig::default());
        assert!(verdict.accepted, "{verdict:?}");
    }

    #[test]
    fn non_letter_ratio_just_over_threshold_is_rejected() {
        let mut text: String = "abcd€".repeat(200);
        text.push('€');
        let verdict = classify(&text, &QualityConfig::default());
        assert_eq!(verdict.reason, DocumentStatus::Gibberish);
    }

    #[test]
    fn accented_letters_are_tolerated() {
        let text: String = "ăâîșțĂÂÎȘȚ".repeat(100);
        assert!(classify(&text, &QualityConfig::default()).accepted);
    }

    #[test]
    fn one_word_per_line_is_gibberish() {
        let text: String = "cu\n".repeat(200);
        let verdict = classify(&text, &QualityConfig::default());
        assert_eq!(verdict.reason, DocumentStatus::Gibberish);
        assert!(verdict.diagnostics.newline_ratio.unwrap() > 0.25);
    }

    #[test]
    fn ascii_punctuation_is_not_noise() {
        let text: String = "#$%&*!?".repeat(100);
        let verdict = classify(&text, &QualityConfig::default());
        assert!(verdict.accepted);
        assert_eq!(verdict.diagnostics.non_letter_ratio, Some(0.0));
    }

    #[test]
    fn deserialize_partial_config() {
        let config: QualityConfig = toml::from_str("min_text_length = 1000").unwrap();
        assert_eq!(config.min_text_length, 1000);
        assert!((config.max_non_letter_ratio - 0.2).abs() < f64::EPSILON);
        assert!((config.max_newline_ratio - 0.25).abs() < f64::EPSILON);
    }
}
