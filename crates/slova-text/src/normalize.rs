//! OCR cleanup and paragraph reconstruction.
//!
//! Stages run in a fixed order; each one assumes the artifacts handled by the
//! previous stages are gone:
//!
//! 1. fold `\r\n` and `\r` into `\n`, drop other `C*` chars except `\t`
//! 2. drop `<...>` scanner tags
//! 3. join words split as `exam-\nple`
//! 4. collapse blank-line runs and space/tab runs
//! 5. drop noisy, decorative and table-of-contents lines
//! 6. drop lines dominated by code points above the rare-script floor
//! 7. rebuild paragraphs from the surviving lines
//!
//! The output is a fixed point: normalizing it again returns it unchanged.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use crate::unicode::{is_other, is_word_char};

static BRACKET_ARTIFACT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());
static BLANK_LINES_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n\s*\n").unwrap());
static SPACE_RUN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t]+").unwrap());
static DECORATION_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[\s*.\-_]+$").unwrap());
static NUMBERING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\s\d\-\u{2013}\u{2014}]{0,20}$").unwrap());

const SEPARATOR_MARKERS: [&str; 3] = ["....", "----", "***"];

const DEFAULT_ALLOWED_PUNCTUATION: &str = concat!(
    ".,;:!?\"'-()[]{}",
    "„”«»\u{2013}\u{2014}",
    "ăâîșțşţĂÂÎȘȚŞŢ",
    "çéèêëàìíïòóôõöùúûüýÿœæ",
);

fn default_max_noise_ratio() -> f64 {
    0.3
}

fn default_allowed_punctuation() -> String {
    DEFAULT_ALLOWED_PUNCTUATION.to_owned()
}

fn default_rare_codepoint_floor() -> u32 {
    0x3000
}

fn default_max_rare_ratio() -> f64 {
    0.2
}

fn default_heading_max_chars() -> usize {
    15
}

/// Thresholds for the line-level filters and paragraph rebuild.
#[derive(Debug, Clone, Deserialize)]
pub struct NormalizerConfig {
    /// Lines whose share of chars outside alphanumerics, whitespace and
    /// `allowed_punctuation` exceeds this are dropped.
    #[serde(default = "default_max_noise_ratio")]
    pub max_noise_ratio: f64,
    #[serde(default = "default_allowed_punctuation")]
    pub allowed_punctuation: String,
    /// Code points above this count as rare script (CJK and beyond).
    #[serde(default = "default_rare_codepoint_floor")]
    pub rare_codepoint_floor: u32,
    #[serde(default = "default_max_rare_ratio")]
    pub max_rare_ratio: f64,
    /// Uppercase lines shorter than this many chars are headings.
    #[serde(default = "default_heading_max_chars")]
    pub heading_max_chars: usize,
    /// Drop lines longer than 20 chars whose letter share is below this.
    /// Off by default: joining lines into paragraphs can push a paragraph
    /// under the ratio, so the output is no longer a fixed point.
    #[serde(default)]
    pub min_letter_ratio: Option<f64>,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            max_noise_ratio: default_max_noise_ratio(),
            allowed_punctuation: default_allowed_punctuation(),
            rare_codepoint_floor: default_rare_codepoint_floor(),
            max_rare_ratio: default_max_rare_ratio(),
            heading_max_chars: default_heading_max_chars(),
            min_letter_ratio: None,
        }
    }
}

#[derive(Debug)]
pub struct Normalizer {
    config: NormalizerConfig,
    allowed: HashSet<char>,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(NormalizerConfig::default())
    }
}

impl Normalizer {
    #[must_use]
    pub fn new(config: NormalizerConfig) -> Self {
        let allowed = config.allowed_punctuation.chars().collect();
        Self { config, allowed }
    }

    #[must_use]
    pub fn config(&self) -> &NormalizerConfig {
        &self.config
    }

    #[must_use]
    pub fn normalize(&self, raw: &str) -> String {
        let text = strip_control_chars(raw);
        let text = BRACKET_ARTIFACT_RE.replace_all(&text, "");
        let text = repair_hyphenation(&text);
        let text = BLANK_LINES_RE.replace_all(&text, "\n\n");
        let text = SPACE_RUN_RE.replace_all(&text, " ");

        let mut dropped = 0usize;
        let lines = text.split('\n').map(str::trim).filter(|line| {
            let keep = self.is_clean_line(line) && !self.is_rare_script(line);
            if !keep {
                dropped += 1;
            }
            keep
        });
        let out = self.rebuild_paragraphs(lines);

        tracing::trace!(
            input_chars = raw.len(),
            output_chars = out.len(),
            dropped_lines = dropped,
            "normalized text"
        );
        out
    }

    /// Ratios are taken over the trimmed line.
    #[allow(clippy::cast_precision_loss)]
    fn is_clean_line(&self, line: &str) -> bool {
        let len = line.chars().count();
        let noise = line
            .chars()
            .filter(|&c| !(c.is_alphanumeric() || c.is_whitespace() || self.allowed.contains(&c)))
            .count();
        if noise as f64 / (len as f64 + 1e-9) > self.config.max_noise_ratio {
            return false;
        }

        if !line.is_empty() && DECORATION_RE.is_match(line) {
            return false;
        }
        if NUMBERING_RE.is_match(line) || is_repeated_symbol(line) {
            return false;
        }
        if SEPARATOR_MARKERS.iter().any(|m| line.contains(m)) {
            return false;
        }

        if let Some(min) = self.config.min_letter_ratio
            && len > 20
        {
            let letters = line.chars().filter(|c| c.is_alphabetic()).count();
            if (letters as f64) / (len as f64) < min {
                return false;
            }
        }
        true
    }

    #[allow(clippy::cast_precision_loss)]
    fn is_rare_script(&self, line: &str) -> bool {
        let len = line.chars().count();
        let rare = line
            .chars()
            .filter(|&c| u32::from(c) > self.config.rare_codepoint_floor)
            .count();
        rare as f64 / (len as f64 + 1e-9) > self.config.max_rare_ratio
    }

    fn is_heading(&self, line: &str) -> bool {
        line.chars().count() < self.config.heading_max_chars && is_all_uppercase(line)
    }

    fn rebuild_paragraphs<'a>(&self, lines: impl Iterator<Item = &'a str>) -> String {
        let mut out = String::new();
        let mut current = String::new();

        for line in lines.filter(|l| !l.is_empty()) {
            if self.is_heading(line) {
                push_paragraph(&mut out, &current);
                current.clear();
                push_paragraph(&mut out, line);
            } else {
                if !current.is_empty() {
                    current.push(' ');
                }
                current.push_str(line);
            }
        }
        push_paragraph(&mut out, &current);
        out
    }
}

/// Normalize with default thresholds.
#[must_use]
pub fn normalize(raw: &str) -> String {
    Normalizer::default().normalize(raw)
}

fn push_paragraph(out: &mut String, paragraph: &str) {
    if paragraph.is_empty() {
        return;
    }
    if !out.is_empty() {
        out.push_str("\n\n");
    }
    out.push_str(paragraph);
}

/// Also folds `\r\n` and lone `\r` into `\n`, so every later stage sees one
/// line terminator.
fn strip_control_chars(text: &str) -> String {
    text.replace("\r\n", "\n")
        .chars()
        .map(|c| if c == '\r' { '\n' } else { c })
        .filter(|&c| matches!(c, '\n' | '\t') || !is_other(c))
        .collect()
}

fn repair_hyphenation(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == '-' && out.chars().next_back().is_some_and(is_word_char) {
            let mut ahead = chars.clone();
            if ahead.next() == Some('\n') && ahead.next().is_some_and(is_word_char) {
                chars.next();
                continue;
            }
        }
        out.push(c);
    }
    out
}

/// Python `str.isupper` semantics: at least one cased char, none lowercase.
fn is_all_uppercase(line: &str) -> bool {
    let mut cased = false;
    for c in line.chars() {
        if c.is_lowercase() {
            return false;
        }
        if c.is_uppercase() {
            cased = true;
        }
    }
    cased
}

fn is_repeated_symbol(line: &str) -> bool {
    let mut chars = line.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    !first.is_alphanumeric() && line.chars().count() >= 5 && chars.all(|c| c == first)
}
