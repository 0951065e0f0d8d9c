use serde::Deserialize;

use crate::types::TextRecord;

const PARAGRAPH_SEPARATOR: &str = "\n\n";

fn default_max_chunk_chars() -> usize {
    2048
}

fn default_min_chunk_chars() -> usize {
    100
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChunkerConfig {
    /// Soft ceiling; a single paragraph longer than this becomes its own chunk.
    #[serde(default = "default_max_chunk_chars")]
    pub max_chunk_chars: usize,
    /// Chunks shorter than this are discarded.
    #[serde(default = "default_min_chunk_chars")]
    pub min_chunk_chars: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            max_chunk_chars: default_max_chunk_chars(),
            min_chunk_chars: default_min_chunk_chars(),
        }
    }
}

/// Groups paragraphs of normalized text into corpus records.
#[derive(Debug)]
pub struct TextChunker {
    config: ChunkerConfig,
}

impl Default for TextChunker {
    fn default() -> Self {
        Self::new(ChunkerConfig::default())
    }
}

impl TextChunker {
    #[must_use]
    pub fn new(config: ChunkerConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &ChunkerConfig {
        &self.config
    }

    /// Split `text` on blank lines and pack whole paragraphs into chunks of at
    /// most `max_chunk_chars`. Paragraphs are never split.
    #[must_use]
    pub fn chunk(&self, text: &str, source: Option<&str>) -> Vec<TextRecord> {
        let mut records = Vec::new();
        let mut current = String::new();
        let mut current_len = 0usize;
        let mut discarded = 0usize;

        let mut flush = |buf: &mut String, len: usize| {
            if len >= self.config.min_chunk_chars {
                records.push(TextRecord::new(
                    std::mem::take(buf),
                    source.map(str::to_owned),
                ));
            } else {
                discarded += 1;
                buf.clear();
            }
        };

        for paragraph in text.split(PARAGRAPH_SEPARATOR) {
            let paragraph = paragraph.trim();
            if paragraph.is_empty() {
                continue;
            }
            let para_len = paragraph.chars().count();

            if current_len > 0 && current_len + 2 + para_len > self.config.max_chunk_chars {
                flush(&mut current, current_len);
                current_len = 0;
            }

            if current_len > 0 {
                current.push_str(PARAGRAPH_SEPARATOR);
                current_len += 2;
            }
            current.push_str(paragraph);
            current_len += para_len;
        }

        if current_len > 0 {
            flush(&mut current, current_len);
        }

        if discarded > 0 {
            tracing::trace!(source, discarded, "dropped undersized chunks");
        }
        records
    }
}

/// Chunk with default bounds.
#[must_use]
pub fn chunk_text(text: &str, source: Option<&str>) -> Vec<TextRecord> {
    TextChunker::default().chunk(text, source)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paragraph(seed: char, len: usize) -> String {
        std::iter::repeat_n(seed, len).collect()
    }

    fn chunker(max: usize, min: usize) -> TextChunker {
        TextChunker::new(ChunkerConfig {
            max_chunk_chars: max,
            min_chunk_chars: min,
        })
    }

    #[test]
    fn empty_text_yields_nothing() {
        assert!(chunk_text("", None).is_empty());
        assert!(chunk_text("\n\n\n\n", None).is_empty());
    }

    #[test]
    fn short_text_is_discarded() {
        assert!(chunk_text("prea scurt", None).is_empty());
    }

    #[test]
    fn chunk_of_exactly_min_is_kept() {
        let text = paragraph('a', 100);
        assert_eq!(chunk_text(&text, None).len(), 1);
        assert!(chunk_text(&paragraph('a', 99), None).is_empty());
    }

    #[test]
    fn paragraphs_accumulate_until_limit() {
        let p = paragraph('a', 600);
        let text = [p.as_str(); 5].join("\n\n");
        let records = chunk_text(&text, Some("carte"));
        // 600 + 2 + 600 + 2 + 600 = 1804; a fourth would reach 2406.
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].char_len(), 1804);
        assert_eq!(records[1].char_len(), 1202);
        assert_eq!(records[0].source.as_deref(), Some("carte"));
    }

    #[test]
    fn exact_fit_stays_in_one_chunk() {
        let text = format!("{}\n\n{}", paragraph('a', 100), paragraph('b', 98));
        let records = chunker(200, 1).chunk(&text, None);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].char_len(), 200);
    }

    #[test]
    fn oversized_paragraph_is_its_own_chunk() {
        let big = paragraph('x', 3000);
        let text = format!("{}\n\n{big}\n\n{}", paragraph('a', 150), paragraph('b', 150));
        let records = chunk_text(&text, None);
        assert_eq!(records.len(), 3);
        assert_eq!(records[1].text, big);
    }

    #[test]
    fn blank_paragraphs_are_skipped() {
        let p = paragraph('a', 120);
        let text = format!("{p}\n\n   \n\n\n\n{p}");
        let records = chunker(1000, 1).chunk(&text, None);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].text, format!("{p}\n\n{p}"));
    }

    #[test]
    fn lengths_are_in_chars() {
        let p = paragraph('ș', 1000);
        let text = format!("{p}\n\n{p}");
        let records = chunk_text(&text, None);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].char_len(), 2002);
    }

    mod proptest_chunker {
        use super::*;
        use proptest::prelude::*;

        fn paragraphs() -> impl Strategy<Value = Vec<String>> {
            prop::collection::vec("[a-zăîșț .,]{1,700}", 0..30)
        }

        fn non_blank(paras: &[String]) -> Vec<String> {
            paras
                .iter()
                .map(|p| p.trim().to_owned())
                .filter(|p| !p.is_empty())
                .collect()
        }

        proptest! {
            #[test]
            fn paragraph_sequence_is_preserved(paras in paragraphs()) {
                let text = paras.join("\n\n");
                let records = chunker(2048, 0).chunk(&text, None);
                let rebuilt: Vec<String> = records
                    .iter()
                    .flat_map(|r| r.text.split("\n\n").map(str::to_owned))
                    .collect();
                prop_assert_eq!(rebuilt, non_blank(&paras));
            }

            #[test]
            fn chunks_respect_bounds(paras in paragraphs()) {
                let text = paras.join("\n\n");
                for record in chunk_text(&text, None) {
                    let len = record.char_len();
                    prop_assert!(len >= 100);
                    let single_paragraph = !record.text.contains("\n\n");
                    prop_assert!(len <= 2048 || single_paragraph);
                }
            }
        }
    }
}
