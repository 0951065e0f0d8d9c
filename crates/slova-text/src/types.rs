use serde::{Deserialize, Serialize};

/// One corpus line: `{"text": ..., "source": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TextRecord {
    pub text: String,
    /// File stem of the document the text came from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl TextRecord {
    #[must_use]
    pub fn new(text: impl Into<String>, source: Option<String>) -> Self {
        Self {
            text: text.into(),
            source,
        }
    }

    /// Length of `text` in chars.
    #[must_use]
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_is_omitted_when_absent() {
        let record = TextRecord::new("Bună ziua", None);
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"text":"Bună ziua"}"#);
    }

    #[test]
    fn missing_source_deserializes_as_none() {
        let record: TextRecord = serde_json::from_str(r#"{"text":"a"}"#).unwrap();
        assert!(record.source.is_none());
    }

    #[test]
    fn char_len_counts_diacritics_once() {
        assert_eq!(TextRecord::new("ștăî", None).char_len(), 4);
    }
}
