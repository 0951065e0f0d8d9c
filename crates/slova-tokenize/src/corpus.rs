//! JSON-lines corpus I/O and the drivers that produce corpus files.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use slova_text::{Normalizer, TextChunker, TextRecord, decode_utf8_dropping_invalid};

use crate::error::{Result, TokenizeError};

fn default_unite_min_chars() -> usize {
    500
}

#[derive(Debug, Clone, Deserialize)]
pub struct CorpusConfig {
    /// With `--clean`, records shorter than this after normalization are dropped.
    #[serde(default = "default_unite_min_chars")]
    pub unite_min_chars: usize,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            unite_min_chars: default_unite_min_chars(),
        }
    }
}

/// Streams `TextRecord`s from a JSON-lines file.
///
/// Malformed lines and records with empty `text` are skipped and counted.
/// Invalid UTF-8 is dropped rather than failing the line.
pub struct CorpusReader<R> {
    reader: R,
    path: PathBuf,
    line_no: usize,
    records: usize,
    skipped: usize,
    buf: Vec<u8>,
}

impl CorpusReader<BufReader<File>> {
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self::new(BufReader::new(file), path))
    }
}

impl<R: BufRead> CorpusReader<R> {
    pub fn new(reader: R, path: impl Into<PathBuf>) -> Self {
        Self {
            reader,
            path: path.into(),
            line_no: 0,
            records: 0,
            skipped: 0,
            buf: Vec::new(),
        }
    }

    #[must_use]
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Records yielded so far.
    #[must_use]
    pub fn records(&self) -> usize {
        self.records
    }

    #[must_use]
    pub fn lines_read(&self) -> usize {
        self.line_no
    }
}

impl<R: BufRead> Iterator for CorpusReader<R> {
    type Item = TextRecord;

    fn next(&mut self) -> Option<TextRecord> {
        loop {
            self.buf.clear();
            match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(path = %self.path.display(), line = self.line_no + 1, "read failed, stopping: {e}");
                    return None;
                }
            }
            self.line_no += 1;

            let line = decode_utf8_dropping_invalid(&self.buf);
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<TextRecord>(line) {
                Ok(record) if !record.text.is_empty() => {
                    self.records += 1;
                    return Some(record);
                }
                Ok(_) => self.skipped += 1,
                Err(e) => {
                    self.skipped += 1;
                    tracing::warn!(path = %self.path.display(), line = self.line_no, "skipping malformed line: {e}");
                }
            }
        }
    }
}

/// Counts of what a writer emitted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteStats {
    pub records: usize,
    pub chars: usize,
}

/// Buffered JSON-lines writer. Non-ASCII text is written verbatim.
pub struct CorpusWriter {
    out: BufWriter<File>,
    stats: WriteStats,
}

impl CorpusWriter {
    /// Create (or truncate) `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created.
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        Ok(Self {
            out: BufWriter::new(File::create(path)?),
            stats: WriteStats::default(),
        })
    }

    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn write(&mut self, record: &TextRecord) -> Result<()> {
        serde_json::to_writer(&mut self.out, record)?;
        self.out.write_all(b"\n")?;
        self.stats.records += 1;
        self.stats.chars += record.char_len();
        Ok(())
    }

    /// Flush and return the totals.
    ///
    /// # Errors
    ///
    /// Returns an error if the final flush fails.
    pub fn finish(mut self) -> Result<WriteStats> {
        self.out.flush()?;
        Ok(self.stats)
    }
}

fn sorted_files(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(TokenizeError::NoInput(dir.display().to_string()));
    }
    let mut files: Vec<PathBuf> = ignore::WalkBuilder::new(dir)
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
        .map(ignore::DirEntry::into_path)
        .filter(|p| p.extension().is_some_and(|e| e.eq_ignore_ascii_case(extension)))
        .collect();
    files.sort();
    Ok(files)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChunkReport {
    pub files: usize,
    pub records: usize,
    pub chars: usize,
}

/// Chunk every `*.txt` in `cleaned_dir` (sorted by name) into `output`,
/// tagging each record with the file stem.
///
/// # Errors
///
/// Returns an error if the directory is missing or a file cannot be read or
/// written.
pub fn chunk_directory(cleaned_dir: &Path, output: &Path, chunker: &TextChunker) -> Result<ChunkReport> {
    let files = sorted_files(cleaned_dir, "txt")?;
    let total = files.len();
    tracing::info!(dir = %cleaned_dir.display(), files = total, "chunking started");

    let mut writer = CorpusWriter::create(output)?;
    for (i, path) in files.iter().enumerate() {
        let text = decode_utf8_dropping_invalid(&std::fs::read(path)?);
        let source = path.file_stem().and_then(|s| s.to_str());
        let records = chunker.chunk(&text, source);
        for record in &records {
            writer.write(record)?;
        }
        tracing::debug!(
            file = %path.display(),
            progress = format_args!("{}/{total}", i + 1),
            records = records.len(),
        );
    }

    let stats = writer.finish()?;
    tracing::info!(records = stats.records, chars = stats.chars, output = %output.display(), "chunking finished");
    Ok(ChunkReport {
        files: total,
        records: stats.records,
        chars: stats.chars,
    })
}

/// Optional re-cleaning applied while uniting corpora.
#[derive(Debug, Clone, Copy)]
pub struct UniteCleaning<'a> {
    pub normalizer: &'a Normalizer,
    pub min_chars: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UniteReport {
    pub inputs: usize,
    pub records: usize,
    pub chars: usize,
    /// Malformed lines, empty records and records dropped by cleaning.
    pub skipped: usize,
    pub bytes_written: u64,
}

/// Write `record`, re-cleaned if requested. Returns `false` when cleaning
/// left it too short.
fn emit(
    record: TextRecord,
    cleaning: Option<UniteCleaning<'_>>,
    writer: &mut CorpusWriter,
) -> Result<bool> {
    let record = match cleaning {
        Some(c) => {
            let text = c.normalizer.normalize(&record.text);
            if text.chars().count() < c.min_chars {
                return Ok(false);
            }
            TextRecord::new(text, record.source)
        }
        None => record,
    };
    writer.write(&record)?;
    Ok(true)
}

/// Merge JSON-lines (`.jsonl`) and plain text (`.txt`, one record per file)
/// inputs into one corpus. Missing inputs are skipped with a warning.
///
/// # Errors
///
/// Returns `NoInput` if none of the inputs exist, or an error if writing
/// fails.
pub fn unite_corpora(
    inputs: &[PathBuf],
    output: &Path,
    cleaning: Option<UniteCleaning<'_>>,
) -> Result<UniteReport> {
    let existing: Vec<&PathBuf> = inputs
        .iter()
        .filter(|p| {
            let found = p.is_file();
            if !found {
                tracing::warn!(path = %p.display(), "input not found, skipping");
            }
            found
        })
        .collect();
    if existing.is_empty() {
        return Err(TokenizeError::NoInput(format!("{} input(s) given", inputs.len())));
    }

    let mut report = UniteReport {
        inputs: existing.len(),
        ..UniteReport::default()
    };
    let mut writer = CorpusWriter::create(output)?;

    for path in existing {
        let is_text = path.extension().is_some_and(|e| e.eq_ignore_ascii_case("txt"));
        if is_text {
            let text = decode_utf8_dropping_invalid(&std::fs::read(path)?);
            if text.trim().is_empty() {
                report.skipped += 1;
                continue;
            }
            let source = path.file_stem().and_then(|s| s.to_str()).map(str::to_owned);
            if !emit(TextRecord::new(text, source), cleaning, &mut writer)? {
                report.skipped += 1;
            }
        } else {
            let mut reader = CorpusReader::open(path)?;
            for record in reader.by_ref() {
                if !emit(record, cleaning, &mut writer)? {
                    report.skipped += 1;
                }
            }
            report.skipped += reader.skipped();
            tracing::info!(path = %path.display(), lines = reader.lines_read(), "input merged");
        }
    }

    let stats = writer.finish()?;
    report.records = stats.records;
    report.chars = stats.chars;
    report.bytes_written = std::fs::metadata(output)?.len();
    tracing::info!(
        records = report.records,
        chars = report.chars,
        skipped = report.skipped,
        bytes = report.bytes_written,
        output = %output.display(),
        "corpora united"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use slova_text::ChunkerConfig;

    use super::*;

    fn reader(data: &[u8]) -> CorpusReader<Cursor<Vec<u8>>> {
        CorpusReader::new(Cursor::new(data.to_vec()), "mem.jsonl")
    }

    #[test]
    fn reader_skips_malformed_and_empty() {
        let data = b"{\"text\":\"unu\"}\nnot json\n\n{\"text\":\"\"}\n{\"other\":1}\n{\"text\":\"doi\",\"source\":\"b\"}";
        let mut reader = reader(data);
        let texts: Vec<String> = reader.by_ref().map(|r| r.text).collect();
        assert_eq!(texts, vec!["unu", "doi"]);
        assert_eq!(reader.skipped(), 3);
        assert_eq!(reader.lines_read(), 6);
        assert_eq!(reader.records(), 2);
    }

    #[test]
    fn reader_drops_invalid_utf8() {
        let mut data = b"{\"text\":\"a".to_vec();
        data.push(0xff);
        data.extend_from_slice(b"b\"}\n");
        let texts: Vec<String> = reader(&data).map(|r| r.text).collect();
        assert_eq!(texts, vec!["ab"]);
    }

    #[test]
    fn reader_handles_crlf() {
        let texts: Vec<String> = reader(b"{\"text\":\"x\"}\r\n{\"text\":\"y\"}\r\n")
            .map(|r| r.text)
            .collect();
        assert_eq!(texts, vec!["x", "y"]);
    }

    #[test]
    fn writer_keeps_diacritics_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("c.jsonl");
        let mut writer = CorpusWriter::create(&path).unwrap();
        writer.write(&TextRecord::new("Țară", None)).unwrap();
        let stats = writer.finish().unwrap();

        assert_eq!(stats, WriteStats { records: 1, chars: 4 });
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{\"text\":\"Țară\"}\n");
    }

    #[test]
    fn chunk_directory_tags_sources_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        let cleaned = dir.path().join("clean");
        std::fs::create_dir(&cleaned).unwrap();
        let para = "Un paragraf suficient de lung pentru a trece de pragul minim al bucăților. ".repeat(3);
        std::fs::write(cleaned.join("b.txt"), &para).unwrap();
        std::fs::write(cleaned.join("a.txt"), format!("{para}\n\n{para}")).unwrap();
        std::fs::write(cleaned.join("notes.md"), &para).unwrap();
        std::fs::write(cleaned.join("scurt.txt"), "prea scurt").unwrap();

        let output = dir.path().join("corpus.jsonl");
        let chunker = TextChunker::new(ChunkerConfig::default());
        let report = chunk_directory(&cleaned, &output, &chunker).unwrap();

        assert_eq!(report.files, 3);
        assert_eq!(report.records, 2);
        let sources: Vec<Option<String>> = CorpusReader::open(&output)
            .unwrap()
            .map(|r| r.source)
            .collect();
        assert_eq!(sources, vec![Some("a".into()), Some("b".into())]);
    }

    #[test]
    fn chunk_directory_missing_dir_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = chunk_directory(
            &dir.path().join("absent"),
            &dir.path().join("c.jsonl"),
            &TextChunker::default(),
        );
        assert!(matches!(result, Err(TokenizeError::NoInput(_))));
    }

    #[test]
    fn unite_merges_jsonl_and_text_inputs() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.jsonl");
        std::fs::write(&a, "{\"text\":\"unu\"}\nbroken\n{\"text\":\"doi\"}\n").unwrap();
        let b = dir.path().join("carte.txt");
        std::fs::write(&b, "text liber").unwrap();
        let missing = dir.path().join("missing.jsonl");
        let output = dir.path().join("all.jsonl");

        let report = unite_corpora(&[a, missing, b], &output, None).unwrap();
        assert_eq!(report.inputs, 2);
        assert_eq!(report.records, 3);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.bytes_written, std::fs::metadata(&output).unwrap().len());

        let records: Vec<TextRecord> = CorpusReader::open(&output).unwrap().collect();
        assert_eq!(records[2].source.as_deref(), Some("carte"));
    }

    #[test]
    fn unite_with_cleaning_drops_short_records() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.jsonl");
        let long = "Propoziție curată și destul de lungă. ".repeat(20);
        let lines = [
            serde_json::to_string(&TextRecord::new(long.clone(), None)).unwrap(),
            serde_json::to_string(&TextRecord::new("scurt\x00", None)).unwrap(),
        ];
        std::fs::write(&input, lines.join("\n")).unwrap();
        let output = dir.path().join("out.jsonl");
        let normalizer = Normalizer::default();

        let report = unite_corpora(
            &[input],
            &output,
            Some(UniteCleaning {
                normalizer: &normalizer,
                min_chars: 500,
            }),
        )
        .unwrap();

        assert_eq!(report.records, 1);
        assert_eq!(report.skipped, 1);
        let records: Vec<TextRecord> = CorpusReader::open(&output).unwrap().collect();
        assert_eq!(records[0].text, long.trim());
    }

    #[test]
    fn unite_without_existing_inputs_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = unite_corpora(
            &[dir.path().join("nope.jsonl")],
            &dir.path().join("out.jsonl"),
            None,
        );
        assert!(matches!(result, Err(TokenizeError::NoInput(_))));
    }
}
