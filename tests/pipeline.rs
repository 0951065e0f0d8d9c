use std::path::Path;

use slova_core::Config;
use slova_extract::{
    BatchOrchestrator, DocumentProcessor, ExtractorRegistry, FixedProbe, MemoryPolicy,
};
use slova_models::{ModelsConfig, split_blocks, write_model_configs};
use slova_text::{ChunkerConfig, DocumentStatus, Normalizer, TextChunker};
use slova_tokenize::{
    PackingConfig, TokenizerConfig, chunk_directory, pack_corpus, save_tokenizer, train_tokenizer,
};

fn book(title: &str, sentence: &str) -> String {
    let mut text = String::new();
    for chapter in ["CAPITOLUL I", "CAPITOLUL II", "CAPITOLUL III"] {
        text.push_str(chapter);
        text.push('\n');
        for _ in 0..4 {
            text.push_str(&format!("{title}: {sentence}\n"));
        }
        text.push('\n');
    }
    text
}

fn write_inputs(dir: &Path) {
    std::fs::write(
        dir.join("amintiri.txt"),
        book("Amintiri", "Ion plecă dimineața spre școală cu traista în spinare și cu gândul la joacă."),
    )
    .unwrap();
    std::fs::write(
        dir.join("povesti.txt"),
        book("Povești", "Bunica spunea povești lungi despre zmei, împărați și fete frumoase din alte vremuri."),
    )
    .unwrap();
    std::fs::write(dir.join("scurt.txt"), "Prea scurt pentru a fi păstrat.").unwrap();
    std::fs::write(dir.join("zgomot.txt"), "Ana ■■ □□ ◆◆ ".repeat(60)).unwrap();
    std::fs::write(dir.join(".ascuns.txt"), book("Ascuns", "Nu trebuie citit.")).unwrap();
}

#[test]
fn shipped_default_config_is_valid() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config/default.toml");
    let config = Config::load(&path).unwrap();
    config.validate().unwrap();
    assert_eq!(config.models.presets.len(), 5);
    assert_eq!(config.tokenizer.special_tokens.len(), 7);
}

#[tokio::test]
async fn raw_documents_to_training_artifacts() {
    let work = tempfile::tempdir().unwrap();
    let input = work.path().join("raw");
    let texts = work.path().join("texts");
    std::fs::create_dir_all(&input).unwrap();
    write_inputs(&input);

    let processor = DocumentProcessor::new(ExtractorRegistry::with_defaults(), &texts)
        .with_normalizer(Normalizer::default());
    let policy = MemoryPolicy {
        max_workers: 2,
        pause_secs: 0,
        ..MemoryPolicy::default()
    };
    let summary = BatchOrchestrator::new(&input, work.path().join("checkpoint.json"), processor, policy)
        .with_probe(FixedProbe(32_000))
        .run()
        .await
        .unwrap();

    let checkpoint = &summary.checkpoint;
    assert_eq!(checkpoint.processed.len(), 4);
    assert_eq!(checkpoint.count(DocumentStatus::Success), 2);
    assert_eq!(checkpoint.count(DocumentStatus::NoText), 1);
    assert_eq!(checkpoint.count(DocumentStatus::Gibberish), 1);
    assert!(!checkpoint.processed.contains(".ascuns"));

    let corpus = work.path().join("corpus.jsonl");
    let chunker = TextChunker::new(ChunkerConfig {
        max_chunk_chars: 400,
        min_chunk_chars: 50,
    });
    let chunks = chunk_directory(&texts, &corpus, &chunker).unwrap();
    assert_eq!(chunks.files, 2);
    assert!(chunks.records >= 2);

    let tokenizer = train_tokenizer(
        &corpus,
        &TokenizerConfig {
            vocab_size: 400,
            min_frequency: 1,
            ..TokenizerConfig::default()
        },
    )
    .unwrap();
    let tokenizer_path = work.path().join("tokenizer.json");
    save_tokenizer(&tokenizer, &tokenizer_path).unwrap();

    let packed = work.path().join("packed.jsonl");
    let pack = pack_corpus(
        &corpus,
        &tokenizer_path,
        &packed,
        &PackingConfig {
            block_length: 32,
            ..PackingConfig::default()
        },
    )
    .unwrap();
    assert_eq!(pack.documents, chunks.records);
    assert!(pack.blocks > 1);

    let models_dir = work.path().join("models");
    let models = ModelsConfig::default();
    assert_eq!(write_model_configs(&models_dir, &models).unwrap().len(), 5);
    let split = split_blocks(
        &packed,
        &models_dir.join("train.jsonl"),
        &models_dir.join("eval.jsonl"),
        models.eval_fraction,
        models.seed,
    )
    .unwrap();
    assert_eq!(split.train + split.eval, pack.blocks);
}
