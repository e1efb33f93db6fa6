// ============================================================
// Layer 4 — Corpus Loader
// ============================================================
// Reads one task's splits and label vocabularies from disk.
//
// Expected layout:
//
//   {data_dir}/
//     train-{task}/train-{task}.json
//     dev-{task}/dev-{task}.json
//     test-{task}/test-{task}.json
//     resource/
//       intent_label.vocab
//       topic_label.vocab
//       ability_label.vocab
//
// Each split file is a JSON array of
//   { "id", "text", "intent_label", "topic_label", "ability_label" }
//
// A missing file is fatal: silently training on an empty corpus
// would only surface much later as a meaningless model.
//
// Reference: serde_json crate documentation
//            Rust Book §9 (Error Handling)

use anyhow::{bail, Context, Result};
use std::{fs, path::{Path, PathBuf}};

use crate::domain::example::Example;
use crate::domain::label::{LabelKind, LabelVocab, LabelVocabs};
use crate::domain::traits::ExampleSource;

/// The three corpus splits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Split {
    Train,
    Dev,
    Test,
}

impl Split {
    pub fn name(self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Dev   => "dev",
            Split::Test  => "test",
        }
    }
}

/// Loads JSON splits for one task from a data directory.
/// Implements the ExampleSource trait from Layer 3.
pub struct JsonCorpus {
    data_dir:  PathBuf,
    task_name: String,
}

impl JsonCorpus {
    /// The task name is matched case-insensitively (lowercased).
    pub fn new(data_dir: impl Into<PathBuf>, task_name: &str) -> Self {
        Self {
            data_dir:  data_dir.into(),
            task_name: task_name.to_lowercase(),
        }
    }

    pub fn split_path(&self, split: Split) -> PathBuf {
        let stem = format!("{}-{}", split.name(), self.task_name);
        self.data_dir.join(&stem).join(format!("{stem}.json"))
    }

    pub fn vocab_path(&self, kind: LabelKind) -> PathBuf {
        self.data_dir.join("resource").join(kind.vocab_file_name())
    }

    /// Load all three vocabularies at once.
    pub fn label_vocabs(&self) -> Result<LabelVocabs> {
        let vocabs = LabelVocabs {
            intent:  self.label_vocab(LabelKind::Intent)?,
            topic:   self.label_vocab(LabelKind::Topic)?,
            ability: self.label_vocab(LabelKind::Ability)?,
        };
        tracing::info!(
            "Label vocabularies: {} intents, {} topics, {} abilities",
            vocabs.intent.len(), vocabs.topic.len(), vocabs.ability.len()
        );
        Ok(vocabs)
    }

    fn load_split(&self, split: Split) -> Result<Vec<Example>> {
        let path     = self.split_path(split);
        let examples = read_examples(&path)?;
        tracing::info!(
            "Loaded {} {} examples from '{}'",
            examples.len(), split.name(), path.display()
        );
        Ok(examples)
    }
}

impl ExampleSource for JsonCorpus {
    fn train_examples(&self) -> Result<Vec<Example>> {
        self.load_split(Split::Train)
    }

    fn dev_examples(&self) -> Result<Vec<Example>> {
        self.load_split(Split::Dev)
    }

    fn test_examples(&self) -> Result<Vec<Example>> {
        self.load_split(Split::Test)
    }

    fn label_vocab(&self, kind: LabelKind) -> Result<LabelVocab> {
        let path = self.vocab_path(kind);
        let text = read_existing(&path)?;
        let vocab = LabelVocab::from_lines(kind, text.lines());
        if vocab.is_empty() {
            bail!("{} vocabulary '{}' is empty", kind, path.display());
        }
        tracing::debug!("Loaded {} {} labels from '{}'", vocab.len(), kind, path.display());
        Ok(vocab)
    }
}

/// Parse a JSON array of examples.
pub fn read_examples(path: &Path) -> Result<Vec<Example>> {
    let text = read_existing(path)?;
    serde_json::from_str(&text)
        .with_context(|| format!("Malformed example file '{}'", path.display()))
}

fn read_existing(path: &Path) -> Result<String> {
    if !path.exists() {
        bail!("Data path not found: '{}'", path.display());
    }
    fs::read_to_string(path).with_context(|| format!("Cannot read '{}'", path.display()))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("multihead-intent-{}-{}", name, std::process::id()));
        let _   = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_paths_follow_layout() {
        let corpus = JsonCorpus::new("/data", "Assistant");
        assert_eq!(
            corpus.split_path(Split::Dev),
            PathBuf::from("/data/dev-assistant/dev-assistant.json")
        );
        assert_eq!(
            corpus.vocab_path(LabelKind::Topic),
            PathBuf::from("/data/resource/topic_label.vocab")
        );
    }

    #[test]
    fn test_loads_split_and_vocabs() {
        let dir    = scratch_dir("loader");
        let corpus = JsonCorpus::new(&dir, "demo");

        let split = corpus.split_path(Split::Train);
        fs::create_dir_all(split.parent().unwrap()).unwrap();
        fs::write(&split, r#"[
            {"id": 1, "text": "play jazz", "intent_label": "play",
             "topic_label": "music", "ability_label": "media"},
            {"id": "b", "text": "stop", "intent_label": "stop",
             "topic_label": "music", "ability_label": "media"}
        ]"#).unwrap();

        fs::create_dir_all(dir.join("resource")).unwrap();
        fs::write(corpus.vocab_path(LabelKind::Intent),  "play\nstop\n").unwrap();
        fs::write(corpus.vocab_path(LabelKind::Topic),   "music\n").unwrap();
        fs::write(corpus.vocab_path(LabelKind::Ability), "media\nother\n").unwrap();

        let examples = corpus.train_examples().unwrap();
        assert_eq!(examples.len(), 2);
        assert_eq!(examples[1].text, "stop");

        let vocabs = corpus.label_vocabs().unwrap();
        assert_eq!(vocabs.sizes(), [2, 1, 2]);

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_missing_split_is_fatal() {
        let dir    = scratch_dir("missing");
        let corpus = JsonCorpus::new(&dir, "demo");
        let err    = corpus.dev_examples().unwrap_err().to_string();
        assert!(err.contains("Data path not found"));
        fs::remove_dir_all(&dir).ok();
    }
}
