// ============================================================
// Layer 3 — Label Vocabularies
// ============================================================
// Every utterance is classified along three independent label
// dimensions. Each dimension owns an ordered vocabulary: the
// position of a label string in the list IS its class index.
//
//   intent_label.vocab      topic_label.vocab
//   0  play_music           0  music
//   1  set_alarm            1  time
//   2  ...                  2  ...
//
// The vocabulary must be identical for train, eval and predict
// or the head outputs would be decoded against the wrong names.

use std::collections::HashMap;
use std::fmt;

use anyhow::{anyhow, Result};

/// The three label dimensions, in head order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LabelKind {
    Intent,
    Topic,
    Ability,
}

impl LabelKind {
    pub const ALL: [LabelKind; 3] = [LabelKind::Intent, LabelKind::Topic, LabelKind::Ability];

    pub fn name(self) -> &'static str {
        match self {
            LabelKind::Intent  => "intent",
            LabelKind::Topic   => "topic",
            LabelKind::Ability => "ability",
        }
    }

    /// File name of the vocabulary under `{data_dir}/resource/`.
    pub fn vocab_file_name(self) -> String {
        format!("{}_label.vocab", self.name())
    }
}

impl fmt::Display for LabelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Ordered, deduplicated label list for one dimension.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelVocab {
    kind:   LabelKind,
    labels: Vec<String>,
    index:  HashMap<String, usize>,
}

impl LabelVocab {
    /// Build from raw lines. Lines are trimmed; blank lines and
    /// repeated labels are skipped so indices stay contiguous.
    pub fn from_lines<I, S>(kind: LabelKind, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut labels = Vec::new();
        let mut index  = HashMap::new();

        for line in lines {
            let label = line.as_ref().trim();
            if label.is_empty() {
                continue;
            }
            if index.contains_key(label) {
                tracing::warn!("Duplicate {} label '{}' ignored", kind, label);
                continue;
            }
            index.insert(label.to_string(), labels.len());
            labels.push(label.to_string());
        }

        Self { kind, labels, index }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Class index of a label string. An unknown label is fatal for
    /// feature conversion, so this returns an error rather than None.
    pub fn lookup(&self, label: &str) -> Result<usize> {
        self.index.get(label).copied().ok_or_else(|| {
            anyhow!(
                "{} label '{}' not found in vocabulary ({} labels)",
                self.kind, label, self.labels.len()
            )
        })
    }

    /// Label string at a class index.
    pub fn label(&self, id: usize) -> Result<&str> {
        self.labels.get(id).map(String::as_str).ok_or_else(|| {
            anyhow!(
                "{} label id {} out of range ({} labels)",
                self.kind, id, self.labels.len()
            )
        })
    }
}

/// The three vocabularies loaded once per run and shared read-only.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelVocabs {
    pub intent:  LabelVocab,
    pub topic:   LabelVocab,
    pub ability: LabelVocab,
}

impl LabelVocabs {
    pub fn get(&self, kind: LabelKind) -> &LabelVocab {
        match kind {
            LabelKind::Intent  => &self.intent,
            LabelKind::Topic   => &self.topic,
            LabelKind::Ability => &self.ability,
        }
    }

    /// Head widths in `LabelKind::ALL` order.
    pub fn sizes(&self) -> [usize; 3] {
        [self.intent.len(), self.topic.len(), self.ability.len()]
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_order_defines_index() {
        let v = LabelVocab::from_lines(LabelKind::Intent, ["greet", "bye", "ask"]);
        assert_eq!(v.lookup("greet").unwrap(), 0);
        assert_eq!(v.lookup("ask").unwrap(), 2);
        assert_eq!(v.label(1).unwrap(), "bye");
    }

    #[test]
    fn test_blank_and_duplicate_lines_skipped() {
        let v = LabelVocab::from_lines(LabelKind::Topic, ["a\r", "", "b", "a", "  c  "]);
        assert_eq!(v.labels(), &["a".to_string(), "b".to_string(), "c".to_string()]);
        assert_eq!(v.lookup("c").unwrap(), 2);
    }

    #[test]
    fn test_unknown_label_is_an_error() {
        let v   = LabelVocab::from_lines(LabelKind::Ability, ["x"]);
        let err = v.lookup("y").unwrap_err().to_string();
        assert!(err.contains("ability label 'y' not found"));
        assert!(v.label(5).is_err());
    }

    #[test]
    fn test_vocab_file_names() {
        assert_eq!(LabelKind::Intent.vocab_file_name(), "intent_label.vocab");
        assert_eq!(LabelKind::Ability.vocab_file_name(), "ability_label.vocab");
    }
}
