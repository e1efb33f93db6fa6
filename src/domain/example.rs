// ============================================================
// Layer 3 — Example Domain Type
// ============================================================
// One raw utterance as read from the corpus, e.g.
//
//   { "id": 17, "text": "play some jazz",
//     "intent_label": "play_music", "topic_label": "music",
//     "ability_label": "media" }
//
// Labels are optional: the test split may ship without them.
//
// Alignment padding is a separate enum variant rather than a
// magic value, so an all-zero feature can never be mistaken
// for an example whose labels all sit at index 0.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::label::LabelKind;

/// Corpus ids are numbers in some dumps and strings in others.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExampleId {
    Num(i64),
    Text(String),
}

impl fmt::Display for ExampleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExampleId::Num(n)  => write!(f, "{n}"),
            ExampleId::Text(s) => f.write_str(s),
        }
    }
}

/// A labelled (or unlabelled) utterance. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Example {
    pub id:            ExampleId,
    pub text:          String,
    #[serde(default)]
    pub intent_label:  Option<String>,
    #[serde(default)]
    pub topic_label:   Option<String>,
    #[serde(default)]
    pub ability_label: Option<String>,
}

impl Example {
    pub fn new(id: ExampleId, text: impl Into<String>) -> Self {
        Self {
            id,
            text:          text.into(),
            intent_label:  None,
            topic_label:   None,
            ability_label: None,
        }
    }

    /// Builder-style helper for fixtures.
    #[cfg(test)]
    pub fn with_labels(
        mut self,
        intent:  impl Into<String>,
        topic:   impl Into<String>,
        ability: impl Into<String>,
    ) -> Self {
        self.intent_label  = Some(intent.into());
        self.topic_label   = Some(topic.into());
        self.ability_label = Some(ability.into());
        self
    }

    pub fn label(&self, kind: LabelKind) -> Option<&str> {
        match kind {
            LabelKind::Intent  => self.intent_label.as_deref(),
            LabelKind::Topic   => self.topic_label.as_deref(),
            LabelKind::Ability => self.ability_label.as_deref(),
        }
    }

    pub fn is_labelled(&self) -> bool {
        LabelKind::ALL.iter().all(|&k| self.label(k).is_some())
    }
}

/// What the converter consumes: a real example or batch filler.
#[derive(Debug, Clone, PartialEq)]
pub enum InputExample {
    Real(Example),
    /// Inserted only so the example count becomes a multiple of the
    /// batch size. Converts to an all-zero feature.
    Padding,
}

impl InputExample {
    pub fn is_padding(&self) -> bool {
        matches!(self, InputExample::Padding)
    }
}

impl From<Example> for InputExample {
    fn from(example: Example) -> Self {
        InputExample::Real(example)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_and_string_ids_deserialize() {
        let a: Example = serde_json::from_str(
            r#"{"id": 3, "text": "hi", "intent_label": "greet",
                "topic_label": "chat", "ability_label": "talk"}"#,
        ).unwrap();
        let b: Example = serde_json::from_str(r#"{"id": "u-9", "text": "hi"}"#).unwrap();

        assert_eq!(a.id, ExampleId::Num(3));
        assert_eq!(a.id.to_string(), "3");
        assert!(a.is_labelled());

        assert_eq!(b.id.to_string(), "u-9");
        assert!(!b.is_labelled());
        assert_eq!(b.label(LabelKind::Topic), None);
    }

    #[test]
    fn test_padding_variant() {
        let real: InputExample = Example::new(ExampleId::Num(1), "x").into();
        assert!(!real.is_padding());
        assert!(InputExample::Padding.is_padding());
    }
}
