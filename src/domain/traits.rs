// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The rest of the system programs against these traits instead
// of concrete loaders and tokenizers:
//   - JsonCorpus      implements ExampleSource
//   - BertTokenizer   implements WordpieceTokenizer
//
// Tests swap in in-memory implementations without touching the
// converter or decoder.
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use anyhow::Result;

use crate::domain::example::Example;
use crate::domain::label::{LabelKind, LabelVocab};

/// Marker that prefixes a wordpiece continuing the previous piece.
pub const CONTINUATION_PREFIX: &str = "##";
/// Structural marker placed before the first content token.
pub const CLS_TOKEN: &str = "[CLS]";
/// Structural marker placed after the last content token.
pub const SEP_TOKEN: &str = "[SEP]";

// ─── ExampleSource ────────────────────────────────────────────────────────────
/// Anything that can produce the three data splits and the label
/// vocabularies for one task.
pub trait ExampleSource {
    fn train_examples(&self) -> Result<Vec<Example>>;
    fn dev_examples(&self) -> Result<Vec<Example>>;
    fn test_examples(&self) -> Result<Vec<Example>>;
    fn label_vocab(&self, kind: LabelKind) -> Result<LabelVocab>;
}

// ─── WordpieceTokenizer ───────────────────────────────────────────────────────
/// Text ↔ wordpiece ↔ id mapping, as used by BERT-style encoders.
pub trait WordpieceTokenizer {
    /// Split text into wordpieces (continuations carry `##`).
    fn tokenize(&self, text: &str) -> Result<Vec<String>>;

    /// Map wordpieces to vocabulary ids. Fails on a piece that is
    /// not in the vocabulary.
    fn convert_tokens_to_ids(&self, tokens: &[String]) -> Result<Vec<u32>>;

    /// Map ids back to wordpieces. Unknown ids become the unknown token.
    fn convert_ids_to_tokens(&self, ids: &[u32]) -> Vec<String>;
}
