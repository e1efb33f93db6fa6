// ============================================================
// Layer 6 — Tokenizer Store
// ============================================================
// Builds a BERT wordpiece tokenizer from a plain `vocab.txt`
// (one wordpiece per line, line number = id) and persists it as
// `tokenizer.json` next to the checkpoints, so that `predict`
// and `export` decode with exactly the vocabulary used in
// training.
//
// The tokenizer JSON is written by hand in HuggingFace format
// and loaded back through `Tokenizer::from_file`; the pipeline
// is the standard BERT one:
//   BertNormalizer (clean, CJK split, optional lowercase)
//   → BertPreTokenizer (whitespace + punctuation)
//   → WordPiece (greedy longest-match, "##" continuations)
//
// Reference: Wu et al. (2016) Google NMT wordpiece model

use anyhow::{anyhow, bail, Context, Result};
use std::path::{Path, PathBuf};
use tokenizers::Tokenizer;

use crate::domain::traits::{WordpieceTokenizer, CONTINUATION_PREFIX};

const UNK_TOKEN: &str = "[UNK]";
const TOKENIZER_FILE: &str = "tokenizer.json";

// Checkpoint directory names published with the reference BERT models.
const UNCASED_MODELS: [&str; 4] = [
    "uncased_L-24_H-1024_A-16",
    "uncased_L-12_H-768_A-12",
    "multilingual_L-12_H-768_A-12",
    "chinese_L-12_H-768_A-12",
];
const CASED_MODELS: [&str; 3] = [
    "cased_L-12_H-768_A-12",
    "cased_L-24_H-1024_A-16",
    "multi_cased_L-12_H-768_A-12",
];

// ─── BertTokenizer ────────────────────────────────────────────────────────────
/// Wordpiece tokenizer backed by the `tokenizers` crate.
pub struct BertTokenizer {
    inner: Tokenizer,
}

impl BertTokenizer {
    pub fn new(inner: Tokenizer) -> Self {
        Self { inner }
    }

    /// Build a tokenizer from an ordered wordpiece list (index = id).
    #[cfg(test)]
    pub fn from_vocab_tokens<S: AsRef<str>>(tokens: &[S], lowercase: bool) -> Result<Self> {
        let json = tokenizer_json(tokens, lowercase)?;
        let inner = Tokenizer::from_bytes(serde_json::to_vec(&json)?)
            .map_err(|e| anyhow!("Cannot build tokenizer: {e}"))?;
        Ok(Self { inner })
    }

    pub fn vocab_size(&self) -> usize {
        self.inner.get_vocab_size(true)
    }
}

impl WordpieceTokenizer for BertTokenizer {
    fn tokenize(&self, text: &str) -> Result<Vec<String>> {
        let enc = self.inner
            .encode(text, false)
            .map_err(|e| anyhow!("Tokenisation error: {e}"))?;
        Ok(enc.get_tokens().to_vec())
    }

    fn convert_tokens_to_ids(&self, tokens: &[String]) -> Result<Vec<u32>> {
        tokens
            .iter()
            .map(|t| {
                self.inner
                    .token_to_id(t)
                    .ok_or_else(|| anyhow!("Token '{t}' is not in the wordpiece vocabulary"))
            })
            .collect()
    }

    fn convert_ids_to_tokens(&self, ids: &[u32]) -> Vec<String> {
        ids.iter()
            .map(|&id| self.inner.id_to_token(id).unwrap_or_else(|| UNK_TOKEN.to_string()))
            .collect()
    }
}

// ─── TokenizerStore ───────────────────────────────────────────────────────────
pub struct TokenizerStore {
    dir: PathBuf,
}

impl TokenizerStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(TOKENIZER_FILE)
    }

    /// Read `vocab.txt`, write `tokenizer.json` into the store and
    /// return the loaded tokenizer.
    pub fn build_from_vocab_file(&self, vocab_file: &Path, lowercase: bool) -> Result<BertTokenizer> {
        let text = std::fs::read_to_string(vocab_file)
            .with_context(|| format!("Cannot read vocab file '{}'", vocab_file.display()))?;
        let tokens: Vec<&str> = text.lines().map(|l| l.trim_end_matches(['\r', '\n'])).collect();

        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create '{}'", self.dir.display()))?;

        let json     = tokenizer_json(&tokens, lowercase)?;
        let tok_path = self.path();
        std::fs::write(&tok_path, serde_json::to_string_pretty(&json)?)
            .with_context(|| format!("Cannot write '{}'", tok_path.display()))?;

        tracing::info!(
            "Tokenizer built from '{}' ({} wordpieces, lowercase={}), saved to '{}'",
            vocab_file.display(),
            tokens.len(),
            lowercase,
            tok_path.display()
        );

        self.load()
    }

    /// Load a previously saved tokenizer.
    pub fn load(&self) -> Result<BertTokenizer> {
        let path = self.path();
        Tokenizer::from_file(&path)
            .map(BertTokenizer::new)
            .map_err(|e| anyhow!("Cannot load tokenizer from '{}': {}", path.display(), e))
    }
}

/// HuggingFace tokenizer JSON for a BERT wordpiece vocabulary.
fn tokenizer_json<S: AsRef<str>>(tokens: &[S], lowercase: bool) -> Result<serde_json::Value> {
    let mut vocab = serde_json::Map::new();
    for (id, token) in tokens.iter().enumerate() {
        let token = token.as_ref();
        if token.is_empty() {
            continue;
        }
        vocab.insert(token.to_string(), serde_json::json!(id));
    }

    if !vocab.contains_key(UNK_TOKEN) {
        bail!("Wordpiece vocabulary has no '{UNK_TOKEN}' entry");
    }

    // Markers stay ordinary vocab entries: a literal "[SEP]" in the
    // text is split like any other punctuation, never matched whole.
    Ok(serde_json::json!({
        "version": "1.0",
        "truncation": null,
        "padding": null,
        "added_tokens": [],
        "normalizer": {
            "type": "BertNormalizer",
            "clean_text": true,
            "handle_chinese_chars": true,
            "strip_accents": null,
            "lowercase": lowercase
        },
        "pre_tokenizer": { "type": "BertPreTokenizer" },
        "post_processor": null,
        "decoder": null,
        "model": {
            "type": "WordPiece",
            "unk_token": UNK_TOKEN,
            "continuing_subword_prefix": CONTINUATION_PREFIX,
            "max_input_chars_per_word": 100,
            "vocab": vocab
        }
    }))
}

/// Reject a lowercase setting that contradicts a well-known
/// pretrained checkpoint. The model name is the directory that
/// holds the checkpoint file; unknown names are accepted.
pub fn validate_case_matches_checkpoint(do_lower_case: bool, init_checkpoint: Option<&Path>) -> Result<()> {
    let Some(ckpt) = init_checkpoint else { return Ok(()) };
    let Some(model_name) = ckpt
        .parent()
        .and_then(|p| p.file_name())
        .and_then(|n| n.to_str())
    else {
        return Ok(());
    };

    if UNCASED_MODELS.contains(&model_name) && !do_lower_case {
        bail!(
            "You passed lowercase=false but '{model_name}' is an uncased model. \
             Enable lowercasing or use a cased checkpoint."
        );
    }
    if CASED_MODELS.contains(&model_name) && do_lower_case {
        bail!(
            "You passed lowercase=true but '{model_name}' is a cased model. \
             Disable lowercasing or use an uncased checkpoint."
        );
    }
    Ok(())
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Small vocabulary shared by converter and decoder tests.
    pub(crate) fn test_tokenizer() -> BertTokenizer {
        let vocab = [
            "[PAD]", "[UNK]", "[CLS]", "[SEP]", "[MASK]",
            "new", "york", "city", "play", "##ing", "the", "music", "loud", "##ly",
        ];
        BertTokenizer::from_vocab_tokens(&vocab, true).unwrap()
    }

    #[test]
    fn test_tokenize_splits_wordpieces() {
        let tok = test_tokenizer();
        assert_eq!(tok.tokenize("Playing loudly").unwrap(), vec!["play", "##ing", "loud", "##ly"]);
    }

    #[test]
    fn test_literal_marker_in_text_is_not_a_marker() {
        let tok = test_tokenizer();
        assert_eq!(
            tok.tokenize("new [SEP] city").unwrap(),
            vec!["new", "[UNK]", "[UNK]", "[UNK]", "city"],
        );
        let ids = tok.convert_tokens_to_ids(&tok.tokenize("[CLS]").unwrap()).unwrap();
        assert!(!ids.contains(&2));
    }

    #[test]
    fn test_unknown_word_becomes_unk() {
        let tok = test_tokenizer();
        assert_eq!(tok.tokenize("zebra").unwrap(), vec!["[UNK]"]);
    }

    #[test]
    fn test_ids_roundtrip_through_vocab() {
        let tok    = test_tokenizer();
        let tokens = vec!["[CLS]".to_string(), "new".to_string(), "[SEP]".to_string()];
        let ids    = tok.convert_tokens_to_ids(&tokens).unwrap();
        assert_eq!(ids, vec![2, 5, 3]);
        assert_eq!(tok.convert_ids_to_tokens(&ids), tokens);
        assert_eq!(tok.convert_ids_to_tokens(&[999]), vec!["[UNK]"]);
    }

    #[test]
    fn test_vocab_without_unk_is_rejected() {
        assert!(BertTokenizer::from_vocab_tokens(&["[CLS]", "a"], true).is_err());
    }

    #[test]
    fn test_case_validation() {
        let uncased = Path::new("models/uncased_L-12_H-768_A-12/bert_model.mpk");
        let cased   = Path::new("models/cased_L-12_H-768_A-12/bert_model.mpk");
        let custom  = Path::new("models/my_encoder/encoder.mpk");

        assert!(validate_case_matches_checkpoint(true, Some(uncased)).is_ok());
        assert!(validate_case_matches_checkpoint(false, Some(uncased)).is_err());
        assert!(validate_case_matches_checkpoint(true, Some(cased)).is_err());
        assert!(validate_case_matches_checkpoint(false, Some(custom)).is_ok());
        assert!(validate_case_matches_checkpoint(false, None).is_ok());
    }
}
