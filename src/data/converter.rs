// ============================================================
// Layer 4 — Example → Feature Converter
// ============================================================
// Turns one utterance into the fixed-length arrays the encoder
// consumes. For max_seq_len = 8 and "play the music loudly":
//
//   tokens:      [CLS] play the music loud ##ly [SEP] [PAD]
//   input_ids:   2     8    10  11    12   13   3     0
//   input_mask:  1     1    1   1     1    1    1     0
//   segment_ids: 0     0    0   0     0    0    0     0
//
// Single-sequence task, so every segment id is 0. Text longer
// than max_seq_len - 2 wordpieces is cut to make room for the
// two markers.
//
// Reference: Devlin et al. (2019) BERT, §3 input representation

use anyhow::{bail, Context, Result};

use crate::data::dataset::{Feature, LabelIds};
use crate::domain::example::{Example, InputExample};
use crate::domain::label::{LabelKind, LabelVocabs};
use crate::domain::traits::{WordpieceTokenizer, CLS_TOKEN, SEP_TOKEN};

// Detailed feature dumps for the first few examples only
const LOGGED_EXAMPLES: usize = 5;
const PROGRESS_EVERY: usize  = 10_000;

pub struct FeatureConverter<'a, T: WordpieceTokenizer> {
    vocabs:      &'a LabelVocabs,
    tokenizer:   &'a T,
    max_seq_len: usize,
}

impl<'a, T: WordpieceTokenizer> FeatureConverter<'a, T> {
    /// `max_seq_len` must leave room for [CLS] and [SEP].
    pub fn new(vocabs: &'a LabelVocabs, tokenizer: &'a T, max_seq_len: usize) -> Result<Self> {
        if max_seq_len < 2 {
            bail!("max_seq_len must be at least 2 to hold [CLS] and [SEP], got {max_seq_len}");
        }
        Ok(Self { vocabs, tokenizer, max_seq_len })
    }

    /// Convert every example, preserving input order.
    pub fn convert_all(&self, examples: &[InputExample]) -> Result<Vec<Feature>> {
        let mut features = Vec::with_capacity(examples.len());
        for (index, example) in examples.iter().enumerate() {
            if index % PROGRESS_EVERY == 0 {
                tracing::info!("Writing example {} of {}", index, examples.len());
            }
            features.push(self.convert(index, example)?);
        }
        Ok(features)
    }

    /// Convert a single example. `index` is only used for logging.
    pub fn convert(&self, index: usize, example: &InputExample) -> Result<Feature> {
        let example = match example {
            InputExample::Padding  => return Ok(Feature::padding(self.max_seq_len)),
            InputExample::Real(ex) => ex,
        };

        let label_ids = self.label_ids(example)?;

        let mut tokens = self.tokenizer
            .tokenize(&example.text)
            .with_context(|| format!("Cannot tokenize example {}", example.id))?;
        tokens.truncate(self.max_seq_len - 2);

        let mut input_tokens = Vec::with_capacity(tokens.len() + 2);
        input_tokens.push(CLS_TOKEN.to_string());
        input_tokens.extend(tokens.iter().cloned());
        input_tokens.push(SEP_TOKEN.to_string());

        let mut input_ids   = self.tokenizer.convert_tokens_to_ids(&input_tokens)?;
        let mut input_mask  = vec![1u32; input_ids.len()];
        let mut segment_ids = vec![0u32; input_ids.len()];

        input_ids.resize(self.max_seq_len, 0);
        input_mask.resize(self.max_seq_len, 0);
        segment_ids.resize(self.max_seq_len, 0);

        if index < LOGGED_EXAMPLES {
            tracing::info!("*** Example ***");
            tracing::info!("guid: {}", example.id);
            tracing::info!("tokens: {}", tokens.join(" "));
            tracing::info!("input_ids: {}", join_numbers(&input_ids));
            tracing::info!("input_mask: {}", join_numbers(&input_mask));
            tracing::info!("segment_ids: {}", join_numbers(&segment_ids));
            tracing::info!("label_ids: {:?}", label_ids);
        }

        Ok(Feature { input_ids, input_mask, segment_ids, label_ids })
    }

    fn label_ids(&self, example: &Example) -> Result<LabelIds> {
        let lookup = |kind: LabelKind| -> Result<Option<usize>> {
            example
                .label(kind)
                .map(|label| self.vocabs.get(kind).lookup(label))
                .transpose()
                .with_context(|| format!("Cannot convert example {}", example.id))
        };
        Ok(LabelIds {
            intent:  lookup(LabelKind::Intent)?,
            topic:   lookup(LabelKind::Topic)?,
            ability: lookup(LabelKind::Ability)?,
        })
    }
}

fn join_numbers(values: &[u32]) -> String {
    values.iter().map(u32::to_string).collect::<Vec<_>>().join(" ")
}
