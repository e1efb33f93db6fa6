// ============================================================
// Layer 4 — Feature Dataset
// ============================================================
// A Feature is one converted example: wordpiece ids, mask and
// segment ids, all exactly `max_seq_len` long, plus the three
// label indices. FeatureDataset wraps a Vec<Feature> behind
// Burn's Dataset trait so the DataLoader can shuffle and batch
// it.
//
// `pad_to_batch_multiple` appends `InputExample::Padding` until
// the example count divides the batch size. Padding converts to
// an all-zero feature, which the heads mask out.
//
// Reference: Burn Book §4 (Dataset)

use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};

use crate::domain::example::InputExample;
use crate::domain::label::LabelKind;

/// Per-head class indices. `None` means the example carried no
/// gold label for that dimension (test data).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LabelIds {
    pub intent:  Option<usize>,
    pub topic:   Option<usize>,
    pub ability: Option<usize>,
}

impl LabelIds {
    /// Placeholder carried by alignment padding.
    pub fn padding() -> Self {
        Self { intent: Some(0), topic: Some(0), ability: Some(0) }
    }

    pub fn get(&self, kind: LabelKind) -> Option<usize> {
        match kind {
            LabelKind::Intent  => self.intent,
            LabelKind::Topic   => self.topic,
            LabelKind::Ability => self.ability,
        }
    }
}

/// One fully tokenised and padded example.
/// Sequence format: [CLS] tokens [SEP] [PAD]...
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub input_ids:   Vec<u32>,
    pub input_mask:  Vec<u32>,
    pub segment_ids: Vec<u32>,
    pub label_ids:   LabelIds,
}

impl Feature {
    /// The all-zero feature produced for `InputExample::Padding`.
    pub fn padding(max_seq_len: usize) -> Self {
        Self {
            input_ids:   vec![0; max_seq_len],
            input_mask:  vec![0; max_seq_len],
            segment_ids: vec![0; max_seq_len],
            label_ids:   LabelIds::padding(),
        }
    }

    pub fn seq_len(&self) -> usize {
        self.input_ids.len()
    }

    /// Number of real (non-pad) positions.
    #[cfg(test)]
    pub fn real_len(&self) -> usize {
        self.input_mask.iter().filter(|&&m| m != 0).count()
    }

    /// True when no position is attended to.
    #[cfg(test)]
    pub fn is_padding(&self) -> bool {
        self.real_len() == 0
    }
}

pub struct FeatureDataset {
    features: Vec<Feature>,
}

impl FeatureDataset {
    pub fn new(features: Vec<Feature>) -> Self { Self { features } }

    pub fn feature_count(&self) -> usize { self.features.len() }
}

impl Dataset<Feature> for FeatureDataset {
    fn get(&self, index: usize) -> Option<Feature> {
        self.features.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.features.len()
    }
}

/// Append `Padding` entries until the count is a multiple of
/// `batch_size`. Returns the padded list and the number of real
/// examples, which callers use to drop padded rows from output.
pub fn pad_to_batch_multiple(
    mut examples: Vec<InputExample>,
    batch_size:   usize,
) -> (Vec<InputExample>, usize) {
    let real = examples.len();
    if batch_size > 0 {
        while examples.len() % batch_size != 0 {
            examples.push(InputExample::Padding);
        }
    }
    (examples, real)
}
