// ============================================================
// Layer 4 — Classifier Batcher
// ============================================================
// Implements Burn's Batcher trait: stacks a Vec<Feature> into
// tensors of shape [batch_size, max_seq_len] for the sequences
// and [batch_size] for each head's label ids.
//
// All features are already padded to the same length, so
// batching is a flatten + reshape:
//   [f1_t1 .. f1_tL, f2_t1 .. fN_tL] → [N, L]
//
// A missing gold label (test data) is written as class 0. It
// never reaches a loss: `predict` computes no loss and
// `train`/`eval` reject unlabelled examples up front.
//
// Reference: Burn Book §4 (Batcher)

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::dataset::Feature;
use crate::domain::label::LabelKind;

/// A batch of features ready for the encoder.
#[derive(Debug, Clone)]
pub struct ClassifierBatch<B: Backend> {
    /// Wordpiece ids — shape: [batch_size, seq_len]
    pub input_ids: Tensor<B, 2, Int>,

    /// 1 = real token, 0 = padding — shape: [batch_size, seq_len]
    pub input_mask: Tensor<B, 2, Int>,

    /// All zero for single-sequence input — shape: [batch_size, seq_len]
    pub segment_ids: Tensor<B, 2, Int>,

    /// Gold class per head — shape: [batch_size] each
    pub intent_label_ids:  Tensor<B, 1, Int>,
    pub topic_label_ids:   Tensor<B, 1, Int>,
    pub ability_label_ids: Tensor<B, 1, Int>,
}

impl<B: Backend> ClassifierBatch<B> {
    pub fn label_ids(&self, kind: LabelKind) -> Tensor<B, 1, Int> {
        match kind {
            LabelKind::Intent  => self.intent_label_ids.clone(),
            LabelKind::Topic   => self.topic_label_ids.clone(),
            LabelKind::Ability => self.ability_label_ids.clone(),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ClassifierBatcher;

impl ClassifierBatcher {
    pub fn new() -> Self {
        Self
    }
}

impl<B: Backend> Batcher<B, Feature, ClassifierBatch<B>> for ClassifierBatcher {
    fn batch(&self, items: Vec<Feature>, device: &B::Device) -> ClassifierBatch<B> {
        let batch_size = items.len();
        // All sequences have the same length (pre-padded)
        let seq_len    = items.first().map(Feature::seq_len).unwrap_or(0);

        let seq_tensor = |select: fn(&Feature) -> &Vec<u32>| -> Tensor<B, 2, Int> {
            let flat: Vec<i32> = items
                .iter()
                .flat_map(|f| select(f).iter().map(|&x| x as i32))
                .collect();
            Tensor::<B, 1, Int>::from_ints(flat.as_slice(), device)
                .reshape([batch_size, seq_len])
        };

        let label_tensor = |kind: LabelKind| -> Tensor<B, 1, Int> {
            let ids: Vec<i32> = items
                .iter()
                .map(|f| f.label_ids.get(kind).unwrap_or(0) as i32)
                .collect();
            Tensor::<B, 1, Int>::from_ints(ids.as_slice(), device)
        };

        ClassifierBatch {
            input_ids:         seq_tensor(|f| &f.input_ids),
            input_mask:        seq_tensor(|f| &f.input_mask),
            segment_ids:       seq_tensor(|f| &f.segment_ids),
            intent_label_ids:  label_tensor(LabelKind::Intent),
            topic_label_ids:   label_tensor(LabelKind::Topic),
            ability_label_ids: label_tensor(LabelKind::Ability),
        }
    }
}
