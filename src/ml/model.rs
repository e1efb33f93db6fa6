// ============================================================
// Layer 5 — Multi-Head Intent Classifier
// ============================================================
// One shared encoder, three independent heads:
//
//                    ┌─ intent head  (n_intents)
//   BertEncoder ─────┼─ topic head   (n_topics)
//   pooled [b, h]    └─ ability head (n_abilities)
//
// Training loss is the plain sum of the three masked losses.
// The pooled vector is also returned as the sentence embedding.

use burn::prelude::*;

use crate::data::batcher::ClassifierBatch;
use crate::domain::label::LabelKind;
use crate::ml::encoder::{BertEncoder, EncoderConfig};
use crate::ml::head::{
    masked_cross_entropy, valid_rows, ClassificationHead, ClassificationHeadConfig, HeadOutput,
};

#[derive(Config, Debug)]
pub struct ClassifierConfig {
    pub encoder:       EncoderConfig,
    pub num_intents:   usize,
    pub num_topics:    usize,
    pub num_abilities: usize,
    #[config(default = 0.1)]
    pub head_dropout:  f64,
}

impl ClassifierConfig {
    pub fn num_labels(&self, kind: LabelKind) -> usize {
        match kind {
            LabelKind::Intent  => self.num_intents,
            LabelKind::Topic   => self.num_topics,
            LabelKind::Ability => self.num_abilities,
        }
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> IntentClassifier<B> {
        let hidden = self.encoder.hidden_size;
        let head = |kind: LabelKind| {
            ClassificationHeadConfig::new(hidden, self.num_labels(kind))
                .with_dropout(self.head_dropout)
                .init(device)
        };
        IntentClassifier {
            encoder: self.encoder.init(device),
            intent:  head(LabelKind::Intent),
            topic:   head(LabelKind::Topic),
            ability: head(LabelKind::Ability),
        }
    }
}

#[derive(Module, Debug)]
pub struct IntentClassifier<B: Backend> {
    pub encoder: BertEncoder<B>,
    pub intent:  ClassificationHead<B>,
    pub topic:   ClassificationHead<B>,
    pub ability: ClassificationHead<B>,
}

#[derive(Debug, Clone)]
pub struct ClassifierOutput<B: Backend> {
    /// Pooled encoder output — [batch, hidden]
    pub sent_embed: Tensor<B, 2>,
    /// 1.0 for real rows, 0.0 for padding rows — [batch]
    pub valid:      Tensor<B, 1>,
    pub intent:     HeadOutput<B>,
    pub topic:      HeadOutput<B>,
    pub ability:    HeadOutput<B>,
}

impl<B: Backend> ClassifierOutput<B> {
    pub fn head(&self, kind: LabelKind) -> &HeadOutput<B> {
        match kind {
            LabelKind::Intent  => &self.intent,
            LabelKind::Topic   => &self.topic,
            LabelKind::Ability => &self.ability,
        }
    }
}

impl<B: Backend> IntentClassifier<B> {
    pub fn head(&self, kind: LabelKind) -> &ClassificationHead<B> {
        match kind {
            LabelKind::Intent  => &self.intent,
            LabelKind::Topic   => &self.topic,
            LabelKind::Ability => &self.ability,
        }
    }

    pub fn forward(
        &self,
        input_ids:   Tensor<B, 2, Int>,
        input_mask:  Tensor<B, 2, Int>,
        segment_ids: Tensor<B, 2, Int>,
    ) -> ClassifierOutput<B> {
        let valid  = valid_rows(input_mask.clone());
        let pooled = self.encoder.forward(input_ids, input_mask, segment_ids);

        let run = |kind: LabelKind| self.head(kind).forward(pooled.clone(), valid.clone());
        let intent  = run(LabelKind::Intent);
        let topic   = run(LabelKind::Topic);
        let ability = run(LabelKind::Ability);

        ClassifierOutput { sent_embed: pooled, valid, intent, topic, ability }
    }

    pub fn forward_batch(&self, batch: &ClassifierBatch<B>) -> ClassifierOutput<B> {
        self.forward(
            batch.input_ids.clone(),
            batch.input_mask.clone(),
            batch.segment_ids.clone(),
        )
    }

    /// Total loss = intent + topic + ability.
    pub fn forward_loss(&self, batch: &ClassifierBatch<B>) -> (Tensor<B, 1>, ClassifierOutput<B>) {
        let output = self.forward_batch(batch);
        let head_loss = |kind: LabelKind| {
            masked_cross_entropy(
                output.head(kind).masked_scores.clone(),
                batch.label_ids(kind),
                output.valid.clone(),
            )
        };
        let loss = head_loss(LabelKind::Intent)
            + head_loss(LabelKind::Topic)
            + head_loss(LabelKind::Ability);
        (loss, output)
    }
}
