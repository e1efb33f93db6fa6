// ============================================================
// Layer 5 — Evaluator
// ============================================================
// Runs the classifier over a labelled dataset without gradients
// and reports the mean batch loss plus per-head accuracy.
//
// Accuracy only counts valid rows, so the padding appended by
// --pad-final-batch never inflates or deflates a score:
//
//   accuracy = Σ valid · [predict == gold] / Σ valid

use anyhow::{bail, Result};
use burn::{
    data::dataloader::DataLoaderBuilder,
    prelude::*,
};
use serde::{Deserialize, Serialize};

use crate::data::{
    batcher::{ClassifierBatch, ClassifierBatcher},
    dataset::{Feature, FeatureDataset},
};
use crate::domain::label::LabelKind;
use crate::ml::model::IntentClassifier;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvalReport {
    pub eval_loss:        f64,
    pub intent_accuracy:  f64,
    pub topic_accuracy:   f64,
    pub ability_accuracy: f64,
    /// Real (non-padding) examples scored
    pub num_examples:     usize,
    pub num_batches:      usize,
    /// Checkpoint the weights came from, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub global_step:      Option<usize>,
}

impl EvalReport {
    pub fn accuracy(&self, kind: LabelKind) -> f64 {
        match kind {
            LabelKind::Intent  => self.intent_accuracy,
            LabelKind::Topic   => self.topic_accuracy,
            LabelKind::Ability => self.ability_accuracy,
        }
    }
}

pub fn evaluate<B: Backend>(
    model:      &IntentClassifier<B>,
    dataset:    FeatureDataset,
    batch_size: usize,
    device:     &B::Device,
) -> Result<EvalReport> {
    tracing::info!("***** Running evaluation *****");
    tracing::info!("  Num features = {}", dataset.feature_count());
    tracing::info!("  Batch size = {}", batch_size);

    let loader = DataLoaderBuilder::<B, Feature, ClassifierBatch<B>>::new(ClassifierBatcher::new())
        .batch_size(batch_size)
        .num_workers(1)
        .set_device(device.clone())
        .build(dataset);

    let mut loss_sum    = 0.0f64;
    let mut batches     = 0usize;
    let mut valid_total = 0.0f64;
    let mut correct     = [0.0f64; 3];

    for batch in loader.iter() {
        let (loss, output) = model.forward_loss(&batch);
        loss_sum += loss.into_scalar().elem::<f64>();
        batches  += 1;

        valid_total += output.valid.clone().sum().into_scalar().elem::<f64>();

        for (slot, kind) in LabelKind::ALL.iter().enumerate() {
            let hits: f64 = output.head(*kind).predict_ids.clone()
                .equal(batch.label_ids(*kind))
                .int()
                .float()
                .mul(output.valid.clone())
                .sum()
                .into_scalar()
                .elem::<f64>();
            correct[slot] += hits;
        }
    }

    if batches == 0 {
        bail!("Evaluation data loader produced no batches");
    }

    let accuracy = |slot: usize| {
        if valid_total > 0.0 { correct[slot] / valid_total } else { 0.0 }
    };

    let report = EvalReport {
        eval_loss:        loss_sum / batches as f64,
        intent_accuracy:  accuracy(0),
        topic_accuracy:   accuracy(1),
        ability_accuracy: accuracy(2),
        num_examples:     valid_total.round() as usize,
        num_batches:      batches,
        global_step:      None,
    };

    tracing::info!("***** Eval results *****");
    tracing::info!("  eval_loss = {:.4}", report.eval_loss);
    for kind in LabelKind::ALL {
        tracing::info!("  {}_accuracy = {:.4}", kind, report.accuracy(kind));
    }
    Ok(report)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::model::tests::{feature, tiny_classifier_config};
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_padding_rows_do_not_count() {
        let device = Default::default();
        let model: IntentClassifier<TestBackend> = tiny_classifier_config().init(&device);

        let dataset = FeatureDataset::new(vec![
            feature(&[2, 5, 3], (1, 2, 0)),
            feature(&[2, 7, 3], (3, 1, 2)),
            feature(&[2, 8, 3], (0, 0, 1)),
            Feature::padding(6),
        ]);

        let report = evaluate(&model, dataset, 2, &device).unwrap();
        assert_eq!(report.num_examples, 3);
        assert_eq!(report.num_batches, 2);
        assert!(report.eval_loss.is_finite());
        for kind in LabelKind::ALL {
            let acc = report.accuracy(kind);
            assert!((0.0..=1.0).contains(&acc));
            // Three real rows → accuracy is a multiple of 1/3
            let thirds = acc * 3.0;
            assert!((thirds - thirds.round()).abs() < 1e-9);
        }
    }

    #[test]
    fn test_empty_dataset_is_an_error() {
        let device = Default::default();
        let model: IntentClassifier<TestBackend> = tiny_classifier_config().init(&device);
        assert!(evaluate(&model, FeatureDataset::new(vec![]), 4, &device).is_err());
    }
}
