// ============================================================
// Layer 5 — Inferencer
// ============================================================
// Runs the classifier over features in input order and copies
// each row's outputs back to plain vectors:
//
//   sent_embed [hidden]      — pooled encoder output
//   per head   predict_id, score, probs[n_labels]
//
// No shuffling and no loss: labels are not needed here.

use anyhow::{ensure, Result};
use burn::{
    data::dataloader::DataLoaderBuilder,
    prelude::*,
};

use crate::data::{
    batcher::{ClassifierBatch, ClassifierBatcher},
    dataset::{Feature, FeatureDataset},
    decoder::{RawHeadOutput, RawPrediction},
};
use crate::ml::head::HeadOutput;
use crate::ml::model::{ClassifierOutput, IntentClassifier};

pub struct Inferencer<B: Backend> {
    model:  IntentClassifier<B>,
    device: B::Device,
}

impl<B: Backend> Inferencer<B> {
    pub fn new(model: IntentClassifier<B>, device: B::Device) -> Self {
        Self { model, device }
    }

    /// One `RawPrediction` per feature, same order as the input.
    pub fn predict(&self, features: Vec<Feature>, batch_size: usize) -> Result<Vec<RawPrediction>> {
        let expected = features.len();
        tracing::info!("***** Running prediction *****");
        tracing::info!("  Num features = {}", expected);
        tracing::info!("  Batch size = {}", batch_size);

        let loader = DataLoaderBuilder::<B, Feature, ClassifierBatch<B>>::new(ClassifierBatcher::new())
            .batch_size(batch_size)
            .num_workers(1)
            .set_device(self.device.clone())
            .build(FeatureDataset::new(features));

        let mut predictions = Vec::with_capacity(expected);
        for batch in loader.iter() {
            let output = self.model.forward_batch(&batch);
            predictions.extend(rows(output)?);
        }

        ensure!(
            predictions.len() == expected,
            "Prediction produced {} rows for {} features",
            predictions.len(), expected,
        );
        Ok(predictions)
    }
}

fn to_f32<const D: usize, B: Backend>(t: Tensor<B, D>) -> Result<Vec<f32>> {
    t.into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|e| anyhow::anyhow!("Cannot read tensor data: {e:?}"))
}

fn head_rows<B: Backend>(head: HeadOutput<B>, batch_size: usize) -> Result<Vec<RawHeadOutput>> {
    let [_, num_labels] = head.probs.dims();
    let probs  = to_f32(head.probs)?;
    let scores = to_f32(head.scores)?;
    let ids: Vec<i64> = head.predict_ids
        .into_data()
        .convert::<i64>()
        .to_vec::<i64>()
        .map_err(|e| anyhow::anyhow!("Cannot read tensor data: {e:?}"))?;

    Ok((0..batch_size)
        .map(|row| RawHeadOutput {
            predict_id: ids[row] as usize,
            score:      scores[row],
            probs:      probs[row * num_labels..(row + 1) * num_labels].to_vec(),
        })
        .collect())
}

fn rows<B: Backend>(output: ClassifierOutput<B>) -> Result<Vec<RawPrediction>> {
    let [batch_size, hidden] = output.sent_embed.dims();
    let embeds  = to_f32(output.sent_embed)?;
    let intent  = head_rows(output.intent, batch_size)?;
    let topic   = head_rows(output.topic, batch_size)?;
    let ability = head_rows(output.ability, batch_size)?;

    Ok(intent
        .into_iter()
        .zip(topic)
        .zip(ability)
        .enumerate()
        .map(|(row, ((intent, topic), ability))| RawPrediction {
            sent_embed: embeds[row * hidden..(row + 1) * hidden].to_vec(),
            intent,
            topic,
            ability,
        })
        .collect())
}
