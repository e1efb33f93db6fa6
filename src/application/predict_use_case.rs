// ============================================================
// Layer 2 — PredictUseCase
// ============================================================
// Labels the test split with the newest checkpoint and writes
// `{output_dir}/predict.{tag}.json`:
//
//   Step 1: Open the session
//   Step 2: Load test examples, pad the final batch if asked
//   Step 3: Convert to features (labels optional)
//   Step 4: Restore the model and run it
//   Step 5: Drop padding rows, decode, write JSON

use anyhow::Result;
use burn::{
    backend::{NdArray, Wgpu},
    prelude::*,
};
use std::path::PathBuf;

use crate::application::config::{BackendKind, RunConfig};
use crate::application::session::{Phase, Session};
use crate::data::{dataset::pad_to_batch_multiple, decoder::decode_predictions};
use crate::domain::example::InputExample;
use crate::domain::traits::ExampleSource;
use crate::infra::output::write_pretty_json;
use crate::ml::inferencer::Inferencer;

pub struct PredictUseCase {
    config: RunConfig,
}

impl PredictUseCase {
    pub fn new(config: RunConfig) -> Self {
        Self { config }
    }

    /// Returns the path of the written predictions file.
    pub fn execute(&self) -> Result<PathBuf> {
        match self.config.backend {
            BackendKind::Wgpu    => self.run::<Wgpu>(&Default::default()),
            BackendKind::NdArray => self.run::<NdArray>(&Default::default()),
        }
    }

    fn run<B: Backend>(&self, device: &B::Device) -> Result<PathBuf> {
        let cfg = &self.config;

        // ── Step 1 ────────────────────────────────────────────────────────────
        let session = Session::open(cfg.clone(), Phase::Predict)?;

        // ── Step 2 ────────────────────────────────────────────────────────────
        let mut examples: Vec<InputExample> = session.corpus
            .test_examples()?
            .into_iter()
            .map(InputExample::from)
            .collect();
        let real_count = examples.len();
        if cfg.pad_final_batch {
            examples = pad_to_batch_multiple(examples, cfg.predict_batch_size).0;
        }
        tracing::info!(
            "Predict examples: {} ({} real, {} padding)",
            examples.len(), real_count,
            examples.iter().filter(|e| e.is_padding()).count(),
        );

        // ── Step 3 ────────────────────────────────────────────────────────────
        let features = session.features(&examples)?;

        // ── Step 4 ────────────────────────────────────────────────────────────
        let model      = session.restore_model::<B>(device)?;
        let inferencer = Inferencer::new(model, device.clone());
        let raw        = inferencer.predict(features.clone(), cfg.predict_batch_size)?;

        // ── Step 5 ────────────────────────────────────────────────────────────
        let records = decode_predictions(
            &features[..real_count],
            &raw[..real_count],
            &session.vocabs,
            &session.tokenizer,
        )?;

        let path = cfg.output_dir.join(format!("predict.{}.json", cfg.resolved_predict_tag()));
        write_pretty_json(&records, &path)?;
        tracing::info!("Wrote {} predictions", records.len());
        Ok(path)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::session::tests::{cleanup, scratch_run};
    use crate::application::train_use_case::TrainUseCase;

    #[test]
    fn test_predict_after_train_writes_one_record_per_example() {
        let cfg = RunConfig {
            pad_final_batch:    true,
            predict_batch_size: 4,
            predict_tag:        Some("unit".into()),
            ..scratch_run("predict")
        };
        TrainUseCase::new(cfg.clone()).execute().unwrap();

        let path = PredictUseCase::new(cfg.clone()).execute().unwrap();
        assert_eq!(path, cfg.output_dir.join("predict.unit.json"));

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("[\n    {"));

        let records: Vec<serde_json::Value> = serde_json::from_str(&text).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0]["text"], "play the music loudly");
        assert_eq!(records[1]["text"], "new york");
        assert!(records[2]["intent_label"].is_null());
        assert_eq!(records[0]["intent_probs"].as_array().unwrap().len(), 5);
        assert_eq!(records[0]["topic_probs"].as_array().unwrap().len(), 4);
        assert_eq!(records[0]["ability_probs"].as_array().unwrap().len(), 3);
        assert_eq!(records[0]["sent_embed"].as_array().unwrap().len(), 8);
        cleanup(&cfg);
    }
}
