// ============================================================
// Layer 2 — EvalUseCase
// ============================================================
// Scores the newest checkpoint on the dev split and writes
// `{output_dir}/eval_results.json`.
//
//   Step 1: Open the session
//   Step 2: Load dev examples, pad the final batch if asked
//   Step 3: Convert to features (labels required)
//   Step 4: Restore the model
//   Step 5: Evaluate and write results

use anyhow::Result;
use burn::{
    backend::{NdArray, Wgpu},
    prelude::*,
};

use crate::application::config::{BackendKind, RunConfig};
use crate::application::session::{require_labels, Phase, Session};
use crate::data::dataset::{pad_to_batch_multiple, FeatureDataset};
use crate::domain::example::InputExample;
use crate::domain::traits::ExampleSource;
use crate::infra::output::write_pretty_json;
use crate::ml::evaluator::{evaluate, EvalReport};

const EVAL_RESULTS_FILE: &str = "eval_results.json";

pub struct EvalUseCase {
    config: RunConfig,
}

impl EvalUseCase {
    pub fn new(config: RunConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<EvalReport> {
        match self.config.backend {
            BackendKind::Wgpu    => self.run::<Wgpu>(&Default::default()),
            BackendKind::NdArray => self.run::<NdArray>(&Default::default()),
        }
    }

    fn run<B: Backend>(&self, device: &B::Device) -> Result<EvalReport> {
        let cfg = &self.config;

        // ── Step 1 ────────────────────────────────────────────────────────────
        let session = Session::open(cfg.clone(), Phase::Eval)?;

        // ── Step 2 ────────────────────────────────────────────────────────────
        let mut examples: Vec<InputExample> = session.corpus
            .dev_examples()?
            .into_iter()
            .map(InputExample::from)
            .collect();
        let real_count = examples.len();
        if cfg.pad_final_batch {
            examples = pad_to_batch_multiple(examples, cfg.eval_batch_size).0;
        }
        tracing::info!(
            "Eval examples: {} ({} real, {} padding)",
            examples.len(), real_count,
            examples.iter().filter(|e| e.is_padding()).count(),
        );

        // ── Step 3 ────────────────────────────────────────────────────────────
        require_labels(&examples, "eval")?;
        let features = session.features(&examples)?;

        // ── Step 4 ────────────────────────────────────────────────────────────
        let model = session.restore_model::<B>(device)?;

        // ── Step 5 ────────────────────────────────────────────────────────────
        let mut report = evaluate(&model, FeatureDataset::new(features), cfg.eval_batch_size, device)?;
        report.global_step = session.checkpoints.latest_step().ok();
        write_pretty_json(&report, &cfg.output_dir.join(EVAL_RESULTS_FILE))?;

        Ok(report)
    }
}
