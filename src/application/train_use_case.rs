// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates fine-tuning:
//
//   Step 1: Open the session           (config, tokenizer, vocabs)
//   Step 2: Load train examples        (Layer 4 - data)
//   Step 3: Convert to features        (Layer 4 - data)
//   Step 4: Derive the LR schedule     (Layer 5 - ml)
//   Step 5: Save run + model config    (Layer 6 - infra)
//   Step 6: Build the model            (Layer 5 - ml)
//   Step 7: Run the step loop          (Layer 5 - ml)
//
// Reference: Burn Book §5 (Training)

use anyhow::Result;
use burn::{
    backend::{Autodiff, NdArray, Wgpu},
    tensor::backend::AutodiffBackend,
};

use crate::application::config::{BackendKind, RunConfig};
use crate::application::session::{require_labels, Phase, Session};
use crate::data::dataset::FeatureDataset;
use crate::domain::example::InputExample;
use crate::domain::traits::ExampleSource;
use crate::infra::{metrics::MetricsLogger, output::write_pretty_json};
use crate::ml::schedule::WarmupLinearDecay;
use crate::ml::trainer::{run_training, TrainSettings, TrainSummary};

const RUN_CONFIG_FILE: &str = "run_config.json";

pub struct TrainUseCase {
    config: RunConfig,
}

impl TrainUseCase {
    pub fn new(config: RunConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<TrainSummary> {
        match self.config.backend {
            BackendKind::Wgpu    => self.run::<Autodiff<Wgpu>>(&Default::default()),
            BackendKind::NdArray => self.run::<Autodiff<NdArray>>(&Default::default()),
        }
    }

    fn run<B: AutodiffBackend>(&self, device: &B::Device) -> Result<TrainSummary> {
        let cfg = &self.config;
        tracing::info!("Using device: {:?}", device);

        // ── Step 1: Session ───────────────────────────────────────────────────
        let session = Session::open(cfg.clone(), Phase::Train)?;

        // ── Step 2: Train examples ────────────────────────────────────────────
        let examples: Vec<InputExample> = session.corpus
            .train_examples()?
            .into_iter()
            .map(InputExample::from)
            .collect();
        tracing::info!("Loaded {} training examples", examples.len());

        // ── Step 3: Features ──────────────────────────────────────────────────
        require_labels(&examples, "train")?;
        let features = session.features(&examples)?;

        // ── Step 4: Schedule ──────────────────────────────────────────────────
        let schedule = WarmupLinearDecay::from_epochs(
            cfg.learning_rate,
            features.len(),
            cfg.train_batch_size,
            cfg.num_train_epochs,
            cfg.warmup_proportion,
        );

        // ── Step 5: Record the run ────────────────────────────────────────────
        write_pretty_json(cfg, &cfg.output_dir.join(RUN_CONFIG_FILE))?;

        // ── Step 6: Model (also saves classifier_config.json) ─────────────────
        let model = session.fresh_model::<B>(device)?;

        // ── Step 7: Train ─────────────────────────────────────────────────────
        let settings = TrainSettings {
            batch_size:             cfg.train_batch_size,
            schedule,
            save_checkpoints_steps: cfg.save_checkpoints_steps,
            seed:                   cfg.random_seed,
        };
        let metrics = MetricsLogger::new(&cfg.output_dir)?;
        let (_, summary) = run_training(
            model,
            FeatureDataset::new(features),
            &settings,
            &session.checkpoints,
            &metrics,
            device,
        )?;

        Ok(summary)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::session::tests::{cleanup, scratch_run};

    #[test]
    fn test_train_writes_checkpoint_and_records() {
        let cfg = scratch_run("train");
        let summary = TrainUseCase::new(cfg.clone()).execute().unwrap();

        // 3 examples / batch 2 × 2 epochs → 3 steps
        assert_eq!(summary.global_step, 3);
        for file in ["run_config.json", "classifier_config.json", "latest_step.json", "metrics.csv", "tokenizer.json"] {
            assert!(cfg.output_dir.join(file).exists(), "missing {file}");
        }
        cleanup(&cfg);
    }

    #[test]
    fn test_train_rejects_unlabelled_examples() {
        let cfg = scratch_run("train_unlabelled");
        std::fs::write(
            cfg.data_dir.join("train-intent/train-intent.json"),
            r#"[{"id": 1, "text": "city"}]"#,
        ).unwrap();

        let err = format!("{:#}", TrainUseCase::new(cfg.clone()).execute().unwrap_err());
        assert!(err.contains("has no labels"));
        cleanup(&cfg);
    }
}
