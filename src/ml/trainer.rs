// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Step-driven fine-tuning with AdamW and a warmup + linear
// decay schedule. Training stops after exactly
// `num_train_steps` optimiser updates, re-shuffling the data
// at the start of every pass.
//
// Per step:
//   loss  = L_intent + L_topic + L_ability
//   grads = backward(loss), clipped to global norm 1.0
//   θ     = AdamW(θ, grads, lr_at(step))
//
// A checkpoint is written every `save_checkpoints_steps` steps
// and once more at the end if the last step was not on the
// boundary.
//
// Reference: Burn Book §5, Loshchilov & Hutter (2019) AdamW

use anyhow::{bail, Result};
use burn::{
    data::dataloader::DataLoaderBuilder,
    grad_clipping::GradientClippingConfig,
    optim::{AdamWConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::data::{
    batcher::{ClassifierBatch, ClassifierBatcher},
    dataset::{Feature, FeatureDataset},
};
use crate::infra::checkpoint::CheckpointManager;
use crate::infra::metrics::{MetricsLogger, PassMetrics};
use crate::ml::model::IntentClassifier;
use crate::ml::schedule::WarmupLinearDecay;

const LOG_EVERY_STEPS: usize = 100;

#[derive(Debug, Clone)]
pub struct TrainSettings {
    pub batch_size:             usize,
    pub schedule:               WarmupLinearDecay,
    pub save_checkpoints_steps: usize,
    pub seed:                   u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrainSummary {
    pub global_step:  usize,
    pub passes:       usize,
    pub final_loss:   f64,
}

pub fn run_training<B: AutodiffBackend>(
    mut model:    IntentClassifier<B>,
    dataset:      FeatureDataset,
    settings:     &TrainSettings,
    ckpt_manager: &CheckpointManager,
    metrics:      &MetricsLogger,
    device:       &B::Device,
) -> Result<(IntentClassifier<B>, TrainSummary)> {
    let total_steps = settings.schedule.total_steps();
    if total_steps == 0 {
        bail!(
            "Nothing to train: {} examples at batch size {} give 0 training steps",
            dataset.feature_count(), settings.batch_size,
        );
    }

    tracing::info!("***** Running training *****");
    tracing::info!("  Num examples = {}", dataset.feature_count());
    tracing::info!("  Batch size = {}", settings.batch_size);
    tracing::info!("  Num steps = {}", total_steps);
    tracing::info!("  Warmup steps = {}", settings.schedule.warmup_steps());

    // ── AdamW optimiser ───────────────────────────────────────────────────────
    // β1 = 0.9, β2 = 0.999, ε = 1e-6, weight decay 0.01
    let mut optim = AdamWConfig::new()
        .with_beta_1(0.9)
        .with_beta_2(0.999)
        .with_epsilon(1e-6)
        .with_weight_decay(0.01)
        .with_grad_clipping(Some(GradientClippingConfig::Norm(1.0)))
        .init();

    let loader = DataLoaderBuilder::<B, Feature, ClassifierBatch<B>>::new(ClassifierBatcher::new())
        .batch_size(settings.batch_size)
        .shuffle(settings.seed)
        .num_workers(1)
        .set_device(device.clone())
        .build(dataset);

    let save_every     = settings.save_checkpoints_steps.max(1);
    let mut step       = 0usize;
    let mut passes     = 0usize;
    let mut last_saved = None;
    let mut final_loss = f64::NAN;

    // ── Step loop ─────────────────────────────────────────────────────────────
    while step < total_steps {
        passes += 1;
        let mut loss_sum = 0.0f64;
        let mut batches  = 0usize;
        let mut lr       = 0.0f64;

        for batch in loader.iter() {
            if step >= total_steps {
                break;
            }

            let (loss, _) = model.forward_loss(&batch);
            let loss_val: f64 = loss.clone().into_scalar().elem::<f64>();
            if !loss_val.is_finite() {
                bail!("Loss became {loss_val} at step {step}");
            }
            loss_sum += loss_val;
            batches  += 1;

            lr = settings.schedule.lr_at(step);
            let grads = GradientsParams::from_grads(loss.backward(), &model);
            model = optim.step(lr, model, grads);
            step += 1;

            if step % LOG_EVERY_STEPS == 0 {
                tracing::info!("step {:>6}/{} | loss={:.4} | lr={:.3e}", step, total_steps, loss_val, lr);
            }
            if step % save_every == 0 {
                ckpt_manager.save_model(&model, step)?;
                last_saved = Some(step);
            }
        }

        if batches == 0 {
            bail!("Training data loader produced no batches");
        }

        final_loss = loss_sum / batches as f64;
        metrics.log(&PassMetrics::new(passes, step, final_loss, lr))?;
        tracing::info!("Pass {} | step {} | train_loss={:.4}", passes, step, final_loss);
    }

    if last_saved != Some(step) {
        ckpt_manager.save_model(&model, step)?;
    }

    tracing::info!("Training complete after {} steps; metrics in '{}'", step, metrics.csv_path().display());
    Ok((model, TrainSummary { global_step: step, passes, final_loss }))
}
