// ============================================================
// Layer 2 — Run Configuration
// ============================================================
// Every setting of a single invocation. Built from CLI flags,
// validated once, then passed by reference to the phase that
// runs. `train` also writes it to `{output_dir}/run_config.json`
// as a record of the run.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Tensor backend used for the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// GPU through WGPU
    Wgpu,
    /// CPU through ndarray
    #[value(name = "ndarray")]
    NdArray,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub bert_config_file:       PathBuf,
    pub vocab_file:             PathBuf,
    pub data_dir:               PathBuf,
    pub task_name:              String,
    pub output_dir:             PathBuf,
    pub export_dir:             PathBuf,
    pub init_checkpoint:        Option<PathBuf>,
    pub do_lower_case:          bool,
    pub random_seed:            u64,
    pub predict_tag:            Option<String>,
    pub max_seq_len:            usize,
    pub train_batch_size:       usize,
    pub eval_batch_size:        usize,
    pub predict_batch_size:     usize,
    pub learning_rate:          f64,
    pub num_train_epochs:       f64,
    pub warmup_proportion:      f64,
    pub save_checkpoints_steps: usize,
    pub backend:                BackendKind,
    pub pad_final_batch:        bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            bert_config_file:       PathBuf::from("bert_config.json"),
            vocab_file:             PathBuf::from("vocab.txt"),
            data_dir:               PathBuf::from("data"),
            task_name:              "intent".to_string(),
            output_dir:             PathBuf::from("output"),
            export_dir:             PathBuf::from("export"),
            init_checkpoint:        None,
            do_lower_case:          true,
            random_seed:            100,
            predict_tag:            None,
            max_seq_len:            128,
            train_batch_size:       32,
            eval_batch_size:        8,
            predict_batch_size:     8,
            learning_rate:          5e-5,
            num_train_epochs:       3.0,
            warmup_proportion:      0.1,
            save_checkpoints_steps: 1000,
            backend:                BackendKind::Wgpu,
            pad_final_batch:        false,
        }
    }
}

impl RunConfig {
    /// Reject settings no phase can run with.
    pub fn validate(&self) -> Result<()> {
        if self.max_seq_len < 2 {
            bail!("max_seq_len must be at least 2 to hold [CLS] and [SEP], got {}", self.max_seq_len);
        }
        for (name, size) in [
            ("train_batch_size",   self.train_batch_size),
            ("eval_batch_size",    self.eval_batch_size),
            ("predict_batch_size", self.predict_batch_size),
            ("save_checkpoints_steps", self.save_checkpoints_steps),
        ] {
            if size == 0 {
                bail!("{name} must be positive");
            }
        }
        if !(0.0..=1.0).contains(&self.warmup_proportion) {
            bail!("warmup_proportion must be within [0, 1], got {}", self.warmup_proportion);
        }
        if self.num_train_epochs.is_nan() || self.num_train_epochs <= 0.0 {
            bail!("num_train_epochs must be positive, got {}", self.num_train_epochs);
        }
        if self.learning_rate <= 0.0 {
            bail!("learning_rate must be positive, got {}", self.learning_rate);
        }
        Ok(())
    }

    /// Tag for `predict.{tag}.json`: the given one, else the current unix time.
    pub fn resolved_predict_tag(&self) -> String {
        match &self.predict_tag {
            Some(tag) => tag.clone(),
            None => timestamp_tag(),
        }
    }
}

/// `{secs}.{micros}` wall-clock tag, used for prediction files and
/// export bundles.
pub fn timestamp_tag() -> String {
    let now = unix_now();
    format!("{}.{:06}", now.as_secs(), now.subsec_micros())
}

fn unix_now() -> std::time::Duration {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(RunConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_short_max_seq_len() {
        let cfg = RunConfig { max_seq_len: 1, ..RunConfig::default() };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_batch_size() {
        let cfg = RunConfig { eval_batch_size: 0, ..RunConfig::default() };
        let err = cfg.validate().unwrap_err().to_string();
        assert!(err.contains("eval_batch_size"));
    }

    #[test]
    fn test_predict_tag() {
        let cfg = RunConfig { predict_tag: Some("dev1".into()), ..RunConfig::default() };
        assert_eq!(cfg.resolved_predict_tag(), "dev1");

        let generated = RunConfig::default().resolved_predict_tag();
        let (secs, micros) = generated.split_once('.').unwrap();
        assert!(secs.parse::<u64>().unwrap() > 1_600_000_000);
        assert_eq!(micros.len(), 6);
    }

    #[test]
    fn test_backend_serialises_lowercase() {
        let json = serde_json::to_string(&BackendKind::NdArray).unwrap();
        assert_eq!(json, "\"ndarray\"");
    }
}
