// ============================================================
// Layer 2 — ExportUseCase
// ============================================================
// Writes a self-contained serving bundle for the newest
// checkpoint:
//
//   {export_dir}/{secs}.{micros}/
//     model_step_{n}.*          ← full classifier weights
//     latest_step.json
//     classifier_config.json
//     encoder.*                 ← encoder only, usable as --init-checkpoint
//     tokenizer.json
//     {intent,topic,ability}_label.vocab
//     export_manifest.json      ← serving inputs and outputs
//
// The bundle directory is itself a valid output_dir, so it can
// be pointed at by `eval` or `predict` unchanged. An existing
// bundle directory is never written into.

use anyhow::{Context, Result};
use burn::{
    backend::{NdArray, Wgpu},
    prelude::*,
};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::application::config::{timestamp_tag, BackendKind, RunConfig};
use crate::application::session::{Phase, Session};
use crate::domain::label::LabelKind;
use crate::infra::{
    checkpoint::{save_encoder, CheckpointManager},
    output::write_pretty_json,
    tokenizer_store::TokenizerStore,
};
use crate::ml::model::ClassifierConfig;

const MANIFEST_FILE: &str = "export_manifest.json";

/// One named tensor at the serving boundary. `None` in `shape`
/// is the batch dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TensorSpec {
    pub name:  String,
    pub dtype: String,
    pub shape: Vec<Option<usize>>,
}

impl TensorSpec {
    fn new(name: impl Into<String>, dtype: &str, shape: Vec<Option<usize>>) -> Self {
        Self { name: name.into(), dtype: dtype.to_string(), shape }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportManifest {
    pub global_step:   usize,
    pub max_seq_len:   usize,
    pub do_lower_case: bool,
    pub inputs:        Vec<TensorSpec>,
    pub outputs:       Vec<TensorSpec>,
}

impl ExportManifest {
    pub fn new(cfg: &ClassifierConfig, max_seq_len: usize, do_lower_case: bool, global_step: usize) -> Self {
        let inputs = ["input_ids", "input_masks", "segment_ids"]
            .into_iter()
            .map(|name| TensorSpec::new(name, "int32", vec![None, Some(max_seq_len)]))
            .collect();

        let mut outputs = vec![
            TensorSpec::new("sent_embed", "float32", vec![None, Some(cfg.encoder.hidden_size)]),
        ];
        for kind in LabelKind::ALL {
            outputs.push(TensorSpec::new(format!("{kind}_probs"), "float32", vec![None, Some(cfg.num_labels(kind))]));
            outputs.push(TensorSpec::new(format!("{kind}_predict"), "int64", vec![None]));
            outputs.push(TensorSpec::new(format!("{kind}_score"), "float32", vec![None]));
        }

        Self { global_step, max_seq_len, do_lower_case, inputs, outputs }
    }
}

pub struct ExportUseCase {
    config: RunConfig,
}

impl ExportUseCase {
    pub fn new(config: RunConfig) -> Self {
        Self { config }
    }

    /// Returns the bundle directory.
    pub fn execute(&self) -> Result<PathBuf> {
        match self.config.backend {
            BackendKind::Wgpu    => self.run::<Wgpu>(&Default::default()),
            BackendKind::NdArray => self.run::<NdArray>(&Default::default()),
        }
    }

    fn run<B: Backend>(&self, device: &B::Device) -> Result<PathBuf> {
        let cfg     = &self.config;
        let session = Session::open(cfg.clone(), Phase::Export)?;
        let model   = session.restore_model::<B>(device)?;

        let (model_cfg, step) = if session.checkpoints.has_checkpoint() {
            (session.checkpoints.load_config()?, session.checkpoints.latest_step()?)
        } else {
            (session.classifier_config(), 0)
        };

        let dir    = create_bundle_dir(&cfg.export_dir, &timestamp_tag())?;
        let bundle = CheckpointManager::new(&dir)?;
        tracing::info!("Exporting step {} to '{}'", step, dir.display());

        bundle.save_config(&model_cfg)?;
        bundle.save_model(&model, step)?;
        save_encoder(&model.encoder, &dir.join("encoder"))?;

        let tokenizer_src = TokenizerStore::new(&cfg.output_dir).path();
        let tokenizer_dst = TokenizerStore::new(&dir).path();
        fs::copy(&tokenizer_src, &tokenizer_dst)
            .with_context(|| format!("Cannot copy '{}'", tokenizer_src.display()))?;

        for kind in LabelKind::ALL {
            let mut text = session.vocabs.get(kind).labels().join("\n");
            text.push('\n');
            let path = dir.join(kind.vocab_file_name());
            fs::write(&path, text).with_context(|| format!("Cannot write '{}'", path.display()))?;
        }

        let manifest = ExportManifest::new(&model_cfg, cfg.max_seq_len, cfg.do_lower_case, step);
        write_pretty_json(&manifest, &dir.join(MANIFEST_FILE))?;

        Ok(dir)
    }
}

/// Create `{export_dir}/{tag}`; fails if it already exists.
fn create_bundle_dir(export_dir: &Path, tag: &str) -> Result<PathBuf> {
    fs::create_dir_all(export_dir)
        .with_context(|| format!("Cannot create '{}'", export_dir.display()))?;
    let dir = export_dir.join(tag);
    fs::create_dir(&dir)
        .with_context(|| format!("Cannot create export bundle '{}'", dir.display()))?;
    Ok(dir)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::session::tests::{cleanup, scratch_run};
    use crate::application::train_use_case::TrainUseCase;
    use crate::ml::model::tests::tiny_classifier_config;

    #[test]
    fn test_manifest_shapes() {
        let m = ExportManifest::new(&tiny_classifier_config(), 128, true, 42);
        let names: Vec<&str> = m.inputs.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["input_ids", "input_masks", "segment_ids"]);
        assert!(m.inputs.iter().all(|s| s.shape == vec![None, Some(128)]));

        let topic = m.outputs.iter().find(|s| s.name == "topic_probs").unwrap();
        assert_eq!(topic.shape, vec![None, Some(4)]);
        assert_eq!(m.outputs.len(), 1 + 3 * 3);

        let json = serde_json::to_value(&m).unwrap();
        assert!(json["inputs"][0]["shape"][0].is_null());
    }

    #[test]
    fn test_export_bundle_is_a_usable_output_dir() {
        let cfg = scratch_run("export");
        TrainUseCase::new(cfg.clone()).execute().unwrap();

        let dir = ExportUseCase::new(cfg.clone()).execute().unwrap();
        for file in ["classifier_config.json", "latest_step.json", "tokenizer.json",
                     "intent_label.vocab", "topic_label.vocab", "ability_label.vocab", MANIFEST_FILE] {
            assert!(dir.join(file).exists(), "missing {file}");
        }

        let bundle = CheckpointManager::new(&dir).unwrap();
        assert_eq!(bundle.latest_step().unwrap(), 3);
        let vocab = fs::read_to_string(dir.join("ability_label.vocab")).unwrap();
        assert_eq!(vocab, "media\nsearch\nchat\n");

        let again = ExportUseCase::new(cfg.clone()).execute().unwrap();
        assert_ne!(again, dir);
        cleanup(&cfg);
    }

    #[test]
    fn test_existing_bundle_dir_is_not_reused() {
        let root = std::env::temp_dir().join(format!("export_clash_{}", std::process::id()));
        fs::remove_dir_all(&root).ok();

        let first = create_bundle_dir(&root, "1700000000.000001").unwrap();
        fs::write(first.join("latest_step.json"), "3").unwrap();

        let err = format!("{:#}", create_bundle_dir(&root, "1700000000.000001").unwrap_err());
        assert!(err.contains("Cannot create export bundle"), "{err}");
        assert_eq!(fs::read_to_string(first.join("latest_step.json")).unwrap(), "3");
        fs::remove_dir_all(&root).ok();
    }
}
