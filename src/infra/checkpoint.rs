// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores classifier weights with Burn's
// CompactRecorder, keyed by global training step.
//
// Output directory layout:
//   {output_dir}/
//     model_step_1000.*        ← weights after step 1000
//     model_step_2000.*
//     ...
//     latest_step.json         ← number of the newest checkpoint
//     classifier_config.json   ← encoder shape + head sizes
//
// The config is written before the first step so `eval`,
// `predict` and `export` can rebuild the exact architecture
// before loading weights into it.
//
// An encoder-only record (no heads) can be loaded from any path
// through `load_encoder`; this is how `--init-checkpoint` seeds
// fine-tuning.
//
// Burn's `load_record` neither checks shapes nor returns an error,
// so both loaders compare the record against the module they were
// handed: layer count before loading, every weight shape after.
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{anyhow, bail, Context, Result};
use burn::{
    prelude::*,
    record::{CompactRecorder, Recorder},
};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::domain::label::LabelKind;
use crate::ml::encoder::{BertEncoder, BertEncoderRecord};
use crate::ml::model::{ClassifierConfig, IntentClassifier, IntentClassifierRecord};

const LATEST_STEP_FILE: &str = "latest_step.json";
const CONFIG_FILE: &str      = "classifier_config.json";

pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Creates the directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create output directory '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn config_path(&self) -> PathBuf {
        self.dir.join(CONFIG_FILE)
    }

    /// Save weights for `step` and move the latest pointer to it.
    pub fn save_model<B: Backend>(&self, model: &IntentClassifier<B>, step: usize) -> Result<()> {
        // Recorder adds the file extension
        let path = self.dir.join(format!("model_step_{step}"));

        CompactRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .with_context(|| format!("Failed to save checkpoint to '{}'", path.display()))?;

        let latest_path = self.dir.join(LATEST_STEP_FILE);
        fs::write(&latest_path, serde_json::to_string(&step)?)
            .with_context(|| format!("Failed to write {LATEST_STEP_FILE}"))?;

        tracing::info!("Saved checkpoint for step {}", step);
        Ok(())
    }

    /// Load the newest checkpoint into `model`.
    /// Fails if the saved architecture differs from `model`.
    pub fn load_model<B: Backend>(
        &self,
        model:  IntentClassifier<B>,
        device: &B::Device,
    ) -> Result<IntentClassifier<B>> {
        let step = self.latest_step()?;
        let path = self.dir.join(format!("model_step_{step}"));

        tracing::info!("Loading checkpoint from step {}", step);

        let record: IntentClassifierRecord<B> = CompactRecorder::new()
            .load(path.clone(), device)
            .with_context(|| format!("Cannot load checkpoint '{}'", path.display()))?;
        check_layer_count(model.encoder.layers.len(), record.encoder.layers.len())
            .with_context(|| format!("Checkpoint '{}' does not fit the model", path.display()))?;

        let expected = classifier_shapes(&model);
        let loaded   = model.load_record(record);
        check_shapes(&expected, &classifier_shapes(&loaded))
            .with_context(|| format!("Checkpoint '{}' does not fit the model", path.display()))?;
        Ok(loaded)
    }

    pub fn has_checkpoint(&self) -> bool {
        self.dir.join(LATEST_STEP_FILE).exists() && self.config_path().exists()
    }

    pub fn latest_step(&self) -> Result<usize> {
        let path = self.dir.join(LATEST_STEP_FILE);
        let s = fs::read_to_string(&path).with_context(|| {
            format!("Cannot find '{}'. Have you run 'train' first?", path.display())
        })?;
        serde_json::from_str::<usize>(s.trim())
            .with_context(|| format!("Malformed '{}'", path.display()))
    }

    pub fn save_config(&self, cfg: &ClassifierConfig) -> Result<()> {
        let path = self.config_path();
        cfg.save(&path)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;
        tracing::debug!("Saved classifier config to '{}'", path.display());
        Ok(())
    }

    pub fn load_config(&self) -> Result<ClassifierConfig> {
        let path = self.config_path();
        ClassifierConfig::load(&path)
            .map_err(|e| anyhow!("Cannot read config from '{}': {e}", path.display()))
    }
}

/// Write the encoder alone, in the format `load_encoder` reads.
pub fn save_encoder<B: Backend>(encoder: &BertEncoder<B>, path: &Path) -> Result<()> {
    CompactRecorder::new()
        .record(encoder.clone().into_record(), path.to_path_buf())
        .with_context(|| format!("Failed to save encoder to '{}'", path.display()))
}

/// Load pre-trained encoder weights into a freshly built encoder.
pub fn load_encoder<B: Backend>(
    encoder: BertEncoder<B>,
    path:    &Path,
    device:  &B::Device,
) -> Result<BertEncoder<B>> {
    let record: BertEncoderRecord<B> = CompactRecorder::new()
        .load(path.to_path_buf(), device)
        .with_context(|| format!("Cannot load encoder checkpoint '{}'", path.display()))?;
    check_layer_count(encoder.layers.len(), record.layers.len())
        .with_context(|| format!("Encoder checkpoint '{}' does not match the encoder config", path.display()))?;

    let expected = encoder_shapes(&encoder);
    let loaded   = encoder.load_record(record);
    check_shapes(&expected, &encoder_shapes(&loaded))
        .with_context(|| format!("Encoder checkpoint '{}' does not match the encoder config", path.display()))?;

    tracing::info!("Initialised encoder from '{}'", path.display());
    Ok(loaded)
}

type Shapes = Vec<(String, Vec<usize>)>;

fn check_layer_count(expected: usize, found: usize) -> Result<()> {
    if expected != found {
        bail!("record has {found} encoder layers but the config expects {expected}");
    }
    Ok(())
}

fn check_shapes(expected: &[(String, Vec<usize>)], found: &[(String, Vec<usize>)]) -> Result<()> {
    for ((name, want), (_, got)) in expected.iter().zip(found) {
        if want != got {
            bail!("{name} has shape {got:?} but the config expects {want:?}");
        }
    }
    Ok(())
}

fn encoder_shapes<B: Backend>(encoder: &BertEncoder<B>) -> Shapes {
    let mut shapes = vec![
        ("word_embeddings".to_string(),       encoder.word_embeddings.weight.val().dims().to_vec()),
        ("position_embeddings".to_string(),   encoder.position_embeddings.weight.val().dims().to_vec()),
        ("token_type_embeddings".to_string(), encoder.token_type_embeddings.weight.val().dims().to_vec()),
        ("embedding_norm".to_string(),        encoder.embedding_norm.gamma.val().dims().to_vec()),
        ("pooler".to_string(),                encoder.pooler.weight.val().dims().to_vec()),
    ];
    for (i, layer) in encoder.layers.iter().enumerate() {
        shapes.push((format!("layer {i} query"),  layer.self_attn.query.weight.val().dims().to_vec()));
        shapes.push((format!("layer {i} output"), layer.self_attn.output.weight.val().dims().to_vec()));
        shapes.push((format!("layer {i} ffn_linear1"), layer.ffn_linear1.weight.val().dims().to_vec()));
        shapes.push((format!("layer {i} ffn_linear2"), layer.ffn_linear2.weight.val().dims().to_vec()));
    }
    shapes
}

fn classifier_shapes<B: Backend>(model: &IntentClassifier<B>) -> Shapes {
    let mut shapes = encoder_shapes(&model.encoder);
    for kind in LabelKind::ALL {
        shapes.push((format!("{kind} head"), model.head(kind).dense.weight.val().dims().to_vec()));
    }
    shapes
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::encoder::{tests::tiny_encoder_config, EncoderConfig};
    use crate::ml::model::tests::tiny_classifier_config;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("ckpt_{}_{}", name, std::process::id()));
        fs::remove_dir_all(&dir).ok();
        dir
    }

    fn weights(model: &IntentClassifier<TestBackend>) -> Vec<f32> {
        model.intent.dense.weight.val().into_data().convert::<f32>().to_vec().unwrap()
    }

    // Records are stored at half precision
    fn assert_close(a: &[f32], b: &[f32]) {
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b) {
            assert!((x - y).abs() < 1e-2, "{x} vs {y}");
        }
    }

    #[test]
    fn test_save_then_load_latest() {
        let dir    = scratch_dir("roundtrip");
        let device = Default::default();
        let ckpt   = CheckpointManager::new(&dir).unwrap();
        let cfg    = tiny_classifier_config();

        assert!(!ckpt.has_checkpoint());
        ckpt.save_config(&cfg).unwrap();

        let first: IntentClassifier<TestBackend>  = cfg.init(&device);
        let second: IntentClassifier<TestBackend> = cfg.init(&device);
        ckpt.save_model(&first, 10).unwrap();
        ckpt.save_model(&second, 20).unwrap();

        assert!(ckpt.has_checkpoint());
        assert_eq!(ckpt.latest_step().unwrap(), 20);

        let restored_cfg = ckpt.load_config().unwrap();
        assert_eq!(restored_cfg.num_topics, 4);
        assert_eq!(restored_cfg.encoder.hidden_size, cfg.encoder.hidden_size);

        let fresh: IntentClassifier<TestBackend> = restored_cfg.init(&device);
        let loaded = ckpt.load_model(fresh, &device).unwrap();
        assert_close(&weights(&loaded), &weights(&second));

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_missing_checkpoint_is_an_error() {
        let dir  = scratch_dir("missing");
        let ckpt = CheckpointManager::new(&dir).unwrap();
        let err  = format!("{:#}", ckpt.latest_step().unwrap_err());
        assert!(err.contains("Have you run 'train' first?"));
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_encoder_roundtrip() {
        let dir    = scratch_dir("encoder");
        let device = Default::default();
        fs::create_dir_all(&dir).unwrap();
        let cfg    = tiny_classifier_config();

        let source: IntentClassifier<TestBackend> = cfg.init(&device);
        save_encoder(&source.encoder, &dir.join("encoder")).unwrap();

        let target: IntentClassifier<TestBackend> = cfg.init(&device);
        let encoder = load_encoder(target.encoder, &dir.join("encoder"), &device).unwrap();

        let a: Vec<f32> = source.encoder.pooler.weight.val().into_data().convert::<f32>().to_vec().unwrap();
        let b: Vec<f32> = encoder.pooler.weight.val().into_data().convert::<f32>().to_vec().unwrap();
        assert_close(&a, &b);

        fs::remove_dir_all(&dir).ok();
    }

    /// Saves the tiny (hidden 8, one layer) encoder and returns its path.
    fn saved_tiny_encoder(dir: &Path) -> PathBuf {
        fs::create_dir_all(dir).unwrap();
        let encoder = tiny_encoder_config().init::<TestBackend>(&Default::default());
        let path = dir.join("encoder");
        save_encoder(&encoder, &path).unwrap();
        path
    }

    #[test]
    fn test_encoder_of_other_width_is_rejected() {
        let dir  = scratch_dir("encoder_width");
        let path = saved_tiny_encoder(&dir);

        let wider = EncoderConfig::new(16, 16, 1, 2, 32, 12).init::<TestBackend>(&Default::default());
        let err = format!("{:#}", load_encoder(wider, &path, &Default::default()).unwrap_err());
        assert!(err.contains("does not match the encoder config"), "{err}");
        assert!(err.contains("but the config expects [16, 16]"), "{err}");

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_encoder_of_other_depth_is_rejected() {
        let dir  = scratch_dir("encoder_depth");
        let path = saved_tiny_encoder(&dir);

        let deeper = EncoderConfig::new(16, 8, 2, 2, 16, 12).init::<TestBackend>(&Default::default());
        let err = format!("{:#}", load_encoder(deeper, &path, &Default::default()).unwrap_err());
        assert!(err.contains("record has 1 encoder layers but the config expects 2"), "{err}");

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_missing_or_corrupt_encoder_is_an_error() {
        let dir = scratch_dir("encoder_corrupt");
        fs::create_dir_all(&dir).unwrap();
        let encoder = || tiny_encoder_config().init::<TestBackend>(&Default::default());

        let err = format!("{:#}", load_encoder(encoder(), &dir.join("absent"), &Default::default()).unwrap_err());
        assert!(err.contains("Cannot load encoder checkpoint"), "{err}");

        fs::write(dir.join("garbage.mpk"), b"not a record").unwrap();
        assert!(load_encoder(encoder(), &dir.join("garbage"), &Default::default()).is_err());

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_checkpoint_with_other_head_size_is_rejected() {
        let dir    = scratch_dir("head_size");
        let device = Default::default();
        let ckpt   = CheckpointManager::new(&dir).unwrap();

        let saved: IntentClassifier<TestBackend> = tiny_classifier_config().init(&device);
        ckpt.save_model(&saved, 5).unwrap();

        let six_topics = ClassifierConfig::new(tiny_encoder_config(), 5, 6, 3);
        let target: IntentClassifier<TestBackend> = six_topics.init(&device);
        let err = format!("{:#}", ckpt.load_model(target, &device).unwrap_err());
        assert!(err.contains("does not fit the model"), "{err}");
        assert!(err.contains("topic head has shape [8, 4]"), "{err}");

        fs::remove_dir_all(&dir).ok();
    }
}
