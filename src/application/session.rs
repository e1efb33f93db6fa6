// ============================================================
// Layer 2 — Session
// ============================================================
// Shared set-up for every phase:
//
//   Step 1: Validate the run config
//   Step 2: Check lowercase flag against the checkpoint name
//   Step 3: Read the encoder config, check max_seq_len fits
//   Step 4: Build or load the wordpiece tokenizer
//   Step 5: Load the three label vocabularies
//
// It also owns the two ways of getting a model: a fresh one for
// training (optionally seeded from --init-checkpoint) and a
// restored one from the newest checkpoint in output_dir.

use anyhow::{bail, Context, Result};
use burn::prelude::*;

use crate::application::config::RunConfig;
use crate::data::{
    converter::FeatureConverter,
    dataset::Feature,
    loader::JsonCorpus,
};
use crate::domain::example::InputExample;
use crate::domain::label::{LabelKind, LabelVocabs};
use crate::infra::checkpoint::{load_encoder, CheckpointManager};
use crate::infra::tokenizer_store::{validate_case_matches_checkpoint, BertTokenizer, TokenizerStore};
use crate::ml::encoder::EncoderConfig;
use crate::ml::model::{ClassifierConfig, IntentClassifier};

/// Which phase the session serves; decides how the tokenizer is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Train,
    Eval,
    Predict,
    Export,
}

pub struct Session {
    pub config:         RunConfig,
    pub encoder_config: EncoderConfig,
    pub tokenizer:      BertTokenizer,
    pub vocabs:         LabelVocabs,
    pub corpus:         JsonCorpus,
    pub checkpoints:    CheckpointManager,
}

impl Session {
    pub fn open(config: RunConfig, phase: Phase) -> Result<Self> {
        // ── Step 1 + 2 ────────────────────────────────────────────────────────
        config.validate()?;
        validate_case_matches_checkpoint(config.do_lower_case, config.init_checkpoint.as_deref())?;

        // ── Step 3: Encoder config ────────────────────────────────────────────
        let encoder_config = EncoderConfig::from_bert_json(&config.bert_config_file)?;
        if config.max_seq_len > encoder_config.max_position_embeddings {
            bail!(
                "Cannot use sequence length {} because the encoder was only trained up to sequence length {}",
                config.max_seq_len, encoder_config.max_position_embeddings,
            );
        }

        // ── Step 4: Tokenizer ─────────────────────────────────────────────────
        let checkpoints = CheckpointManager::new(&config.output_dir)?;
        let store = TokenizerStore::new(&config.output_dir);
        let tokenizer = if phase != Phase::Train && store.path().exists() {
            tracing::info!("Loading tokenizer from '{}'", store.path().display());
            store.load()?
        } else {
            store.build_from_vocab_file(&config.vocab_file, config.do_lower_case)?
        };
        if tokenizer.vocab_size() > encoder_config.vocab_size {
            bail!(
                "Wordpiece vocabulary has {} entries but the encoder only embeds {}",
                tokenizer.vocab_size(), encoder_config.vocab_size,
            );
        }

        // ── Step 5: Label vocabularies ────────────────────────────────────────
        let corpus = JsonCorpus::new(&config.data_dir, &config.task_name);
        let vocabs = corpus.label_vocabs()?;
        for kind in LabelKind::ALL {
            tracing::info!("{} labels: {}", kind, vocabs.get(kind).len());
        }

        Ok(Self { config, encoder_config, tokenizer, vocabs, corpus, checkpoints })
    }

    /// Architecture for the current vocabularies.
    pub fn classifier_config(&self) -> ClassifierConfig {
        let [intents, topics, abilities] = self.vocabs.sizes();
        ClassifierConfig::new(self.encoder_config.clone(), intents, topics, abilities)
    }

    pub fn converter(&self) -> Result<FeatureConverter<'_, BertTokenizer>> {
        FeatureConverter::new(&self.vocabs, &self.tokenizer, self.config.max_seq_len)
    }

    pub fn features(&self, examples: &[InputExample]) -> Result<Vec<Feature>> {
        self.converter()?.convert_all(examples)
    }

    /// Build a model for training. Encoder weights come from
    /// --init-checkpoint when given; heads always start fresh.
    pub fn fresh_model<B: Backend>(&self, device: &B::Device) -> Result<IntentClassifier<B>> {
        let cfg = self.classifier_config();
        let mut model: IntentClassifier<B> = cfg.init(device);

        match &self.config.init_checkpoint {
            Some(path) => {
                model.encoder = load_encoder(model.encoder, path, device)?;
            }
            None => tracing::warn!("No --init-checkpoint given; encoder starts from random weights"),
        }

        self.checkpoints.save_config(&cfg)?;
        Ok(model)
    }

    /// Rebuild the trained model from output_dir. Falls back to the
    /// init checkpoint (with untrained heads) when nothing was trained.
    pub fn restore_model<B: Backend>(&self, device: &B::Device) -> Result<IntentClassifier<B>> {
        if !self.checkpoints.has_checkpoint() {
            let Some(path) = &self.config.init_checkpoint else {
                bail!(
                    "No trained checkpoint in '{}' and no --init-checkpoint given",
                    self.checkpoints.dir().display(),
                );
            };
            tracing::warn!("No trained checkpoint in '{}'; heads are untrained", self.checkpoints.dir().display());
            let mut model: IntentClassifier<B> = self.classifier_config().init(device);
            model.encoder = load_encoder(model.encoder, path, device)?;
            return Ok(model);
        }

        let saved = self.checkpoints.load_config()?;
        let expected = self.classifier_config();
        let (have, want) = (encoder_dims(&saved.encoder), encoder_dims(&expected.encoder));
        if have != want {
            bail!(
                "Checkpoint encoder (vocab, hidden, layers, heads, ffn, positions) = {:?} but --bert-config-file gives {:?}",
                have, want,
            );
        }
        for kind in LabelKind::ALL {
            if saved.num_labels(kind) != expected.num_labels(kind) {
                bail!(
                    "Checkpoint has {} {} labels but the vocabulary has {}",
                    saved.num_labels(kind), kind, expected.num_labels(kind),
                );
            }
        }

        let model: IntentClassifier<B> = saved.init(device);
        self.checkpoints
            .load_model(model, device)
            .context("Checkpoint does not match the saved classifier config")
    }
}

fn encoder_dims(cfg: &EncoderConfig) -> [usize; 6] {
    [
        cfg.vocab_size,
        cfg.hidden_size,
        cfg.num_hidden_layers,
        cfg.num_attention_heads,
        cfg.intermediate_size,
        cfg.max_position_embeddings,
    ]
}

/// Fail on the first real example that lacks any of the three labels.
pub fn require_labels(examples: &[InputExample], phase: &str) -> Result<()> {
    for example in examples {
        if let InputExample::Real(ex) = example {
            if !ex.is_labelled() {
                bail!("Example {} has no labels; every {phase} example needs intent, topic and ability labels", ex.id);
            }
        }
    }
    Ok(())
}
