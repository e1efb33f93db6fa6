// ============================================================
// Layer 5 — BERT Encoder
// ============================================================
// Shared body under the three classification heads:
//
//   token emb + position emb + segment emb
//       → LayerNorm → Dropout
//       → N × EncoderBlock (self-attention + GELU FFN)
//       → first position → Linear → tanh   (pooled output)
//
// Padding positions are masked out of attention using the
// input mask, so a short utterance pools the same way
// whatever max_seq_len is.
//
// Reference: Devlin et al. (2019) BERT
//            Vaswani et al. (2017) Attention Is All You Need

use anyhow::{Context, Result};
use burn::{
    nn::{
        attention::{MhaInput, MultiHeadAttention, MultiHeadAttentionConfig},
        Dropout, DropoutConfig,
        Embedding, EmbeddingConfig,
        LayerNorm, LayerNormConfig,
        Linear, LinearConfig,
    },
    prelude::*,
};
use serde::Deserialize;
use std::path::Path;

// Persisted inside classifier_config.json alongside the head sizes.
#[derive(Config, Debug)]
pub struct EncoderConfig {
    pub vocab_size:              usize,
    pub hidden_size:             usize,
    pub num_hidden_layers:       usize,
    pub num_attention_heads:     usize,
    pub intermediate_size:       usize,
    pub max_position_embeddings: usize,
    #[config(default = 2)]
    pub type_vocab_size:         usize,
    #[config(default = 0.1)]
    pub hidden_dropout_prob:     f64,
    #[config(default = 0.1)]
    pub attention_probs_dropout_prob: f64,
    #[config(default = 1e-12)]
    pub layer_norm_eps:          f64,
}

/// Subset of a BERT `bert_config.json` the encoder understands.
/// Other keys (hidden_act, initializer_range, ...) are ignored.
#[derive(Deserialize)]
struct BertConfigFile {
    vocab_size:                   usize,
    hidden_size:                  usize,
    num_hidden_layers:            usize,
    num_attention_heads:          usize,
    intermediate_size:            usize,
    max_position_embeddings:      usize,
    type_vocab_size:              Option<usize>,
    hidden_dropout_prob:          Option<f64>,
    attention_probs_dropout_prob: Option<f64>,
    layer_norm_eps:               Option<f64>,
}

impl EncoderConfig {
    /// Read a BERT-format config file.
    pub fn from_bert_json(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read encoder config '{}'", path.display()))?;
        let file: BertConfigFile = serde_json::from_str(&json)
            .with_context(|| format!("Malformed encoder config '{}'", path.display()))?;

        let mut cfg = EncoderConfig::new(
            file.vocab_size, file.hidden_size, file.num_hidden_layers,
            file.num_attention_heads, file.intermediate_size, file.max_position_embeddings,
        );
        if let Some(v) = file.type_vocab_size              { cfg = cfg.with_type_vocab_size(v); }
        if let Some(v) = file.hidden_dropout_prob          { cfg = cfg.with_hidden_dropout_prob(v); }
        if let Some(v) = file.attention_probs_dropout_prob { cfg = cfg.with_attention_probs_dropout_prob(v); }
        if let Some(v) = file.layer_norm_eps               { cfg = cfg.with_layer_norm_eps(v); }
        Ok(cfg)
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> BertEncoder<B> {
        let word_embeddings       = EmbeddingConfig::new(self.vocab_size, self.hidden_size).init(device);
        let position_embeddings   = EmbeddingConfig::new(self.max_position_embeddings, self.hidden_size).init(device);
        let token_type_embeddings = EmbeddingConfig::new(self.type_vocab_size, self.hidden_size).init(device);
        let embedding_norm = LayerNormConfig::new(self.hidden_size)
            .with_epsilon(self.layer_norm_eps)
            .init(device);
        let layers: Vec<EncoderBlock<B>> = (0..self.num_hidden_layers)
            .map(|_| self.build_encoder_block(device))
            .collect();
        let pooler  = LinearConfig::new(self.hidden_size, self.hidden_size).init(device);
        let dropout = DropoutConfig::new(self.hidden_dropout_prob).init();
        BertEncoder {
            word_embeddings, position_embeddings, token_type_embeddings,
            embedding_norm, layers, pooler, dropout,
        }
    }

    fn build_encoder_block<B: Backend>(&self, device: &B::Device) -> EncoderBlock<B> {
        let self_attn = MultiHeadAttentionConfig::new(self.hidden_size, self.num_attention_heads)
            .with_dropout(self.attention_probs_dropout_prob)
            .init(device);
        let ffn_linear1 = LinearConfig::new(self.hidden_size, self.intermediate_size).init(device);
        let ffn_linear2 = LinearConfig::new(self.intermediate_size, self.hidden_size).init(device);
        let norm1   = LayerNormConfig::new(self.hidden_size).with_epsilon(self.layer_norm_eps).init(device);
        let norm2   = LayerNormConfig::new(self.hidden_size).with_epsilon(self.layer_norm_eps).init(device);
        let dropout = DropoutConfig::new(self.hidden_dropout_prob).init();
        EncoderBlock { self_attn, ffn_linear1, ffn_linear2, norm1, norm2, dropout }
    }
}

#[derive(Module, Debug)]
pub struct EncoderBlock<B: Backend> {
    pub self_attn:   MultiHeadAttention<B>,
    pub ffn_linear1: Linear<B>,
    pub ffn_linear2: Linear<B>,
    pub norm1:       LayerNorm<B>,
    pub norm2:       LayerNorm<B>,
    pub dropout:     Dropout,
}

impl<B: Backend> EncoderBlock<B> {
    /// `mask_pad` is true at padding positions, which receive no attention.
    pub fn forward(&self, x: Tensor<B, 3>, mask_pad: Tensor<B, 2, Bool>) -> Tensor<B, 3> {
        let attn_input  = MhaInput::self_attn(x.clone()).mask_pad(mask_pad);
        let attn_output = self.self_attn.forward(attn_input).context;
        let x = self.norm1.forward(x + self.dropout.forward(attn_output));
        let ffn_out = self.ffn_linear2.forward(
            burn::tensor::activation::gelu(self.ffn_linear1.forward(x.clone()))
        );
        self.norm2.forward(x + self.dropout.forward(ffn_out))
    }
}

/// BERT-shaped encoder producing one pooled vector per sequence.
#[derive(Module, Debug)]
pub struct BertEncoder<B: Backend> {
    pub word_embeddings:       Embedding<B>,
    pub position_embeddings:   Embedding<B>,
    pub token_type_embeddings: Embedding<B>,
    pub embedding_norm:        LayerNorm<B>,
    pub layers:                Vec<EncoderBlock<B>>,
    pub pooler:                Linear<B>,
    pub dropout:               Dropout,
}

impl<B: Backend> BertEncoder<B> {
    /// All inputs [batch, seq_len] → pooled embedding [batch, hidden].
    pub fn forward(
        &self,
        input_ids:   Tensor<B, 2, Int>,
        input_mask:  Tensor<B, 2, Int>,
        segment_ids: Tensor<B, 2, Int>,
    ) -> Tensor<B, 2> {
        let [batch_size, seq_len] = input_ids.dims();
        let device = input_ids.device();

        let positions = Tensor::<B, 1, Int>::arange(0..seq_len as i64, &device)
            .unsqueeze::<2>()
            .expand([batch_size, seq_len]);

        let embeddings = self.word_embeddings.forward(input_ids)
            + self.position_embeddings.forward(positions)
            + self.token_type_embeddings.forward(segment_ids);
        let mut x = self.dropout.forward(self.embedding_norm.forward(embeddings));

        let mask_pad = input_mask.equal_elem(0);
        for layer in &self.layers {
            x = layer.forward(x, mask_pad.clone());
        }

        // Pool on the [CLS] position
        let [_, _, hidden] = x.dims();
        let first = x.slice([0..batch_size, 0..1, 0..hidden]).reshape([batch_size, hidden]);
        self.pooler.forward(first).tanh()
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    pub(crate) fn tiny_encoder_config() -> EncoderConfig {
        EncoderConfig::new(16, 8, 1, 2, 16, 12)
    }

    #[test]
    fn test_pooled_shape_and_range() {
        let device  = Default::default();
        let encoder: BertEncoder<TestBackend> = tiny_encoder_config().init(&device);

        let ids  = Tensor::<TestBackend, 1, Int>::from_ints([2, 5, 3, 0, 2, 3, 0, 0], &device).reshape([2, 4]);
        let mask = Tensor::<TestBackend, 1, Int>::from_ints([1, 1, 1, 0, 1, 1, 0, 0], &device).reshape([2, 4]);
        let segs = Tensor::<TestBackend, 2, Int>::zeros([2, 4], &device);

        let pooled = encoder.forward(ids, mask, segs);
        assert_eq!(pooled.dims(), [2, 8]);

        let values: Vec<f32> = pooled.into_data().convert::<f32>().to_vec().unwrap();
        assert!(values.iter().all(|v| v.is_finite() && v.abs() <= 1.0));
    }

    #[test]
    fn test_reads_bert_config_json() {
        let path = std::env::temp_dir().join(format!("bert_config_{}.json", std::process::id()));
        std::fs::write(&path, r#"{
            "attention_probs_dropout_prob": 0.0, "hidden_act": "gelu",
            "hidden_dropout_prob": 0.1, "hidden_size": 768, "initializer_range": 0.02,
            "intermediate_size": 3072, "max_position_embeddings": 512,
            "num_attention_heads": 12, "num_hidden_layers": 12,
            "type_vocab_size": 2, "vocab_size": 30522
        }"#).unwrap();

        let cfg = EncoderConfig::from_bert_json(&path).unwrap();
        assert_eq!(cfg.hidden_size, 768);
        assert_eq!(cfg.max_position_embeddings, 512);
        assert_eq!(cfg.attention_probs_dropout_prob, 0.0);
        assert_eq!(cfg.layer_norm_eps, 1e-12);

        std::fs::remove_file(&path).ok();
    }
}
