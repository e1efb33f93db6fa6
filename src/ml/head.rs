// ============================================================
// Layer 5 — Masked Classification Head
// ============================================================
// One head per label family (intent / topic / ability). All
// three share this code; only the number of classes differs.
//
// A row is "valid" when its input mask has at least one 1.
// Padding rows are forced onto a flat distribution and carry
// zero weight in the loss:
//
//   scores = Dropout(pooled · W + b)                [batch, n]
//   masked = scores · valid + MIN_FLOAT · (1 − valid)
//   probs  = softmax(masked)
//   loss   = Σ valid · nll(masked, label · valid) / max(Σ valid, 1)
//
// The max(·, 1) keeps an all-padding batch at loss 0 instead of
// 0 / 0.
//
// Reference: Glorot & Bengio (2010) for the kernel initialiser

use burn::{
    module::Param,
    nn::{Dropout, DropoutConfig, Initializer, Linear, LinearConfig},
    prelude::*,
    tensor::activation::softmax,
};

/// Large negative fill for scores of padding rows.
pub const MIN_FLOAT: f32 = -1e30;

#[derive(Config, Debug)]
pub struct ClassificationHeadConfig {
    pub d_input:    usize,
    pub num_labels: usize,
    #[config(default = 0.1)]
    pub dropout:    f64,
}

impl ClassificationHeadConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> ClassificationHead<B> {
        let mut dense = LinearConfig::new(self.d_input, self.num_labels)
            .with_initializer(Initializer::XavierUniform { gain: 1.0 })
            .init(device);
        dense.bias = Some(Param::from_tensor(Tensor::zeros([self.num_labels], device)));

        ClassificationHead {
            dense,
            dropout: DropoutConfig::new(self.dropout).init(),
        }
    }
}

#[derive(Module, Debug)]
pub struct ClassificationHead<B: Backend> {
    pub dense:   Linear<B>,
    pub dropout: Dropout,
}

/// Per-row output of one head.
#[derive(Debug, Clone)]
pub struct HeadOutput<B: Backend> {
    /// Scores after padding rows are masked — [batch, num_labels]
    pub masked_scores: Tensor<B, 2>,
    /// Softmax of the masked scores — [batch, num_labels]
    pub probs:         Tensor<B, 2>,
    /// Argmax class — [batch]
    pub predict_ids:   Tensor<B, 1, Int>,
    /// Probability of the argmax class — [batch]
    pub scores:        Tensor<B, 1>,
}

impl<B: Backend> ClassificationHead<B> {
    /// `pooled` is [batch, hidden]; `valid` is 1.0 / 0.0 per row, shape [batch].
    pub fn forward(&self, pooled: Tensor<B, 2>, valid: Tensor<B, 1>) -> HeadOutput<B> {
        let scores = self.dropout.forward(self.dense.forward(pooled));
        let [batch_size, num_labels] = scores.dims();

        let valid  = valid.reshape([batch_size, 1]).expand([batch_size, num_labels]);
        let masked = scores * valid.clone()
            + valid.neg().add_scalar(1.0).mul_scalar(MIN_FLOAT);

        let probs       = softmax(masked.clone(), 1);
        let predict_ids = probs.clone().argmax(1).flatten::<1>(0, 1);
        let scores      = probs.clone().max_dim(1).flatten::<1>(0, 1);

        HeadOutput { masked_scores: masked, probs, predict_ids, scores }
    }
}

/// Mean negative log-likelihood over valid rows.
///
/// `labels` of padding rows are multiplied by zero, so whatever they
/// hold is never looked up against the vocabulary.
pub fn masked_cross_entropy<B: Backend>(
    masked_scores: Tensor<B, 2>,
    labels:        Tensor<B, 1, Int>,
    valid:         Tensor<B, 1>,
) -> Tensor<B, 1> {
    let [batch_size, _] = masked_scores.dims();

    let targets = (labels.float() * valid.clone())
        .int()
        .reshape([batch_size, 1]);

    // Shift by the row max so fully masked rows stay finite
    let shifted   = masked_scores.clone() - masked_scores.max_dim(1);
    let log_probs = shifted.clone() - shifted.exp().sum_dim(1).log();

    let nll = log_probs.gather(1, targets).reshape([batch_size]).neg();

    let denominator = valid.clone().sum().clamp_min(1.0);
    (nll * valid).sum() / denominator
}

/// 1.0 for rows with any real token, else 0.0 — shape [batch].
pub fn valid_rows<B: Backend>(input_mask: Tensor<B, 2, Int>) -> Tensor<B, 1> {
    input_mask.max_dim(1).flatten::<1>(0, 1).clamp(0, 1).float()
}
