// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All Burn model and optimisation code lives here.
//
//   encoder.rs    — BERT-shaped encoder: token, position and
//                   segment embeddings, masked self-attention
//                   blocks, tanh pooler
//
//   head.rs       — masked classification head and loss,
//                   shared by all three label families
//
//   model.rs      — encoder + intent / topic / ability heads
//
//   schedule.rs   — linear warmup then linear decay
//
//   trainer.rs    — step loop: forward, summed loss, backward,
//                   AdamW update, periodic checkpoints
//
//   evaluator.rs  — loss and per-head accuracy on labelled data
//
//   inferencer.rs — per-example embeddings, probabilities and
//                   predicted ids, in input order
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)
//            Devlin et al. (2019) BERT

/// BERT encoder and its configuration
pub mod encoder;

/// Masked classification head and loss
pub mod head;

/// Three-head intent classifier
pub mod model;

/// Warmup + linear decay learning-rate schedule
pub mod schedule;

/// Step-driven training loop with checkpointing
pub mod trainer;

/// Evaluation loop
pub mod evaluator;

/// Batched prediction
pub mod inferencer;
