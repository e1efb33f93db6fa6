// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Everything that touches the output directory on disk:
//
//   checkpoint.rs      — classifier weights per step, the
//                        classifier config, encoder-only
//                        records for --init-checkpoint
//
//   tokenizer_store.rs — builds the wordpiece tokenizer from
//                        vocab.txt and keeps tokenizer.json
//                        beside the checkpoints
//
//   metrics.rs         — per-pass training metrics CSV
//
//   output.rs          — four-space indented JSON writer for
//                        predictions, eval results, manifests
//
// Reference: Burn Book §5 (Checkpointing)

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Wordpiece tokenizer building, saving, and loading
pub mod tokenizer_store;

/// Training metrics CSV logger
pub mod metrics;

/// Pretty JSON result files
pub mod output;
