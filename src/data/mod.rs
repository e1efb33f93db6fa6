// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything between JSON on disk and tensor batches, and the
// way back from model output to JSON:
//
//   {split}-{task}.json + *_label.vocab
//       │
//       ▼
//   JsonCorpus          → Examples + label vocabularies
//       │
//       ▼
//   FeatureConverter    → fixed-length ids / mask / segments
//       │
//       ▼
//   FeatureDataset      → implements Burn's Dataset trait
//       │
//       ▼
//   ClassifierBatcher   → stacks features into tensor batches
//       │
//       ▼
//   (model)             → RawPrediction per example
//       │
//       ▼
//   decoder             → PredictionRecord (labels + text)
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Reads JSON splits and label vocabularies
pub mod loader;

/// Example → Feature conversion
pub mod converter;

/// Feature type and Burn Dataset implementation
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;

/// Model output → readable prediction records
pub mod decoder;
