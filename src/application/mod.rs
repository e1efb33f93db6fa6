// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// One use case per CLI subcommand. Each opens a Session for
// the shared set-up, then coordinates the data, ml and infra
// layers for its phase. No tensor maths here.
//
//   train   — fine-tune on the train split, checkpoint by step
//   eval    — loss + per-head accuracy on the dev split
//   predict — label the test split, write predict.{tag}.json
//   export  — serving bundle under export_dir/{timestamp}/
//
// Reference: Clean Architecture pattern

/// Run configuration and backend choice
pub mod config;

/// Shared per-phase set-up and model construction
pub mod session;

/// The training workflow
pub mod train_use_case;

/// The evaluation workflow
pub mod eval_use_case;

/// The prediction workflow
pub mod predict_use_case;

/// The export workflow
pub mod export_use_case;
