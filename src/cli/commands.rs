// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Four subcommands, one per phase. They all take the same
// flag group so a run can be trained, evaluated, used for
// prediction and exported with one set of flags.
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::application::config::{BackendKind, RunConfig};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fine-tune the classifier on the train split
    Train(RunArgs),

    /// Report loss and accuracy of the newest checkpoint on the dev split
    Eval(RunArgs),

    /// Label the test split and write predict.{tag}.json
    Predict(RunArgs),

    /// Write a serving bundle under --export-dir
    Export(RunArgs),
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// BERT config JSON describing the encoder architecture
    #[arg(long)]
    pub bert_config_file: PathBuf,

    /// Wordpiece vocabulary the encoder was trained with
    #[arg(long)]
    pub vocab_file: PathBuf,

    /// Directory with {split}-{task}/ data and resource/*_label.vocab
    #[arg(long)]
    pub data_dir: PathBuf,

    /// Task name used in the data file names
    #[arg(long, default_value = "intent")]
    pub task_name: String,

    /// Where checkpoints, tokenizer, metrics and results are written
    #[arg(long)]
    pub output_dir: PathBuf,

    /// Parent directory for exported bundles
    #[arg(long, default_value = "export")]
    pub export_dir: PathBuf,

    /// Encoder weights to start fine-tuning from
    #[arg(long)]
    pub init_checkpoint: Option<PathBuf>,

    /// Lowercase input text; must match the pretrained model
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub do_lower_case: bool,

    /// Seed for shuffling the training data
    #[arg(long, default_value_t = 100)]
    pub random_seed: u64,

    /// Suffix of the predictions file (default: current unix time)
    #[arg(long)]
    pub predict_tag: Option<String>,

    /// Total wordpieces per sequence, [CLS] and [SEP] included
    #[arg(long, default_value_t = 128)]
    pub max_seq_len: usize,

    #[arg(long, default_value_t = 32)]
    pub train_batch_size: usize,

    #[arg(long, default_value_t = 8)]
    pub eval_batch_size: usize,

    #[arg(long, default_value_t = 8)]
    pub predict_batch_size: usize,

    /// Peak learning rate for AdamW
    #[arg(long, default_value_t = 5e-5)]
    pub learning_rate: f64,

    #[arg(long, default_value_t = 3.0)]
    pub num_train_epochs: f64,

    /// Fraction of training steps spent warming up the learning rate
    #[arg(long, default_value_t = 0.1)]
    pub warmup_proportion: f64,

    #[arg(long, default_value_t = 1000)]
    pub save_checkpoints_steps: usize,

    /// Tensor backend
    #[arg(long, value_enum, default_value_t = BackendKind::Wgpu)]
    pub backend: BackendKind,

    /// Pad eval/predict input to a whole number of batches
    #[arg(long)]
    pub pad_final_batch: bool,
}

impl From<RunArgs> for RunConfig {
    fn from(a: RunArgs) -> Self {
        RunConfig {
            bert_config_file:       a.bert_config_file,
            vocab_file:             a.vocab_file,
            data_dir:               a.data_dir,
            task_name:              a.task_name,
            output_dir:             a.output_dir,
            export_dir:             a.export_dir,
            init_checkpoint:        a.init_checkpoint,
            do_lower_case:          a.do_lower_case,
            random_seed:            a.random_seed,
            predict_tag:            a.predict_tag,
            max_seq_len:            a.max_seq_len,
            train_batch_size:       a.train_batch_size,
            eval_batch_size:        a.eval_batch_size,
            predict_batch_size:     a.predict_batch_size,
            learning_rate:          a.learning_rate,
            num_train_epochs:       a.num_train_epochs,
            warmup_proportion:      a.warmup_proportion,
            save_checkpoints_steps: a.save_checkpoints_steps,
            backend:                a.backend,
            pad_final_batch:        a.pad_final_batch,
        }
    }
}
