// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Parses arguments with clap and routes each subcommand to its
// use case in Layer 2. Printing the final outcome is the only
// work done here.
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, RunArgs};

use crate::application::{
    eval_use_case::EvalUseCase,
    export_use_case::ExportUseCase,
    predict_use_case::PredictUseCase,
    train_use_case::TrainUseCase,
};

#[derive(Parser, Debug)]
#[command(
    name = "multihead-intent",
    version = "0.1.0",
    about = "Fine-tune a BERT encoder with intent, topic and ability heads."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)   => run_train(args),
            Commands::Eval(args)    => run_eval(args),
            Commands::Predict(args) => run_predict(args),
            Commands::Export(args)  => run_export(args),
        }
    }
}

fn run_train(args: RunArgs) -> Result<()> {
    tracing::info!("Starting training on data in: {}", args.data_dir.display());
    let summary = TrainUseCase::new(args.into()).execute()?;
    println!(
        "Training complete: {} steps over {} passes, final train_loss={:.4}",
        summary.global_step, summary.passes, summary.final_loss,
    );
    Ok(())
}

fn run_eval(args: RunArgs) -> Result<()> {
    let report = EvalUseCase::new(args.into()).execute()?;
    println!(
        "eval_loss={:.4} | intent_acc={:.1}% | topic_acc={:.1}% | ability_acc={:.1}% | n={}",
        report.eval_loss,
        report.intent_accuracy * 100.0,
        report.topic_accuracy * 100.0,
        report.ability_accuracy * 100.0,
        report.num_examples,
    );
    Ok(())
}

fn run_predict(args: RunArgs) -> Result<()> {
    let path = PredictUseCase::new(args.into()).execute()?;
    println!("Predictions written to {}", path.display());
    Ok(())
}

fn run_export(args: RunArgs) -> Result<()> {
    let dir = ExportUseCase::new(args.into()).execute()?;
    println!("Exported to {}", dir.display());
    Ok(())
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::config::{BackendKind, RunConfig};

    fn parse(extra: &[&str]) -> Cli {
        let mut argv = vec![
            "multihead-intent", "predict",
            "--bert-config-file", "bert/bert_config.json",
            "--vocab-file", "bert/vocab.txt",
            "--data-dir", "data",
            "--output-dir", "out",
        ];
        argv.extend_from_slice(extra);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults() {
        let Commands::Predict(args) = parse(&[]).command else { panic!("wrong subcommand") };
        let cfg: RunConfig = args.into();
        assert_eq!(cfg.max_seq_len, 128);
        assert_eq!(cfg.predict_batch_size, 8);
        assert_eq!(cfg.random_seed, 100);
        assert!(cfg.do_lower_case);
        assert!(!cfg.pad_final_batch);
        assert_eq!(cfg.backend, BackendKind::Wgpu);
        assert_eq!(cfg.task_name, "intent");
    }

    #[test]
    fn test_overrides() {
        let cli = parse(&[
            "--do-lower-case", "false", "--backend", "ndarray",
            "--pad-final-batch", "--predict-tag", "v2", "--max-seq-len", "64",
        ]);
        let Commands::Predict(args) = cli.command else { panic!("wrong subcommand") };
        let cfg: RunConfig = args.into();
        assert!(!cfg.do_lower_case);
        assert_eq!(cfg.backend, BackendKind::NdArray);
        assert!(cfg.pad_final_batch);
        assert_eq!(cfg.predict_tag.as_deref(), Some("v2"));
        assert_eq!(cfg.max_seq_len, 64);
    }

    #[test]
    fn test_missing_required_path_is_rejected() {
        assert!(Cli::try_parse_from(["multihead-intent", "train", "--data-dir", "d"]).is_err());
    }
}
