// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction, built on `clap`.
// All pipeline work is delegated to Layer 2 (application).
//
// Three commands are supported:
//   1. `preprocess` — corpora → feature tables
//   2. `train`      — feature tables → trained model
//   3. `infer`      — trained model + test table → predictions
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, InferArgs, PreprocessArgs, TrainArgs};

#[derive(Parser, Debug)]
#[command(
    name = "squad-qa",
    version,
    about = "Preprocess SQuAD-style corpora, train an extractive Q&A model, and predict answer spans."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Match on the subcommand and dispatch to the matching use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Preprocess(args) => run_preprocess(args),
            Commands::Train(args)      => run_train(args),
            Commands::Infer(args)      => run_infer(args),
        }
    }
}

fn run_preprocess(args: PreprocessArgs) -> Result<()> {
    use crate::application::preprocess_use_case::PreprocessUseCase;

    tracing::info!("Preprocessing corpora in: {}", args.data_path);
    let save_path = args.save_path.clone();
    let summary   = PreprocessUseCase::new(args.into()).execute()?;

    println!(
        "Preprocessing complete: {} train, {} validation, {} test features in '{}'.",
        summary.train_features, summary.validation_features, summary.test_features, save_path,
    );
    Ok(())
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    tracing::info!("Starting training on features in: {}", args.file_path);
    let model_fn = args.model_fn.clone();
    let history  = TrainUseCase::new(args.into()).execute()?;

    if let Some(last) = history.last() {
        println!("Final epoch: exact={:.2} f1={:.2}", last.exact, last.f1);
    }
    println!("Training complete. Model saved to '{}'.", model_fn);
    Ok(())
}

fn run_infer(args: InferArgs) -> Result<()> {
    use crate::application::infer_use_case::InferUseCase;

    let output_file = args.output_file.clone();
    let predictions = InferUseCase::new(args.into()).execute()?;

    let answered = predictions.iter().filter(|p| !p.is_no_answer()).count();
    println!(
        "Wrote {} predictions ({} answered) to '{}'.",
        predictions.len(), answered, output_file,
    );
    Ok(())
}
