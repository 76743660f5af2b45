// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// This is the entry point for all user interaction.
// It uses the `clap` crate to parse command line arguments.
// All business logic is delegated to Layer 2 (application).
//
// Two commands are supported:
//   1. `train`   — trains the language model on a text corpus
//   2. `inspect` — prints how a corpus will be batched
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, InspectArgs, TrainArgs};

#[derive(Parser, Debug)]
#[command(
    name = "causal-lm-trainer",
    version,
    about = "Train a windowed causal transformer language model on a word-level corpus."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Dispatch to the matching use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)   => run_train(args),
            Commands::Inspect(args) => run_inspect(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    tracing::info!("Starting training on corpus in: {}", args.data_dir);
    let save_dir = args.save_dir.clone();

    TrainUseCase::new(args.into()).execute()?;

    println!("Training complete. Best model saved to '{save_dir}'.");
    Ok(())
}

fn run_inspect(args: InspectArgs) -> Result<()> {
    use crate::application::inspect_use_case::InspectUseCase;

    let bptt  = args.bptt;
    let stats = InspectUseCase::new(args.into()).execute()?;

    println!("vocabulary: {} words", stats.vocab_size);
    for s in &stats.splits {
        println!(
            "{:5}: {:>9} tokens → {:>7} × {:<3} matrix, {} windows of {}",
            s.name, s.tokens, s.timesteps, s.columns, s.windows_per_epoch, bptt,
        );
    }
    Ok(())
}
