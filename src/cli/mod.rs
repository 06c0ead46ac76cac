// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Parses arguments with clap and routes to Layer 2:
//
//   1. `train` — corpus → co-trained masker + learner
//   2. `mask`  — print the masker's picks for a sentence
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, MaskArgs, TrainArgs};

#[derive(Parser, Debug)]
#[command(
    name = "mask-co-learner",
    version = "0.1.0",
    about = "Train a masked language model whose masking policy is learned jointly with it."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args) => run_train(args),
            Commands::Mask(args)  => run_mask(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    tracing::info!("Starting training on documents in: {}", args.docs_dir);
    let checkpoint_dir = args.checkpoint_dir.clone();
    let history = TrainUseCase::new(args.into()).execute()?;

    if let Some(last) = history.last() {
        println!(
            "Training complete after {} epochs (val_loss={:.3}, ppl={:.3}). Checkpoints in '{}'.",
            last.epoch, last.val_loss, last.ppl, checkpoint_dir,
        );
    } else {
        println!("No epochs were run.");
    }
    Ok(())
}

fn run_mask(args: MaskArgs) -> Result<()> {
    use crate::application::mask_use_case::MaskUseCase;

    let use_case = MaskUseCase::open(&args.checkpoint_dir)?;
    let out = use_case.inspect(&args.sentence)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&out.report)?);
        return Ok(());
    }

    let picked: Vec<usize> = out.report.selected.iter().map(|p| p.position).collect();
    let rendered: Vec<String> = out
        .symbols
        .iter()
        .enumerate()
        .map(|(i, s)| if picked.contains(&i) { format!("[{s}]") } else { s.clone() })
        .collect();
    println!("\n{}\n", rendered.join(" "));

    for p in &out.report.selected {
        println!("  #{:<3} {:<20} p={:.4}", p.position, out.symbols[p.position], p.probability);
    }
    let d = &out.report.diagnostics;
    println!(
        "\nentropy={:.4} nats | top2_gap={:.5} | top5_gap={:.5}",
        d.entropy, d.top2_gap, d.top5_gap,
    );
    Ok(())
}
