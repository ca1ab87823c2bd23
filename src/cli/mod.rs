// ============================================================
// Layer 1 - CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction, parsed with clap.
// Business logic is delegated to Layer 2 (application).
//
// Three commands are supported:
//   1. `train`   - fit the network, writing checkpoints + logs
//   2. `predict` - score every pair of an archive
//   3. `score`   - rank candidates against a target patch
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::{Context, Result};
use clap::Parser;
use commands::{Commands, PredictArgs, ScoreArgs, TrainArgs};

use crate::application::{predict, ScoreCache, TrainUseCase};
use crate::backend::{backend_name, InferBackend, TrainBackend};
use crate::data::loader::read_score_data;
use crate::infra::session::Session;
use crate::ml::trainer::BurnFitter;

#[derive(Parser, Debug)]
#[command(
    name = "siamese-patch",
    version,
    about = "Train a siamese network on image patch pairs, then score candidate patches against a target."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Dispatch to the matching use case. Routing only.
    pub fn run(self) -> Result<()> {
        tracing::debug!("Running on the {} backend", backend_name());
        match self.command {
            Commands::Train(args)   => run_train(args),
            Commands::Predict(args) => run_predict(args),
            Commands::Score(args)   => run_score(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    let seed    = args.seed.unwrap_or_else(rand::random);
    let session = Session::<TrainBackend>::new(Default::default(), seed);

    let use_case = TrainUseCase::new(args.into());
    let history  = use_case
        .execute(&session, &mut BurnFitter::new(&session))
        .context("training failed")?;

    match history.last() {
        Some(last) => println!(
            "Training complete after {} epoch(s): loss={:.4}, val_loss={}",
            history.len(),
            last.loss,
            last.val_loss.map(|v| format!("{v:.4}")).unwrap_or_else(|| "-".to_string()),
        ),
        None => println!("Training complete (0 epochs)."),
    }
    println!("Logs written to '{}'", use_case.config().log_save_path.display());
    Ok(())
}

fn run_predict(args: PredictArgs) -> Result<()> {
    let output  = args.output.clone();
    let session = Session::<InferBackend>::new(Default::default(), 0);

    let scores = predict(&session, &args.into()).context("prediction failed")?;

    match output {
        Some(path) => {
            ndarray_npy::write_npy(&path, &scores)
                .with_context(|| format!("cannot write scores to '{}'", path.display()))?;
            println!("Wrote {} scores to '{}'", scores.nrows(), path.display());
        }
        None => {
            for score in scores.column(0) {
                println!("{score}");
            }
        }
    }
    Ok(())
}

fn run_score(args: ScoreArgs) -> Result<()> {
    let session = Session::<InferBackend>::new(Default::default(), 0);

    let (target, candidates) = read_score_data(&args.data)
        .with_context(|| format!("cannot read '{}'", args.data.display()))?;

    let mut cache = ScoreCache::<InferBackend>::new(args.network.into());
    let scores = cache
        .calculate_scores(&session, &target, &candidates, &args.weight_path, args.output_mode)
        .context("scoring failed")?;

    for (i, score) in scores.iter().enumerate() {
        println!("{i}\t{score}");
    }
    Ok(())
}
