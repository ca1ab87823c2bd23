// ============================================================
// Layer 1 - CLI Commands and Arguments
// ============================================================
// Defines the three subcommands, `train`, `predict` and
// `score`, and their flags.
//
// Loss and output-mode codes are parsed into their enums by
// clap, so a bad code is reported as a usage error before
// anything runs.
//
// Reference: Rust Book §12 (Building a CLI Program)

use std::path::PathBuf;
use clap::{Args, Subcommand};

use crate::application::{PredictConfig, TrainConfig};
use crate::domain::modes::{LossKind, OutputMode};
use crate::infra::checkpoint::DEFAULT_WEIGHT_TEMPLATE;
use crate::ml::model::SiameseNetworkConfig;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train the siamese network on a pair archive
    Train(TrainArgs),

    /// Score every pair in an archive with trained weights
    Predict(PredictArgs),

    /// Score candidate patches against a target patch
    Score(ScoreArgs),
}

fn parse_loss(code: &str) -> Result<LossKind, String> {
    code.parse().map_err(|e: crate::error::SiameseError| e.to_string())
}

fn parse_output_mode(code: &str) -> Result<OutputMode, String> {
    code.parse().map_err(|e: crate::error::SiameseError| e.to_string())
}

/// Architecture flags. Prediction and scoring must use the
/// values the weights were trained with.
#[derive(Args, Debug, Clone)]
pub struct NetworkArgs {
    /// Channels per patch (1 = grayscale, 3 = RGB)
    #[arg(long, default_value_t = 1)]
    pub channels: usize,

    #[arg(long, default_value_t = 32)]
    pub conv1_filters: usize,

    #[arg(long, default_value_t = 64)]
    pub conv2_filters: usize,

    /// Length of the vector each patch is encoded to
    #[arg(long, default_value_t = 128)]
    pub embedding_dim: usize,
}

impl From<NetworkArgs> for SiameseNetworkConfig {
    fn from(a: NetworkArgs) -> Self {
        SiameseNetworkConfig::new()
            .with_channels(a.channels)
            .with_conv1_filters(a.conv1_filters)
            .with_conv2_filters(a.conv2_filters)
            .with_embedding_dim(a.embedding_dim)
    }
}

#[derive(Args, Debug)]
pub struct TrainArgs {
    /// .npz archive with `left`, `right` and `label`
    #[arg(long)]
    pub train_data: Option<PathBuf>,

    /// e = euclidean distance, c = cosine similarity, l = logit
    #[arg(long, default_value = "e", value_parser = parse_output_mode)]
    pub output_mode: OutputMode,

    /// c = contrastive (labels 0 match / 1 non-match),
    /// l = logistic (labels +1 match / -1 non-match)
    #[arg(long, default_value = "c", value_parser = parse_loss)]
    pub loss: LossKind,

    #[arg(long, default_value_t = 5)]
    pub epochs: usize,

    #[arg(long, default_value_t = 1)]
    pub batch_size: usize,

    #[arg(long, default_value_t = 0.001)]
    pub lr: f64,

    /// Validation archive; without it `--val-ratio` of the
    /// training pairs is held out
    #[arg(long)]
    pub val_data: Option<PathBuf>,

    /// Weights to resume from
    #[arg(long)]
    pub weight_path: Option<PathBuf>,

    #[arg(long, default_value_t = 0.2)]
    pub val_ratio: f64,

    /// Checkpoint path template, e.g. `ckpt/{epoch:02d}-{val_loss:.2f}`
    #[arg(long, default_value = DEFAULT_WEIGHT_TEMPLATE)]
    pub weight_save_path: String,

    /// Directory for graph.json, train_config.json and metrics.csv
    #[arg(long, default_value = "log")]
    pub log_save_path: PathBuf,

    /// Stop once the monitored loss stops improving
    #[arg(long)]
    pub early_stopping: bool,

    /// Seed for weight init and shuffling (random when omitted)
    #[arg(long)]
    pub seed: Option<u64>,

    #[command(flatten)]
    pub network: NetworkArgs,
}

/// The application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            train_data:       a.train_data,
            output_mode:      a.output_mode,
            loss:             a.loss,
            epochs:           a.epochs,
            batch_size:       a.batch_size,
            learning_rate:    a.lr,
            val_data:         a.val_data,
            weight_path:      a.weight_path,
            val_ratio:        a.val_ratio,
            weight_save_path: a.weight_save_path,
            log_save_path:    a.log_save_path,
            early_stopping:   a.early_stopping,
            network:          a.network.into(),
        }
    }
}

#[derive(Args, Debug)]
pub struct PredictArgs {
    /// .npz archive with `left` and `right`
    #[arg(long)]
    pub data: Option<PathBuf>,

    /// Weight file written during training
    #[arg(long)]
    pub weight_path: PathBuf,

    #[arg(long, default_value = "e", value_parser = parse_output_mode)]
    pub output_mode: OutputMode,

    #[arg(long, default_value_t = 32)]
    pub batch_size: usize,

    /// Write scores to this .npy file instead of printing them
    #[arg(long)]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub network: NetworkArgs,
}

impl From<PredictArgs> for PredictConfig {
    fn from(a: PredictArgs) -> Self {
        PredictConfig {
            output_mode: a.output_mode,
            weight_path: a.weight_path,
            data_path:   a.data,
            batch_size:  a.batch_size,
            network:     a.network.into(),
        }
    }
}

#[derive(Args, Debug)]
pub struct ScoreArgs {
    /// .npz archive with a `target` patch and a `candidates` stack
    #[arg(long)]
    pub data: PathBuf,

    #[arg(long)]
    pub weight_path: PathBuf,

    #[arg(long, default_value = "e", value_parser = parse_output_mode)]
    pub output_mode: OutputMode,

    #[command(flatten)]
    pub network: NetworkArgs,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    #[test]
    fn test_train_defaults() {
        let cli = Cli::try_parse_from(["siamese-patch", "train", "--train-data", "pairs.npz"]).unwrap();
        let Commands::Train(args) = cli.command else { panic!("expected train") };
        let cfg: TrainConfig = args.into();

        assert_eq!(cfg.train_data, Some(PathBuf::from("pairs.npz")));
        assert_eq!(cfg.output_mode, OutputMode::Euclidean);
        assert_eq!(cfg.loss, LossKind::Contrastive);
        assert_eq!((cfg.epochs, cfg.batch_size), (5, 1));
        assert_eq!(cfg.weight_save_path, "{epoch:02d}-{val_loss:.2f}");
        assert_eq!(cfg.network.embedding_dim, 128);
        assert!(!cfg.early_stopping);
    }

    #[test]
    fn test_codes_are_parsed() {
        let cli = Cli::try_parse_from([
            "siamese-patch", "predict", "--weight-path", "w", "--output-mode", "l",
        ])
        .unwrap();
        let Commands::Predict(args) = cli.command else { panic!("expected predict") };
        assert_eq!(args.output_mode, OutputMode::Logit);

        assert!(Cli::try_parse_from(["siamese-patch", "train", "--loss", "x"]).is_err());
        assert!(Cli::try_parse_from(["siamese-patch", "score", "--data", "d", "--weight-path", "w", "--output-mode", "z"]).is_err());
    }
}
