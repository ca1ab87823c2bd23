// ============================================================
// Layer 2 - TrainUseCase
// ============================================================
// Orchestrates a training run in order:
//
//   Step 1: Check a training archive was given
//   Step 2: Build the network for the output mode   (Layer 5)
//   Step 3: Build the callbacks                      (Layer 6)
//   Step 4: Build the RMSProp optimizer              (Layer 5)
//   Step 5: Resolve loss + metric                    (Layer 5)
//   Step 6: Read the training pairs                  (Layer 4)
//   Step 7: Read validation pairs, if given          (Layer 4)
//   Step 8: Preload weights, if given                (Layer 6)
//   Step 9: Fit                                      (Layer 5)
//
// Reference: Rust Book §13 (Iterators and Closures)
//            Burn Book §5 (Training)

use std::path::PathBuf;
use burn::tensor::backend::AutodiffBackend;
use serde::{Deserialize, Serialize};

use crate::data::loader::NpzArchive;
use crate::domain::{
    modes::{LossKind, OutputMode},
    traits::PairSource,
};
use crate::error::{Result, SiameseError};
use crate::infra::{
    callbacks::{gen_callbacks, Callback, EarlyStopping},
    checkpoint::{load_weights, DEFAULT_WEIGHT_TEMPLATE},
    session::Session,
};
use crate::ml::{
    loss::check_label_contract,
    model::SiameseNetworkConfig,
    optimizer::{get_optimizer, DEFAULT_LEARNING_RATE},
    trainer::{CompiledModel, FitOptions, Fitter, History, Validation},
};

// ─── Training Configuration ──────────────────────────────────────────────────
// Everything a training run needs. Written to the log directory
// as train_config.json when training starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    /// Archive with `left`, `right` and `label`; required
    pub train_data:       Option<PathBuf>,
    pub output_mode:      OutputMode,
    pub loss:             LossKind,
    pub epochs:           usize,
    pub batch_size:       usize,
    pub learning_rate:    f64,
    /// Separate validation archive. When absent, `val_ratio`
    /// of the training pairs is held out instead.
    pub val_data:         Option<PathBuf>,
    /// Weights to start from
    pub weight_path:      Option<PathBuf>,
    pub val_ratio:        f64,
    /// Checkpoint path template, rendered every epoch
    pub weight_save_path: String,
    pub log_save_path:    PathBuf,
    pub early_stopping:   bool,
    pub network:          SiameseNetworkConfig,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            train_data:       None,
            output_mode:      OutputMode::Euclidean,
            loss:             LossKind::Contrastive,
            epochs:           5,
            batch_size:       1,
            learning_rate:    DEFAULT_LEARNING_RATE,
            val_data:         None,
            weight_path:      None,
            val_ratio:        0.2,
            weight_save_path: DEFAULT_WEIGHT_TEMPLATE.to_string(),
            log_save_path:    PathBuf::from("log"),
            early_stopping:   false,
            network:          SiameseNetworkConfig::new(),
        }
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainConfig {
        &self.config
    }

    pub fn execute<B, F>(&self, session: &Session<B>, fitter: &mut F) -> Result<History>
    where
        B: AutodiffBackend,
        F: Fitter<B>,
    {
        train(session, &self.config, fitter)
    }
}

/// Train a siamese network as described by `cfg`.
///
/// Checkpoint and log files are written by the callbacks as
/// training progresses; the returned history holds the same
/// per-epoch numbers.
pub fn train<B, F>(session: &Session<B>, cfg: &TrainConfig, fitter: &mut F) -> Result<History>
where
    B: AutodiffBackend,
    F: Fitter<B>,
{
    // ── Step 1: Training data is required ─────────────────────────────────────
    let train_path = cfg.train_data.as_ref().ok_or(SiameseError::NoData("training"))?;

    // ── Step 2: Network ───────────────────────────────────────────────────────
    let model = cfg.network.init::<B>(cfg.output_mode, session.device());
    tracing::info!(
        "Built siamese network: output mode '{}', {} parameters",
        cfg.output_mode,
        model.graph().num_params
    );

    // ── Step 3: Callbacks ─────────────────────────────────────────────────────
    let mut callbacks: Vec<Box<dyn Callback<B>>> =
        gen_callbacks(&cfg.weight_save_path, &cfg.log_save_path)?;
    if cfg.early_stopping {
        callbacks.push(Box::new(EarlyStopping::default()));
    }

    // ── Step 4 + 5: Optimizer, loss and metric ────────────────────────────────
    let optimizer = get_optimizer(cfg.learning_rate);
    let loss      = cfg.loss;
    let metric    = loss.metric();

    // ── Step 6: Training pairs ────────────────────────────────────────────────
    let pairs = NpzArchive::new(train_path).load_pairs(true)?;
    if let Some(labels) = &pairs.label {
        check_label_contract(labels, loss);
    }
    tracing::info!("Read {} training pairs from '{}'", pairs.len(), train_path.display());

    // ── Step 7: Validation pairs ──────────────────────────────────────────────
    let validation = match &cfg.val_data {
        Some(path) => {
            tracing::info!("Use provided validation data instead of splitting train data");
            let val = NpzArchive::new(path).load_pairs(true)?;
            if let Some(labels) = &val.label {
                check_label_contract(labels, loss);
            }
            Validation::Provided(val)
        }
        None => Validation::Split(cfg.val_ratio),
    };

    // ── Step 8: Starting weights ──────────────────────────────────────────────
    let model = match &cfg.weight_path {
        Some(path) => load_weights(model, path, session.device())?,
        None       => model,
    };

    // ── Step 9: Fit ───────────────────────────────────────────────────────────
    let mut run_config = serde_json::to_value(cfg)?;
    if let Some(fields) = run_config.as_object_mut() {
        fields.insert("metric".to_string(), metric.name().into());
        fields.insert("seed".to_string(), session.seed().into());
    }
    let options = FitOptions {
        epochs:     cfg.epochs,
        batch_size: cfg.batch_size,
        seed:       session.seed(),
        run_config,
    };
    let compiled = CompiledModel { model, optimizer, loss, metric };

    fitter.fit(compiled, pairs, validation, &options, &mut callbacks)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::fixtures::write_archive;
    use crate::domain::pair::PairArchive;
    use crate::infra::metrics::EpochLogs;
    use crate::ml::trainer::BurnFitter;
    use burn::backend::{Autodiff, NdArray};

    type TestBackend = Autodiff<NdArray>;

    /// Records what train() hands to the fit loop without training
    #[derive(Default)]
    struct SpyFitter {
        calls:      usize,
        train_len:  usize,
        validation: Option<Validation>,
        callbacks:  Vec<&'static str>,
        lr:         f64,
    }

    impl Fitter<TestBackend> for SpyFitter {
        fn fit(
            &mut self,
            compiled:   CompiledModel<TestBackend>,
            train:      PairArchive,
            validation: Validation,
            options:    &FitOptions,
            callbacks:  &mut [Box<dyn Callback<TestBackend>>],
        ) -> Result<History> {
            self.calls     += 1;
            self.train_len  = train.len();
            self.validation = Some(validation);
            self.callbacks  = callbacks.iter().map(|c| c.name()).collect();
            self.lr         = compiled.optimizer.learning_rate;
            Ok(History {
                epochs: vec![EpochLogs::new(1, 0.0, "mean_squared_error", 0.0, None, None); options.epochs],
            })
        }
    }

    fn small_network() -> SiameseNetworkConfig {
        SiameseNetworkConfig::new()
            .with_conv1_filters(2)
            .with_conv2_filters(3)
            .with_embedding_dim(4)
    }

    fn session() -> Session<TestBackend> {
        Session::new(Default::default(), 3)
    }

    #[test]
    fn test_missing_training_data() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = TrainConfig { log_save_path: dir.path().join("log"), ..TrainConfig::default() };

        let mut spy = SpyFitter::default();
        let err = train(&session(), &cfg, &mut spy).unwrap_err();

        assert!(matches!(err, SiameseError::NoData("training")));
        assert_eq!(err.to_string(), "No training data");
        assert_eq!(spy.calls, 0);
        assert!(!dir.path().join("log").exists());
    }

    #[test]
    fn test_split_by_default() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("train.npz");
        write_archive(&path, 5, 4, 4, 1, Some(&[0.0, 1.0, 0.0, 1.0, 0.0]));

        let cfg = TrainConfig {
            train_data:    Some(path),
            val_ratio:     0.4,
            learning_rate: 0.05,
            log_save_path: dir.path().join("log"),
            network:       small_network(),
            ..TrainConfig::default()
        };
        let mut spy = SpyFitter::default();
        let history = train(&session(), &cfg, &mut spy).unwrap();

        assert_eq!(history.len(), 5);
        assert_eq!(spy.train_len, 5);
        assert!(matches!(spy.validation, Some(Validation::Split(r)) if r == 0.4));
        assert_eq!(spy.callbacks, vec!["curve_logger", "weight_checkpoint"]);
        assert_eq!(spy.lr, 0.05);
    }

    #[test]
    fn test_provided_validation_and_early_stopping() {
        let dir   = tempfile::tempdir().unwrap();
        let train_path = dir.path().join("train.npz");
        let val_path   = dir.path().join("val.npz");
        write_archive(&train_path, 4, 4, 4, 1, Some(&[0.0, 1.0, 0.0, 1.0]));
        write_archive(&val_path, 3, 4, 4, 1, Some(&[1.0, 0.0, 1.0]));

        let cfg = TrainConfig {
            train_data:     Some(train_path),
            val_data:       Some(val_path),
            early_stopping: true,
            log_save_path:  dir.path().join("log"),
            network:        small_network(),
            ..TrainConfig::default()
        };
        let mut spy = SpyFitter::default();
        train(&session(), &cfg, &mut spy).unwrap();

        match spy.validation {
            Some(Validation::Provided(val)) => assert_eq!(val.len(), 3),
            other => panic!("expected provided validation, got {other:?}"),
        }
        assert_eq!(spy.callbacks.last(), Some(&"early_stopping"));
    }

    #[test]
    fn test_bad_template_fails_before_reading_data() {
        let cfg = TrainConfig {
            train_data:       Some(PathBuf::from("/nonexistent/train.npz")),
            weight_save_path: "{accuracy}".to_string(),
            network:          small_network(),
            ..TrainConfig::default()
        };
        let err = train(&session(), &cfg, &mut SpyFitter::default()).unwrap_err();
        assert!(matches!(err, SiameseError::Template(_)));
    }

    #[test]
    fn test_full_run_writes_checkpoints_and_logs() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("train.npz");
        write_archive(&path, 6, 4, 4, 1, Some(&[0.0, 1.0, 0.0, 1.0, 0.0, 1.0]));

        let log_dir = dir.path().join("log");
        let cfg = TrainConfig {
            train_data:       Some(path),
            epochs:           2,
            batch_size:       2,
            val_ratio:        0.34,
            weight_save_path: format!("{}/w-{{epoch:02d}}", dir.path().display()),
            log_save_path:    log_dir.clone(),
            network:          small_network(),
            ..TrainConfig::default()
        };

        let session = session();
        let history = TrainUseCase::new(cfg).execute(&session, &mut BurnFitter::new(&session)).unwrap();

        assert_eq!(history.len(), 2);
        assert!(dir.path().join("w-01").exists());
        assert!(dir.path().join("w-02").exists());
        assert!(log_dir.join("graph.json").exists());
        assert!(log_dir.join("train_config.json").exists());

        let csv = std::fs::read_to_string(log_dir.join("metrics.csv")).unwrap();
        assert_eq!(csv.lines().count(), 3);
    }
}
