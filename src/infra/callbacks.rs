// ============================================================
// Layer 6 - Training Callbacks
// ============================================================
// Hooks the fit loop calls at the start of training, after
// every epoch, and at the end.
//
// gen_callbacks builds the standard pair:
//   CurveLogger      → graph.json, train_config.json and one
//                      metrics.csv row per epoch in the log dir
//   WeightCheckpoint → saves weights after EVERY epoch to the
//                      path rendered from the template
//
// EarlyStopping is available but not part of the standard
// set; a run opts in through its config.
//
// Nothing here touches the filesystem until training begins.

use std::{
    fs,
    path::{Path, PathBuf},
};
use burn::prelude::*;

use crate::error::Result;
use crate::infra::{
    checkpoint::{save_weights, CheckpointTemplate},
    metrics::{EpochLogs, MetricsLogger},
};
use crate::ml::model::SiameseNetwork;

/// What the fit loop should do after an epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
    Continue,
    Stop,
}

pub trait Callback<B: Backend> {
    fn name(&self) -> &'static str;

    fn on_train_begin(
        &mut self,
        _model:      &SiameseNetwork<B>,
        _run_config: &serde_json::Value,
    ) -> Result<()> {
        Ok(())
    }

    fn on_epoch_end(&mut self, logs: &EpochLogs, model: &SiameseNetwork<B>) -> Result<CallbackAction>;

    fn on_train_end(&mut self, _history: &[EpochLogs]) -> Result<()> {
        Ok(())
    }
}

/// The standard callbacks for a training run: curve logging into
/// `log_dir` and a weight checkpoint per epoch.
pub fn gen_callbacks<B: Backend>(
    weight_save_path: &str,
    log_dir:          impl AsRef<Path>,
) -> Result<Vec<Box<dyn Callback<B>>>> {
    let checkpoint = WeightCheckpoint::new(CheckpointTemplate::parse(weight_save_path)?);
    let logger     = CurveLogger::new(log_dir.as_ref());
    Ok(vec![Box::new(logger), Box::new(checkpoint)])
}

// ─── CurveLogger ──────────────────────────────────────────────────────────────

pub struct CurveLogger {
    log_dir: PathBuf,
    csv:     Option<MetricsLogger>,
}

impl CurveLogger {
    pub fn new(log_dir: impl Into<PathBuf>) -> Self {
        Self { log_dir: log_dir.into(), csv: None }
    }
}

impl<B: Backend> Callback<B> for CurveLogger {
    fn name(&self) -> &'static str {
        "curve_logger"
    }

    fn on_train_begin(&mut self, model: &SiameseNetwork<B>, run_config: &serde_json::Value) -> Result<()> {
        fs::create_dir_all(&self.log_dir)?;

        fs::write(
            self.log_dir.join("graph.json"),
            serde_json::to_string_pretty(&model.graph())?,
        )?;
        fs::write(
            self.log_dir.join("train_config.json"),
            serde_json::to_string_pretty(run_config)?,
        )?;

        let metric_name = run_config
            .get("metric")
            .and_then(|m| m.as_str())
            .unwrap_or("metric");
        self.csv = Some(MetricsLogger::new(&self.log_dir, metric_name)?);

        tracing::info!("Logging training curves to '{}'", self.log_dir.display());
        Ok(())
    }

    fn on_epoch_end(&mut self, logs: &EpochLogs, _model: &SiameseNetwork<B>) -> Result<CallbackAction> {
        // used without on_train_begin, e.g. from a custom fit loop
        if self.csv.is_none() {
            self.csv = Some(MetricsLogger::new(&self.log_dir, &logs.metric_name)?);
        }
        if let Some(csv) = &self.csv {
            csv.log(logs)?;
        }
        Ok(CallbackAction::Continue)
    }
}

// ─── WeightCheckpoint ─────────────────────────────────────────────────────────

pub struct WeightCheckpoint {
    template: CheckpointTemplate,
    saved:    Vec<PathBuf>,
}

impl WeightCheckpoint {
    pub fn new(template: CheckpointTemplate) -> Self {
        Self { template, saved: Vec::new() }
    }

    /// Every file written so far, in epoch order
    pub fn saved(&self) -> &[PathBuf] {
        &self.saved
    }
}

impl<B: Backend> Callback<B> for WeightCheckpoint {
    fn name(&self) -> &'static str {
        "weight_checkpoint"
    }

    fn on_epoch_end(&mut self, logs: &EpochLogs, model: &SiameseNetwork<B>) -> Result<CallbackAction> {
        let path = self.template.render(logs)?;
        tracing::info!("Epoch {:05}: saving model to {}", logs.epoch, path.display());
        save_weights(model, &path)?;
        self.saved.push(path);
        Ok(CallbackAction::Continue)
    }
}

// ─── EarlyStopping ────────────────────────────────────────────────────────────

/// Stops training once the monitored loss (val_loss, or loss
/// without validation) has not improved for `patience` epochs.
#[derive(Debug, Clone)]
pub struct EarlyStopping {
    pub min_delta: f64,
    pub patience:  usize,
    best:          f64,
    wait:          usize,
}

impl EarlyStopping {
    pub fn new(min_delta: f64, patience: usize) -> Self {
        Self { min_delta, patience, best: f64::INFINITY, wait: 0 }
    }
}

impl Default for EarlyStopping {
    fn default() -> Self {
        Self::new(0.0, 1)
    }
}

impl<B: Backend> Callback<B> for EarlyStopping {
    fn name(&self) -> &'static str {
        "early_stopping"
    }

    fn on_train_begin(&mut self, _model: &SiameseNetwork<B>, _run_config: &serde_json::Value) -> Result<()> {
        self.best = f64::INFINITY;
        self.wait = 0;
        Ok(())
    }

    fn on_epoch_end(&mut self, logs: &EpochLogs, _model: &SiameseNetwork<B>) -> Result<CallbackAction> {
        if logs.is_improvement(self.best, self.min_delta) {
            self.best = logs.monitored_loss();
            self.wait = 0;
            return Ok(CallbackAction::Continue);
        }

        self.wait += 1;
        if self.wait >= self.patience {
            tracing::info!("Epoch {:05}: early stopping", logs.epoch);
            return Ok(CallbackAction::Stop);
        }
        Ok(CallbackAction::Continue)
    }
}
