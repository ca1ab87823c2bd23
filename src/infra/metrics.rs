// ============================================================
// Layer 6 - Training Curve Logger
// ============================================================
// Records one row per epoch to `metrics.csv` in the log
// directory, so learning curves can be plotted afterwards.
//
// Columns:
//   epoch, loss, <metric>, val_loss, val_<metric>
// where <metric> is mean_squared_error or binary_accuracy
// depending on the loss. Validation columns are empty when
// the run has no validation set.
//
// Example (contrastive loss):
//   epoch,loss,mean_squared_error,val_loss,val_mean_squared_error
//   1,412.500000,388.120000,401.002000,379.440000
//   2,397.310000,371.880000,,
//
// Reference: Rust Book §12 (I/O and File Handling)

use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Everything measured during one epoch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochLogs {
    /// 1-based epoch number
    pub epoch: usize,

    /// Sample-weighted mean training loss
    pub loss: f64,

    /// `mean_squared_error` or `binary_accuracy`
    pub metric_name: String,

    /// Training value of the metric
    pub metric: f64,

    /// None when there is no validation set
    pub val_loss: Option<f64>,

    pub val_metric: Option<f64>,
}

impl EpochLogs {
    pub fn new(
        epoch:       usize,
        loss:        f64,
        metric_name: impl Into<String>,
        metric:      f64,
        val_loss:    Option<f64>,
        val_metric:  Option<f64>,
    ) -> Self {
        Self { epoch, loss, metric_name: metric_name.into(), metric, val_loss, val_metric }
    }

    /// val_loss when present, otherwise the training loss
    pub fn monitored_loss(&self) -> f64 {
        self.val_loss.unwrap_or(self.loss)
    }

    /// True if this epoch beat `best_loss` by more than `min_delta`
    pub fn is_improvement(&self, best_loss: f64, min_delta: f64) -> bool {
        self.monitored_loss() < best_loss - min_delta
    }
}

/// Appends epoch logs to a CSV file.
pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Create the directory and, if the file is new, write the header.
    /// An existing file is appended to.
    pub fn new(dir: impl AsRef<Path>, metric_name: &str) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let csv_path = dir.join("metrics.csv");
        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)?;
            writeln!(f, "epoch,loss,{metric_name},val_loss,val_{metric_name}")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    pub fn log(&self, m: &EpochLogs) -> Result<()> {
        let mut f = OpenOptions::new().append(true).open(&self.csv_path)?;

        writeln!(
            f,
            "{},{:.6},{:.6},{},{}",
            m.epoch,
            m.loss,
            m.metric,
            optional(m.val_loss),
            optional(m.val_metric),
        )?;

        tracing::debug!(
            "Logged epoch {} metrics: loss={:.4}, val_loss={:?}",
            m.epoch,
            m.loss,
            m.val_loss,
        );
        Ok(())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}

fn optional(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.6}")).unwrap_or_default()
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_improvement() {
        let m = EpochLogs::new(2, 2.5, "mean_squared_error", 0.2, Some(2.3), Some(0.1));
        assert!(m.is_improvement(3.0, 0.0));
        assert!(!m.is_improvement(2.0, 0.0));
        // within min_delta does not count
        assert!(!m.is_improvement(2.35, 0.1));
    }

    #[test]
    fn test_monitors_training_loss_without_validation() {
        let m = EpochLogs::new(1, 1.5, "binary_accuracy", 0.5, None, None);
        assert_eq!(m.monitored_loss(), 1.5);
    }

    #[test]
    fn test_csv_rows() {
        let dir    = tempfile::tempdir().unwrap();
        let logger = MetricsLogger::new(dir.path().join("log"), "binary_accuracy").unwrap();
        logger.log(&EpochLogs::new(1, 0.7, "binary_accuracy", 0.5, Some(0.6), Some(0.75))).unwrap();
        logger.log(&EpochLogs::new(2, 0.5, "binary_accuracy", 0.6, None, None)).unwrap();

        let csv   = fs::read_to_string(logger.csv_path()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "epoch,loss,binary_accuracy,val_loss,val_binary_accuracy");
        assert_eq!(lines[1], "1,0.700000,0.500000,0.600000,0.750000");
        assert_eq!(lines[2], "2,0.500000,0.600000,,");
    }
}
