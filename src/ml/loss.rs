// ============================================================
// Layer 5 - Losses and Metrics
// ============================================================
// Two loss functions, each paired with the metric reported
// next to it during training:
//
//   code  loss                                   metric
//   c     contrastive (Hadsell et al. 2006)      mean squared error
//   l     logistic    ln(1 + exp(-y * p))        binary accuracy
//
// Contrastive:
//   mean((1 - y) * d^2 + y * max(margin - d, 0)^2), margin = 100
//   y = 0 pulls a pair together, y = 1 pushes it past the margin.
//
// Logistic runs use signed labels (+1 / -1) on logits, so
// binary accuracy compares signs: decision boundary at 0.
//
// Losses run on tensors so they take part in backprop.
// Metrics only report, so they are computed on host values.
//
// Reference: Hadsell, Chopra, LeCun (2006) Dimensionality
//            Reduction by Learning an Invariant Mapping

use burn::{prelude::*, tensor::activation::relu};

use crate::domain::modes::LossKind;
use crate::error::Result;

pub const CONTRASTIVE_MARGIN: f64 = 100.0;

/// Logit decision boundary; labels above it are the positive class
const BINARY_THRESHOLD: f32 = 0.0;

/// Contrastive loss over distances `y_pred` with labels `y_true`.
pub fn contrastive_loss<B: Backend>(y_true: Tensor<B, 1>, y_pred: Tensor<B, 1>) -> Tensor<B, 1> {
    let similar = y_true.clone().neg().add_scalar(1.0) * y_pred.clone().powf_scalar(2.0);
    let dissimilar = y_true
        * y_pred
            .neg()
            .add_scalar(CONTRASTIVE_MARGIN)
            .clamp_min(0.0)
            .powf_scalar(2.0);
    (similar + dissimilar).mean()
}

/// Logistic loss over logits `y_pred` with signed labels `y_true`.
///
/// Evaluated as `max(-z, 0) + ln(1 + exp(-|z|))` with `z = y * p`,
/// which equals `ln(1 + exp(-z))` but never exponentiates a large
/// positive number.
pub fn logistic_loss<B: Backend>(y_true: Tensor<B, 1>, y_pred: Tensor<B, 1>) -> Tensor<B, 1> {
    let margin = y_true * y_pred;
    let tail   = margin.clone().abs().neg().exp().log1p();
    (relu(margin.neg()) + tail).mean()
}

impl LossKind {
    /// Metric reported alongside this loss
    pub fn metric(&self) -> Metric {
        match self {
            LossKind::Contrastive => Metric::MeanSquaredError,
            LossKind::Logistic    => Metric::BinaryAccuracy,
        }
    }

    /// Mean loss over a batch; returns a single-element tensor
    pub fn forward<B: Backend>(&self, y_true: Tensor<B, 1>, y_pred: Tensor<B, 1>) -> Tensor<B, 1> {
        match self {
            LossKind::Contrastive => contrastive_loss(y_true, y_pred),
            LossKind::Logistic    => logistic_loss(y_true, y_pred),
        }
    }
}

/// Resolve a loss code (`c` or `l`) into the loss and its metric.
pub fn get_loss_and_metric(code: &str) -> Result<(LossKind, Metric)> {
    let loss: LossKind = code.parse()?;
    Ok((loss, loss.metric()))
}

/// Count labels outside the convention of `loss`, logging a warning
/// when there are any. Training still proceeds.
pub fn check_label_contract(labels: &[f32], loss: LossKind) -> usize {
    let expected = loss.expected_labels();
    let off = labels.iter().filter(|l| !expected.contains(l)).count();

    if off > 0 {
        tracing::warn!(
            "{} of {} labels are outside {:?}, the convention for loss '{}'",
            off,
            labels.len(),
            expected,
            loss
        );
    }
    if loss == LossKind::Logistic && labels.iter().any(|&l| l == 0.0) {
        tracing::warn!("Logistic loss with 0 labels: those pairs contribute a constant ln 2");
    }
    off
}

// ─── Metrics ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    MeanSquaredError,
    BinaryAccuracy,
}

impl Metric {
    pub fn name(&self) -> &'static str {
        match self {
            Metric::MeanSquaredError => "mean_squared_error",
            Metric::BinaryAccuracy   => "binary_accuracy",
        }
    }

    fn sample(&self, y_true: f32, y_pred: f32) -> f64 {
        match self {
            Metric::MeanSquaredError => {
                let diff = (y_true - y_pred) as f64;
                diff * diff
            }
            Metric::BinaryAccuracy => {
                let predicted = y_pred > BINARY_THRESHOLD;
                let actual    = y_true > BINARY_THRESHOLD;
                if predicted == actual { 1.0 } else { 0.0 }
            }
        }
    }
}

/// Running mean of a metric over all samples seen in an epoch.
#[derive(Debug, Clone)]
pub struct MetricAccumulator {
    metric: Metric,
    sum:    f64,
    count:  usize,
}

impl MetricAccumulator {
    pub fn new(metric: Metric) -> Self {
        Self { metric, sum: 0.0, count: 0 }
    }

    pub fn update(&mut self, y_true: &[f32], y_pred: &[f32]) {
        for (&t, &p) in y_true.iter().zip(y_pred) {
            self.sum   += self.metric.sample(t, p);
            self.count += 1;
        }
    }

    /// NaN when nothing was seen
    pub fn value(&self) -> f64 {
        if self.count == 0 {
            f64::NAN
        } else {
            self.sum / self.count as f64
        }
    }
}
