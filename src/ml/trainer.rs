// ============================================================
// Layer 5 - Fit Loop
// ============================================================
// Train + validation loop using Burn's DataLoader and RMSProp.
//
// Per epoch:
//   1. shuffled mini-batches on the autodiff backend:
//      forward → loss → backward → RMSProp step
//   2. model.valid() moves the network to the inner backend,
//      validation batches are scored there without autodiff
//   3. every callback sees the epoch's logs; any of them can
//      ask to stop
//
// Epoch loss and metric are averaged per SAMPLE, so a short
// last batch weighs in proportion to its size.
//
// The loop sits behind the Fitter trait so the application
// layer can be tested without running Burn.
//
// Reference: Burn Book §5 (Custom Training Loop)

use std::sync::Arc;
use burn::{
    data::dataloader::{DataLoader, DataLoaderBuilder},
    module::AutodiffModule,
    optim::{GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use serde::Serialize;

use crate::data::{
    batcher::{PairBatch, PairBatcher},
    dataset::PairDataset,
    splitter::split_validation,
};
use crate::domain::{modes::LossKind, pair::PairArchive};
use crate::error::{Result, SiameseError};
use crate::infra::{
    callbacks::{Callback, CallbackAction},
    metrics::EpochLogs,
    session::Session,
};
use crate::ml::{
    inferencer::tensor_values,
    loss::{Metric, MetricAccumulator},
    model::SiameseNetwork,
    optimizer::Rmsprop,
};

/// Where the validation pairs come from
#[derive(Debug, Clone)]
pub enum Validation {
    /// Take this share off the end of the training pairs
    Split(f64),
    /// A separate archive
    Provided(PairArchive),
}

#[derive(Debug, Clone)]
pub struct FitOptions {
    pub epochs:     usize,
    pub batch_size: usize,
    /// Seeds the per-epoch shuffle
    pub seed:       u64,
    /// Handed to callbacks at train start
    pub run_config: serde_json::Value,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct History {
    pub epochs: Vec<EpochLogs>,
}

impl History {
    pub fn len(&self) -> usize {
        self.epochs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.epochs.is_empty()
    }

    pub fn last(&self) -> Option<&EpochLogs> {
        self.epochs.last()
    }
}

/// A network with everything needed to train it
pub struct CompiledModel<B: AutodiffBackend> {
    pub model:     SiameseNetwork<B>,
    pub optimizer: Rmsprop,
    pub loss:      LossKind,
    pub metric:    Metric,
}

pub trait Fitter<B: AutodiffBackend> {
    fn fit(
        &mut self,
        compiled:   CompiledModel<B>,
        train:      PairArchive,
        validation: Validation,
        options:    &FitOptions,
        callbacks:  &mut [Box<dyn Callback<B>>],
    ) -> Result<History>;
}

// ─── BurnFitter ───────────────────────────────────────────────────────────────

pub struct BurnFitter<B: AutodiffBackend> {
    device: B::Device,
}

impl<B: AutodiffBackend> BurnFitter<B> {
    pub fn new(session: &Session<B>) -> Self {
        Self { device: session.device().clone() }
    }
}

impl<B: AutodiffBackend> Fitter<B> for BurnFitter<B> {
    fn fit(
        &mut self,
        compiled:   CompiledModel<B>,
        train:      PairArchive,
        validation: Validation,
        options:    &FitOptions,
        callbacks:  &mut [Box<dyn Callback<B>>],
    ) -> Result<History> {
        let CompiledModel { mut model, optimizer, loss, metric } = compiled;

        // ── Validation pairs ──────────────────────────────────────────────────
        let (train, val) = match validation {
            Validation::Split(ratio) => split_validation(train, ratio),
            Validation::Provided(val) => (train, val),
        };
        if train.is_empty() {
            return Err(SiameseError::EmptyTraining);
        }
        model.check_input(train.patch_shape())?;
        if !val.is_empty() {
            model.check_input(val.patch_shape())?;
        }

        let shape      = train.patch_shape();
        let batch_size = options.batch_size.max(1);
        let train_set  = PairDataset::from_archive(&train, true)?;
        let val_set    = PairDataset::from_archive(&val, true)?;
        let has_val    = val_set.sample_count() > 0;

        tracing::info!(
            "Training on {} pairs, validating on {} ({} patches, batch size {})",
            train_set.sample_count(),
            val_set.sample_count(),
            shape,
            batch_size,
        );

        // ── Data loaders ──────────────────────────────────────────────────────
        let train_loader = DataLoaderBuilder::new(PairBatcher::<B>::new(self.device.clone(), shape))
            .batch_size(batch_size)
            .shuffle(options.seed)
            .num_workers(1)
            .build(train_set);

        // inner backend, no autodiff overhead
        let val_loader = DataLoaderBuilder::new(PairBatcher::<B::InnerBackend>::new(self.device.clone(), shape))
            .batch_size(batch_size)
            .num_workers(1)
            .build(val_set);

        let mut optim   = optimizer.init::<B, SiameseNetwork<B>>();
        let mut history = History::default();

        for callback in callbacks.iter_mut() {
            callback.on_train_begin(&model, &options.run_config)?;
        }

        // ── Epoch loop ────────────────────────────────────────────────────────
        for epoch in 1..=options.epochs {
            let mut totals = EpochTotals::new(metric);

            for batch in train_loader.iter() {
                let n      = batch.labels.dims()[0];
                let labels = batch.labels.clone();
                let output = model.forward(batch.left, batch.right).flatten::<1>(0, 1);

                totals
                    .metric
                    .update(&tensor_values(labels.clone())?, &tensor_values(output.clone())?);

                let batch_loss = loss.forward(labels, output);
                totals.add_loss(batch_loss.clone().into_scalar().elem::<f64>(), n);

                let grads = batch_loss.backward();
                let grads = GradientsParams::from_grads(grads, &model);
                model = optim.step(optimizer.learning_rate, model, grads);
            }

            let validation = if has_val {
                Some(evaluate(&model.valid(), &val_loader, loss, metric)?)
            } else {
                None
            };

            let logs = EpochLogs::new(
                epoch,
                totals.loss(),
                metric.name(),
                totals.metric.value(),
                validation.map(|(l, _)| l),
                validation.map(|(_, m)| m),
            );

            tracing::info!(
                "Epoch {:>3}/{} | loss={:.4} | {}={:.4} | val_loss={} | val_{}={}",
                epoch,
                options.epochs,
                logs.loss,
                metric.name(),
                logs.metric,
                display_optional(logs.val_loss),
                metric.name(),
                display_optional(logs.val_metric),
            );

            let mut stop = false;
            for callback in callbacks.iter_mut() {
                if callback.on_epoch_end(&logs, &model)? == CallbackAction::Stop {
                    tracing::debug!("{} asked to stop after epoch {}", callback.name(), epoch);
                    stop = true;
                }
            }
            history.epochs.push(logs);
            if stop {
                break;
            }
        }

        for callback in callbacks.iter_mut() {
            callback.on_train_end(&history.epochs)?;
        }

        tracing::info!("Training complete after {} epoch(s)", history.len());
        Ok(history)
    }
}

/// Sample-weighted (loss, metric) over a whole loader
fn evaluate<B: Backend>(
    model:  &SiameseNetwork<B>,
    loader: &Arc<dyn DataLoader<PairBatch<B>>>,
    loss:   LossKind,
    metric: Metric,
) -> Result<(f64, f64)> {
    let mut totals = EpochTotals::new(metric);

    for batch in loader.iter() {
        let n      = batch.labels.dims()[0];
        let output = model.forward(batch.left, batch.right).flatten::<1>(0, 1);

        totals
            .metric
            .update(&tensor_values(batch.labels.clone())?, &tensor_values(output.clone())?);
        let batch_loss = loss.forward(batch.labels, output).into_scalar().elem::<f64>();
        totals.add_loss(batch_loss, n);
    }

    Ok((totals.loss(), totals.metric.value()))
}

struct EpochTotals {
    loss_sum: f64,
    samples:  usize,
    metric:   MetricAccumulator,
}

impl EpochTotals {
    fn new(metric: Metric) -> Self {
        Self { loss_sum: 0.0, samples: 0, metric: MetricAccumulator::new(metric) }
    }

    fn add_loss(&mut self, batch_mean: f64, n: usize) {
        self.loss_sum += batch_mean * n as f64;
        self.samples  += n;
    }

    fn loss(&self) -> f64 {
        if self.samples == 0 { f64::NAN } else { self.loss_sum / self.samples as f64 }
    }
}

fn display_optional(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.4}")).unwrap_or_else(|| "-".to_string())
}
