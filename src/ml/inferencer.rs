// ============================================================
// Layer 5 - Inference
// ============================================================
// Runs a built (and usually weight-loaded) network forward
// without autodiff:
//
//   predict_batched → one score per archive pair, in order,
//                     returned as an [N, 1] array
//   score_pair      → one target vs one candidate, each sent
//                     as a batch of one
//
// No shuffling anywhere here; output row i always belongs
// to archive pair i.

use burn::{
    data::{dataloader::batcher::Batcher, dataset::Dataset},
    prelude::*,
};
use ndarray::Array2;

use crate::data::{batcher::PairBatcher, dataset::PairDataset};
use crate::domain::{pair::PairArchive, patch::Patch};
use crate::error::{Result, SiameseError};
use crate::ml::model::SiameseNetwork;

/// Copy a tensor's values to the host as f32
pub(crate) fn tensor_values<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> Result<Vec<f32>> {
    tensor
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|e| SiameseError::Shape(format!("cannot read tensor values: {e:?}")))
}

/// Score every pair in `pairs`, `batch_size` pairs at a time.
pub fn predict_batched<B: Backend>(
    model:      &SiameseNetwork<B>,
    pairs:      &PairArchive,
    batch_size: usize,
    device:     &B::Device,
) -> Result<Array2<f32>> {
    let total = pairs.len();
    if total == 0 {
        return Ok(Array2::zeros((0, 1)));
    }
    model.check_input(pairs.patch_shape())?;

    let dataset    = PairDataset::from_archive(pairs, false)?;
    let batcher    = PairBatcher::<B>::new(device.clone(), pairs.patch_shape());
    let batch_size = batch_size.max(1);
    let mut scores = Vec::with_capacity(total);

    for start in (0..total).step_by(batch_size) {
        let end   = (start + batch_size).min(total);
        let items = (start..end).filter_map(|i| dataset.get(i)).collect();
        let batch = batcher.batch(items);

        scores.extend(tensor_values(model.forward(batch.left, batch.right))?);
        tracing::debug!("Scored pairs {}..{} of {}", start, end, total);
    }

    Array2::from_shape_vec((total, 1), scores)
        .map_err(|e| SiameseError::Shape(format!("prediction output: {e}")))
}

/// Score one candidate against a target.
pub fn score_pair<B: Backend>(
    model:     &SiameseNetwork<B>,
    target:    &Patch,
    candidate: &Patch,
    device:    &B::Device,
) -> Result<f32> {
    if target.shape() != candidate.shape() {
        return Err(SiameseError::Shape(format!(
            "target is {} but candidate is {}",
            target.shape(),
            candidate.shape()
        )));
    }
    model.check_input(target.shape())?;

    let batcher = PairBatcher::<B>::new(device.clone(), target.shape());
    let left    = batcher.stack(target.values().to_vec(), 1);
    let right   = batcher.stack(candidate.values().to_vec(), 1);

    tensor_values(model.forward(left, right))?
        .first()
        .copied()
        .ok_or_else(|| SiameseError::Shape("network returned no score".to_string()))
}
