// ============================================================
// Layer 4 - Pair Batcher
// ============================================================
// Implements Burn's Batcher trait to turn a Vec<PairSample>
// into tensors the siamese network can consume.
//
// How batching works here:
//   Input:  N samples, each side holding C*H*W values
//   Output: left/right tensors [N, C, H, W], labels [N]
//
// Every sample already has the same patch shape (the archive
// enforces it), so flattening then reshaping is enough.
//
// Reference: Burn Book §4 (Batcher)

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
    tensor::TensorData,
};

use crate::data::dataset::PairSample;
use crate::domain::patch::PatchShape;

// ─── PairBatch ────────────────────────────────────────────────────────────────
/// A batch of pairs. All tensors have batch_size as their first dimension.
#[derive(Debug, Clone)]
pub struct PairBatch<B: Backend> {
    /// Left patches: [batch_size, channels, height, width]
    pub left: Tensor<B, 4>,

    /// Right patches, index-aligned with `left`
    pub right: Tensor<B, 4>,

    /// One label per pair: [batch_size]
    pub labels: Tensor<B, 1>,
}

// ─── PairBatcher ──────────────────────────────────────────────────────────────
/// Holds the target device and the patch shape to reshape into.
#[derive(Clone, Debug)]
pub struct PairBatcher<B: Backend> {
    pub device: B::Device,
    pub shape:  PatchShape,
}

impl<B: Backend> PairBatcher<B> {
    pub fn new(device: B::Device, shape: PatchShape) -> Self {
        Self { device, shape }
    }

    /// Stack flat channel-first patches into a [n, C, H, W] tensor
    pub fn stack(&self, flat: Vec<f32>, n: usize) -> Tensor<B, 4> {
        let [c, h, w] = self.shape.dims();
        Tensor::<B, 4>::from_data(TensorData::new(flat, [n, c, h, w]), &self.device)
    }
}

impl<B: Backend> Batcher<PairSample, PairBatch<B>> for PairBatcher<B> {
    fn batch(&self, items: Vec<PairSample>) -> PairBatch<B> {
        let batch_size = items.len();

        let left_flat: Vec<f32> = items
            .iter()
            .flat_map(|s| s.left.iter().copied())
            .collect();

        let right_flat: Vec<f32> = items
            .iter()
            .flat_map(|s| s.right.iter().copied())
            .collect();

        let labels: Vec<f32> = items.iter().map(|s| s.label).collect();

        PairBatch {
            left:   self.stack(left_flat, batch_size),
            right:  self.stack(right_flat, batch_size),
            labels: Tensor::<B, 1>::from_data(
                TensorData::new(labels, [batch_size]),
                &self.device,
            ),
        }
    }
}
