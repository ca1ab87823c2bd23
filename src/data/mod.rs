// ============================================================
// Layer 4 - Data Pipeline
// ============================================================
// Everything between an .npz archive on disk and a tensor
// batch ready for the siamese network.
//
//   pairs.npz (left, right, label)
//       │
//       ▼
//   NpzArchive        → reads named arrays, converts to f32
//       │
//       ▼
//   PairArchive       → index-aligned patch stacks (Layer 3)
//       │
//       ▼
//   split_validation  → tail split when no validation archive
//       │
//       ▼
//   PairDataset       → implements Burn's Dataset trait
//       │
//       ▼
//   PairBatcher       → stacks samples into [B, C, H, W] tensors
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Reads pair archives from .npz files
pub mod loader;

/// Implements Burn's Dataset trait for patch pairs
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;

/// Takes the validation share off the end of the training pairs
pub mod splitter;

/// Archive builders shared by tests across layers
#[cfg(test)]
pub(crate) mod fixtures;
