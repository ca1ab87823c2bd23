// ============================================================
// Layer 6 - Infrastructure Layer
// ============================================================
// Concerns shared by the training, prediction and scoring
// paths that belong to none of them:
//
//   session.rs    - device + seed for one run
//   checkpoint.rs - weight files and the checkpoint name
//                   template
//   metrics.rs    - per-epoch logs and the metrics.csv writer
//   callbacks.rs  - hooks the fit loop calls each epoch
//                   (curve logger, weight checkpoint, early
//                   stopping)
//
// Reference: Rust Book §7 (Modules)
//            Burn Book §5 (Checkpointing)

/// Device and seed for a run
pub mod session;

/// Weight save/load and checkpoint path templates
pub mod checkpoint;

/// Epoch logs and the training curve CSV
pub mod metrics;

/// Training callbacks
pub mod callbacks;
