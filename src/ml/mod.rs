// ============================================================
// Layer 5 - ML Layer (Burn)
// ============================================================
// All tensor work lives here. Layers above hand in domain
// types (PairArchive, Patch, LossKind, OutputMode) and get
// back plain Rust values.
//
//   model.rs      - the siamese network: one shared conv
//                   branch, compared by Euclidean distance,
//                   cosine similarity or a linear logit head
//   loss.rs       - contrastive and logistic losses, and the
//                   metric reported with each
//   optimizer.rs  - RMSProp factory
//   trainer.rs    - fit loop behind the Fitter trait
//   inferencer.rs - batched prediction and single-pair scoring
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)
//            Bromley et al. (1993) Signature Verification
//            using a Siamese Time Delay Neural Network

/// Siamese network architecture
pub mod model;

/// Loss functions and their metrics
pub mod loss;

/// RMSProp optimizer factory
pub mod optimizer;

/// Training loop with validation and callbacks
pub mod trainer;

/// Batched prediction and pair scoring
pub mod inferencer;
