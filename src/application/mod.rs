// ============================================================
// Layer 2 - Application / Use Cases
// ============================================================
// Coordinates the other layers to accomplish one goal each:
// training, batch prediction, or scoring candidates against
// a target.
//
// Rules for this layer:
//   - No tensor math or model code here
//   - No printing here (that's Layer 1)
//   - No file formats here (that's Layer 4 and 6)
//   - Only workflow coordination
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

// The training workflow
pub mod train_use_case;

// Batch prediction over an archive
pub mod predict_use_case;

// Cached-model scoring of candidates against a target
pub mod score_use_case;

pub use predict_use_case::{predict, PredictConfig};
pub use score_use_case::ScoreCache;
pub use train_use_case::{train, TrainConfig, TrainUseCase};
