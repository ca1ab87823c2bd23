// ============================================================
// Layer 2 - PredictUseCase
// ============================================================
// Scores every pair of an unlabelled archive with trained
// weights:
//
//   Step 1: Check a data archive was given
//   Step 2: Build the network for the output mode   (Layer 5)
//   Step 3: Load the weights                         (Layer 6)
//   Step 4: Read the pairs, labels ignored           (Layer 4)
//   Step 5: Batched forward pass                     (Layer 5)

use std::path::PathBuf;
use burn::prelude::*;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::data::loader::NpzArchive;
use crate::domain::{modes::OutputMode, traits::PairSource};
use crate::error::{Result, SiameseError};
use crate::infra::{checkpoint::load_weights, session::Session};
use crate::ml::{inferencer::predict_batched, model::SiameseNetworkConfig};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictConfig {
    pub output_mode: OutputMode,
    pub weight_path: PathBuf,
    /// Archive with `left` and `right`; required
    pub data_path:   Option<PathBuf>,
    pub batch_size:  usize,
    /// Must match the network the weights were trained with
    pub network:     SiameseNetworkConfig,
}

impl Default for PredictConfig {
    fn default() -> Self {
        Self {
            output_mode: OutputMode::Euclidean,
            weight_path: PathBuf::new(),
            data_path:   None,
            batch_size:  32,
            network:     SiameseNetworkConfig::new(),
        }
    }
}

/// Raw network output for every pair, shape [N, 1].
pub fn predict<B: Backend>(session: &Session<B>, cfg: &PredictConfig) -> Result<Array2<f32>> {
    let data_path = cfg.data_path.as_ref().ok_or(SiameseError::NoData("prediction"))?;

    let model = cfg.network.init::<B>(cfg.output_mode, session.device());
    let model = load_weights(model, &cfg.weight_path, session.device())?;

    let pairs = NpzArchive::new(data_path).load_pairs(false)?;
    tracing::info!("Predicting {} pairs from '{}'", pairs.len(), data_path.display());

    predict_batched(&model, &pairs, cfg.batch_size, session.device())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::fixtures::write_archive;
    use crate::infra::checkpoint::save_weights;
    use crate::ml::model::SiameseNetwork;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn small_network() -> SiameseNetworkConfig {
        SiameseNetworkConfig::new()
            .with_conv1_filters(2)
            .with_conv2_filters(3)
            .with_embedding_dim(4)
    }

    #[test]
    fn test_missing_data_path() {
        let session = Session::<TestBackend>::new(Default::default(), 0);
        let cfg = PredictConfig {
            // no weight file either; NoData must win
            weight_path: PathBuf::from("/nonexistent/weights"),
            ..PredictConfig::default()
        };
        let err = predict(&session, &cfg).unwrap_err();
        assert!(matches!(err, SiameseError::NoData("prediction")));
    }

    #[test]
    fn test_one_score_per_pair() {
        let dir     = tempfile::tempdir().unwrap();
        let data    = dir.path().join("pairs.npz");
        let weights = dir.path().join("weights");
        // labels in the archive are ignored
        write_archive(&data, 6, 4, 4, 1, Some(&[0.0; 6]));

        let session = Session::<TestBackend>::new(Default::default(), 0);
        let model: SiameseNetwork<TestBackend> =
            small_network().init(OutputMode::Cosine, session.device());
        save_weights(&model, &weights).unwrap();

        let cfg = PredictConfig {
            output_mode: OutputMode::Cosine,
            weight_path: weights,
            data_path:   Some(data),
            batch_size:  4,
            network:     small_network(),
        };
        let scores = predict(&session, &cfg).unwrap();
        assert_eq!(scores.dim(), (6, 1));
        assert!(scores.iter().all(|s| s.is_finite() && (-1.001..=1.001).contains(s)));
    }
}
