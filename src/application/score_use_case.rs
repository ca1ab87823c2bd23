// ============================================================
// Layer 2 - Score Cache
// ============================================================
// Ranks candidate patches against one target patch with a
// network that is loaded once and reused across calls.
//
// The cache holds at most one model, keyed by
// (weights path, output mode):
//
//   same key      → reuse the loaded model
//   different key → drop it, build + load the new one
//
// The cache is a plain value owned by the caller. Scoring
// borrows it mutably, so sharing one across threads needs the
// caller's own lock.

use std::path::{Path, PathBuf};
use burn::prelude::*;

use crate::domain::{modes::OutputMode, patch::Patch};
use crate::error::Result;
use crate::infra::{checkpoint::load_weights, session::Session};
use crate::ml::{
    inferencer::score_pair,
    model::{SiameseNetwork, SiameseNetworkConfig},
};

struct CachedModel<B: Backend> {
    model:        SiameseNetwork<B>,
    weights_path: PathBuf,
    output_mode:  OutputMode,
}

impl<B: Backend> CachedModel<B> {
    fn is_for(&self, weights_path: &Path, output_mode: OutputMode) -> bool {
        self.weights_path == weights_path && self.output_mode == output_mode
    }
}

pub struct ScoreCache<B: Backend> {
    network: SiameseNetworkConfig,
    slot:    Option<CachedModel<B>>,
}

impl<B: Backend> ScoreCache<B> {
    /// An empty cache. Every model it loads is built from `network`.
    pub fn new(network: SiameseNetworkConfig) -> Self {
        Self { network, slot: None }
    }

    /// Weights path and mode of the model currently held
    pub fn loaded_key(&self) -> Option<(&Path, OutputMode)> {
        self.slot
            .as_ref()
            .map(|c| (c.weights_path.as_path(), c.output_mode))
    }

    /// The model for (weights, mode), loading it if the cache holds
    /// nothing or holds a different key. A failed load leaves the
    /// cache empty.
    pub fn get_or_load(
        &mut self,
        session: &Session<B>,
        weights: &Path,
        mode:    OutputMode,
    ) -> Result<&SiameseNetwork<B>> {
        let cached = match self.slot.take() {
            Some(cached) if cached.is_for(weights, mode) => cached,
            previous => {
                match &previous {
                    None => tracing::info!("Initializing '{}' model from '{}'", mode, weights.display()),
                    Some(old) => tracing::info!(
                        "Reloading model: '{}' ({}) replaces '{}' ({})",
                        weights.display(),
                        mode,
                        old.weights_path.display(),
                        old.output_mode,
                    ),
                }
                drop(previous);

                let model = self.network.init::<B>(mode, session.device());
                CachedModel {
                    model:        load_weights(model, weights, session.device())?,
                    weights_path: weights.to_path_buf(),
                    output_mode:  mode,
                }
            }
        };

        Ok(&self.slot.insert(cached).model)
    }

    /// One score per candidate, in candidate order.
    pub fn calculate_scores(
        &mut self,
        session:    &Session<B>,
        target:     &Patch,
        candidates: &[Patch],
        weights:    impl AsRef<Path>,
        mode:       OutputMode,
    ) -> Result<Vec<f32>> {
        let model = self.get_or_load(session, weights.as_ref(), mode)?;

        let scores = candidates
            .iter()
            .map(|candidate| score_pair(model, target, candidate, session.device()))
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!("Scored {} candidates", scores.len());
        Ok(scores)
    }
}
