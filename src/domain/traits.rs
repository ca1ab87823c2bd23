// ============================================================
// Layer 3 - Core Traits (Abstractions)
// ============================================================
// The application layer only sees these traits, so an npz
// archive on disk and an in-memory archive built by a test
// are interchangeable.

use crate::domain::pair::PairArchive;
use crate::error::Result;

// ─── PairSource ───────────────────────────────────────────────────────────────
/// Anything that can hand over a set of patch pairs.
///
/// Implementations:
///   - NpzArchive → reads `left`/`right`/`label` from an .npz file
///   - PairArchive → already in memory
pub trait PairSource {
    /// Load the pairs. When `with_label` is true the labels
    /// must be present; otherwise they are not read at all.
    fn load_pairs(&self, with_label: bool) -> Result<PairArchive>;
}

impl PairSource for PairArchive {
    fn load_pairs(&self, with_label: bool) -> Result<PairArchive> {
        if with_label && self.label.is_none() {
            return Err(crate::error::SiameseError::MissingEntry("label".to_string()));
        }
        let mut pairs = self.clone();
        if !with_label {
            pairs.label = None;
        }
        Ok(pairs)
    }
}
