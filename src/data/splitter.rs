// ============================================================
// Layer 4 - Train/Validation Splitter
// ============================================================
// When no validation archive is given, the validation set is
// carved off the END of the training pairs:
//   - the first (1 - ratio) share stays for training
//   - the last `ratio` share becomes the validation set
//
// There is no shuffle before the split. Archives are expected
// to be shuffled already, and a deterministic split means
// the same run always validates on the same pairs.
// Shuffling happens later, per epoch, inside the DataLoader.
//
// Split index: floor(len * (1 - ratio)), clamped to [0, len].

use crate::domain::pair::PairArchive;

/// Index at which the validation tail starts
pub fn split_index(total: usize, val_ratio: f64) -> usize {
    let ratio = val_ratio.clamp(0.0, 1.0);
    let at    = ((total as f64) * (1.0 - ratio)).floor() as usize;
    at.min(total)
}

/// Split `pairs` into (train, validation), validation taken from the tail.
pub fn split_validation(pairs: PairArchive, val_ratio: f64) -> (PairArchive, PairArchive) {
    let total    = pairs.len();
    let split_at = split_index(total, val_ratio);
    let (train, val) = pairs.split_at(split_at);

    tracing::debug!(
        "Validation split: {} training, {} validation (ratio {:.2})",
        train.len(),
        val.len(),
        val_ratio,
    );

    (train, val)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::fixtures::pair_archive;

    #[test]
    fn test_correct_split_sizes() {
        assert_eq!(split_index(100, 0.2), 80);
        assert_eq!(split_index(10, 0.25), 7);
    }

    #[test]
    fn test_validation_is_the_tail() {
        let labels = (0..10).map(|i| i as f32).collect();
        let (train, val) = split_validation(pair_archive(10, 2, 2, Some(labels)), 0.2);
        assert_eq!(train.len(), 8);
        assert_eq!(val.label, Some(vec![8.0, 9.0]));
    }

    #[test]
    fn test_empty_dataset() {
        let (train, val) = split_validation(pair_archive(0, 2, 2, Some(Vec::new())), 0.2);
        assert!(train.is_empty());
        assert!(val.is_empty());
    }

    #[test]
    fn test_zero_ratio_keeps_everything() {
        assert_eq!(split_index(10, 0.0), 10);
        assert_eq!(split_index(10, 1.0), 0);
    }
}
