// ============================================================
// Layer 3 - Pair Archive Domain Type
// ============================================================
// The contents of one pair archive: index-aligned left and
// right stacks, plus labels when the archive is used for
// training or validation.

use crate::domain::patch::{PatchShape, PatchStack};
use crate::error::{Result, SiameseError};

#[derive(Debug, Clone, PartialEq)]
pub struct PairArchive {
    pub left:  PatchStack,
    pub right: PatchStack,
    /// Present only for training/validation archives
    pub label: Option<Vec<f32>>,
}

impl PairArchive {
    /// Build an archive, checking that every entry has the same length
    /// and that both sides share one patch shape.
    pub fn new(left: PatchStack, right: PatchStack, label: Option<Vec<f32>>) -> Result<Self> {
        if left.len() != right.len() {
            return Err(SiameseError::Shape(format!(
                "left has {} patches but right has {}",
                left.len(),
                right.len()
            )));
        }
        if left.shape() != right.shape() {
            return Err(SiameseError::Shape(format!(
                "left patches are {} but right patches are {}",
                left.shape(),
                right.shape()
            )));
        }
        if let Some(label) = &label {
            if label.len() != left.len() {
                return Err(SiameseError::Shape(format!(
                    "{} labels for {} pairs",
                    label.len(),
                    left.len()
                )));
            }
        }
        Ok(Self { left, right, label })
    }

    pub fn len(&self) -> usize {
        self.left.len()
    }

    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }

    pub fn patch_shape(&self) -> PatchShape {
        self.left.shape()
    }

    /// Split into the first `at` pairs and the rest, keeping order
    pub fn split_at(self, at: usize) -> (PairArchive, PairArchive) {
        let (left_head, left_tail)   = self.left.split_at(at);
        let (right_head, right_tail) = self.right.split_at(at);
        let (label_head, label_tail) = match self.label {
            Some(mut label) => {
                let tail = label.split_off(at.min(label.len()));
                (Some(label), Some(tail))
            }
            None => (None, None),
        };
        (
            PairArchive { left: left_head, right: right_head, label: label_head },
            PairArchive { left: left_tail, right: right_tail, label: label_tail },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array, IxDyn};

    fn stack(n: usize) -> PatchStack {
        let values = (0..n * 4).map(|v| v as f32).collect();
        PatchStack::from_array(Array::from_shape_vec(IxDyn(&[n, 2, 2]), values).unwrap()).unwrap()
    }

    #[test]
    fn test_length_mismatch_is_rejected() {
        assert!(PairArchive::new(stack(3), stack(2), None).is_err());
        assert!(PairArchive::new(stack(3), stack(3), Some(vec![0.0; 2])).is_err());
    }

    #[test]
    fn test_split_keeps_alignment() {
        let archive = PairArchive::new(stack(4), stack(4), Some(vec![0.0, 1.0, 0.0, 1.0])).unwrap();
        let (head, tail) = archive.split_at(3);
        assert_eq!(head.len(), 3);
        assert_eq!(tail.len(), 1);
        assert_eq!(tail.label, Some(vec![1.0]));
        assert_eq!(tail.left.values_at(0), Some(&[12.0, 13.0, 14.0, 15.0][..]));
    }
}
