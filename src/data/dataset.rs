// ============================================================
// Layer 4 - Pair Dataset
// ============================================================
// A PairArchive flattened into owned samples so burn's
// DataLoader can index, shuffle and batch them. Sample i is
// archive pair i.

use burn::data::dataset::Dataset;

use crate::domain::pair::PairArchive;
use crate::error::{Result, SiameseError};

/// One pair of channel-first patches and its label.
/// Unlabelled (prediction) pairs carry a label of 0.
#[derive(Debug, Clone)]
pub struct PairSample {
    pub left:  Vec<f32>,
    pub right: Vec<f32>,
    pub label: f32,
}

pub struct PairDataset {
    samples: Vec<PairSample>,
}

impl PairDataset {
    /// Flatten an archive into samples. Labels are required when
    /// `labelled` is true.
    pub fn from_archive(archive: &PairArchive, labelled: bool) -> Result<Self> {
        let labels = match (&archive.label, labelled) {
            (Some(label), _) => Some(label.as_slice()),
            (None, true)     => return Err(SiameseError::MissingEntry("label".to_string())),
            (None, false)    => None,
        };

        let samples = (0..archive.len())
            .filter_map(|i| {
                let left  = archive.left.values_at(i)?;
                let right = archive.right.values_at(i)?;
                Some(PairSample {
                    left:  left.to_vec(),
                    right: right.to_vec(),
                    label: labels.map(|l| l[i]).unwrap_or(0.0),
                })
            })
            .collect();

        Ok(Self { samples })
    }

    pub fn sample_count(&self) -> usize { self.samples.len() }
}

impl Dataset<PairSample> for PairDataset {
    fn get(&self, index: usize) -> Option<PairSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::fixtures::pair_archive;

    #[test]
    fn test_samples_follow_archive_order() {
        let archive = pair_archive(3, 2, 2, Some(vec![1.0, 0.0, 1.0]));
        let dataset = PairDataset::from_archive(&archive, true).unwrap();
        assert_eq!(dataset.len(), 3);
        let second = dataset.get(1).unwrap();
        assert_eq!(second.label, 0.0);
        assert_eq!(second.left, archive.left.values_at(1).unwrap());
    }

    #[test]
    fn test_labelled_dataset_needs_labels() {
        let archive = pair_archive(2, 2, 2, None);
        assert!(PairDataset::from_archive(&archive, true).is_err());
        assert_eq!(PairDataset::from_archive(&archive, false).unwrap().len(), 2);
    }
}
