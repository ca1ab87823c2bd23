// ============================================================
// Layer 4 - Pair Archive Loader
// ============================================================
// Loads `left`, `right` and (optionally) `label` from an .npz
// archive using ndarray-npy.
//
// How .npz files work:
//   An .npz file is a ZIP archive holding one .npy file per
//   named array. numpy writes the entry as `left.npy` but
//   callers ask for `left`, so names are matched with or
//   without the suffix.
//
// Element types:
//   Archives produced by numpy are often float64 or uint8.
//   f32, f64, u8 and i64 entries are read and converted to
//   f32; anything else is reported with ndarray-npy's own
//   error.
//
// Missing or malformed files are not translated: the error
// from std::fs / ndarray-npy reaches the caller unchanged.

use std::{
    fs::File,
    path::{Path, PathBuf},
};

use ndarray::{ArrayD, IxDyn, OwnedRepr};
use ndarray_npy::{NpzReader, ReadNpyError, ReadNpzError, ReadableElement};

use crate::domain::{
    pair::PairArchive,
    patch::{Patch, PatchStack},
    traits::PairSource,
};
use crate::error::{Result, SiameseError};

/// A pair archive on disk.
/// Implements the PairSource trait from Layer 3.
#[derive(Debug, Clone)]
pub struct NpzArchive {
    path: PathBuf,
}

impl NpzArchive {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl PairSource for NpzArchive {
    fn load_pairs(&self, with_label: bool) -> Result<PairArchive> {
        read_data(&self.path, with_label)
    }
}

/// Read a pair archive. Labels are read only when `with_label` is set.
pub fn read_data(path: impl AsRef<Path>, with_label: bool) -> Result<PairArchive> {
    let path    = path.as_ref();
    let mut npz = open_archive(path)?;

    let left  = PatchStack::from_array(read_entry(&mut npz, "left")?)?;
    let right = PatchStack::from_array(read_entry(&mut npz, "right")?)?;
    let label = if with_label {
        Some(read_entry(&mut npz, "label")?.into_iter().collect::<Vec<f32>>())
    } else {
        None
    };

    tracing::debug!(
        "Read {} pairs of {} patches from '{}'",
        left.len(),
        left.shape(),
        path.display()
    );
    PairArchive::new(left, right, label)
}

/// Read a scoring archive: one `target` patch ([H, W] or [H, W, C])
/// and a `candidates` stack ([N, H, W] or [N, H, W, C]).
pub fn read_score_data(path: impl AsRef<Path>) -> Result<(Patch, Vec<Patch>)> {
    let mut npz = open_archive(path)?;

    let target     = Patch::from_hwc(read_entry(&mut npz, "target")?.view())?;
    let candidates = PatchStack::from_array(read_entry(&mut npz, "candidates")?)?;
    let candidates = (0..candidates.len())
        .filter_map(|i| candidates.patch(i))
        .collect();

    Ok((target, candidates))
}

/// Open an .npz archive for reading
pub fn open_archive(path: impl AsRef<Path>) -> Result<NpzReader<File>> {
    let file = File::open(path.as_ref())?;
    Ok(NpzReader::new(file)?)
}

/// Read one named entry as f32, whatever numeric type it was stored as
pub fn read_entry(npz: &mut NpzReader<File>, name: &str) -> Result<ArrayD<f32>> {
    let entry = npz
        .names()?
        .into_iter()
        .find(|n| n == name || n.strip_suffix(".npy") == Some(name))
        .ok_or_else(|| SiameseError::MissingEntry(name.to_string()))?;

    if let Some(array) = try_read::<f32>(npz, &entry, |v| v)? {
        return Ok(array);
    }
    if let Some(array) = try_read::<f64>(npz, &entry, |v| v as f32)? {
        return Ok(array);
    }
    if let Some(array) = try_read::<u8>(npz, &entry, f32::from)? {
        return Ok(array);
    }
    // last candidate: its error is the one reported
    Ok(npz
        .by_name::<OwnedRepr<i64>, IxDyn>(&entry)?
        .mapv(|v| v as f32))
}

/// `Ok(None)` when the entry holds a different element type
fn try_read<T>(
    npz:   &mut NpzReader<File>,
    entry: &str,
    cast:  impl Fn(T) -> f32,
) -> Result<Option<ArrayD<f32>>>
where
    T: ReadableElement + Copy,
{
    match npz.by_name::<OwnedRepr<T>, IxDyn>(entry) {
        Ok(array) => Ok(Some(array.mapv(cast))),
        Err(ReadNpzError::Npy(ReadNpyError::WrongDescriptor(_))) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::fixtures::{write_archive, ArchiveEntry};
    use ndarray::Array;

    #[test]
    fn test_reads_labelled_archive() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("train.npz");
        write_archive(&path, 4, 3, 3, 1, Some(&[0.0, 1.0, 1.0, 0.0]));

        let pairs = read_data(&path, true).unwrap();
        assert_eq!(pairs.len(), 4);
        assert_eq!(pairs.patch_shape().dims(), [1, 3, 3]);
        assert_eq!(pairs.label, Some(vec![0.0, 1.0, 1.0, 0.0]));
    }

    #[test]
    fn test_labels_skipped_for_prediction() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.npz");
        write_archive(&path, 2, 2, 2, 3, None);

        let pairs = NpzArchive::new(&path).load_pairs(false).unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs.patch_shape().channels, 3);
        assert!(pairs.label.is_none());
    }

    #[test]
    fn test_missing_label_entry() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("unlabelled.npz");
        write_archive(&path, 2, 2, 2, 1, None);

        let err = read_data(&path, true).unwrap_err();
        assert!(matches!(err, SiameseError::MissingEntry(ref name) if name == "label"));
    }

    #[test]
    fn test_missing_file_keeps_io_error() {
        let err = read_data("/nonexistent/pairs.npz", false).unwrap_err();
        assert!(matches!(err, SiameseError::Io(_)));
    }

    #[test]
    fn test_float64_and_uint8_entries_are_converted() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("mixed.npz");
        let left  = Array::from_shape_vec(IxDyn(&[1, 1, 2]), vec![0.5f64, 1.5]).unwrap();
        let right = Array::from_shape_vec(IxDyn(&[1, 1, 2]), vec![7u8, 9]).unwrap();
        crate::data::fixtures::write_entries(
            &path,
            vec![("left", ArchiveEntry::F64(left)), ("right", ArchiveEntry::U8(right))],
        );

        let pairs = read_data(&path, false).unwrap();
        assert_eq!(pairs.left.values_at(0), Some(&[0.5, 1.5][..]));
        assert_eq!(pairs.right.values_at(0), Some(&[7.0, 9.0][..]));
    }

    #[test]
    fn test_reads_score_archive() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("score.npz");
        let target = Array::from_shape_vec(IxDyn(&[2, 2]), vec![0.0f32, 0.1, 0.2, 0.3]).unwrap();
        crate::data::fixtures::write_entries(
            &path,
            vec![
                ("target", ArchiveEntry::F32(target)),
                ("candidates", ArchiveEntry::F32(crate::data::fixtures::patch_array(3, 2, 2, 1, 0.0))),
            ],
        );

        let (target, candidates) = read_score_data(&path).unwrap();
        assert_eq!(target.values(), &[0.0f32, 0.1, 0.2, 0.3][..]);
        assert_eq!(candidates.len(), 3);
        assert!(candidates.iter().all(|c| c.shape() == target.shape()));
    }
}
