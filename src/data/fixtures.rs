//! Small archives for tests. Values are deterministic so two
//! archives written with the same arguments are identical.

use std::{fs::File, path::Path};

use ndarray::{Array, ArrayD, IxDyn};
use ndarray_npy::NpzWriter;

use crate::domain::{pair::PairArchive, patch::PatchStack};

pub(crate) enum ArchiveEntry {
    F32(ArrayD<f32>),
    F64(ArrayD<f64>),
    U8(ArrayD<u8>),
}

pub(crate) fn write_entries(path: &Path, entries: Vec<(&str, ArchiveEntry)>) {
    let mut npz = NpzWriter::new_compressed(File::create(path).unwrap());
    for (name, entry) in entries {
        match entry {
            ArchiveEntry::F32(a) => npz.add_array(name, &a).unwrap(),
            ArchiveEntry::F64(a) => npz.add_array(name, &a).unwrap(),
            ArchiveEntry::U8(a)  => npz.add_array(name, &a).unwrap(),
        }
    }
    npz.finish().unwrap();
}

/// Channel-last stack of `n` patches; grayscale stacks are written 3-D
pub(crate) fn patch_array(n: usize, h: usize, w: usize, c: usize, offset: f32) -> ArrayD<f32> {
    let len    = n * h * w * c;
    let values = (0..len).map(|i| offset + (i % 17) as f32 / 17.0).collect();
    let shape  = if c == 1 { vec![n, h, w] } else { vec![n, h, w, c] };
    Array::from_shape_vec(IxDyn(&shape), values).unwrap()
}

pub(crate) fn write_archive(
    path:   &Path,
    n:      usize,
    h:      usize,
    w:      usize,
    c:      usize,
    labels: Option<&[f32]>,
) {
    let mut entries = vec![
        ("left",  ArchiveEntry::F32(patch_array(n, h, w, c, 0.0))),
        ("right", ArchiveEntry::F32(patch_array(n, h, w, c, 0.25))),
    ];
    if let Some(labels) = labels {
        let label = Array::from_shape_vec(IxDyn(&[labels.len()]), labels.to_vec()).unwrap();
        entries.push(("label", ArchiveEntry::F32(label)));
    }
    write_entries(path, entries);
}

/// In-memory grayscale archive
pub(crate) fn pair_archive(n: usize, h: usize, w: usize, labels: Option<Vec<f32>>) -> PairArchive {
    PairArchive::new(
        PatchStack::from_array(patch_array(n, h, w, 1, 0.0)).unwrap(),
        PatchStack::from_array(patch_array(n, h, w, 1, 0.25)).unwrap(),
        labels,
    )
    .unwrap()
}
