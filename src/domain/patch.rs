// ============================================================
// Layer 3 - Patch Domain Types
// ============================================================
// A Patch is one fixed-size image region. A PatchStack is an
// ordered sequence of same-shaped patches, i.e. one `left` or
// `right` entry of a pair archive.
//
// Both accept channel-last input, the layout numpy archives
// use:
//   single patch:  [H, W]    or [H, W, C]
//   stack:         [N, H, W] or [N, H, W, C]
// and keep their values channel-first so a patch can be fed
// straight into a [batch, C, H, W] tensor.
//
// No normalisation or value range checks happen here.

use ndarray::{ArrayD, ArrayViewD, Axis, Ix3, Ix4};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SiameseError};

/// Channel/height/width of one patch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchShape {
    pub channels: usize,
    pub height:   usize,
    pub width:    usize,
}

impl PatchShape {
    pub fn new(channels: usize, height: usize, width: usize) -> Self {
        Self { channels, height, width }
    }

    /// Number of scalar values in one patch
    pub fn volume(&self) -> usize {
        self.channels * self.height * self.width
    }

    pub fn dims(&self) -> [usize; 3] {
        [self.channels, self.height, self.width]
    }
}

impl std::fmt::Display for PatchShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}x{}", self.channels, self.height, self.width)
    }
}

// ─── Patch ────────────────────────────────────────────────────────────────────

/// One image patch, values in channel-first order.
#[derive(Debug, Clone, PartialEq)]
pub struct Patch {
    shape:  PatchShape,
    values: Vec<f32>,
}

impl Patch {
    /// Build a patch from channel-first values
    pub fn new(shape: PatchShape, values: Vec<f32>) -> Result<Self> {
        if values.len() != shape.volume() {
            return Err(SiameseError::Shape(format!(
                "patch {} needs {} values, got {}",
                shape,
                shape.volume(),
                values.len()
            )));
        }
        Ok(Self { shape, values })
    }

    /// Build a patch from a channel-last view shaped [H, W] or [H, W, C]
    pub fn from_hwc(view: ArrayViewD<'_, f32>) -> Result<Self> {
        let view = match view.ndim() {
            2 => view.insert_axis(Axis(2)),
            3 => view,
            n => {
                return Err(SiameseError::Shape(format!(
                    "a patch must be [H, W] or [H, W, C], got {n} dimensions"
                )))
            }
        };
        let view = view
            .into_dimensionality::<Ix3>()
            .map_err(|e| SiameseError::Shape(e.to_string()))?;
        let (height, width, channels) = view.dim();

        // permuted view iterates in logical (C, H, W) order
        let values: Vec<f32> = view.permuted_axes([2, 0, 1]).iter().copied().collect();
        Self::new(PatchShape::new(channels, height, width), values)
    }

    pub fn shape(&self) -> PatchShape {
        self.shape
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }
}

// ─── PatchStack ───────────────────────────────────────────────────────────────

/// An ordered, index-addressable sequence of same-shaped patches.
#[derive(Debug, Clone, PartialEq)]
pub struct PatchStack {
    shape:  PatchShape,
    count:  usize,
    values: Vec<f32>,
}

impl PatchStack {
    /// Build a stack from a channel-last array shaped [N, H, W] or [N, H, W, C]
    pub fn from_array(array: ArrayD<f32>) -> Result<Self> {
        let array = match array.ndim() {
            3 => array.insert_axis(Axis(3)),
            4 => array,
            n => {
                return Err(SiameseError::Shape(format!(
                    "a patch stack must be [N, H, W] or [N, H, W, C], got {n} dimensions"
                )))
            }
        };
        let array = array
            .into_dimensionality::<Ix4>()
            .map_err(|e| SiameseError::Shape(e.to_string()))?;
        let (count, height, width, channels) = array.dim();

        let values: Vec<f32> = array.permuted_axes([0, 3, 1, 2]).iter().copied().collect();
        Ok(Self {
            shape: PatchShape::new(channels, height, width),
            count,
            values,
        })
    }

    /// Stack already-built patches. All patches must share one shape.
    pub fn from_patches(patches: &[Patch]) -> Result<Self> {
        let shape = match patches.first() {
            Some(p) => p.shape(),
            None => {
                return Err(SiameseError::Shape(
                    "cannot stack an empty list of patches".to_string(),
                ))
            }
        };
        let mut values = Vec::with_capacity(shape.volume() * patches.len());
        for (i, patch) in patches.iter().enumerate() {
            if patch.shape() != shape {
                return Err(SiameseError::Shape(format!(
                    "patch {i} is {} but patch 0 is {}",
                    patch.shape(),
                    shape
                )));
            }
            values.extend_from_slice(patch.values());
        }
        Ok(Self { shape, count: patches.len(), values })
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn shape(&self) -> PatchShape {
        self.shape
    }

    /// Channel-first values of the patch at `index`
    pub fn values_at(&self, index: usize) -> Option<&[f32]> {
        if index >= self.count {
            return None;
        }
        let volume = self.shape.volume();
        Some(&self.values[index * volume..(index + 1) * volume])
    }

    pub fn patch(&self, index: usize) -> Option<Patch> {
        self.values_at(index).map(|values| Patch {
            shape:  self.shape,
            values: values.to_vec(),
        })
    }

    /// Split into `[0, at)` and `[at, len)`, keeping order
    pub fn split_at(mut self, at: usize) -> (PatchStack, PatchStack) {
        let at   = at.min(self.count);
        let tail = self.values.split_off(at * self.shape.volume());
        let rest = PatchStack {
            shape:  self.shape,
            count:  self.count - at,
            values: tail,
        };
        self.count = at;
        (self, rest)
    }
}
