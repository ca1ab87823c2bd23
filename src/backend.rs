// ============================================================
// Backend Selection
// ============================================================
// One place decides which Burn backend the binary runs on.
//
//   default build     → NdArray (CPU)
//   --features wgpu   → Wgpu (GPU via WebGPU)
//
// Training wraps the backend in Autodiff; prediction and
// scoring run on the plain backend.

#[cfg(not(feature = "wgpu"))]
pub type InferBackend = burn::backend::NdArray;

#[cfg(feature = "wgpu")]
pub type InferBackend = burn::backend::Wgpu;

pub type TrainBackend = burn::backend::Autodiff<InferBackend>;

pub fn backend_name() -> &'static str {
    if cfg!(feature = "wgpu") { "wgpu" } else { "ndarray" }
}
