// ============================================================
// Layer 3 - Domain Layer
// ============================================================
// Plain Rust types that describe what the system works on:
// image patches, stacks of patches, and the closed set of
// loss and output modes a run can be configured with.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only structs, enums and traits
//
// Patches are stored channel-first (C x H x W) because that
// is what the convolution layers consume. Archives hold them
// channel-last, so conversion happens once, on the way in.

// Single patches and ordered stacks of patches
pub mod patch;

// Left/right/label triples read from one archive
pub mod pair;

// Loss codes and output modes as closed enums
pub mod modes;

// Core abstractions (traits) that other layers implement
pub mod traits;
