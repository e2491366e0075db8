#![doc = include_str!("../README.md")]

// Public modules (stable-ish surface)
pub mod config;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod volume;

// "Expert" modules – still public, but considered unstable internals.
// (You can tighten or feature-gate these later.)
pub mod accumulator;
pub mod bump;
pub mod grid;
pub mod scheduler;
pub mod transform;

// --- High-level re-exports -------------------------------------------------

// Main entry points: engine + parameters.
pub use crate::engine::{InferenceParams, Inferencer};
pub use crate::error::{InferenceError, Result};

// Core containers.
pub use crate::volume::{VolumeF32, VolumeU8};

// Per-invocation diagnostics returned by the engine.
pub use crate::diagnostics::{InferenceReport, TimingBreakdown};

// --- Prelude ---------------------------------------------------------------

/// Small prelude for quick experiments.
///
/// ```no_run
/// use block_inference::prelude::*;
///
/// # fn main() -> Result<()> {
/// let (sz, sy, sx) = (18usize, 224usize, 224usize);
/// let voxels = vec![0u8; sz * sy * sx];
/// let image = VolumeU8 {
///     size: [sz, sy, sx],
///     offset: [0, 0, 0],
///     data: &voxels,
/// };
///
/// let params = InferenceParams {
///     input_patch_size: [10, 128, 128],
///     output_patch_overlap: [2, 32, 32],
///     num_output_channels: 1,
///     ..Default::default()
/// };
/// let transform = IdentityTransform::new([10, 128, 128], [10, 128, 128], 1)?;
/// let mut inferencer = Inferencer::new(params, Box::new(transform))?;
///
/// let output = inferencer.process(&image)?;
/// println!("channels={} size={:?}", output.channels, output.size);
/// # Ok(())
/// # }
/// ```
pub mod prelude {
    pub use crate::engine::{InferenceParams, Inferencer};
    pub use crate::error::{InferenceError, Result};
    pub use crate::transform::{IdentityTransform, PassthroughTransform, PatchTransform};
    pub use crate::volume::{VolumeF32, VolumeU8};
}
