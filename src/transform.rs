//! Capability boundary to the per-patch computational transform.
//!
//! The engine treats the transform as an opaque blocking call with fixed
//! declared shapes: a batch of input patches goes in, the same number of
//! output patches comes out, `result[i]` belonging to `batch[i]`. The
//! concrete transform is chosen at construction time — the built-in
//! identity/passthrough variants below for self-testing, or an external
//! implementation of [`PatchTransform`] for real workloads. Whatever the
//! transform does internally (device placement, its own batching) is
//! invisible here; its failures surface as transform errors and are never
//! retried by the engine.
use crate::error::{InferenceError, Result};
use crate::volume::VolumeF32;

/// A fixed-shape batched patch transform.
pub trait PatchTransform {
    /// Declared spatial shape of input patches, (z, y, x).
    fn input_patch_size(&self) -> [usize; 3];

    /// Declared spatial shape of output patches, (z, y, x).
    fn output_patch_size(&self) -> [usize; 3];

    /// Number of channels in each output patch.
    fn num_output_channels(&self) -> usize;

    /// Run the transform on an ordered batch.
    ///
    /// Implementations must return exactly one output per input, in the
    /// same order.
    fn forward(&mut self, batch: Vec<VolumeF32>) -> Result<Vec<VolumeF32>>;
}

/// Self-test transform: output is the input, centre-cropped to the output
/// patch shape and replicated across the configured channel count.
pub struct IdentityTransform {
    input_patch_size: [usize; 3],
    output_patch_size: [usize; 3],
    num_output_channels: usize,
    margin: [usize; 3],
}

impl IdentityTransform {
    pub fn new(
        input_patch_size: [usize; 3],
        output_patch_size: [usize; 3],
        num_output_channels: usize,
    ) -> Result<Self> {
        if num_output_channels == 0 {
            return Err(InferenceError::Config(
                "identity transform needs at least one output channel".into(),
            ));
        }
        let mut margin = [0usize; 3];
        for a in 0..3 {
            if output_patch_size[a] > input_patch_size[a] {
                return Err(InferenceError::Config(format!(
                    "identity transform cannot grow patches: output {:?} exceeds input {:?}",
                    output_patch_size, input_patch_size
                )));
            }
            let diff = input_patch_size[a] - output_patch_size[a];
            if diff % 2 != 0 {
                return Err(InferenceError::Config(format!(
                    "input/output patch difference must be even for a centred crop, \
                     got {:?} vs {:?}",
                    input_patch_size, output_patch_size
                )));
            }
            margin[a] = diff / 2;
        }
        Ok(Self {
            input_patch_size,
            output_patch_size,
            num_output_channels,
            margin,
        })
    }
}

impl PatchTransform for IdentityTransform {
    fn input_patch_size(&self) -> [usize; 3] {
        self.input_patch_size
    }

    fn output_patch_size(&self) -> [usize; 3] {
        self.output_patch_size
    }

    fn num_output_channels(&self) -> usize {
        self.num_output_channels
    }

    fn forward(&mut self, batch: Vec<VolumeF32>) -> Result<Vec<VolumeF32>> {
        let mut outputs = Vec::with_capacity(batch.len());
        for patch in batch {
            // Crop by the fixed margin relative to the actual patch extent,
            // so whole-chunk-sized patches pass through when the margin is 0.
            let size = [
                patch.size[0] - 2 * self.margin[0],
                patch.size[1] - 2 * self.margin[1],
                patch.size[2] - 2 * self.margin[2],
            ];
            let cropped = patch.slice(self.margin, size)?;
            let mut out = VolumeF32::new(self.num_output_channels, size).with_offset(cropped.offset);
            for c in 0..self.num_output_channels {
                out.channel_mut(c).copy_from_slice(cropped.channel(0));
            }
            outputs.push(out);
        }
        Ok(outputs)
    }
}

/// Minimal batched variant: patches pass through untouched, one channel,
/// equal input and output shapes.
pub struct PassthroughTransform {
    patch_size: [usize; 3],
}

impl PassthroughTransform {
    pub fn new(patch_size: [usize; 3]) -> Self {
        Self { patch_size }
    }
}

impl PatchTransform for PassthroughTransform {
    fn input_patch_size(&self) -> [usize; 3] {
        self.patch_size
    }

    fn output_patch_size(&self) -> [usize; 3] {
        self.patch_size
    }

    fn num_output_channels(&self) -> usize {
        1
    }

    fn forward(&mut self, batch: Vec<VolumeF32>) -> Result<Vec<VolumeF32>> {
        Ok(batch)
    }
}
