//! Parameter types configuring the inference engine.
//!
//! All combinations are validated at construction, before any volume is
//! processed; nothing here is re-checked per patch.

use crate::bump::BumpKind;
use crate::error::{InferenceError, Result};
use serde::{Deserialize, Serialize};

/// Engine-wide parameters controlling patch geometry and post-processing.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceParams {
    /// Spatial shape of transform input patches, (z, y, x).
    pub input_patch_size: [usize; 3],
    /// Spatial shape of transform output patches. `None` means equal to
    /// the input patch shape.
    pub output_patch_size: Option<[usize; 3]>,
    /// Overlap between neighbouring output patches, (z, y, x).
    pub output_patch_overlap: [usize; 3],
    /// Channels produced by the transform.
    pub num_output_channels: usize,
    /// Patches grouped per transform invocation.
    pub batch_size: usize,
    /// Explicit per-axis patch counts. `None` derives the counts from the
    /// input size.
    pub patch_num: Option<[usize; 3]>,
    /// Bump function family used for blending weights.
    pub bump: BumpKind,
    /// Treat the whole input chunk as a single patch: no planning, no
    /// blending, uniform weight 1. Supports inputs smaller than one
    /// nominal patch at the cost of seamlessness.
    pub mask_output_chunk: bool,
    /// Symmetric crop applied to the normalized output, (z, y, x).
    pub output_crop_margin: Option<[usize; 3]>,
    /// Threshold for the trailing mask channel: where the last channel
    /// exceeds it, the remaining channels are zeroed, and the mask channel
    /// is dropped from the returned volume.
    pub mask_channel_threshold: Option<f32>,
}

impl Default for InferenceParams {
    fn default() -> Self {
        Self {
            input_patch_size: [20, 256, 256],
            output_patch_size: None,
            output_patch_overlap: [4, 64, 64],
            num_output_channels: 3,
            batch_size: 1,
            patch_num: None,
            bump: BumpKind::Wu,
            mask_output_chunk: false,
            output_crop_margin: None,
            mask_channel_threshold: None,
        }
    }
}

impl InferenceParams {
    /// Output patch shape with the default applied.
    pub fn output_patch_size(&self) -> [usize; 3] {
        self.output_patch_size.unwrap_or(self.input_patch_size)
    }

    /// Fail fast on invalid combinations.
    pub fn validate(&self) -> Result<()> {
        let out = self.output_patch_size();
        for a in 0..3 {
            if self.input_patch_size[a] == 0 {
                return Err(InferenceError::Config(format!(
                    "input_patch_size {:?} has a zero axis",
                    self.input_patch_size
                )));
            }
            if out[a] == 0 || out[a] > self.input_patch_size[a] {
                return Err(InferenceError::Config(format!(
                    "output_patch_size {:?} must be positive and no larger than \
                     input_patch_size {:?}",
                    out, self.input_patch_size
                )));
            }
            if (self.input_patch_size[a] - out[a]) % 2 != 0 {
                return Err(InferenceError::Config(format!(
                    "input/output patch difference must be even per axis, \
                     got {:?} vs {:?}",
                    self.input_patch_size, out
                )));
            }
            if self.output_patch_overlap[a] >= out[a] {
                return Err(InferenceError::Config(format!(
                    "output_patch_overlap {:?} must be smaller than the output \
                     patch {:?} on every axis",
                    self.output_patch_overlap, out
                )));
            }
        }
        if self.num_output_channels == 0 {
            return Err(InferenceError::Config(
                "num_output_channels must be positive".into(),
            ));
        }
        if self.batch_size == 0 {
            return Err(InferenceError::Config("batch_size must be positive".into()));
        }
        if let Some(num) = self.patch_num {
            if num.iter().any(|&n| n == 0) {
                return Err(InferenceError::Config(format!(
                    "patch_num {num:?} entries must be positive"
                )));
            }
        }
        if self.mask_channel_threshold.is_some() && self.num_output_channels < 2 {
            return Err(InferenceError::Config(
                "mask_channel_threshold needs at least two output channels \
                 (the last one is the mask)"
                    .into(),
            ));
        }
        Ok(())
    }
}
