//! Inference pipeline driving one chunk end-to-end.
//!
//! The [`Inferencer`] exposes a simple API: feed a volume and get the
//! blended, normalized output volume. Internally it coordinates the grid
//! planner, the batch scheduler in front of the patch transform, and the
//! overlap-add accumulator, then applies the optional crop and mask-channel
//! post-processing.
//!
//! Typical usage:
//! ```no_run
//! use block_inference::engine::{Inferencer, InferenceParams};
//! use block_inference::transform::IdentityTransform;
//! use block_inference::volume::VolumeU8;
//!
//! # fn example(image: VolumeU8) -> block_inference::Result<()> {
//! let params = InferenceParams {
//!     input_patch_size: [10, 128, 128],
//!     output_patch_overlap: [2, 32, 32],
//!     num_output_channels: 1,
//!     ..Default::default()
//! };
//! let transform = IdentityTransform::new([10, 128, 128], [10, 128, 128], 1)?;
//! let mut inferencer = Inferencer::new(params, Box::new(transform))?;
//! let output = inferencer.process(&image)?;
//! println!("output channels={} size={:?}", output.channels, output.size);
//! # Ok(())
//! # }
//! ```
use super::params::InferenceParams;
use crate::accumulator::OverlapAddAccumulator;
use crate::bump::{BumpField, BumpFieldCache};
use crate::diagnostics::{InferenceReport, TimingBreakdown};
use crate::error::{InferenceError, Result};
use crate::grid::{self, PatchGrid, PatchPlacement};
use crate::scheduler::BatchScheduler;
use crate::transform::PatchTransform;
use crate::volume::{VolumeF32, VolumeU8};
use log::debug;
use std::time::Instant;

/// Patch-based block inference engine.
///
/// Construction validates the configuration and cross-checks it against the
/// shapes the transform declares; processing is then a plain synchronous
/// call chain per chunk.
pub struct Inferencer {
    params: InferenceParams,
    transform: Box<dyn PatchTransform>,
    bump_cache: BumpFieldCache,
}

impl Inferencer {
    pub fn new(params: InferenceParams, transform: Box<dyn PatchTransform>) -> Result<Self> {
        params.validate()?;
        if transform.num_output_channels() != params.num_output_channels {
            return Err(InferenceError::Config(format!(
                "transform declares {} output channels, params expect {}",
                transform.num_output_channels(),
                params.num_output_channels
            )));
        }
        // The nominal patch shapes only matter when tiling; whole-chunk
        // mode feeds the transform whatever the chunk happens to be.
        if !params.mask_output_chunk {
            if transform.input_patch_size() != params.input_patch_size {
                return Err(InferenceError::Config(format!(
                    "transform input patch {:?} does not match configured {:?}",
                    transform.input_patch_size(),
                    params.input_patch_size
                )));
            }
            if transform.output_patch_size() != params.output_patch_size() {
                return Err(InferenceError::Config(format!(
                    "transform output patch {:?} does not match configured {:?}",
                    transform.output_patch_size(),
                    params.output_patch_size()
                )));
            }
        }
        let bump = params.bump;
        Ok(Self {
            params,
            transform,
            bump_cache: BumpFieldCache::new(bump),
        })
    }

    pub fn params(&self) -> &InferenceParams {
        &self.params
    }

    /// Run inference on an 8-bit volume (normalized to [0, 1] internally).
    pub fn process(&mut self, image: &VolumeU8) -> Result<VolumeF32> {
        Ok(self.process_with_diagnostics(image)?.0)
    }

    /// Run inference and return the per-stage report alongside the output.
    pub fn process_with_diagnostics(
        &mut self,
        image: &VolumeU8,
    ) -> Result<(VolumeF32, InferenceReport)> {
        self.run(image.to_f32_normalized())
    }

    /// Run inference on an already-normalized single-channel f32 volume.
    pub fn process_f32(&mut self, volume: &VolumeF32) -> Result<VolumeF32> {
        if volume.channels != 1 {
            return Err(InferenceError::Config(format!(
                "input volume must have a single channel, got {}",
                volume.channels
            )));
        }
        Ok(self.run(volume.clone())?.0)
    }

    fn run(&mut self, working: VolumeF32) -> Result<(VolumeF32, InferenceReport)> {
        let total_start = Instant::now();
        let input_size = working.size;
        let channels = self.params.num_output_channels;
        debug!(
            "Inferencer::process start size={:?} offset={:?} whole_chunk={}",
            input_size, working.offset, self.params.mask_output_chunk
        );

        let plan_start = Instant::now();
        let (grid, weights, patch_size) = self.plan_call(input_size)?;
        let plan_ms = plan_start.elapsed().as_secs_f64() * 1000.0;
        debug!(
            "planned {} placements ({:?} per axis)",
            grid.len(),
            grid.patch_num
        );

        let expected_output = weights.size;
        let mut accumulator = OverlapAddAccumulator::new(
            channels,
            input_size,
            working.offset,
            patch_size,
            weights,
            grid.len(),
        );

        // Whole-chunk mode runs its single patch as one batch.
        let batch_size = if self.params.mask_output_chunk {
            1
        } else {
            self.params.batch_size
        };

        let patch_start = Instant::now();
        let mut scheduler = BatchScheduler::new(
            self.transform.as_mut(),
            batch_size,
            expected_output,
            channels,
        );
        for placement in &grid.placements {
            let patch = working.slice(placement.start, patch_size)?;
            for (done, output) in scheduler.push(*placement, patch)? {
                accumulator.deposit(&done, &output)?;
            }
        }
        for (done, output) in scheduler.flush()? {
            accumulator.deposit(&done, &output)?;
        }
        let batch_count = scheduler.batches_run();
        drop(scheduler);
        let patch_ms = patch_start.elapsed().as_secs_f64() * 1000.0;

        let finalize_start = Instant::now();
        let mut output = accumulator.finalize()?;
        let finalize_ms = finalize_start.elapsed().as_secs_f64() * 1000.0;

        let post_start = Instant::now();
        if let Some(margin) = self.params.output_crop_margin {
            output = output.crop_margin(margin)?;
        }
        if let Some(threshold) = self.params.mask_channel_threshold {
            output = apply_mask_channel(output, threshold);
        }
        let postprocess_ms = post_start.elapsed().as_secs_f64() * 1000.0;

        let total_ms = total_start.elapsed().as_secs_f64() * 1000.0;
        debug!(
            "Inferencer::process done size={:?} channels={} batches={} total_ms={:.3}",
            output.size, output.channels, batch_count, total_ms
        );
        let report = InferenceReport {
            input_size,
            output_size: output.size,
            output_channels: output.channels,
            patch_count: grid.len(),
            batch_count,
            whole_chunk: self.params.mask_output_chunk,
            timing: TimingBreakdown {
                plan_ms,
                patch_ms,
                finalize_ms,
                postprocess_ms,
                total_ms,
            },
        };
        Ok((output, report))
    }

    /// Placement grid, weight field and input patch shape for one call.
    fn plan_call(&mut self, input_size: [usize; 3]) -> Result<(PatchGrid, BumpField, [usize; 3])> {
        if self.params.mask_output_chunk {
            // Whole-chunk shortcut: one placement, uniform weight, blending
            // a no-op division by 1.
            let grid = PatchGrid {
                patch_num: [1, 1, 1],
                placements: vec![PatchPlacement {
                    index: [0, 0, 0],
                    start: [0, 0, 0],
                    size: input_size,
                }],
            };
            return Ok((grid, BumpField::uniform(input_size), input_size));
        }

        let patch_size = self.params.input_patch_size;
        let overlap = self.input_space_overlap();
        let grid = grid::plan(input_size, patch_size, overlap, self.params.patch_num)?;
        let weights = self.bump_cache.get(self.params.output_patch_size()).clone();
        Ok((grid, weights, patch_size))
    }

    /// Configured overlap expressed in input coordinates. Identical to the
    /// output overlap unless the transform resizes patches.
    fn input_space_overlap(&self) -> [usize; 3] {
        let inp = self.params.input_patch_size;
        let out = self.params.output_patch_size();
        let ov = self.params.output_patch_overlap;
        let mut scaled = [0usize; 3];
        for a in 0..3 {
            scaled[a] = if inp[a] == out[a] {
                ov[a]
            } else {
                ((ov[a] * inp[a]) as f64 / out[a] as f64).round() as usize
            };
        }
        scaled
    }
}

/// Threshold the trailing mask channel and suppress the other channels
/// where it fires; the mask channel itself is dropped.
fn apply_mask_channel(volume: VolumeF32, threshold: f32) -> VolumeF32 {
    let kept = volume.channels - 1;
    let voxels = volume.voxels_per_channel();
    let mut out = VolumeF32 {
        channels: kept,
        size: volume.size,
        offset: volume.offset,
        data: volume.data[..kept * voxels].to_vec(),
    };
    let mask = volume.channel(kept);
    for c in 0..kept {
        for (v, &m) in out.channel_mut(c).iter_mut().zip(mask) {
            if m > threshold {
                *v = 0.0;
            }
        }
    }
    out
}
