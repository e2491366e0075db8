//! Weighted overlap-add accumulation of output patches.
//!
//! Purpose
//! - Merge overlapping output patches into one seamless volume: each patch
//!   is weighted by its bump field, summed into a chunk-sized buffer, and
//!   the sum is normalized by the accumulated weights.
//!
//! Design
//! - Two buffers, both f32 regardless of the transform's working
//!   precision: `weighted_sum` (channels x chunk) and `weight_sum` (chunk).
//!   They are created zero-filled per engine invocation and consumed by
//!   `finalize`, so partial state from an aborted call is never observable.
//! - Placement starts are mapped from input to output coordinates with
//!   `round(start * out / in)` per axis when the two patch sizes differ.
//! - Element-wise adds commute, so the finalized result does not depend on
//!   deposit order or batch grouping.
//! - Deposits are serial (overlapping patches write overlapping regions);
//!   only the normalization sweep fans out over rows.
use crate::bump::BumpField;
use crate::error::{InferenceError, Result};
use crate::grid::PatchPlacement;
use crate::volume::VolumeF32;
use rayon::prelude::*;

pub struct OverlapAddAccumulator {
    channels: usize,
    input_patch_size: [usize; 3],
    output_size: [usize; 3],
    output_offset: [i32; 3],
    weights: BumpField,
    weighted_sum: Vec<f32>,
    weight_sum: Vec<f32>,
    expected_deposits: usize,
    deposited: usize,
}

/// Map an input-space coordinate or extent to output space.
#[inline]
fn map_axis(value: usize, input_patch: usize, output_patch: usize) -> usize {
    if input_patch == output_patch {
        value
    } else {
        ((value * output_patch) as f64 / input_patch as f64).round() as usize
    }
}

impl OverlapAddAccumulator {
    /// Create zero-filled buffers sized for `input_size`, scaled to output
    /// space when the output patch differs from the input patch.
    ///
    /// `expected_deposits` is the planned placement count; `finalize`
    /// refuses to run until every deposit arrived.
    pub fn new(
        channels: usize,
        input_size: [usize; 3],
        input_offset: [i32; 3],
        input_patch_size: [usize; 3],
        weights: BumpField,
        expected_deposits: usize,
    ) -> Self {
        let output_patch_size = weights.size;
        let output_size = [
            map_axis(input_size[0], input_patch_size[0], output_patch_size[0]),
            map_axis(input_size[1], input_patch_size[1], output_patch_size[1]),
            map_axis(input_size[2], input_patch_size[2], output_patch_size[2]),
        ];
        let voxels = output_size[0] * output_size[1] * output_size[2];
        Self {
            channels,
            input_patch_size,
            output_size,
            output_offset: input_offset,
            weights,
            weighted_sum: vec![0.0; channels * voxels],
            weight_sum: vec![0.0; voxels],
            expected_deposits,
            deposited: 0,
        }
    }

    pub fn output_size(&self) -> [usize; 3] {
        self.output_size
    }

    pub fn deposited(&self) -> usize {
        self.deposited
    }

    /// Weight `patch` by the bump field and add it into the buffers at the
    /// placement's location in output coordinates.
    pub fn deposit(&mut self, placement: &PatchPlacement, patch: &VolumeF32) -> Result<()> {
        let ps = self.weights.size;
        if patch.size != ps || patch.channels != self.channels {
            return Err(InferenceError::ShapeMismatch {
                expected: format!("{} x {:?}", self.channels, ps),
                actual: format!("{} x {:?}", patch.channels, patch.size),
            });
        }
        let out_start = [
            map_axis(placement.start[0], self.input_patch_size[0], ps[0]),
            map_axis(placement.start[1], self.input_patch_size[1], ps[1]),
            map_axis(placement.start[2], self.input_patch_size[2], ps[2]),
        ];
        for a in 0..3 {
            if out_start[a] + ps[a] > self.output_size[a] {
                return Err(InferenceError::Coverage(format!(
                    "patch {:?} deposits at {:?} beyond output extent {:?}",
                    placement.index, out_start, self.output_size
                )));
            }
        }

        let [_, sy, sx] = self.output_size;
        let voxels = self.output_size[0] * sy * sx;
        for z in 0..ps[0] {
            for y in 0..ps[1] {
                let wbase = self.weights.idx(z, y, 0);
                let dst = ((out_start[0] + z) * sy + out_start[1] + y) * sx + out_start[2];
                let wrow = &self.weights.data[wbase..wbase + ps[2]];
                for (acc, &w) in self.weight_sum[dst..dst + ps[2]].iter_mut().zip(wrow) {
                    *acc += w;
                }
                for c in 0..self.channels {
                    let src = patch.idx(c, z, y, 0);
                    let row = &patch.data[src..src + ps[2]];
                    let sums = &mut self.weighted_sum[c * voxels + dst..c * voxels + dst + ps[2]];
                    for ((acc, &v), &w) in sums.iter_mut().zip(row).zip(wrow) {
                        *acc += v * w;
                    }
                }
            }
        }
        self.deposited += 1;
        Ok(())
    }

    /// Normalize and return the blended volume.
    ///
    /// Fails when deposits are missing or any voxel never received weight —
    /// both indicate a planner defect and abort instead of degrading.
    pub fn finalize(self) -> Result<VolumeF32> {
        if self.deposited != self.expected_deposits {
            return Err(InferenceError::Coverage(format!(
                "finalize after {} of {} planned deposits",
                self.deposited, self.expected_deposits
            )));
        }
        if let Some(pos) = self.weight_sum.iter().position(|&w| w == 0.0) {
            return Err(InferenceError::Coverage(format!(
                "voxel at linear index {pos} received zero weight"
            )));
        }

        let mut out = VolumeF32 {
            channels: self.channels,
            size: self.output_size,
            offset: self.output_offset,
            data: self.weighted_sum,
        };
        let sx = self.output_size[2];
        let weight_sum = self.weight_sum;
        for c in 0..self.channels {
            out.channel_mut(c)
                .par_chunks_mut(sx)
                .zip(weight_sum.par_chunks(sx))
                .for_each(|(row, wrow)| {
                    for (v, &w) in row.iter_mut().zip(wrow) {
                        *v /= w.max(f32::MIN_POSITIVE);
                    }
                });
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bump::{BumpField, BumpKind};

    fn placement(start: [usize; 3], size: [usize; 3]) -> PatchPlacement {
        PatchPlacement {
            index: [0, 0, 0],
            start,
            size,
        }
    }

    fn constant_patch(channels: usize, size: [usize; 3], v: f32) -> VolumeF32 {
        let mut p = VolumeF32::new(channels, size);
        p.data.fill(v);
        p
    }

    #[test]
    fn single_uniform_patch_round_trips() {
        let weights = BumpField::uniform([2, 3, 4]);
        let mut acc = OverlapAddAccumulator::new(1, [2, 3, 4], [5, 6, 7], [2, 3, 4], weights, 1);
        let mut patch = VolumeF32::new(1, [2, 3, 4]);
        for (i, v) in patch.data.iter_mut().enumerate() {
            *v = i as f32 * 0.01;
        }
        acc.deposit(&placement([0, 0, 0], [2, 3, 4]), &patch).unwrap();
        let out = acc.finalize().unwrap();
        assert_eq!(out.offset, [5, 6, 7]);
        for (a, b) in out.data.iter().zip(&patch.data) {
            assert_eq!(a, b);
        }
    }

    #[test]
    fn overlapping_constant_patches_blend_to_constant() {
        let size = [4, 4, 4];
        let weights = BumpField::generate(BumpKind::Wu, size);
        // Two patches overlapping on z in [2, 4) of a 6-deep chunk.
        let mut acc = OverlapAddAccumulator::new(1, [6, 4, 4], [0; 3], size, weights, 2);
        let patch = constant_patch(1, size, 0.5);
        acc.deposit(&placement([0, 0, 0], size), &patch).unwrap();
        acc.deposit(&placement([2, 0, 0], size), &patch).unwrap();
        let out = acc.finalize().unwrap();
        for &v in &out.data {
            assert!((v - 0.5).abs() < 1e-6, "blended value {v}");
        }
    }

    #[test]
    fn deposit_order_does_not_change_result() {
        let size = [4, 4, 4];
        let mut patches = Vec::new();
        for i in 0..3usize {
            let start = [i * 2, 0, 0];
            let mut p = VolumeF32::new(1, size);
            for (j, v) in p.data.iter_mut().enumerate() {
                *v = ((i * 37 + j * 11) % 251) as f32 / 251.0;
            }
            patches.push((placement(start, size), p));
        }
        let run = |order: &[usize]| {
            let weights = BumpField::generate(BumpKind::Hann, size);
            let mut acc = OverlapAddAccumulator::new(1, [8, 4, 4], [0; 3], size, weights, 3);
            for &i in order {
                acc.deposit(&patches[i].0, &patches[i].1).unwrap();
            }
            acc.finalize().unwrap()
        };
        let fwd = run(&[0, 1, 2]);
        let rev = run(&[2, 1, 0]);
        for (a, b) in fwd.data.iter().zip(&rev.data) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn finalize_requires_all_planned_deposits() {
        let weights = BumpField::uniform([2, 2, 2]);
        let acc = OverlapAddAccumulator::new(1, [2, 2, 2], [0; 3], [2, 2, 2], weights, 2);
        let err = acc.finalize().unwrap_err();
        assert!(matches!(err, InferenceError::Coverage(_)));
    }

    #[test]
    fn uncovered_voxels_fail_loudly() {
        let weights = BumpField::uniform([2, 2, 2]);
        let mut acc = OverlapAddAccumulator::new(1, [4, 4, 4], [0; 3], [2, 2, 2], weights, 1);
        let patch = constant_patch(1, [2, 2, 2], 1.0);
        acc.deposit(&placement([0, 0, 0], [2, 2, 2]), &patch).unwrap();
        let err = acc.finalize().unwrap_err();
        assert!(matches!(err, InferenceError::Coverage(_)));
    }

    #[test]
    fn placement_starts_map_to_output_space() {
        // Input patches of 4 produce output patches of 2: starts halve.
        let weights = BumpField::uniform([2, 2, 2]);
        let mut acc = OverlapAddAccumulator::new(1, [8, 4, 4], [0; 3], [4, 4, 4], weights, 3);
        assert_eq!(acc.output_size(), [4, 2, 2]);
        let patch = constant_patch(1, [2, 2, 2], 1.0);
        for start in [[0, 0, 0], [2, 0, 0], [4, 0, 0]] {
            acc.deposit(&placement(start, [4, 4, 4]), &patch).unwrap();
        }
        let out = acc.finalize().unwrap();
        assert_eq!(out.size, [4, 2, 2]);
        for &v in &out.data {
            assert_eq!(v, 1.0);
        }
    }

    #[test]
    fn mismatched_patch_shape_is_rejected() {
        let weights = BumpField::uniform([2, 2, 2]);
        let mut acc = OverlapAddAccumulator::new(1, [2, 2, 2], [0; 3], [2, 2, 2], weights, 1);
        let patch = constant_patch(1, [3, 2, 2], 1.0);
        let err = acc
            .deposit(&placement([0, 0, 0], [2, 2, 2]), &patch)
            .unwrap_err();
        assert!(matches!(err, InferenceError::ShapeMismatch { .. }));
    }
}
