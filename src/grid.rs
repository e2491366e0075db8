//! Patch placement planning over one input chunk.
//!
//! Purpose
//! - Decide where every fixed-shape patch lands inside the input volume so
//!   that the union of placements covers the whole extent, without padding,
//!   for aligned and non-aligned input sizes alike.
//!
//! Design
//! - Per-axis start positions are computed independently and combined into
//!   a z-major (then y, then x) grid, so result reassembly by patch index
//!   is reproducible.
//! - Size-driven mode derives the per-axis count from the input size and
//!   stride `patch - overlap`, and pulls the final start back so the last
//!   patch ends exactly at the input boundary.
//! - Explicit mode takes the per-axis count from configuration and derives
//!   the stride as `(input - patch) / (count - 1)`.
//! - Every plan is verified for coverage completeness before it is used; a
//!   gap or shortfall aborts the invocation rather than producing a
//!   silently incomplete output.
use crate::error::{InferenceError, Result};

/// One planned patch location, in local input coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PatchPlacement {
    /// Grid index in (z, y, x) order.
    pub index: [usize; 3],
    /// Start voxel of the patch in (z, y, x) order.
    pub start: [usize; 3],
    /// Patch extent in (z, y, x) order.
    pub size: [usize; 3],
}

/// Ordered set of placements covering one input chunk.
#[derive(Clone, Debug)]
pub struct PatchGrid {
    /// Patches per axis in (z, y, x) order.
    pub patch_num: [usize; 3],
    /// Placements in z-major, then y, then x order.
    pub placements: Vec<PatchPlacement>,
}

impl PatchGrid {
    pub fn len(&self) -> usize {
        self.placements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }
}

/// Plan patch placements for `input_size`.
///
/// With `patch_num` the per-axis counts are explicit; otherwise they are
/// derived from the input size and `overlap`. The returned grid is verified
/// for coverage completeness on every axis.
pub fn plan(
    input_size: [usize; 3],
    patch_size: [usize; 3],
    overlap: [usize; 3],
    patch_num: Option<[usize; 3]>,
) -> Result<PatchGrid> {
    let mut axis_starts: [Vec<usize>; 3] = [Vec::new(), Vec::new(), Vec::new()];
    for a in 0..3 {
        axis_starts[a] = match patch_num {
            Some(num) => explicit_starts(input_size[a], patch_size[a], num[a])?,
            None => size_driven_starts(input_size[a], patch_size[a], overlap[a])?,
        };
        verify_axis_coverage(a, input_size[a], patch_size[a], &axis_starts[a])?;
    }

    let patch_num = [
        axis_starts[0].len(),
        axis_starts[1].len(),
        axis_starts[2].len(),
    ];
    let mut placements = Vec::with_capacity(patch_num[0] * patch_num[1] * patch_num[2]);
    for (iz, &z) in axis_starts[0].iter().enumerate() {
        for (iy, &y) in axis_starts[1].iter().enumerate() {
            for (ix, &x) in axis_starts[2].iter().enumerate() {
                placements.push(PatchPlacement {
                    index: [iz, iy, ix],
                    start: [z, y, x],
                    size: patch_size,
                });
            }
        }
    }
    Ok(PatchGrid {
        patch_num,
        placements,
    })
}

/// Starts for one axis with a caller-supplied patch count.
fn explicit_starts(input: usize, patch: usize, num: usize) -> Result<Vec<usize>> {
    if num == 0 {
        return Err(InferenceError::Config(
            "patch_num entries must be positive".into(),
        ));
    }
    if num == 1 {
        // Single patch flush at the origin; the coverage check reports any
        // shortfall against the input extent.
        return Ok(vec![0]);
    }
    if patch > input {
        return Err(InferenceError::Config(format!(
            "patch size {patch} exceeds input extent {input} (negative stride)"
        )));
    }
    let stride = (input - patch) / (num - 1);
    Ok((0..num).map(|i| i * stride).collect())
}

/// Starts for one axis derived from the input size.
///
/// The final start is pulled back so the last patch ends exactly at the
/// input boundary, which keeps non-multiple input sizes fully covered.
fn size_driven_starts(input: usize, patch: usize, overlap: usize) -> Result<Vec<usize>> {
    if patch > input {
        return Err(InferenceError::Config(format!(
            "patch size {patch} exceeds input extent {input}; \
             whole-chunk mode handles inputs smaller than one patch"
        )));
    }
    if overlap >= patch {
        return Err(InferenceError::Config(format!(
            "overlap {overlap} must be smaller than patch size {patch}"
        )));
    }
    let stride = patch - overlap;
    let num = (input - overlap).div_ceil(stride).max(1);
    let last = input - patch;
    Ok((0..num).map(|i| (i * stride).min(last)).collect())
}

/// Coverage completeness on one axis: placements begin at 0, touch or
/// overlap each other, and end exactly at the input boundary.
fn verify_axis_coverage(axis: usize, input: usize, patch: usize, starts: &[usize]) -> Result<()> {
    let Some((&first, &last)) = starts.first().zip(starts.last()) else {
        return Err(InferenceError::Coverage(format!(
            "axis {axis}: no placements planned"
        )));
    };
    if first != 0 {
        return Err(InferenceError::Coverage(format!(
            "axis {axis}: first patch starts at {first}, not 0"
        )));
    }
    for w in starts.windows(2) {
        if w[1] > w[0] + patch {
            return Err(InferenceError::Coverage(format!(
                "axis {axis}: gap between patch at {} and patch at {}",
                w[0], w[1]
            )));
        }
    }
    if last + patch != input {
        return Err(InferenceError::Coverage(format!(
            "axis {axis}: coverage ends at {} but input extent is {input}",
            last + patch
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_driven_aligned_counts_and_strides() {
        let grid = plan([18, 224, 224], [10, 128, 128], [2, 32, 32], None).unwrap();
        assert_eq!(grid.patch_num, [2, 2, 2]);
        assert_eq!(grid.len(), 8);
        let first = grid.placements[0];
        assert_eq!(first.start, [0, 0, 0]);
        let last = grid.placements[7];
        assert_eq!(last.start, [8, 96, 96]);
        assert_eq!(last.index, [1, 1, 1]);
    }

    #[test]
    fn size_driven_pulls_back_on_non_aligned_input() {
        // 21 = 2 * 8 + 5: third patch would start at 16 and overrun, so it
        // is pulled back to 11.
        let starts = size_driven_starts(21, 10, 2).unwrap();
        assert_eq!(starts, vec![0, 8, 11]);
        verify_axis_coverage(0, 21, 10, &starts).unwrap();
    }

    #[test]
    fn size_driven_single_patch_exact_fit() {
        let starts = size_driven_starts(10, 10, 2).unwrap();
        assert_eq!(starts, vec![0]);
        verify_axis_coverage(0, 10, 10, &starts).unwrap();
    }

    #[test]
    fn size_driven_rejects_patch_larger_than_input() {
        assert!(matches!(
            size_driven_starts(8, 10, 2),
            Err(InferenceError::Config(_))
        ));
    }

    #[test]
    fn explicit_count_aligned() {
        let grid = plan([60, 448, 448], [32, 256, 256], [4, 64, 64], Some([2, 2, 2])).unwrap();
        assert_eq!(grid.patch_num, [2, 2, 2]);
        assert_eq!(grid.placements[0].start, [0, 0, 0]);
        assert_eq!(grid.placements[7].start, [28, 192, 192]);
    }

    #[test]
    fn explicit_count_rejects_negative_stride() {
        assert!(matches!(
            explicit_starts(20, 32, 2),
            Err(InferenceError::Config(_))
        ));
    }

    #[test]
    fn explicit_count_misaligned_fails_coverage() {
        // stride truncates to (61 - 32) / 1 = 29, last patch ends at 61: ok.
        let starts = explicit_starts(61, 32, 2).unwrap();
        verify_axis_coverage(0, 61, 32, &starts).unwrap();
        // (63 - 32) / 2 = 15: placements end at 62, one voxel short.
        let err = plan([63, 63, 63], [32, 32, 32], [0, 0, 0], Some([3, 3, 3])).unwrap_err();
        assert!(matches!(err, InferenceError::Coverage(_)));
    }

    #[test]
    fn explicit_count_with_gap_fails_coverage() {
        let err = plan([100, 100, 100], [10, 10, 10], [0, 0, 0], Some([2, 2, 2])).unwrap_err();
        assert!(matches!(err, InferenceError::Coverage(_)));
    }

    #[test]
    fn placements_are_axis_major_ordered() {
        let grid = plan([18, 224, 224], [10, 128, 128], [2, 32, 32], None).unwrap();
        let starts: Vec<[usize; 3]> = grid.placements.iter().map(|p| p.start).collect();
        assert_eq!(
            starts,
            vec![
                [0, 0, 0],
                [0, 0, 96],
                [0, 96, 0],
                [0, 96, 96],
                [8, 0, 0],
                [8, 0, 96],
                [8, 96, 0],
                [8, 96, 96],
            ]
        );
    }

    #[test]
    fn coverage_union_spans_full_extent() {
        for input in [30usize, 31, 37, 40, 53] {
            let starts = size_driven_starts(input, 10, 2).unwrap();
            let mut covered = vec![false; input];
            for &s in &starts {
                for c in covered.iter_mut().skip(s).take(10) {
                    *c = true;
                }
            }
            assert!(covered.iter().all(|&c| c), "input={input} left a gap");
        }
    }
}
