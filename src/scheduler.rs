//! Batch grouping in front of the patch transform.
//!
//! Groups pending patches up to the configured batch size before invoking
//! the transform once per group, amortising the fixed per-call overhead of
//! an external backend. Submission order is preserved strictly — completed
//! pairs come back in push order, so `result[i]` always belongs to
//! `patch[i]`. This is the only throughput lever in the engine; it is not a
//! parallelism mechanism.
use crate::error::{InferenceError, Result};
use crate::grid::PatchPlacement;
use crate::transform::PatchTransform;
use crate::volume::VolumeF32;

/// Order-preserving batcher over a [`PatchTransform`].
pub struct BatchScheduler<'a> {
    transform: &'a mut dyn PatchTransform,
    batch_size: usize,
    expected_size: [usize; 3],
    expected_channels: usize,
    placements: Vec<PatchPlacement>,
    patches: Vec<VolumeF32>,
    batches_run: usize,
}

impl<'a> BatchScheduler<'a> {
    /// `expected_size`/`expected_channels` describe the output patch shape
    /// the caller will accept; anything else from the transform is a fatal
    /// shape mismatch.
    pub fn new(
        transform: &'a mut dyn PatchTransform,
        batch_size: usize,
        expected_size: [usize; 3],
        expected_channels: usize,
    ) -> Self {
        Self {
            transform,
            batch_size,
            expected_size,
            expected_channels,
            placements: Vec::with_capacity(batch_size),
            patches: Vec::with_capacity(batch_size),
            batches_run: 0,
        }
    }

    /// Queue one patch. Runs the transform when the batch fills up and
    /// returns the completed `(placement, output)` pairs, else an empty vec.
    pub fn push(
        &mut self,
        placement: PatchPlacement,
        patch: VolumeF32,
    ) -> Result<Vec<(PatchPlacement, VolumeF32)>> {
        self.placements.push(placement);
        self.patches.push(patch);
        if self.patches.len() == self.batch_size {
            self.run_batch()
        } else {
            Ok(Vec::new())
        }
    }

    /// Run the transform on whatever is still pending.
    pub fn flush(&mut self) -> Result<Vec<(PatchPlacement, VolumeF32)>> {
        if self.patches.is_empty() {
            return Ok(Vec::new());
        }
        self.run_batch()
    }

    /// Number of transform invocations so far.
    pub fn batches_run(&self) -> usize {
        self.batches_run
    }

    fn run_batch(&mut self) -> Result<Vec<(PatchPlacement, VolumeF32)>> {
        let placements = std::mem::take(&mut self.placements);
        let patches = std::mem::take(&mut self.patches);
        let submitted = patches.len();

        let outputs = self.transform.forward(patches)?;
        self.batches_run += 1;

        if outputs.len() != submitted {
            return Err(InferenceError::ShapeMismatch {
                expected: format!("{submitted} output patches"),
                actual: format!("{}", outputs.len()),
            });
        }
        for out in &outputs {
            if out.size != self.expected_size || out.channels != self.expected_channels {
                return Err(InferenceError::ShapeMismatch {
                    expected: format!(
                        "{} x {:?}",
                        self.expected_channels, self.expected_size
                    ),
                    actual: format!("{} x {:?}", out.channels, out.size),
                });
            }
        }
        Ok(placements.into_iter().zip(outputs).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::PassthroughTransform;

    fn placement(i: usize) -> PatchPlacement {
        PatchPlacement {
            index: [i, 0, 0],
            start: [i, 0, 0],
            size: [2, 2, 2],
        }
    }

    fn tagged_patch(tag: f32) -> VolumeF32 {
        let mut p = VolumeF32::new(1, [2, 2, 2]);
        p.data.fill(tag);
        p
    }

    #[test]
    fn groups_into_full_batches_and_flushes_remainder() {
        let mut t = PassthroughTransform::new([2, 2, 2]);
        let mut sched = BatchScheduler::new(&mut t, 3, [2, 2, 2], 1);
        let mut completed = Vec::new();
        for i in 0..7 {
            completed.extend(sched.push(placement(i), tagged_patch(i as f32)).unwrap());
        }
        assert_eq!(completed.len(), 6);
        completed.extend(sched.flush().unwrap());
        assert_eq!(completed.len(), 7);
        assert_eq!(sched.batches_run(), 3);
    }

    #[test]
    fn results_pair_back_in_submission_order() {
        let mut t = PassthroughTransform::new([2, 2, 2]);
        let mut sched = BatchScheduler::new(&mut t, 4, [2, 2, 2], 1);
        let mut completed = Vec::new();
        for i in 0..9 {
            completed.extend(sched.push(placement(i), tagged_patch(i as f32)).unwrap());
        }
        completed.extend(sched.flush().unwrap());
        for (i, (pl, out)) in completed.iter().enumerate() {
            assert_eq!(pl.index[0], i);
            assert_eq!(out.data[0], i as f32);
        }
    }

    struct DroppingTransform;

    impl PatchTransform for DroppingTransform {
        fn input_patch_size(&self) -> [usize; 3] {
            [2, 2, 2]
        }
        fn output_patch_size(&self) -> [usize; 3] {
            [2, 2, 2]
        }
        fn num_output_channels(&self) -> usize {
            1
        }
        fn forward(&mut self, mut batch: Vec<VolumeF32>) -> Result<Vec<VolumeF32>> {
            batch.pop();
            Ok(batch)
        }
    }

    #[test]
    fn missing_outputs_are_a_shape_mismatch() {
        let mut t = DroppingTransform;
        let mut sched = BatchScheduler::new(&mut t, 2, [2, 2, 2], 1);
        sched.push(placement(0), tagged_patch(0.0)).unwrap();
        let err = sched.push(placement(1), tagged_patch(1.0)).unwrap_err();
        assert!(matches!(err, InferenceError::ShapeMismatch { .. }));
    }

    #[test]
    fn wrong_output_shape_is_a_shape_mismatch() {
        let mut t = PassthroughTransform::new([2, 2, 2]);
        // Scheduler expects a different shape than the transform produces.
        let mut sched = BatchScheduler::new(&mut t, 1, [3, 3, 3], 1);
        let err = sched.push(placement(0), tagged_patch(0.0)).unwrap_err();
        assert!(matches!(err, InferenceError::ShapeMismatch { .. }));
    }
}
