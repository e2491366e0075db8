//! Serializable per-invocation reports.
//!
//! Returned by `process_with_diagnostics` so callers can log or persist
//! stage timings and patch counts without the engine doing any I/O itself.

use serde::Serialize;

/// Wall-clock milliseconds spent in each pipeline stage.
#[derive(Clone, Debug, Default, Serialize)]
pub struct TimingBreakdown {
    /// Grid planning and weight field lookup.
    pub plan_ms: f64,
    /// Patch extraction, transform batches and deposits.
    pub patch_ms: f64,
    /// Accumulator normalization.
    pub finalize_ms: f64,
    /// Crop margin and mask-channel post-processing.
    pub postprocess_ms: f64,
    pub total_ms: f64,
}

/// Summary of one engine invocation.
#[derive(Clone, Debug, Serialize)]
pub struct InferenceReport {
    pub input_size: [usize; 3],
    pub output_size: [usize; 3],
    pub output_channels: usize,
    /// Planned placements (1 in whole-chunk mode).
    pub patch_count: usize,
    /// Transform invocations after batching.
    pub batch_count: usize,
    pub whole_chunk: bool,
    pub timing: TimingBreakdown,
}
