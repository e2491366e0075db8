//! Block inference engine orchestrating patch-based processing end-to-end.
//!
//! Overview
//! - Plans overlapping patch placements over one input chunk (or treats the
//!   whole chunk as a single patch in whole-chunk mode).
//! - Extracts input patches, groups them into batches, and runs the
//!   configured [`crate::transform::PatchTransform`] on each batch.
//! - Blends the overlapping output patches with bump weights and
//!   normalizes the accumulated sums into one seamless output volume.
//! - Applies the optional crop margin and trailing-mask-channel
//!   post-processing before returning.
//!
//! Modules
//! - [`params`] – configuration consumed by the engine, validated up front.
//! - `pipeline` – the [`Inferencer`] implementation.
//!
//! Key Ideas
//! - Every buffer of one invocation (patches, accumulation sums) is owned
//!   by that invocation and released when it returns, so an aborted call
//!   leaves nothing observable behind.
//! - Errors abort the invocation immediately; a seamless result is never
//!   traded for availability.

pub mod params;
mod pipeline;

pub use params::InferenceParams;
pub use pipeline::Inferencer;
