//! Separable blending weights for overlapping output patches.
//!
//! Purpose
//! - Give every output patch a weight field that is heaviest at the patch
//!   centre and tapers smoothly toward the faces, so that overlap-add
//!   accumulation produces seamless results after normalization.
//!
//! Design
//! - A 1-D curve is built per axis and the 3-D field is the outer product
//!   of the three curves.
//! - Curves are sampled at `(i + 1) / (n + 1)`, which keeps the end samples
//!   strictly inside the support: weights approach zero at patch faces but
//!   never reach it, so summed weights stay positive wherever a patch
//!   landed.
//! - Curves are normalized to a maximum of 1.
//!
//! Notes
//! - An axis of length 1 yields the single weight 1 (no degenerate
//!   blending).
//! - Fields are cached by shape; every placement with the same output-patch
//!   shape reuses one field.
use crate::error::{InferenceError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Supported bump function families.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BumpKind {
    /// Smooth compactly-supported bump `exp(-1 / (1 - u^2))`, `u` in (-1, 1).
    #[default]
    Wu,
    /// Squared-sine window `sin^2(pi t)`, `t` in (0, 1).
    Hann,
}

impl BumpKind {
    /// Parse a configuration name. Unrecognized names are a configuration
    /// error, reported before any volume is processed.
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "wu" => Ok(BumpKind::Wu),
            "hann" => Ok(BumpKind::Hann),
            other => Err(InferenceError::Config(format!(
                "unknown bump function '{other}' (expected 'wu' or 'hann')"
            ))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            BumpKind::Wu => "wu",
            BumpKind::Hann => "hann",
        }
    }
}

/// Dense non-negative weight field of exactly one output-patch shape.
#[derive(Clone, Debug)]
pub struct BumpField {
    pub size: [usize; 3],
    pub data: Vec<f32>,
}

/// Floor for field voxels: the wu tail triple product underflows f32 for
/// large patch axes, and field voxels must stay strictly positive.
const MIN_WEIGHT: f64 = 1e-30;

impl BumpField {
    /// Build the separable field for `size` from the given family.
    pub fn generate(kind: BumpKind, size: [usize; 3]) -> Self {
        let cz = bump_curve_f64(kind, size[0]);
        let cy = bump_curve_f64(kind, size[1]);
        let cx = bump_curve_f64(kind, size[2]);
        let mut data = Vec::with_capacity(size[0] * size[1] * size[2]);
        for &wz in &cz {
            for &wy in &cy {
                let wzy = wz * wy;
                for &wx in &cx {
                    data.push((wzy * wx).max(MIN_WEIGHT) as f32);
                }
            }
        }
        Self { size, data }
    }

    /// Uniform weight 1, used by the whole-chunk shortcut where blending is
    /// a no-op.
    pub fn uniform(size: [usize; 3]) -> Self {
        Self {
            size,
            data: vec![1.0; size[0] * size[1] * size[2]],
        }
    }

    #[inline]
    pub fn idx(&self, z: usize, y: usize, x: usize) -> usize {
        (z * self.size[1] + y) * self.size[2] + x
    }

    #[inline]
    pub fn get(&self, z: usize, y: usize, x: usize) -> f32 {
        self.data[self.idx(z, y, x)]
    }
}

/// 1-D weight curve of length `n`, strictly positive, maximum 1.
fn bump_curve_f64(kind: BumpKind, n: usize) -> Vec<f64> {
    let mut curve = Vec::with_capacity(n);
    for i in 0..n {
        let t = (i + 1) as f64 / (n + 1) as f64;
        let w = match kind {
            BumpKind::Wu => {
                let u = 2.0 * t - 1.0;
                (-1.0 / (1.0 - u * u)).exp()
            }
            BumpKind::Hann => {
                let s = (std::f64::consts::PI * t).sin();
                s * s
            }
        };
        curve.push(w);
    }
    let max = curve.iter().cloned().fold(f64::MIN, f64::max);
    curve.into_iter().map(|w| w / max).collect()
}

#[cfg(test)]
fn bump_curve(kind: BumpKind, n: usize) -> Vec<f32> {
    bump_curve_f64(kind, n).into_iter().map(|w| w as f32).collect()
}

/// Cache of generated fields keyed by shape.
///
/// The engine has a fixed output-patch shape per invocation, but the cache
/// keeps the generator reusable across calls without rebuilding the field.
pub struct BumpFieldCache {
    kind: BumpKind,
    fields: HashMap<[usize; 3], BumpField>,
}

impl BumpFieldCache {
    pub fn new(kind: BumpKind) -> Self {
        Self {
            kind,
            fields: HashMap::new(),
        }
    }

    pub fn kind(&self) -> BumpKind {
        self.kind
    }

    /// Get or build the field for `size`.
    pub fn get(&mut self, size: [usize; 3]) -> &BumpField {
        self.fields
            .entry(size)
            .or_insert_with(|| BumpField::generate(self.kind, size))
    }
}
