//! Owned multi-channel f32 volume in channel-major (C, Z, Y, X) layout.
//!
//! The working and output container of the engine. Carries a global integer
//! offset so that sub-volumes keep their position in the absolute coordinate
//! space: `slice` adds the local start to the parent offset, `crop_margin`
//! advances it by the margin.
use crate::error::{InferenceError, Result};

#[derive(Clone, Debug)]
pub struct VolumeF32 {
    /// Number of channels (1 for plain (Z, Y, X) volumes).
    pub channels: usize,
    /// Spatial extent in (z, y, x) order.
    pub size: [usize; 3],
    /// Global offset of the (0, 0, 0) voxel in (z, y, x) order.
    pub offset: [i32; 3],
    /// Backing storage, channel-major, `channels * sz * sy * sx` samples.
    pub data: Vec<f32>,
}

impl VolumeF32 {
    /// Construct a zero-initialized volume at offset (0, 0, 0).
    pub fn new(channels: usize, size: [usize; 3]) -> Self {
        Self {
            channels,
            size,
            offset: [0; 3],
            data: vec![0.0; channels * size[0] * size[1] * size[2]],
        }
    }

    pub fn with_offset(mut self, offset: [i32; 3]) -> Self {
        self.offset = offset;
        self
    }

    #[inline]
    pub fn voxels_per_channel(&self) -> usize {
        self.size[0] * self.size[1] * self.size[2]
    }

    #[inline]
    /// Convert (c, z, y, x) to a linear index into `data`.
    pub fn idx(&self, c: usize, z: usize, y: usize, x: usize) -> usize {
        ((c * self.size[0] + z) * self.size[1] + y) * self.size[2] + x
    }

    #[inline]
    pub fn get(&self, c: usize, z: usize, y: usize, x: usize) -> f32 {
        self.data[self.idx(c, z, y, x)]
    }

    #[inline]
    pub fn set(&mut self, c: usize, z: usize, y: usize, x: usize, v: f32) {
        let i = self.idx(c, z, y, x);
        self.data[i] = v;
    }

    #[inline]
    pub fn channel(&self, c: usize) -> &[f32] {
        let n = self.voxels_per_channel();
        &self.data[c * n..(c + 1) * n]
    }

    #[inline]
    pub fn channel_mut(&mut self, c: usize) -> &mut [f32] {
        let n = self.voxels_per_channel();
        &mut self.data[c * n..(c + 1) * n]
    }

    /// Copy out the sub-volume `[start, start + size)` across all channels.
    ///
    /// The result's offset is `self.offset + start`.
    pub fn slice(&self, start: [usize; 3], size: [usize; 3]) -> Result<VolumeF32> {
        for a in 0..3 {
            if start[a] + size[a] > self.size[a] {
                return Err(InferenceError::Bounds {
                    start,
                    size,
                    extent: self.size,
                });
            }
        }
        let mut out = VolumeF32::new(self.channels, size);
        for c in 0..self.channels {
            for z in 0..size[0] {
                for y in 0..size[1] {
                    let src = self.idx(c, start[0] + z, start[1] + y, start[2]);
                    let dst = out.idx(c, z, y, 0);
                    out.data[dst..dst + size[2]]
                        .copy_from_slice(&self.data[src..src + size[2]]);
                }
            }
        }
        out.offset = [
            self.offset[0] + start[0] as i32,
            self.offset[1] + start[1] as i32,
            self.offset[2] + start[2] as i32,
        ];
        Ok(out)
    }

    /// Trim `margin` voxels from both ends of every axis.
    ///
    /// Fails when a margin reaches half of the axis length, which would
    /// leave nothing to return.
    pub fn crop_margin(&self, margin: [usize; 3]) -> Result<VolumeF32> {
        for a in 0..3 {
            if 2 * margin[a] >= self.size[a] {
                return Err(InferenceError::Bounds {
                    start: margin,
                    size: margin,
                    extent: self.size,
                });
            }
        }
        let size = [
            self.size[0] - 2 * margin[0],
            self.size[1] - 2 * margin[1],
            self.size[2] - 2 * margin[2],
        ];
        self.slice(margin, size)
    }

    /// Rescale [0, 1] samples to 8-bit with rounding and clamping.
    pub fn to_u8_rescaled(&self) -> Vec<u8> {
        self.data
            .iter()
            .map(|&v| (v * 255.0).round().clamp(0.0, 255.0) as u8)
            .collect()
    }
}

impl crate::volume::traits::VolumeView for VolumeF32 {
    type Sample = f32;

    #[inline]
    fn channels(&self) -> usize {
        self.channels
    }
    #[inline]
    fn size(&self) -> [usize; 3] {
        self.size
    }
    #[inline]
    fn offset(&self) -> [i32; 3] {
        self.offset
    }
    #[inline]
    fn as_slice(&self) -> Option<&[f32]> {
        Some(&self.data)
    }
}
