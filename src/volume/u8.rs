use super::f32::VolumeF32;

/// Borrowed single-channel 8-bit volume in (z, y, x) row-major layout.
#[derive(Clone, Debug)]
pub struct VolumeU8<'a> {
    /// Spatial extent in (z, y, x) order.
    pub size: [usize; 3],
    /// Global offset of the first voxel in (z, y, x) order.
    pub offset: [i32; 3],
    /// Backing storage, `size[0] * size[1] * size[2]` samples.
    pub data: &'a [u8],
}

impl<'a> VolumeU8<'a> {
    #[inline]
    pub fn idx(&self, z: usize, y: usize, x: usize) -> usize {
        (z * self.size[1] + y) * self.size[2] + x
    }

    #[inline]
    pub fn get(&self, z: usize, y: usize, x: usize) -> u8 {
        self.data[self.idx(z, y, x)]
    }

    /// Convert to an owned f32 volume scaled to [0, 1].
    pub fn to_f32_normalized(&self) -> VolumeF32 {
        let data = self.data.iter().map(|&v| v as f32 / 255.0).collect();
        VolumeF32 {
            channels: 1,
            size: self.size,
            offset: self.offset,
            data,
        }
    }
}

impl<'a> crate::volume::traits::VolumeView for VolumeU8<'a> {
    type Sample = u8;

    #[inline]
    fn channels(&self) -> usize {
        1
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
    fn as_slice(&self) -> Option<&[u8]> {
        Some(self.data)
    }
}
