pub trait VolumeView {
    type Sample: Copy;

    fn channels(&self) -> usize;

    /// Spatial extent in (z, y, x) order.
    fn size(&self) -> [usize; 3];

    /// Global offset of the (0, 0, 0) voxel in (z, y, x) order.
    fn offset(&self) -> [i32; 3];

    fn voxels_per_channel(&self) -> usize {
        let [sz, sy, sx] = self.size();
        sz * sy * sx
    }

    fn as_slice(&self) -> Option<&[Self::Sample]> {
        None
    }
}
