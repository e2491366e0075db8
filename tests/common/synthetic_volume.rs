/// Deterministic pseudo-random voxels in [1, 254].
pub fn pseudo_random_u8(size: [usize; 3], seed: u64) -> Vec<u8> {
    assert!(size.iter().all(|&s| s > 0), "volume axes must be positive");
    let mut state = seed.wrapping_mul(2).wrapping_add(1);
    let mut data = Vec::with_capacity(size[0] * size[1] * size[2]);
    for _ in 0..size[0] * size[1] * size[2] {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        data.push(((state >> 33) % 254) as u8 + 1);
    }
    data
}

/// Blocks of alternating low/high values, `cell` voxels on a side.
pub fn two_tone_u8(size: [usize; 3], cell: usize, low: u8, high: u8) -> Vec<u8> {
    assert!(cell > 0, "cell size must be positive");
    let mut data = Vec::with_capacity(size[0] * size[1] * size[2]);
    for z in 0..size[0] {
        for y in 0..size[1] {
            for x in 0..size[2] {
                let sum = z / cell + y / cell + x / cell;
                data.push(if sum % 2 == 0 { low } else { high });
            }
        }
    }
    data
}
