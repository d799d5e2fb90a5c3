//! 4:2:0 to 4:4:4 chroma expansion.

/// Expands a subsampled chroma plane to full resolution by 2x2 replication.
///
/// The plane buffer is full-size (`width * height`); the subsampled samples
/// occupy its first quarter. Expansion runs in place in reverse raster
/// order: every destination index is at or beyond its source index, so by
/// the time a source sample would be overwritten it has already been
/// consumed.
pub fn upsample_chroma(plane: &mut [u8], width: usize, height: usize) {
    debug_assert!(plane.len() >= width * height);
    let half_width = width / 2;
    let half_height = height / 2;

    for sy in (0..half_height).rev() {
        for sx in (0..half_width).rev() {
            let sample = plane[sy * half_width + sx];
            let top = 2 * sy * width + 2 * sx;
            let bottom = top + width;
            plane[top] = sample;
            plane[top + 1] = sample;
            plane[bottom] = sample;
            plane[bottom + 1] = sample;
        }
    }
}
