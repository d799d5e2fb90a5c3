//! Fixed-point studio-range YCbCr to RGB conversion.
//!
//! The per-pixel hot path is five table lookups, three additions, a shift
//! and a clamp; all floating-point work happens once at table construction.

use std::sync::OnceLock;

/// Fractional bits carried by the table entries.
const FRACTION_BITS: u32 = 18;

/// Rounding offset folded into the luma table so the final shift rounds to
/// nearest instead of truncating.
const ONE_HALF: i32 = 1 << (FRACTION_BITS - 1);

/// Scales a BT.601 coefficient into fixed point, rounding to nearest.
fn fix(value: f64) -> i32 {
    (value * f64::from(1i32 << FRACTION_BITS) + 0.5) as i32
}

/// Precomputed contribution tables, one entry per possible 8-bit sample.
///
/// Luma outside 16..=235 and chroma outside 16..=240 contribute the same as
/// the nearest boundary sample, per studio-range conventions; in between the
/// entries are linear in the sample value.
pub struct ColorTables {
    rgb_y: [i32; 256],
    r_cr: [i32; 256],
    g_cb: [i32; 256],
    g_cr: [i32; 256],
    b_cb: [i32; 256],
}

impl ColorTables {
    /// Shared instance, built on first use.
    pub fn get() -> &'static ColorTables {
        static TABLES: OnceLock<ColorTables> = OnceLock::new();
        TABLES.get_or_init(ColorTables::build)
    }

    fn build() -> Self {
        let mut tables = Self {
            rgb_y: [0; 256],
            r_cr: [0; 256],
            g_cb: [0; 256],
            g_cr: [0; 256],
            b_cb: [0; 256],
        };

        for i in 0..256usize {
            let luma = (i as i32).clamp(16, 235) - 16;
            let chroma = (i as i32).clamp(16, 240) - 128;

            tables.rgb_y[i] = fix(255.0 / 219.0) * luma + ONE_HALF;
            tables.r_cr[i] = fix(1.596) * chroma;
            tables.g_cb[i] = -fix(0.391) * chroma;
            tables.g_cr[i] = -fix(0.813) * chroma;
            tables.b_cb[i] = fix(2.018) * chroma;
        }
        tables
    }

    /// Converts one pixel to 8-bit RGB.
    #[inline]
    pub fn pixel(&self, y: u8, cb: u8, cr: u8) -> [u8; 3] {
        let luma = self.rgb_y[y as usize];
        let r = luma + self.r_cr[cr as usize];
        let g = luma + self.g_cb[cb as usize] + self.g_cr[cr as usize];
        let b = luma + self.b_cb[cb as usize];
        [to_channel(r), to_channel(g), to_channel(b)]
    }
}

#[inline]
fn to_channel(value: i32) -> u8 {
    (value >> FRACTION_BITS).clamp(0, 255) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_luma_neutral_chroma_is_white() {
        let tables = ColorTables::get();
        assert_eq!(tables.pixel(235, 128, 128), [255, 255, 255]);
    }

    #[test]
    fn test_min_luma_neutral_chroma_is_black() {
        let tables = ColorTables::get();
        assert_eq!(tables.pixel(16, 128, 128), [0, 0, 0]);
    }

    #[test]
    fn test_mid_gray_is_neutral() {
        let tables = ColorTables::get();
        let [r, g, b] = tables.pixel(126, 128, 128);
        // (126 - 16) * 255/219 = 128.08
        assert_eq!(r, g);
        assert_eq!(g, b);
        assert!((i32::from(r) - 128).abs() <= 1);
    }

    #[test]
    fn test_studio_red() {
        let tables = ColorTables::get();
        let [r, g, b] = tables.pixel(81, 90, 240);
        assert!(r >= 250, "r = {}", r);
        assert!(g <= 5, "g = {}", g);
        assert!(b <= 5, "b = {}", b);
    }

    #[test]
    fn test_out_of_range_samples_clamp_to_boundary() {
        let tables = ColorTables::get();
        // Below/above the studio range behaves like the range boundary
        assert_eq!(tables.pixel(0, 128, 128), tables.pixel(16, 128, 128));
        assert_eq!(tables.pixel(255, 128, 128), tables.pixel(235, 128, 128));
        assert_eq!(tables.pixel(128, 0, 0), tables.pixel(128, 16, 16));
        assert_eq!(tables.pixel(128, 255, 255), tables.pixel(128, 240, 240));
    }

    #[test]
    fn test_saturated_chroma_clamps_to_channel_limits() {
        let tables = ColorTables::get();
        let [r, _, b] = tables.pixel(235, 240, 240);
        assert_eq!(r, 255);
        assert_eq!(b, 255);
        let [r, _, _] = tables.pixel(16, 128, 16);
        assert_eq!(r, 0);
    }
}
