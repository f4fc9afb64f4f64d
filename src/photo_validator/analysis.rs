//! # 画质评分模块
//!
//! 对 RGBA 缓冲做一次完整扫描，得到平均亮度与平均偏离中点的程度，
//! 再按 `policy` 的阈值给出光线 / 清晰度结论。alpha 通道不参与计算。

use super::policy::{
    CONTRAST_MIDPOINT, LUMA_WEIGHTS, MAX_MEAN_LUMA, MIN_MEAN_DEVIATION, MIN_MEAN_LUMA, Rejection,
};
use super::source::DecodedRaster;

/// 亮度统计结果。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LumaStats {
    pub mean_luma: f64,
    pub mean_deviation: f64,
}

/// 单个像素的亮度。
#[inline]
pub fn luma(r: u8, g: u8, b: u8) -> f64 {
    LUMA_WEIGHTS[0] * r as f64 + LUMA_WEIGHTS[1] * g as f64 + LUMA_WEIGHTS[2] * b as f64
}

/// 逐像素扫描 RGBA 数据。
///
/// 空缓冲返回全 0 统计。
pub fn measure(rgba: &[u8]) -> LumaStats {
    let mut luma_sum = 0.0_f64;
    let mut deviation_sum = 0.0_f64;
    let mut count = 0_u64;

    for px in rgba.chunks_exact(4) {
        let value = luma(px[0], px[1], px[2]);
        luma_sum += value;
        deviation_sum += (value - CONTRAST_MIDPOINT).abs();
        count += 1;
    }

    if count == 0 {
        return LumaStats {
            mean_luma: 0.0,
            mean_deviation: 0.0,
        };
    }

    LumaStats {
        mean_luma: luma_sum / count as f64,
        mean_deviation: deviation_sum / count as f64,
    }
}

/// 光线检查在前，清晰度检查在后，先失败者为准。
pub fn judge(stats: &LumaStats) -> Result<(), Rejection> {
    if stats.mean_luma < MIN_MEAN_LUMA || stats.mean_luma > MAX_MEAN_LUMA {
        return Err(Rejection::PoorLighting);
    }
    if stats.mean_deviation < MIN_MEAN_DEVIATION {
        return Err(Rejection::LowContrast);
    }
    Ok(())
}

pub(crate) fn score(raster: &DecodedRaster) -> (LumaStats, Result<(), Rejection>) {
    let stats = measure(&raster.pixels);
    let verdict = judge(&stats);
    (stats, verdict)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn solid(r: u8, g: u8, b: u8, pixels: usize) -> Vec<u8> {
        [r, g, b, 255].repeat(pixels)
    }

    #[test]
    fn luma_weights_sum_to_one_for_grey() {
        assert!((luma(10, 10, 10) - 10.0).abs() < 1e-9);
        assert!((luma(255, 255, 255) - 255.0).abs() < 1e-9);
    }

    #[test]
    fn dark_image_fails_lighting() {
        let stats = measure(&solid(10, 10, 10, 64));
        assert!((stats.mean_luma - 10.0).abs() < 1e-9);
        assert_eq!(judge(&stats), Err(Rejection::PoorLighting));
    }

    #[test]
    fn overexposed_image_fails_lighting() {
        let stats = measure(&solid(240, 240, 240, 64));
        assert_eq!(judge(&stats), Err(Rejection::PoorLighting));
    }

    #[test]
    fn flat_mid_grey_fails_contrast() {
        let stats = measure(&solid(128, 128, 128, 64));
        assert!(stats.mean_deviation < 1e-9);
        assert_eq!(judge(&stats), Err(Rejection::LowContrast));
    }

    #[test]
    fn half_black_half_white_passes() {
        let mut rgba = solid(0, 0, 0, 32);
        rgba.extend(solid(255, 255, 255, 32));

        let stats = measure(&rgba);
        assert!((stats.mean_luma - 127.5).abs() < 1e-9);
        assert!((stats.mean_deviation - 127.5).abs() < 1e-9);
        assert_eq!(judge(&stats), Ok(()));
    }

    #[test]
    fn thresholds_are_exclusive_bounds() {
        let at_floor = LumaStats {
            mean_luma: 30.0,
            mean_deviation: 98.0,
        };
        let at_ceiling = LumaStats {
            mean_luma: 225.0,
            mean_deviation: 97.0,
        };
        let at_contrast_floor = LumaStats {
            mean_luma: 128.0,
            mean_deviation: 15.0,
        };

        assert_eq!(judge(&at_floor), Ok(()));
        assert_eq!(judge(&at_ceiling), Ok(()));
        assert_eq!(judge(&at_contrast_floor), Ok(()));
    }

    #[test]
    fn alpha_channel_is_ignored() {
        let opaque = measure(&[200, 100, 50, 255]);
        let transparent = measure(&[200, 100, 50, 0]);
        assert_eq!(opaque, transparent);
    }

    #[test]
    fn empty_buffer_measures_zero() {
        let stats = measure(&[]);
        assert_eq!(stats.mean_luma, 0.0);
        assert_eq!(judge(&stats), Err(Rejection::PoorLighting));
    }

    proptest! {
        #[test]
        fn stats_stay_in_range(pixels in proptest::collection::vec(any::<u8>(), 4..1024)) {
            let stats = measure(&pixels);
            prop_assert!((0.0..=255.0 + 1e-9).contains(&stats.mean_luma));
            prop_assert!((0.0..=128.0 + 1e-9).contains(&stats.mean_deviation));
        }
    }
}
