//! # 解码与绘制流水线模块
//!
//! ## 设计思路
//!
//! 将“字节 → 图像 → RGBA”的过程集中管理，并在关键节点增加资源上限控制。
//! 图片总是先完整解码：损坏的数据必须在方向检查之前暴露为“无法加载”。
//! 只有解码器因内存上限拒绝分配时，才视为“无法获得绘制表面”。
//!
//! ## 实现思路
//!
//! 1. 猜测格式，建立带 `Limits` 的解码器，读取 header 尺寸与 EXIF 方向
//! 2. 预留解码缓冲并完整解码，随后按 EXIF 方向旋转 / 翻转
//! 3. 内存上限触发 → 保留（已按方向换算的）尺寸，图像为空；其他错误 → 无法加载
//! 4. 绘制：无图像 / 零像素 / 超过像素上限 → 无法获得绘制表面
//! 5. 按配置决定是否降采样，转换 RGBA，并校验字节长度一致性

use fast_image_resize as fr;
use image::metadata::Orientation;
use image::{DynamicImage, GenericImageView, ImageDecoder, ImageReader, Limits};
use std::io::Cursor;

use super::source::DecodedRaster;
use super::{ImageError, PhotoValidator, ValidatorConfig};

/// 解码阶段输出，尺寸为按 EXIF 方向校正后的显示尺寸。
///
/// `image` 为 `None` 表示解码器因内存上限拒绝分配，未得到像素数据。
pub(crate) struct DecodedImage {
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) image: Option<DynamicImage>,
}

/// 旋转 90° / 270° 的方向会交换宽高。
fn oriented_dimensions(width: u32, height: u32, orientation: Orientation) -> (u32, u32) {
    match orientation {
        Orientation::Rotate90
        | Orientation::Rotate270
        | Orientation::Rotate90FlipH
        | Orientation::Rotate270FlipH => (height, width),
        _ => (width, height),
    }
}

impl PhotoValidator {
    /// 解码原始字节，并应用 EXIF 方向。
    pub(crate) fn decode_candidate(
        bytes: &[u8],
        config: &ValidatorConfig,
    ) -> Result<DecodedImage, ImageError> {
        let mut reader = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| ImageError::Decode(format!("无法识别图片格式：{}", e)))?;

        let mut limits = Self::decode_limits(config);
        reader.limits(limits.clone());

        let mut decoder = reader
            .into_decoder()
            .map_err(|e| ImageError::Decode(format!("无法读取图片头信息：{}", e)))?;
        let (raw_width, raw_height) = decoder.dimensions();
        let orientation = decoder.orientation().unwrap_or_else(|e| {
            log::debug!("🔍 无法读取 EXIF 方向，按原始方向处理：{}", e);
            Orientation::NoTransforms
        });
        let (width, height) = oriented_dimensions(raw_width, raw_height, orientation);

        let decoded = limits
            .reserve(decoder.total_bytes())
            .and_then(|()| DynamicImage::from_decoder(decoder));

        match decoded {
            Ok(mut image) => {
                if orientation != Orientation::NoTransforms {
                    log::debug!("🔄 应用 EXIF 方向：{:?}", orientation);
                    image.apply_orientation(orientation);
                }
                Ok(DecodedImage {
                    width,
                    height,
                    image: Some(image),
                })
            }
            Err(image::ImageError::Limits(err)) => {
                log::warn!("⚠️ 解码内存超出上限 - {}x{}: {}", width, height, err);
                Ok(DecodedImage {
                    width,
                    height,
                    image: None,
                })
            }
            Err(err) => Err(ImageError::Decode(format!("图片解码失败：{}", err))),
        }
    }

    /// 解码器内存限制；未配置时沿用 `image` 的默认值。
    fn decode_limits(config: &ValidatorConfig) -> Limits {
        let mut limits = Limits::default();
        if let Some(max_bytes) = config.max_decoded_bytes {
            limits.max_alloc = Some(max_bytes);
        }
        limits
    }

    /// 校验绘制表面像素数量。
    fn validate_surface_limits(
        config: &ValidatorConfig,
        width: u32,
        height: u32,
    ) -> Result<(), ImageError> {
        let pixels = (width as u64)
            .checked_mul(height as u64)
            .ok_or_else(|| ImageError::ResourceLimit("图片像素数溢出".to_string()))?;

        if pixels == 0 {
            return Err(ImageError::ResourceLimit("图片尺寸为 0".to_string()));
        }

        if let Some(max_pixels) = config.max_decoded_pixels {
            if pixels > max_pixels {
                return Err(ImageError::ResourceLimit(format!(
                    "图片像素过大：{} 像素（限制：{} 像素）",
                    pixels, max_pixels
                )));
            }
        }

        Ok(())
    }

    /// 将解码结果绘制到离屏 RGBA 缓冲。
    pub(crate) fn rasterize(
        decoded: DecodedImage,
        config: &ValidatorConfig,
    ) -> Result<DecodedRaster, ImageError> {
        let image = decoded
            .image
            .ok_or_else(|| ImageError::ResourceLimit("绘制表面不可用".to_string()))?;
        Self::validate_surface_limits(config, decoded.width, decoded.height)?;

        let raster = match config.analysis_max_dimension {
            Some(max_dim) if decoded.width.max(decoded.height) > max_dim => {
                Self::downscale_for_analysis(&image, max_dim, config)?
            }
            _ => {
                let rgba = image.to_rgba8();
                let (width, height) = rgba.dimensions();
                DecodedRaster {
                    width,
                    height,
                    pixels: rgba.into_raw(),
                }
            }
        };

        let expected_len = (raster.width as usize)
            .checked_mul(raster.height as usize)
            .and_then(|pixels| pixels.checked_mul(4))
            .ok_or_else(|| ImageError::ResourceLimit("图片尺寸导致内存溢出风险".to_string()))?;

        if raster.pixels.len() != expected_len {
            return Err(ImageError::Decode("绘制后像素数据长度异常".to_string()));
        }

        Ok(raster)
    }

    /// 按长边上限等比降采样后再分析。
    fn downscale_for_analysis(
        image: &DynamicImage,
        max_dim: u32,
        config: &ValidatorConfig,
    ) -> Result<DecodedRaster, ImageError> {
        let (width, height) = image.dimensions();
        let scale = max_dim as f64 / width.max(height) as f64;

        if scale <= 0.0 {
            return Err(ImageError::ResourceLimit("缩放比例计算异常".to_string()));
        }

        let target_width = ((width as f64 * scale).floor() as u32).max(1);
        let target_height = ((height as f64 * scale).floor() as u32).max(1);

        log::info!(
            "🧩 分析前降采样：{}x{} -> {}x{}（filter={:?}）",
            width,
            height,
            target_width,
            target_height,
            config.resize_filter
        );

        match Self::resize_with_fast_image_resize(image, target_width, target_height, config) {
            Ok(raster) => Ok(raster),
            Err(err) => {
                log::warn!("⚠️ fast_image_resize 降采样失败，回退 image::resize_exact：{}", err);
                let rgba = image
                    .resize_exact(
                        target_width,
                        target_height,
                        config.resize_filter.to_image_filter(),
                    )
                    .to_rgba8();
                let (width, height) = rgba.dimensions();
                Ok(DecodedRaster {
                    width,
                    height,
                    pixels: rgba.into_raw(),
                })
            }
        }
    }

    fn resize_with_fast_image_resize(
        image: &DynamicImage,
        target_width: u32,
        target_height: u32,
        config: &ValidatorConfig,
    ) -> Result<DecodedRaster, ImageError> {
        let src = image.to_rgba8();
        let (src_width, src_height) = src.dimensions();

        let src_image = fr::images::Image::from_vec_u8(
            src_width,
            src_height,
            src.into_raw(),
            fr::PixelType::U8x4,
        )
        .map_err(|e| ImageError::Decode(format!("构建源图像缓冲失败：{}", e)))?;

        let mut dst_image =
            fr::images::Image::new(target_width, target_height, fr::PixelType::U8x4);

        let mut resizer = fr::Resizer::new();
        let options = fr::ResizeOptions::new()
            .resize_alg(fr::ResizeAlg::Convolution(config.resize_filter.to_fast_filter()));

        resizer
            .resize(&src_image, &mut dst_image, Some(&options))
            .map_err(|e| ImageError::Decode(format!("fast_image_resize 执行失败：{}", e)))?;

        Ok(DecodedRaster {
            width: target_width,
            height: target_height,
            pixels: dst_image.into_vec(),
        })
    }
}
