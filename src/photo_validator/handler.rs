//! # 核心编排模块
//!
//! ## 设计思路
//!
//! `PhotoValidator` 只负责流程编排与配置管理。单次校验是一条线性状态链：
//!
//! ```text
//! Received → FormatChecked → Decoded → Rasterized → Scored → Accepted | Rejected
//! ```
//!
//! 任一阶段拒绝即终止，不回退、不重试。
//!
//! ## 实现思路
//!
//! - 配置通过 `Arc<RwLock<ValidatorConfig>>` 支持运行时切档；单次校验使用同一配置快照。
//! - 格式检查在调用线程完成，不获取句柄、不解码。
//! - 解码与逐像素扫描放到 tokio 阻塞线程池；解码句柄随闭包一起移动，
//!   闭包结束（含 panic 展开）时自动释放。
//! - 记录 `decode/raster/scan/total` 阶段耗时，便于性能诊断。

use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use super::analysis;
use super::handle::{DecodeHandle, HandleRegistry};
use super::policy::{self, Rejection, ValidationResult};
use super::{AnalysisProfile, CandidateImage, ImageError, ValidatorConfig};

/// 校验状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationStage {
    Received,
    FormatChecked,
    Decoded,
    Rasterized,
    Scored,
}

#[derive(Debug, Default)]
struct StageTimings {
    decode: Duration,
    raster: Duration,
    scan: Duration,
}

/// 照片校验器。
///
/// 不持有任何跨调用的校验状态，可在多个任务间共享（`Clone` 只复制 `Arc`）。
#[derive(Clone)]
pub struct PhotoValidator {
    config: Arc<RwLock<ValidatorConfig>>,
    handles: Arc<HandleRegistry>,
}

impl PhotoValidator {
    /// 根据初始配置创建校验器。
    ///
    /// # 示例
    /// ```rust
    /// use listing_photo_check::photo_validator::{PhotoValidator, ValidatorConfig};
    ///
    /// let validator = PhotoValidator::new(ValidatorConfig::default())?;
    /// # Ok::<(), listing_photo_check::photo_validator::ImageError>(())
    /// ```
    pub fn new(config: ValidatorConfig) -> Result<Self, ImageError> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            handles: HandleRegistry::new(),
        })
    }

    /// 获取配置快照，保证单次校验链路使用一致参数。
    pub fn config_snapshot(&self) -> Result<ValidatorConfig, ImageError> {
        self.config
            .read()
            .map(|cfg| cfg.clone())
            .map_err(|_| ImageError::Config("配置读取锁已中毒".to_string()))
    }

    /// 整体替换配置。
    pub fn update_config(&self, config: ValidatorConfig) -> Result<(), ImageError> {
        config.validate()?;
        let mut current = self
            .config
            .write()
            .map_err(|_| ImageError::Config("配置写入锁已中毒".to_string()))?;
        *current = config;
        Ok(())
    }

    /// 设置分析档位。
    pub fn set_analysis_profile(&self, profile: AnalysisProfile) -> Result<(), ImageError> {
        let mut config = self
            .config
            .write()
            .map_err(|_| ImageError::Config("配置写入锁已中毒".to_string()))?;
        config.apply_analysis_profile(profile);

        log::info!(
            "⚙️ 已切换分析档位：{:?}（analysis_max_dimension={:?}, filter={:?}）",
            profile,
            config.analysis_max_dimension,
            config.resize_filter
        );

        Ok(())
    }

    /// 获取当前生效档位。
    pub fn analysis_profile(&self) -> Result<AnalysisProfile, ImageError> {
        let config = self
            .config
            .read()
            .map_err(|_| ImageError::Config("配置读取锁已中毒".to_string()))?;
        Ok(config.infer_analysis_profile())
    }

    /// 解码句柄登记表（用于观测句柄是否全部释放）。
    pub fn handles(&self) -> &Arc<HandleRegistry> {
        &self.handles
    }

    /// 校验主入口。
    ///
    /// 所有可预期的失败都以 `Ok(ValidationResult)` 返回；只有校验任务本身无法完成时
    /// 才返回 `Err(ImageError::Fatal)`。必须在 tokio 运行时内调用。
    ///
    /// # 示例
    /// ```rust,no_run
    /// use listing_photo_check::photo_validator::{CandidateImage, PhotoValidator, ValidatorConfig};
    ///
    /// # async fn demo() -> Result<(), listing_photo_check::photo_validator::ImageError> {
    /// let validator = PhotoValidator::new(ValidatorConfig::default())?;
    /// let bytes = std::fs::read("living-room.jpg").unwrap_or_default();
    /// let result = validator
    ///     .validate(&CandidateImage::new("living-room.jpg", "image/jpeg", bytes))
    ///     .await?;
    /// println!("{:?}", result.reason());
    /// # Ok(())
    /// # }
    /// ```
    pub async fn validate(
        &self,
        candidate: &CandidateImage,
    ) -> Result<ValidationResult, ImageError> {
        let total_start = Instant::now();
        log::debug!("📥 {:?} - {}", ValidationStage::Received, candidate.name());

        if !policy::is_supported_mime(candidate.declared_mime()) {
            log::info!(
                "🚫 格式不受支持 - 文件: {} 声明类型: {:?}",
                candidate.name(),
                candidate.declared_mime()
            );
            return Ok(ValidationResult::rejected(Rejection::UnsupportedFormat {
                name: candidate.name().to_string(),
            }));
        }
        log::debug!("✅ {:?} - {}", ValidationStage::FormatChecked, candidate.name());

        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| ImageError::Fatal(format!("缺少 tokio 运行时：{}", e)))?;

        let config = self.config_snapshot()?;
        let handle = self.handles.acquire(candidate.name());
        let bytes = candidate.shared_bytes();
        let name = candidate.name().to_string();

        let (outcome, timings) = runtime
            .spawn_blocking(move || Self::run_stages(handle, &bytes, &name, &config))
            .await
            .map_err(|e| ImageError::Fatal(format!("校验工作线程异常退出：{}", e)))?;

        let result = ValidationResult::from(outcome);
        log::info!(
            "{} 照片校验完成 - 文件: {} valid={} decode={}ms raster={}ms scan={}ms total={}ms",
            if result.is_valid() { "✅" } else { "❌" },
            candidate.name(),
            result.is_valid(),
            timings.decode.as_millis(),
            timings.raster.as_millis(),
            timings.scan.as_millis(),
            total_start.elapsed().as_millis()
        );

        Ok(result)
    }

    /// 在阻塞线程中执行 解码 → 方向 → 绘制 → 评分。
    ///
    /// `_handle` 在函数返回时释放，覆盖全部分支。
    fn run_stages(
        _handle: DecodeHandle,
        bytes: &[u8],
        name: &str,
        config: &ValidatorConfig,
    ) -> (Result<(), Rejection>, StageTimings) {
        let mut timings = StageTimings::default();

        let decode_start = Instant::now();
        let decoded = match Self::decode_candidate(bytes, config) {
            Ok(decoded) => decoded,
            Err(err) => {
                log::warn!("⚠️ 图片无法加载 - 文件: {} 原因: {}", name, err);
                return (
                    Err(Rejection::LoadFailed {
                        name: name.to_string(),
                    }),
                    timings,
                );
            }
        };
        timings.decode = decode_start.elapsed();
        log::debug!(
            "✅ {:?} - {} {}x{}",
            ValidationStage::Decoded,
            name,
            decoded.width,
            decoded.height
        );

        if decoded.width <= decoded.height {
            return (Err(Rejection::NotLandscape), timings);
        }

        let raster_start = Instant::now();
        let raster = match Self::rasterize(decoded, config) {
            Ok(raster) => raster,
            Err(err) => {
                log::warn!("⚠️ 无法获得绘制表面 - 文件: {} 原因: {}", name, err);
                return (Err(Rejection::NoDrawingSurface), timings);
            }
        };
        timings.raster = raster_start.elapsed();
        log::debug!(
            "✅ {:?} - {} {}x{}",
            ValidationStage::Rasterized,
            name,
            raster.width,
            raster.height
        );

        let scan_start = Instant::now();
        let (stats, verdict) = analysis::score(&raster);
        timings.scan = scan_start.elapsed();
        log::debug!(
            "✅ {:?} - {} mean_luma={:.2} mean_deviation={:.2}",
            ValidationStage::Scored,
            name,
            stats.mean_luma,
            stats.mean_deviation
        );

        (verdict, timings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageBuffer, ImageFormat, Rgba};
    use std::io::Cursor;

    fn encode(img: ImageBuffer<Rgba<u8>, Vec<u8>>, format: ImageFormat) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img)
            .write_to(&mut cursor, format)
            .expect("failed to encode test image");
        cursor.into_inner()
    }

    fn solid_png(width: u32, height: u32, value: u8) -> Vec<u8> {
        encode(
            ImageBuffer::from_pixel(width, height, Rgba([value, value, value, 255])),
            ImageFormat::Png,
        )
    }

    fn split_png(width: u32, height: u32) -> Vec<u8> {
        encode(
            ImageBuffer::from_fn(width, height, |x, _| {
                if x < width / 2 {
                    Rgba([0, 0, 0, 255])
                } else {
                    Rgba([255, 255, 255, 255])
                }
            }),
            ImageFormat::Png,
        )
    }

    fn validator() -> PhotoValidator {
        PhotoValidator::new(ValidatorConfig::default()).expect("validator init failed")
    }

    #[tokio::test]
    async fn unsupported_format_skips_decode_handle() {
        let validator = validator();
        let candidate = CandidateImage::new("floorplan.gif", "image/gif", split_png(40, 20));

        let result = validator.validate(&candidate).await.expect("validate failed");

        assert!(!result.is_valid());
        assert_eq!(
            result.reason(),
            Some("floorplan.gif: Unsupported format. Allowed formats are JPEG, PNG, WebP.")
        );
        assert_eq!(validator.handles().stats().acquired, 0);
    }

    #[tokio::test]
    async fn portrait_and_square_are_rejected() {
        let validator = validator();

        for (w, h) in [(20, 40), (30, 30)] {
            let candidate = CandidateImage::new("tall.png", "image/png", split_png(w, h));
            let result = validator.validate(&candidate).await.expect("validate failed");
            assert_eq!(result.reason(), Some("Image must be landscape (width > height)."));
        }
    }

    #[tokio::test]
    async fn dark_flat_and_balanced_rasters() {
        let validator = validator();

        let dark = CandidateImage::new("dark.png", "image/png", solid_png(40, 20, 10));
        let flat = CandidateImage::new("flat.png", "image/png", solid_png(40, 20, 128));
        let good = CandidateImage::new("good.png", "image/png", split_png(40, 20));

        assert_eq!(
            validator.validate(&dark).await.expect("validate failed").reason(),
            Some("Image is too dark or too bright (poor lighting).")
        );
        assert_eq!(
            validator.validate(&flat).await.expect("validate failed").reason(),
            Some("Image appears blurry or low quality.")
        );
        assert_eq!(
            validator.validate(&good).await.expect("validate failed"),
            ValidationResult::accepted()
        );
    }

    #[tokio::test]
    async fn surface_limit_rejects_after_orientation_check() {
        let config = ValidatorConfig {
            max_decoded_pixels: Some(100),
            ..ValidatorConfig::default()
        };
        let validator = PhotoValidator::new(config).expect("validator init failed");

        let wide = CandidateImage::new("wide.png", "image/png", split_png(40, 20));
        let tall = CandidateImage::new("tall.png", "image/png", split_png(20, 40));

        assert_eq!(
            validator.validate(&wide).await.expect("validate failed").reason(),
            Some("Could not process image.")
        );
        assert_eq!(
            validator.validate(&tall).await.expect("validate failed").reason(),
            Some("Image must be landscape (width > height).")
        );
        assert_eq!(validator.handles().stats().live(), 0);
    }

    #[tokio::test]
    async fn corrupt_body_over_surface_cap_still_fails_to_load() {
        let config = ValidatorConfig {
            max_decoded_pixels: Some(100),
            ..ValidatorConfig::default()
        };
        let validator = PhotoValidator::new(config).expect("validator init failed");
        let png = split_png(400, 200);
        let truncated = png[..png.len() / 2].to_vec();
        let candidate = CandidateImage::new("trunc.png", "image/png", truncated);

        let result = validator.validate(&candidate).await.expect("validate failed");

        assert_eq!(result.reason(), Some("trunc.png: Failed to load image."));
        assert_eq!(validator.handles().stats().live(), 0);
    }

    #[tokio::test]
    async fn corrupt_png_fails_to_load_and_releases_handle() {
        let validator = validator();
        let candidate = CandidateImage::new("broken.png", "image/png", b"\x89PNG garbage".to_vec());

        let result = validator.validate(&candidate).await.expect("validate failed");

        assert_eq!(result.reason(), Some("broken.png: Failed to load image."));
        let stats = validator.handles().stats();
        assert_eq!(stats.acquired, 1);
        assert_eq!(stats.released, 1);
    }

    #[tokio::test]
    async fn profile_switch_is_visible_in_snapshot() {
        let validator = validator();

        validator
            .set_analysis_profile(AnalysisProfile::Speed)
            .expect("set profile failed");

        assert_eq!(
            validator.analysis_profile().expect("read profile failed"),
            AnalysisProfile::Speed
        );
        assert_eq!(
            validator.config_snapshot().expect("snapshot failed").analysis_max_dimension,
            Some(1024)
        );
    }

    #[test]
    fn validate_outside_runtime_is_fatal() {
        use std::pin::pin;
        use std::task::{Context, Poll, Waker};

        let validator = validator();
        let candidate = CandidateImage::new("good.png", "image/png", split_png(40, 20));

        // 不进入任何 tokio 运行时，直接轮询一次
        let mut future = pin!(validator.validate(&candidate));
        let mut cx = Context::from_waker(Waker::noop());
        let Poll::Ready(result) = future.as_mut().poll(&mut cx) else {
            panic!("validate should resolve immediately without a runtime");
        };

        assert!(matches!(result, Err(ImageError::Fatal(_))));
        assert_eq!(validator.handles().stats().acquired, 0);
    }
}
