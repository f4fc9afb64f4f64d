//! # 配置模块
//!
//! ## 设计思路
//!
//! 将所有“可调策略”集中到 `ValidatorConfig`：加载体积上限、可选的绘制表面上限，
//! 以及分析前是否降采样。验收阈值不在此处，见 `policy`。
//! 分析档位（quality / balanced / speed）作为高层语义，映射到底层参数组合。
//!
//! ## 实现思路
//!
//! - `Default` 保持全分辨率扫描，与原有判定结果完全一致。
//! - `AnalysisProfile` 负责档位字符串解析与反向输出。
//! - `apply_analysis_profile` 将档位转换为具体参数。
//! - `infer_analysis_profile` 用于从当前配置反推档位。
//! - 配置可通过 `serde` 读写 JSON 设置文件（见 `crate::settings`）。

use fast_image_resize as fr;
use image::imageops::FilterType;
use serde::{Deserialize, Serialize};

use super::ImageError;

/// 降采样滤镜。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResizeFilter {
    Nearest,
    Triangle,
    CatmullRom,
    Lanczos3,
}

impl ResizeFilter {
    pub(crate) fn to_image_filter(self) -> FilterType {
        match self {
            Self::Nearest => FilterType::Nearest,
            Self::Triangle => FilterType::Triangle,
            Self::CatmullRom => FilterType::CatmullRom,
            Self::Lanczos3 => FilterType::Lanczos3,
        }
    }

    pub(crate) fn to_fast_filter(self) -> fr::FilterType {
        match self {
            Self::Nearest => fr::FilterType::Box,
            Self::Triangle => fr::FilterType::Bilinear,
            Self::CatmullRom => fr::FilterType::CatmullRom,
            Self::Lanczos3 => fr::FilterType::Lanczos3,
        }
    }
}

/// 校验器配置。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    /// 从磁盘 / Base64 读取候选图片时允许的最大体积（字节）。
    pub max_file_size: u64,
    /// 绘制表面允许的像素上限（`width * height`）；`None` 表示不设上限。
    pub max_decoded_pixels: Option<u64>,
    /// 解码时允许分配的内存上限（字节）；`None` 时沿用 `image` 自带的默认限制。
    pub max_decoded_bytes: Option<u64>,
    /// 分析前长边上限；`None` 表示按原始分辨率逐像素扫描。
    pub analysis_max_dimension: Option<u32>,
    /// 降采样滤镜策略。
    pub resize_filter: ResizeFilter,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            max_file_size: 50 * 1024 * 1024,
            max_decoded_pixels: None,
            max_decoded_bytes: None,
            analysis_max_dimension: None,
            resize_filter: ResizeFilter::Triangle,
        }
    }
}

/// 分析档位。
///
/// - `Quality`：原始分辨率逐像素扫描
/// - `Balanced`：长边压到 2560 再扫描
/// - `Speed`：长边压到 1024 再扫描
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisProfile {
    Quality,
    Balanced,
    Speed,
}

impl AnalysisProfile {
    /// 从外部字符串解析档位。
    ///
    /// # 示例
    /// ```rust
    /// use listing_photo_check::photo_validator::AnalysisProfile;
    ///
    /// let p = AnalysisProfile::parse("balanced")?;
    /// assert_eq!(p.as_str(), "balanced");
    /// # Ok::<(), listing_photo_check::photo_validator::ImageError>(())
    /// ```
    pub fn parse(profile: &str) -> Result<Self, ImageError> {
        match profile.trim().to_lowercase().as_str() {
            "quality" => Ok(Self::Quality),
            "balanced" => Ok(Self::Balanced),
            "speed" => Ok(Self::Speed),
            other => Err(ImageError::Config(format!(
                "未知分析档位：{}（可选：quality / balanced / speed）",
                other
            ))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Quality => "quality",
            Self::Balanced => "balanced",
            Self::Speed => "speed",
        }
    }
}

impl ValidatorConfig {
    /// 基于当前参数反推分析档位。
    pub(crate) fn infer_analysis_profile(&self) -> AnalysisProfile {
        match self.analysis_max_dimension {
            None => AnalysisProfile::Quality,
            Some(max_dim) if max_dim <= 1024 => AnalysisProfile::Speed,
            Some(_) => AnalysisProfile::Balanced,
        }
    }

    /// 应用指定分析档位到实际参数。
    pub(crate) fn apply_analysis_profile(&mut self, profile: AnalysisProfile) {
        match profile {
            AnalysisProfile::Quality => {
                self.analysis_max_dimension = None;
                self.resize_filter = ResizeFilter::Triangle;
            }
            AnalysisProfile::Balanced => {
                self.analysis_max_dimension = Some(2560);
                self.resize_filter = ResizeFilter::Triangle;
            }
            AnalysisProfile::Speed => {
                self.analysis_max_dimension = Some(1024);
                self.resize_filter = ResizeFilter::Nearest;
            }
        }
    }

    /// 检查配置自身是否合理。
    pub fn validate(&self) -> Result<(), ImageError> {
        if self.max_file_size == 0 {
            return Err(ImageError::Config("max_file_size 必须大于 0".to_string()));
        }
        if self.max_decoded_pixels == Some(0) {
            return Err(ImageError::Config("max_decoded_pixels 必须大于 0".to_string()));
        }
        if self.max_decoded_bytes.is_some_and(|bytes| bytes < 4) {
            return Err(ImageError::Config("max_decoded_bytes 至少容纳一个像素".to_string()));
        }
        if let Some(max_dim) = self.analysis_max_dimension {
            if !(16..=16_384).contains(&max_dim) {
                return Err(ImageError::Config(
                    "analysis_max_dimension 必须在 16~16384 之间".to_string(),
                ));
            }
        }
        Ok(())
    }
}
