//! # 验收策略模块
//!
//! ## 设计思路
//!
//! 集中定义“什么样的照片可以上传”：允许的格式、亮度/对比度阈值、
//! 拒绝原因文案，以及最终返回给调用方的 `ValidationResult`。
//!
//! 阈值与亮度权重是验收边界本身，修改任何一个都会改变通过/拒绝的结果，
//! 因此全部以常量形式固定在这里，不进入可调配置。

use serde::Serialize;

/// 允许上传的声明类型（规范化后）。
pub const SUPPORTED_MIME_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp"];

/// 亮度权重（R, G, B）。
pub const LUMA_WEIGHTS: [f64; 3] = [0.299, 0.587, 0.114];

/// 平均亮度下限（0–255）。
pub const MIN_MEAN_LUMA: f64 = 30.0;

/// 平均亮度上限（0–255）。
pub const MAX_MEAN_LUMA: f64 = 225.0;

/// 对比度参考中点。
pub const CONTRAST_MIDPOINT: f64 = 128.0;

/// 平均偏离中点的最小值，低于该值视为模糊/低质量。
pub const MIN_MEAN_DEVIATION: f64 = 15.0;

/// 规范化声明的 MIME 类型：去空白、转小写、去掉 `;` 之后的参数。
pub fn canonical_mime(declared: &str) -> String {
    let normalized = declared.trim().to_ascii_lowercase();
    match normalized.split(';').next() {
        Some(head) => head.trim().to_string(),
        None => normalized,
    }
}

/// 声明类型是否在允许列表内。
pub fn is_supported_mime(declared: &str) -> bool {
    let canonical = canonical_mime(declared);
    SUPPORTED_MIME_TYPES.contains(&canonical.as_str())
}

/// 面向用户的拒绝原因。
///
/// `Display` 输出即为展示给用户的文案。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("{name}: Unsupported format. Allowed formats are JPEG, PNG, WebP.")]
    UnsupportedFormat { name: String },

    #[error("{name}: Failed to load image.")]
    LoadFailed { name: String },

    #[error("Image must be landscape (width > height).")]
    NotLandscape,

    #[error("Could not process image.")]
    NoDrawingSurface,

    #[error("Image is too dark or too bright (poor lighting).")]
    PoorLighting,

    #[error("Image appears blurry or low quality.")]
    LowContrast,
}

impl Rejection {
    /// 稳定的拒绝码，便于日志统计。
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnsupportedFormat { .. } => "unsupported_format",
            Self::LoadFailed { .. } => "load_failed",
            Self::NotLandscape => "not_landscape",
            Self::NoDrawingSurface => "no_drawing_surface",
            Self::PoorLighting => "poor_lighting",
            Self::LowContrast => "low_contrast",
        }
    }
}

/// 单张照片的校验结论。
///
/// 只能通过 `accepted` / `rejected` 构造：`reason` 存在当且仅当 `is_valid == false`。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    is_valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
}

impl ValidationResult {
    pub fn accepted() -> Self {
        Self {
            is_valid: true,
            reason: None,
        }
    }

    pub fn rejected(rejection: Rejection) -> Self {
        Self {
            is_valid: false,
            reason: Some(rejection.to_string()),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid
    }

    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }
}

impl From<Result<(), Rejection>> for ValidationResult {
    fn from(outcome: Result<(), Rejection>) -> Self {
        match outcome {
            Ok(()) => Self::accepted(),
            Err(rejection) => Self::rejected(rejection),
        }
    }
}
