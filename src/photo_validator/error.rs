//! # 错误模型模块
//!
//! ## 设计思路
//!
//! 校验链路中的错误分为两类：
//! - 可预期的拒绝（格式、方向、光线、清晰度、解码失败）由 `Rejection` 表示，
//!   最终折叠为 `ValidationResult`，不会以错误形式抛给调用方；
//! - 加载阶段与运行环境的错误由 `ImageError` 表示，通过 `thiserror` 保持可读，
//!   同时让调用侧可按分支匹配。

/// 图片加载与校验环境的统一错误类型。
///
/// 该类型会在应用层被上转为 `AppError`。
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("解码错误：{0}")]
    Decode(String),

    #[error("格式错误：{0}")]
    InvalidFormat(String),

    #[error("文件错误：{0}")]
    FileSystem(String),

    /// 输入体积超过加载上限。
    #[error("体积超限：{0}")]
    TooLarge(String),

    /// 绘制表面相关的资源限制。
    #[error("资源限制：{0}")]
    ResourceLimit(String),

    #[error("配置错误：{0}")]
    Config(String),

    /// 校验任务本身无法完成（工作线程崩溃、运行时已关闭）。
    #[error("校验任务异常：{0}")]
    Fatal(String),
}

impl ImageError {
    /// 稳定的错误码，供报告与日志检索。
    pub fn code(&self) -> &'static str {
        match self {
            Self::Decode(_) => "decode_failed",
            Self::InvalidFormat(_) => "invalid_format",
            Self::FileSystem(_) => "file_system",
            Self::TooLarge(_) => "too_large",
            Self::ResourceLimit(_) => "resource_limit",
            Self::Config(_) => "config",
            Self::Fatal(_) => "fatal",
        }
    }

    /// 出错所处的处理阶段。
    pub fn stage(&self) -> &'static str {
        match self {
            Self::FileSystem(_) | Self::InvalidFormat(_) | Self::TooLarge(_) => "load",
            Self::Decode(_) => "decode",
            Self::ResourceLimit(_) => "raster",
            Self::Config(_) => "config",
            Self::Fatal(_) => "worker",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_error_reports_worker_stage() {
        let err = ImageError::Fatal("join failed".to_string());

        assert_eq!(err.code(), "fatal");
        assert_eq!(err.stage(), "worker");
        assert!(err.to_string().contains("join failed"));
    }

    #[test]
    fn oversized_input_is_a_load_stage_error() {
        let err = ImageError::TooLarge("文件过大".to_string());

        assert_eq!(err.code(), "too_large");
        assert_eq!(err.stage(), "load");
    }
}
