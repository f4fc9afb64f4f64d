//! # 数据源与中间模型
//!
//! ## 设计思路
//!
//! 将“外部输入类型”和“流水线中间结果”解耦：
//! - `ImageSource` 表示外部来源语义
//! - `CandidateImage` 表示待校验的照片（字节 + 声明类型 + 展示名）
//! - `DecodedRaster` 表示绘制到离屏缓冲后的 RGBA 数据

use std::sync::Arc;

/// 图片输入来源。
pub enum ImageSource {
    /// 本地文件路径来源。
    FilePath(String),
    /// Base64（支持 Data URL 与纯 Base64 字符串）。
    Base64 {
        data: String,
        /// 展示名，用于拒绝原因文案。
        name: String,
        /// 纯 Base64 时使用的声明类型；Data URL 自带类型时忽略。
        declared_mime: Option<String>,
    },
}

/// 待校验的照片。
///
/// 字节以 `Arc<[u8]>` 持有：校验过程只读共享，不会修改或保存调用方的数据。
#[derive(Debug, Clone)]
pub struct CandidateImage {
    name: String,
    declared_mime: String,
    bytes: Arc<[u8]>,
}

impl CandidateImage {
    pub fn new(
        name: impl Into<String>,
        declared_mime: impl Into<String>,
        bytes: impl Into<Arc<[u8]>>,
    ) -> Self {
        Self {
            name: name.into(),
            declared_mime: declared_mime.into(),
            bytes: bytes.into(),
        }
    }

    /// 展示名（原样出现在拒绝原因中）。
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 调用方声明的 MIME 类型，可能为空。
    pub fn declared_mime(&self) -> &str {
        &self.declared_mime
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// 替换声明类型，字节共享不复制。
    pub fn with_declared_mime(self, declared_mime: impl Into<String>) -> Self {
        Self {
            declared_mime: declared_mime.into(),
            ..self
        }
    }

    pub(crate) fn shared_bytes(&self) -> Arc<[u8]> {
        Arc::clone(&self.bytes)
    }
}

/// 绘制阶段输出：RGBA 像素（`width * height * 4`）。
pub(crate) struct DecodedRaster {
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) pixels: Vec<u8>,
}

impl DecodedRaster {
    pub(crate) fn pixel_count(&self) -> usize {
        self.pixels.len() / 4
    }
}
