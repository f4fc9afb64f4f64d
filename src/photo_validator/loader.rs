//! # 加载模块
//!
//! ## 设计思路
//!
//! 把不同来源（本地文件 / Base64）统一转换成 `CandidateImage`，
//! 并在“尽可能早”的阶段执行体积限制，尽快失败。
//!
//! ## 实现思路
//!
//! - 文件：存在性 + metadata 体积限制 + 读取；声明类型按扩展名推断，
//!   与浏览器 `File.type` 的行为一致。
//! - Base64：Data URL 头部携带声明类型；先估算解码体积再解码。
//! - 通过 magic bytes（`infer`）识别真实类型，仅在与声明类型不一致时记录告警，
//!   不影响校验结论。

use base64::{Engine as _, engine::general_purpose};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::path::Path;

use super::policy::canonical_mime;
use super::{CandidateImage, ImageError, ImageSource, PhotoValidator, ValidatorConfig};

/// 扩展名 → 声明类型。
///
/// 非允许格式也在表内：它们需要被“声明”出来，再由格式检查拒绝。
static EXTENSION_MIME_TYPES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("jpg", "image/jpeg"),
        ("jpeg", "image/jpeg"),
        ("jpe", "image/jpeg"),
        ("png", "image/png"),
        ("webp", "image/webp"),
        ("gif", "image/gif"),
        ("bmp", "image/bmp"),
        ("tif", "image/tiff"),
        ("tiff", "image/tiff"),
        ("avif", "image/avif"),
        ("heic", "image/heic"),
        ("heif", "image/heif"),
        ("svg", "image/svg+xml"),
        ("ico", "image/x-icon"),
        ("pdf", "application/pdf"),
        ("txt", "text/plain"),
    ])
});

/// 按文件扩展名推断声明类型；未知扩展名返回空字符串。
pub fn mime_from_extension(path: &Path) -> &'static str {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .and_then(|ext| EXTENSION_MIME_TYPES.get(ext.as_str()).copied())
        .unwrap_or("")
}

impl PhotoValidator {
    /// 从任意来源加载候选图片。
    pub fn load_candidate(&self, source: ImageSource) -> Result<CandidateImage, ImageError> {
        let config = self.config_snapshot()?;
        match source {
            ImageSource::FilePath(path) => Self::load_from_file(&path, &config),
            ImageSource::Base64 {
                data,
                name,
                declared_mime,
            } => Self::load_from_base64(&data, name, declared_mime, &config),
        }
    }

    /// 从本地路径加载候选图片。
    pub(super) fn load_from_file(
        path: &str,
        config: &ValidatorConfig,
    ) -> Result<CandidateImage, ImageError> {
        log::info!("📁 开始读取本地图片 - 路径: {}", path);

        let file_path = Path::new(path);
        if !file_path.exists() {
            return Err(ImageError::FileSystem(format!("文件不存在：{}", path)));
        }

        let metadata = std::fs::metadata(file_path)
            .map_err(|e| ImageError::FileSystem(format!("无法读取文件信息：{}", e)))?;

        if !metadata.is_file() {
            return Err(ImageError::FileSystem(format!("不是普通文件：{}", path)));
        }

        if metadata.len() > config.max_file_size {
            return Err(ImageError::TooLarge(format!(
                "文件过大：{:.2} MB（限制：{:.2} MB）",
                metadata.len() as f64 / 1024.0 / 1024.0,
                config.max_file_size as f64 / 1024.0 / 1024.0
            )));
        }

        let bytes = std::fs::read(file_path)
            .map_err(|e| ImageError::FileSystem(format!("无法读取图片文件：{}", e)))?;

        let name = file_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(path)
            .to_string();
        let declared = mime_from_extension(file_path);
        Self::log_signature_mismatch(&name, declared, &bytes);

        Ok(CandidateImage::new(name, declared, bytes))
    }

    /// 从 Base64 字符串加载候选图片。
    pub(super) fn load_from_base64(
        data: &str,
        name: String,
        declared_mime: Option<String>,
        config: &ValidatorConfig,
    ) -> Result<CandidateImage, ImageError> {
        log::info!("📝 开始处理 base64 图片 - 名称: {}", name);

        let (header_mime, bytes) = Self::parse_base64_with_limit(data, config.max_file_size)?;
        let declared = header_mime.or(declared_mime).unwrap_or_default();
        Self::log_signature_mismatch(&name, &declared, &bytes);

        Ok(CandidateImage::new(name, declared, bytes))
    }

    fn estimate_base64_decoded_upper_bound_len(base64_data: &str) -> Result<u64, ImageError> {
        let len = base64_data.trim().len() as u64;
        let groups = len
            .checked_add(3)
            .ok_or_else(|| ImageError::TooLarge("Base64 输入长度溢出".to_string()))?
            / 4;

        groups
            .checked_mul(3)
            .ok_or_else(|| ImageError::TooLarge("Base64 解码体积估算溢出".to_string()))
    }

    /// 解析 Base64 输入（支持 Data URL / 纯 Base64）。
    ///
    /// 返回 Data URL 头部声明的类型（若有）与解码后的字节。
    fn parse_base64_with_limit(
        data: &str,
        max_file_size: u64,
    ) -> Result<(Option<String>, Vec<u8>), ImageError> {
        let normalized = data.trim();

        let (header_mime, base64_data) = match normalized.strip_prefix("data:") {
            Some(rest) => {
                let marker = rest
                    .find(";base64,")
                    .ok_or_else(|| ImageError::InvalidFormat("缺少 base64 标记".to_string()))?;
                (Some(rest[..marker].to_string()), &rest[marker + 8..])
            }
            None => (None, normalized),
        };

        let estimated_len = Self::estimate_base64_decoded_upper_bound_len(base64_data)?;
        if estimated_len > max_file_size {
            return Err(ImageError::TooLarge(format!(
                "Base64 预计解码体积过大：{:.2} MB（限制：{:.2} MB）",
                estimated_len as f64 / 1024.0 / 1024.0,
                max_file_size as f64 / 1024.0 / 1024.0
            )));
        }

        let bytes = general_purpose::STANDARD
            .decode(base64_data.trim())
            .map_err(|e| ImageError::Decode(format!("Base64 解码失败：{}", e)))?;

        Ok((header_mime, bytes))
    }

    /// 通过文件签名识别真实类型，与声明类型不一致时仅记录告警。
    fn log_signature_mismatch(name: &str, declared: &str, bytes: &[u8]) {
        match infer::get(bytes) {
            Some(kind) if kind.mime_type() != canonical_mime(declared) => {
                log::warn!(
                    "⚠️ 声明类型与文件签名不一致 - 文件: {} 声明: {:?} 签名: {}",
                    name,
                    declared,
                    kind.mime_type()
                );
            }
            Some(_) => {}
            None => log::debug!("🔍 无法从文件签名识别类型 - 文件: {}", name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn temp_path(file_name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("photo-check-loader-{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("create temp dir failed");
        dir.join(file_name)
    }

    #[test]
    fn extension_mapping_is_case_insensitive() {
        assert_eq!(mime_from_extension(Path::new("a/b/Terrace.JPG")), "image/jpeg");
        assert_eq!(mime_from_extension(Path::new("pool.webp")), "image/webp");
        assert_eq!(mime_from_extension(Path::new("plan.gif")), "image/gif");
        assert_eq!(mime_from_extension(Path::new("README")), "");
    }

    #[test]
    fn data_url_header_sets_declared_type() {
        let config = ValidatorConfig::default();
        let candidate = PhotoValidator::load_from_base64(
            "data:image/webp;base64,SGVsbG8=",
            "hello.webp".to_string(),
            Some("image/png".to_string()),
            &config,
        )
        .expect("load failed");

        assert_eq!(candidate.declared_mime(), "image/webp");
        assert_eq!(candidate.bytes(), b"Hello");
        assert_eq!(candidate.name(), "hello.webp");
    }

    #[test]
    fn plain_base64_uses_caller_declared_type() {
        let config = ValidatorConfig::default();
        let candidate = PhotoValidator::load_from_base64(
            "SGVsbG8=",
            "raw".to_string(),
            Some("image/png".to_string()),
            &config,
        )
        .expect("load failed");

        assert_eq!(candidate.declared_mime(), "image/png");
    }

    #[test]
    fn data_url_without_base64_marker_is_rejected() {
        let result = PhotoValidator::parse_base64_with_limit("data:image/png,abc", 1024);
        assert!(matches!(result, Err(ImageError::InvalidFormat(_))));
    }

    #[test]
    fn parse_base64_with_limit_rejects_large_payload_before_decode() {
        let huge = "A".repeat(1024 * 1024);
        let result = PhotoValidator::parse_base64_with_limit(&huge, 32);

        assert!(matches!(result, Err(ImageError::TooLarge(_))));
    }

    #[test]
    fn load_from_file_reports_missing_file() {
        let result = PhotoValidator::load_from_file(
            "/definitely/missing/photo.png",
            &ValidatorConfig::default(),
        );
        assert!(matches!(result, Err(ImageError::FileSystem(_))));
    }

    #[test]
    fn load_from_file_enforces_size_limit() {
        let path = temp_path("too-big.png");
        std::fs::write(&path, vec![0u8; 2048]).expect("write temp file failed");
        let config = ValidatorConfig {
            max_file_size: 1024,
            ..ValidatorConfig::default()
        };

        let result = PhotoValidator::load_from_file(path.to_str().expect("utf-8 path"), &config);

        let Err(err) = result else {
            panic!("oversized file should not load");
        };
        assert!(matches!(err, ImageError::TooLarge(_)));
        assert_eq!(err.stage(), "load");
    }

    #[test]
    fn load_from_file_uses_file_name_and_extension() {
        let path = temp_path("Balcony View.PNG");
        std::fs::write(&path, b"not really a png").expect("write temp file failed");

        let candidate = PhotoValidator::load_from_file(
            path.to_str().expect("utf-8 path"),
            &ValidatorConfig::default(),
        )
        .expect("load failed");

        assert_eq!(candidate.name(), "Balcony View.PNG");
        assert_eq!(candidate.declared_mime(), "image/png");
        assert_eq!(candidate.bytes(), b"not really a png");
    }
}
