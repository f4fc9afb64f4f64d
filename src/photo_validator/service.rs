//! # 服务层
//!
//! ## 设计思路
//!
//! 上传表单通常一次选择多张照片。`ValidatorService` 在 `PhotoValidator` 之上提供批量入口：
//! 1. 每张照片独立校验，互不影响；
//! 2. 多张照片并发处理，结果按输入顺序返回；
//! 3. 某张照片的致命错误只体现在它自己的结果上。
//!
//! ## 实现思路
//!
//! 使用 `tokio::task::JoinSet` 并发调度，按下标回填结果。

use chrono::Utc;
use serde::Serialize;

use super::{
    CandidateImage, ImageError, ImageSource, PhotoValidator, ValidationResult, ValidatorConfig,
};

/// 单张照片的校验报告（供 CLI / 日志输出）。
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileReport {
    pub name: String,
    pub declared_mime: String,
    #[serde(flatten)]
    pub result: ValidationResult,
    pub checked_at: String,
}

impl FileReport {
    pub fn new(candidate: &CandidateImage, result: ValidationResult) -> Self {
        Self {
            name: candidate.name().to_string(),
            declared_mime: candidate.declared_mime().to_string(),
            result,
            checked_at: Utc::now().to_rfc3339(),
        }
    }
}

/// 校验服务。
pub struct ValidatorService {
    validator: PhotoValidator,
}

impl ValidatorService {
    /// 使用默认配置创建服务。
    pub fn new() -> Result<Self, ImageError> {
        Self::with_config(ValidatorConfig::default())
    }

    /// 使用自定义配置创建服务。
    pub fn with_config(config: ValidatorConfig) -> Result<Self, ImageError> {
        Ok(Self {
            validator: PhotoValidator::new(config)?,
        })
    }

    pub fn validator(&self) -> &PhotoValidator {
        &self.validator
    }

    /// 校验单张照片。
    pub async fn validate(
        &self,
        candidate: &CandidateImage,
    ) -> Result<ValidationResult, ImageError> {
        self.validator.validate(candidate).await
    }

    /// 加载并校验单个来源，返回报告。
    pub async fn check_source(&self, source: ImageSource) -> Result<FileReport, ImageError> {
        let candidate = self.validator.load_candidate(source)?;
        let result = self.validator.validate(&candidate).await?;
        Ok(FileReport::new(&candidate, result))
    }

    /// 并发校验多张照片，结果顺序与输入一致。
    pub async fn validate_batch(
        &self,
        candidates: Vec<CandidateImage>,
    ) -> Vec<Result<ValidationResult, ImageError>> {
        let total = candidates.len();
        let mut join_set = tokio::task::JoinSet::new();

        for (index, candidate) in candidates.into_iter().enumerate() {
            let validator = self.validator.clone();
            join_set.spawn(async move { (index, validator.validate(&candidate).await) });
        }

        let mut results: Vec<Option<Result<ValidationResult, ImageError>>> =
            (0..total).map(|_| None).collect();

        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((index, outcome)) => results[index] = Some(outcome),
                Err(err) => log::error!("批量校验任务异常退出：{}", err),
            }
        }

        results
            .into_iter()
            .map(|slot| {
                slot.unwrap_or_else(|| Err(ImageError::Fatal("批量校验任务未返回结果".to_string())))
            })
            .collect()
    }
}
