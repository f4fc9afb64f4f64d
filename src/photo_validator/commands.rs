//! # 命令层
//!
//! ## 设计思路
//!
//! 命令层仅做参数接收与结果组装，不承载校验逻辑。
//! 所有实际处理交由 `ValidatorService`，保持命令函数薄、稳定、易测试。

use std::path::PathBuf;

use clap::Parser;
use serde::Serialize;

use super::{
    AnalysisProfile, CandidateImage, FileReport, ImageError, ImageSource, ValidatorConfig,
    ValidatorService,
};
use crate::error::AppError;
use crate::settings;

#[derive(Debug, Parser)]
#[command(name = "photo-check")]
#[command(about = "Check listing photos before upload (format, orientation, lighting, contrast)")]
pub struct Cli {
    /// JSON settings file
    #[arg(long, env = "PHOTO_CHECK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Analysis profile: quality / balanced / speed
    #[arg(long)]
    pub profile: Option<String>,

    /// Declared MIME type for every file (default: from the file extension)
    #[arg(long)]
    pub mime: Option<String>,

    /// Write the default settings file to this path and exit
    #[arg(long, value_name = "FILE")]
    pub write_default_config: Option<PathBuf>,

    /// Pretty-print the JSON report
    #[arg(long)]
    pub pretty: bool,

    /// Photos to check
    pub files: Vec<PathBuf>,
}

/// 加载失败的文件在报告中的形态。
#[derive(Debug, Clone, Serialize)]
pub struct ImageCommandError {
    pub name: String,
    pub code: &'static str,
    pub stage: &'static str,
    pub message: String,
}

impl ImageCommandError {
    fn new(name: String, error: ImageError) -> Self {
        Self {
            name,
            code: error.code(),
            stage: error.stage(),
            message: error.to_string(),
        }
    }
}

/// 报告中的一行。
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum CheckRow {
    Checked(FileReport),
    Failed { error: ImageCommandError },
}

impl CheckRow {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Checked(report) if report.result.is_valid())
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// 命令执行结果。
#[derive(Debug)]
pub enum CommandOutcome {
    ConfigWritten(PathBuf),
    Checked(Vec<CheckRow>),
}

impl CommandOutcome {
    /// 0：全部通过；1：存在被拒绝的照片；2：存在加载 / 校验错误。
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::ConfigWritten(_) => 0,
            Self::Checked(rows) if rows.iter().any(CheckRow::is_error) => 2,
            Self::Checked(rows) if rows.iter().all(CheckRow::is_valid) => 0,
            Self::Checked(_) => 1,
        }
    }
}

/// 执行一次命令行调用。
pub async fn run(cli: Cli) -> Result<CommandOutcome, AppError> {
    if let Some(path) = cli.write_default_config {
        settings::save_config(&path, &ValidatorConfig::default())?;
        log::info!("📝 已写入默认设置文件: {}", path.display());
        return Ok(CommandOutcome::ConfigWritten(path));
    }

    if cli.files.is_empty() {
        return Err(AppError::Usage("至少需要一个照片文件".to_string()));
    }

    let config = match &cli.config {
        Some(path) => settings::load_config(path)?,
        None => ValidatorConfig::default(),
    };
    let service = ValidatorService::with_config(config)?;

    if let Some(profile) = &cli.profile {
        service
            .validator()
            .set_analysis_profile(AnalysisProfile::parse(profile)?)?;
    }

    let mut rows: Vec<Option<CheckRow>> = Vec::with_capacity(cli.files.len());
    let mut pending: Vec<(usize, CandidateImage)> = Vec::new();

    for path in &cli.files {
        let display = path.display().to_string();
        match service
            .validator()
            .load_candidate(ImageSource::FilePath(display.clone()))
        {
            Ok(candidate) => {
                let candidate = match &cli.mime {
                    Some(mime) => candidate.with_declared_mime(mime.clone()),
                    None => candidate,
                };
                pending.push((rows.len(), candidate));
                rows.push(None);
            }
            Err(err) => {
                log::warn!("⚠️ 加载失败 - {}: {}", display, err);
                rows.push(Some(CheckRow::Failed {
                    error: ImageCommandError::new(display, err),
                }));
            }
        }
    }

    let (slots, candidates): (Vec<usize>, Vec<CandidateImage>) = pending.into_iter().unzip();
    let results = service.validate_batch(candidates.clone()).await;

    for ((slot, candidate), outcome) in slots.into_iter().zip(candidates).zip(results) {
        rows[slot] = Some(match outcome {
            Ok(result) => CheckRow::Checked(FileReport::new(&candidate, result)),
            Err(err) => CheckRow::Failed {
                error: ImageCommandError::new(candidate.name().to_string(), err),
            },
        });
    }

    Ok(CommandOutcome::Checked(rows.into_iter().flatten().collect()))
}
