//! # 房源照片校验模块（photo_validator）
//!
//! ## 设计思路
//!
//! 房东上传房源照片前，先在本地判断照片是否可用：格式、横竖方向、光线、清晰度。
//! 该模块将“来源加载 → 格式检查 → 解码 → 绘制 → 评分 → 结论”
//! 按职责拆分为多个子模块，避免单文件膨胀与耦合。
//!
//! - `commands`：仅做命令行入参/出参适配（薄封装）
//! - `service`：批量并发校验与报告
//! - `handler`：编排单次校验的状态链
//! - `loader`：负责文件 / Base64 加载与体积限制
//! - `pipeline`：负责解码、绘制表面限制、降采样
//! - `analysis`：亮度与对比度评分
//! - `policy`：允许格式、阈值、拒绝原因与 `ValidationResult`
//! - `handle`：单次校验的临时解码句柄（RAII）
//! - `config/error/source`：配置、错误、中间数据模型
//!
//! ## 新同事快速上手
//!
//! ```text
//! main.rs（CLI 入口）
//!    ↓
//! commands.rs（参数适配 + 输出）
//!    ↓
//! service.rs（批量调度）
//!    ↓
//! handler.rs（状态链 + 阶段耗时日志）
//!    ├─ policy.rs（格式检查，不解码）
//!    ├─ pipeline.rs（解码 + 方向 + 绘制）
//!    └─ analysis.rs（亮度 / 对比度）
//!    ↓
//! ValidationResult { isValid, reason? }
//! ```
//!
//! ## 分层职责建议
//!
//! - 验收阈值与文案变更只改 `policy.rs`
//! - 资源上限与降采样策略改 `config.rs`
//! - 阶段顺序变更改 `handler.rs`

mod analysis;
pub mod commands;
mod config;
mod error;
mod handle;
mod handler;
mod loader;
mod pipeline;
mod policy;
mod service;
mod source;

pub use analysis::{LumaStats, judge, luma, measure};
pub use config::{AnalysisProfile, ResizeFilter, ValidatorConfig};
pub use error::ImageError;
pub use handle::{DecodeHandle, HandleRegistry, HandleStats};
pub use handler::{PhotoValidator, ValidationStage};
pub use loader::mime_from_extension;
pub use policy::{
    CONTRAST_MIDPOINT, LUMA_WEIGHTS, MAX_MEAN_LUMA, MIN_MEAN_DEVIATION, MIN_MEAN_LUMA,
    Rejection, SUPPORTED_MIME_TYPES, ValidationResult, canonical_mime, is_supported_mime,
};
pub use service::{FileReport, ValidatorService};
pub use source::{CandidateImage, ImageSource};
