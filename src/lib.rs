//! # 房源照片上传前校验 — 库入口
//!
//! ## 架构总览
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │           上传表单 / 命令行 (photo-check)                 │
//! │                 ↓ 文件 + 声明类型 + 名称                  │
//! └─────────────────┼────────────────────────────────────────┘
//!                   ↓
//! ┌─────────────────┼────────────────────────────────────────┐
//! │  ┌─ error ────── AppError (统一错误类型)                  │
//! │  │                                                       │
//! │  ├─ settings ─── JSON 设置文件读写                        │
//! │  │                                                       │
//! │  └─ photo_validator                                      │
//! │      ├─ policy     允许格式 · 阈值 · 拒绝原因             │
//! │      ├─ pipeline   解码 · 绘制表面 · 降采样               │
//! │      ├─ analysis   亮度 / 对比度评分                      │
//! │      ├─ handle     解码句柄 (RAII)                        │
//! │      └─ service    批量并发校验                           │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## 模块职责
//!
//! | 模块 | 职责 |
//! |------|------|
//! | [`error`] | 统一错误类型 `AppError` |
//! | [`settings`] | 校验器配置的 JSON 读写 |
//! | [`photo_validator`] | 单张 / 批量照片校验，返回 `ValidationResult` |

pub mod error;
pub mod photo_validator;
pub mod settings;
