//! # 房源照片校验 — 命令行入口
//!
//! 本文件仅负责日志初始化、参数解析与结果输出。
//! 业务逻辑分布在各子模块中，详见 `lib.rs` 架构文档。

use std::process::ExitCode;

use clap::Parser;
use listing_photo_check::photo_validator::commands::{self, Cli, CommandOutcome};

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let pretty = cli.pretty;

    let outcome = match commands::run(cli).await {
        Ok(outcome) => outcome,
        Err(err) => {
            log::error!("photo-check 执行失败: {err}");
            return ExitCode::from(2);
        }
    };

    if let CommandOutcome::Checked(rows) = &outcome {
        let rendered = if pretty {
            serde_json::to_string_pretty(rows)
        } else {
            serde_json::to_string(rows)
        };
        match rendered {
            Ok(json) => println!("{json}"),
            Err(err) => {
                log::error!("序列化校验报告失败: {err}");
                return ExitCode::from(2);
            }
        }
    }

    ExitCode::from(outcome.exit_code())
}
