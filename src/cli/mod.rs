//! 命令行入口
//!
//! 只负责解析参数，具体执行交给 `orchestrator::App`

pub mod commands;

use clap::Parser;

pub use commands::{Commands, CorrectArgs, ExamArgs, HistoryCommand};

/// 试卷自动纠正客户端
#[derive(Parser, Debug)]
#[command(
    name = "grade-pilot",
    version,
    about = "上传答题表、验证格式、提交纠正并查看成绩统计"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}
