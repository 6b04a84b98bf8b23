//! 命令与参数定义
//!
//! clap 派生宏负责生成帮助文本、缺参提示和类型转换

use std::path::PathBuf;

use clap::{Args, Subcommand};

/// 顶层子命令
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// 验证答题表结构，不进行纠正
    Validate(ExamArgs),

    /// 验证并纠正试卷，输出成绩和统计
    Correct(CorrectArgs),

    /// 管理本地历史记录
    #[command(subcommand)]
    History(HistoryCommand),

    /// 显示答题表的格式要求
    Guide,
}

/// 试卷文件和配置
#[derive(Args, Debug, Clone)]
pub struct ExamArgs {
    /// 答题表文件（.xlsx / .xls）
    pub file: PathBuf,

    /// 每题的选项数量（3-5，超出范围会被截断）
    #[arg(short = 'o', long = "options", default_value_t = 5)]
    pub options: i64,

    /// 题目数量（5-20，超出范围会被截断）
    #[arg(short = 'q', long = "questions", default_value_t = 10)]
    pub questions: i64,
}

/// `correct` 子命令参数
#[derive(Args, Debug, Clone)]
pub struct CorrectArgs {
    #[command(flatten)]
    pub exam: ExamArgs,

    /// 下载纠正后的 Excel
    #[arg(long)]
    pub excel: bool,

    /// 下载 PDF 报告
    #[arg(long)]
    pub pdf: bool,

    /// 下载目录（默认使用配置中的 download_dir）
    #[arg(long)]
    pub out: Option<PathBuf>,
}

/// `history` 子命令
#[derive(Subcommand, Debug, Clone)]
pub enum HistoryCommand {
    /// 列出最近的纠正记录
    List,
    /// 显示一条记录的成绩和统计
    Show { id: i64 },
    /// 删除一条记录
    Delete { id: i64 },
    /// 清空历史记录
    Clear,
}
