//! 应用入口 - 编排层
//!
//! ## 职责
//!
//! 1. **应用初始化**：创建客户端、打开历史记录文件、组装控制器
//! 2. **命令调度**：把一条 CLI 命令翻译成控制器上的一系列操作
//! 3. **结果输出**：成绩表、指标卡片、历史记录列表
//!
//! 本模块不做任何业务判断，前置条件全部由控制器检查

use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::{error, info, warn};

use crate::cli::{Commands, CorrectArgs, ExamArgs, HistoryCommand};
use crate::clients::{DownloadKind, GradingClient};
use crate::config::Config;
use crate::error::AppError;
use crate::models::{CorrectionResult, SelectedFile};
use crate::services::{presenter, FileHistoryStore};
use crate::utils::logging::log_startup;
use crate::workflow::WorkflowController;

/// 答题表格式说明
pub const SPREADSHEET_GUIDE: &str = "\
答题表格式要求
  • 第 A 列: 学生 DNI
  • 第 B 列起: P1, P2, ..., PN（每题一列，N 为题目数量）
  • 第 1 行: 表头（DNI, P1, P2, ...）
  • 第 2 行: 标准答案
  • 第 3 行起: 每行一名学生的作答
  • 答案使用字母 A-E，多选答案写成 \"A,B\"
  • 空白单元格表示未作答
  • 选项数量和题目数量必须与命令行参数一致（-o / -q）";

/// 应用主结构
pub struct App {
    config: Config,
    controller: WorkflowController<GradingClient, FileHistoryStore>,
}

impl App {
    /// 初始化应用
    pub fn initialize(config: Config) -> Result<Self> {
        log_startup(&config);

        let client = GradingClient::new(&config)?;
        let history = FileHistoryStore::open(&config.history_file);
        let history_path = history.path().display().to_string();
        let controller = WorkflowController::new(client, history);
        info!(
            "🗂️ 已加载 {} 条历史记录 ({})",
            controller.history().len(),
            history_path
        );

        Ok(Self { config, controller })
    }

    pub fn controller(&self) -> &WorkflowController<GradingClient, FileHistoryStore> {
        &self.controller
    }

    /// 执行一条命令
    pub async fn run(&mut self, command: Commands) -> Result<()> {
        let outcome = match command {
            Commands::Validate(args) => self.validate(&args).await,
            Commands::Correct(args) => self.correct(&args).await,
            Commands::History(cmd) => self.history(cmd),
            Commands::Guide => {
                println!("{}", SPREADSHEET_GUIDE);
                Ok(())
            }
        };

        if let Err(e) = &outcome {
            error!("❌ {}", e);
        }
        Ok(outcome?)
    }

    /// 读取文件并应用试卷配置
    fn prepare(&mut self, args: &ExamArgs) -> Result<(), AppError> {
        let file = SelectedFile::from_path(&args.file)?;
        self.controller.select_file(file);
        let options = self.controller.set_option_count(args.options);
        let questions = self.controller.set_question_count(args.questions);
        if i64::from(options) != args.options || i64::from(questions) != args.questions {
            warn!(
                "⚠️ 配置已调整为 {} 个选项 / {} 道题",
                options, questions
            );
        }
        Ok(())
    }

    async fn validate(&mut self, args: &ExamArgs) -> Result<(), AppError> {
        self.prepare(args)?;
        self.controller.validate().await?;
        info!("✅ 文件有效: {}", args.file.display());
        Ok(())
    }

    async fn correct(&mut self, args: &CorrectArgs) -> Result<(), AppError> {
        self.prepare(&args.exam)?;
        self.controller.validate().await?;

        let entry = self.controller.correct().await?;
        info!("🗂️ 已保存到历史记录 [{}]", entry.id);

        if let Some(result) = self.controller.state().result() {
            print_result(result);
        }

        let dir = self.download_dir(args.out.as_deref());
        let kinds = [
            (args.excel, DownloadKind::Spreadsheet),
            (args.pdf, DownloadKind::Report),
        ];
        for (_, kind) in kinds.into_iter().filter(|(wanted, _)| *wanted) {
            self.controller.download(kind, &dir).await?;
        }
        Ok(())
    }

    fn history(&mut self, command: HistoryCommand) -> Result<(), AppError> {
        match command {
            HistoryCommand::List => {
                let history = self.controller.history();
                if history.is_empty() {
                    info!("📭 暂无历史记录");
                }
                for entry in history {
                    println!("{}", presenter::history_line(entry));
                }
            }
            HistoryCommand::Show { id } => {
                let result = self.controller.view_history_entry(id)?;
                print_result(result);
            }
            HistoryCommand::Delete { id } => {
                if !self.controller.delete_history_entry(id)? {
                    warn!("⚠️ 历史记录 [{}] 不存在", id);
                }
            }
            HistoryCommand::Clear => {
                self.controller.clear_history()?;
            }
        }
        Ok(())
    }

    fn download_dir(&self, out: Option<&Path>) -> PathBuf {
        out.map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(&self.config.download_dir))
    }
}

// ========== 输出辅助函数 ==========

fn print_result(result: &CorrectionResult) {
    println!("\n{}", "=".repeat(60));
    println!("📋 成绩预览");
    println!("{}", "=".repeat(60));
    print!("{}", presenter::render_preview_table(&result.preview));

    println!("\n{}", "=".repeat(60));
    println!("📊 统计指标");
    println!("{}", "=".repeat(60));
    for line in presenter::summary_lines(&result.metrics) {
        println!("{}", line);
    }

    if !result.metrics.question_data.is_empty() {
        println!("\n{}", "─".repeat(60));
        print!("{}", presenter::render_question_table(&result.metrics));
    }
    println!("{}", "=".repeat(60));
}
