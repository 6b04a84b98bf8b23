//! # Grade Pilot
//!
//! 选择题试卷自动纠正客户端：上传答题表、验证格式、提交纠正、查看成绩与统计
//!
//! ## 架构设计
//!
//! 纠正、解析和报告生成都在远程服务中完成，本 crate 只负责流程编排和本地历史记录。
//!
//! ### ① 客户端层（Clients）
//! - `clients/` - 远程纠正服务的类型化封装，不持有任何状态
//! - `GradingApi` - validate / corregir / preview / metrics / 下载
//!
//! ### ② 业务能力层（Services）
//! - `HistoryStore` - 最近 10 次纠正结果的本地缓存
//! - `presenter` - 及格判定、成绩格式化、图表序列
//!
//! ### ③ 流程层（Workflow）
//! - `WorkflowState` - 单一枚举表达全部状态
//! - `WorkflowController` - 按前置条件编排远程调用
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator::App` - 组装资源并执行一条 CLI 命令

pub mod cli;
pub mod clients;
pub mod config;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use clients::{GradingApi, GradingClient};
pub use config::Config;
pub use error::{AppError, AppResult};
pub use orchestrator::App;
pub use services::{FileHistoryStore, HistoryStore, MemoryHistoryStore};
pub use workflow::{Phase, WorkflowController, WorkflowState};
