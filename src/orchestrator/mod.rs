//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 持有所有资源（HTTP 客户端、历史记录文件），把 CLI 命令调度到工作流控制器。
//!
//! ## 层次关系
//!
//! ```text
//! cli (解析参数)
//!     ↓
//! orchestrator::App (组装资源，调度命令，输出结果)
//!     ↓
//! workflow::WorkflowController (状态机与前置条件)
//!     ↓
//! clients / services (远程调用、历史记录、展示)
//! ```

pub mod app;

pub use app::{App, SPREADSHEET_GUIDE};
