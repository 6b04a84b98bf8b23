//! 工作流状态
//!
//! 用一个枚举表达全部状态，"已纠正却没有会话"之类的非法组合无法被构造

use std::fmt;

use crate::models::{CorrectionResult, CorrectionSession, SelectedFile};

/// 文件验证状态
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ValidationState {
    #[default]
    NotValidated,
    Validating,
    Valid,
    Invalid(String),
}

/// 当前结果的来源
#[derive(Debug, Clone, PartialEq)]
pub enum ResultOrigin {
    /// 刚完成的纠正，服务器会话仍可用于下载
    Live {
        file_name: String,
        session: CorrectionSession,
    },
    /// 从历史记录打开，没有服务器会话
    History { entry_id: i64 },
}

/// 工作流状态
#[derive(Debug, Clone, PartialEq, Default)]
pub enum WorkflowState {
    /// 未选择文件
    #[default]
    Idle,
    /// 已选择文件，可验证 / 纠正
    Ready {
        file: SelectedFile,
        validation: ValidationState,
        /// 纠正成功但获取结果失败时保留的会话
        pending_session: Option<CorrectionSession>,
    },
    /// 正在纠正（loading）
    Correcting { file: SelectedFile },
    /// 结果已就绪
    Corrected {
        origin: ResultOrigin,
        result: CorrectionResult,
    },
}

/// 对外展示的阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    FileSelected,
    Validating,
    Validated,
    Correcting,
    Corrected,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Idle => "空闲",
            Phase::FileSelected => "已选择文件",
            Phase::Validating => "验证中",
            Phase::Validated => "已验证",
            Phase::Correcting => "纠正中",
            Phase::Corrected => "已纠正",
        };
        write!(f, "{}", name)
    }
}

impl WorkflowState {
    pub fn phase(&self) -> Phase {
        match self {
            WorkflowState::Idle => Phase::Idle,
            WorkflowState::Ready { validation, .. } => match validation {
                ValidationState::NotValidated | ValidationState::Invalid(_) => Phase::FileSelected,
                ValidationState::Validating => Phase::Validating,
                ValidationState::Valid => Phase::Validated,
            },
            WorkflowState::Correcting { .. } => Phase::Correcting,
            WorkflowState::Corrected { .. } => Phase::Corrected,
        }
    }

    /// 文件验证状态；没有文件时视为未验证
    pub fn validation(&self) -> ValidationState {
        match self {
            WorkflowState::Ready { validation, .. } => validation.clone(),
            _ => ValidationState::NotValidated,
        }
    }

    pub fn selected_file(&self) -> Option<&SelectedFile> {
        match self {
            WorkflowState::Ready { file, .. } | WorkflowState::Correcting { file } => Some(file),
            _ => None,
        }
    }

    pub fn result(&self) -> Option<&CorrectionResult> {
        match self {
            WorkflowState::Corrected { result, .. } => Some(result),
            _ => None,
        }
    }

    /// 仍可用于下载 / 刷新的服务器会话
    pub fn live_session(&self) -> Option<&CorrectionSession> {
        match self {
            WorkflowState::Corrected {
                origin: ResultOrigin::Live { session, .. },
                ..
            } => Some(session),
            _ => None,
        }
    }

    pub fn pending_session(&self) -> Option<&CorrectionSession> {
        match self {
            WorkflowState::Ready {
                pending_session, ..
            } => pending_session.as_ref(),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, WorkflowState::Correcting { .. })
    }

    /// 使验证失效：配置或文件变化后调用
    pub(crate) fn invalidate(&mut self) {
        if let WorkflowState::Ready {
            validation,
            pending_session,
            ..
        } = self
        {
            *validation = ValidationState::NotValidated;
            *pending_session = None;
        }
    }
}
