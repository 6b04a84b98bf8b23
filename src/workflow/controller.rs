//! 纠正流程控制器 - 流程层
//!
//! 核心职责：按前置条件编排远程调用
//!
//! 流程顺序：
//! 1. 选择文件 → 配置（选项数 / 题目数）
//! 2. validate → 文件有效
//! 3. corregir → preview → metrics
//! 4. 写入历史记录 → 结果视图
//!
//! 所有操作都需要 `&mut self`，同一时刻只可能有一个请求在进行中

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::clients::{DownloadKind, GradingApi};
use crate::error::{AppError, AppResult, UserInputError};
use crate::models::{
    CorrectionResult, CorrectionSession, ExamConfig, HistoryEntry, HistoryList, SelectedFile,
};
use crate::services::HistoryStore;
use crate::workflow::state::{Phase, ResultOrigin, ValidationState, WorkflowState};

/// 纠正流程控制器
///
/// - 独占试卷配置、所选文件、验证状态、会话和当前结果
/// - 只通过 `HistoryStore` 追加 / 读取历史记录
/// - 不持有任何网络资源，只依赖 `GradingApi`
pub struct WorkflowController<A, H> {
    api: A,
    history: H,
    config: ExamConfig,
    state: WorkflowState,
}

impl<A: GradingApi, H: HistoryStore> WorkflowController<A, H> {
    /// 创建控制器，历史记录从存储中加载
    pub fn new(api: A, mut history: H) -> Self {
        history.load();
        Self {
            api,
            history,
            config: ExamConfig::default(),
            state: WorkflowState::Idle,
        }
    }

    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    pub fn config(&self) -> ExamConfig {
        self.config
    }

    pub fn is_loading(&self) -> bool {
        self.state.is_loading()
    }

    pub fn history(&self) -> &HistoryList {
        self.history.entries()
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    // ========== 文件与配置 ==========

    /// 选择文件，重置验证、会话和当前结果；纠正进行中时静默忽略
    pub fn select_file(&mut self, file: SelectedFile) -> bool {
        if self.is_loading() {
            debug!("纠正进行中，忽略文件选择: {}", file.name);
            return false;
        }
        info!("📄 已选择文件: {} ({} 字节)", file.name, file.len());
        self.state = WorkflowState::Ready {
            file,
            validation: ValidationState::NotValidated,
            pending_session: None,
        };
        true
    }

    /// 设置选项数量（截断到 3..=5），总是使验证失效
    pub fn set_option_count(&mut self, n: i64) -> u8 {
        let applied = self.config.set_option_count(n);
        self.state.invalidate();
        applied
    }

    /// 设置题目数量（截断到 5..=20），总是使验证失效
    pub fn set_question_count(&mut self, n: i64) -> u8 {
        let applied = self.config.set_question_count(n);
        self.state.invalidate();
        applied
    }

    // ========== 验证 ==========

    /// 预先验证文件；不要求之前验证过
    pub async fn validate(&mut self) -> AppResult<()> {
        match &mut self.state {
            WorkflowState::Ready {
                validation,
                pending_session,
                ..
            } => {
                *validation = ValidationState::Validating;
                *pending_session = None;
            }
            WorkflowState::Correcting { .. } => return Err(UserInputError::Busy.into()),
            _ => return Err(UserInputError::NoFileSelected.into()),
        }

        let outcome = match &self.state {
            WorkflowState::Ready { file, .. } => self.api.validate(file, self.config).await,
            _ => return Err(UserInputError::NoFileSelected.into()),
        };

        let next = match &outcome {
            Ok(()) => ValidationState::Valid,
            Err(e) => ValidationState::Invalid(e.message.clone()),
        };
        if let WorkflowState::Ready { validation, .. } = &mut self.state {
            *validation = next;
        }

        match outcome {
            Ok(()) => {
                info!("✓ 文件有效，可以开始纠正");
                Ok(())
            }
            Err(e) => Err(AppError::from_validation(e)),
        }
    }

    // ========== 纠正 ==========

    /// 提交纠正：corregir → preview → metrics → 写入历史
    ///
    /// 要求已选择文件且验证通过，否则不发起任何请求
    pub async fn correct(&mut self) -> AppResult<HistoryEntry> {
        let file = match std::mem::take(&mut self.state) {
            WorkflowState::Ready {
                file,
                validation: ValidationState::Valid,
                ..
            } => file,
            other => {
                let err = precondition_error(&other);
                self.state = other;
                return Err(err.into());
            }
        };

        self.state = WorkflowState::Correcting { file: file.clone() };
        info!("⏳ 正在纠正 {} ({})", file.name, self.config);

        match self.api.correct(&file, self.config).await {
            Ok(session) => {
                debug!("纠正会话: {}", session.session_id);
                self.complete(file, session).await
            }
            Err(e) => {
                self.state = WorkflowState::Ready {
                    file,
                    validation: ValidationState::Valid,
                    pending_session: None,
                };
                Err(AppError::from_correction(e))
            }
        }
    }

    /// 纠正成功但获取结果失败后，使用保留的会话重新获取，不重新上传文件
    pub async fn retry_results(&mut self) -> AppResult<HistoryEntry> {
        let (file, session) = match std::mem::take(&mut self.state) {
            WorkflowState::Ready {
                file,
                pending_session: Some(session),
                ..
            } => (file, session),
            other => {
                let err = if other.is_loading() {
                    UserInputError::Busy
                } else {
                    UserInputError::NoPendingSession
                };
                self.state = other;
                return Err(err.into());
            }
        };

        self.state = WorkflowState::Correcting { file: file.clone() };
        info!("🔄 重新获取会话 {} 的结果", session.session_id);
        self.complete(file, session).await
    }

    /// 依次获取预览和指标，两者都成功才提交结果
    async fn complete(
        &mut self,
        file: SelectedFile,
        session: CorrectionSession,
    ) -> AppResult<HistoryEntry> {
        match self.fetch_results(&session).await {
            Ok(result) => Ok(self.commit(file.name, session, result)),
            Err(e) => {
                warn!(
                    "⚠️ 会话 {} 的结果获取失败，已保留会话以便重试",
                    session.session_id
                );
                self.state = WorkflowState::Ready {
                    file,
                    validation: ValidationState::Valid,
                    pending_session: Some(session),
                };
                Err(e)
            }
        }
    }

    async fn fetch_results(&self, session: &CorrectionSession) -> AppResult<CorrectionResult> {
        let preview = self
            .api
            .preview(session)
            .await
            .map_err(AppError::from_client)?;
        let metrics = self
            .api
            .metrics(session)
            .await
            .map_err(AppError::from_client)?;
        Ok(CorrectionResult::new(preview, metrics))
    }

    /// 保存当前结果并写入历史记录
    ///
    /// 历史写入失败不影响本次结果，只记录警告
    fn commit(
        &mut self,
        file_name: String,
        session: CorrectionSession,
        result: CorrectionResult,
    ) -> HistoryEntry {
        let entry = HistoryEntry::now(
            file_name.clone(),
            self.config.option_count(),
            result.preview.clone(),
            result.metrics.clone(),
        );
        let saved = match self.history.prepend(entry.clone()) {
            Ok(saved) => saved,
            Err(e) => {
                warn!("⚠️ 历史记录保存失败: {}", e);
                entry
            }
        };

        info!(
            "✓ 试卷已纠正: {} ({} 名学生)",
            file_name,
            result.preview.len()
        );
        self.state = WorkflowState::Corrected {
            origin: ResultOrigin::Live { file_name, session },
            result,
        };
        saved
    }

    // ========== 结果视图 ==========

    /// 从服务器重新获取当前会话的预览
    pub async fn refresh_preview(&mut self) -> AppResult<&CorrectionResult> {
        let session = self
            .state
            .live_session()
            .cloned()
            .ok_or(UserInputError::NoLiveSession)?;
        let preview = self
            .api
            .preview(&session)
            .await
            .map_err(AppError::from_client)?;

        match &mut self.state {
            WorkflowState::Corrected { result, .. } => {
                result.preview = preview;
                Ok(&*result)
            }
            _ => Err(UserInputError::NoLiveSession.into()),
        }
    }

    /// 从服务器重新获取当前会话的指标
    pub async fn refresh_metrics(&mut self) -> AppResult<&CorrectionResult> {
        let session = self
            .state
            .live_session()
            .cloned()
            .ok_or(UserInputError::NoLiveSession)?;
        let metrics = self
            .api
            .metrics(&session)
            .await
            .map_err(AppError::from_client)?;

        match &mut self.state {
            WorkflowState::Corrected { result, .. } => {
                result.metrics = metrics;
                Ok(&*result)
            }
            _ => Err(UserInputError::NoLiveSession.into()),
        }
    }

    /// 下载 Excel 或 PDF 到指定目录，返回保存路径
    ///
    /// 只有刚完成的纠正才有服务器会话；历史记录视图无法下载
    pub async fn download(&self, kind: DownloadKind, dir: &Path) -> AppResult<PathBuf> {
        let session = self
            .state
            .live_session()
            .ok_or(UserInputError::NoLiveSession)?;
        let download = self
            .api
            .download(session, kind)
            .await
            .map_err(AppError::from_client)?;

        let path = dir.join(&download.file_name);
        std::fs::create_dir_all(dir)
            .map_err(|e| AppError::file_write_failed(dir.display().to_string(), e))?;
        std::fs::write(&path, &download.bytes)
            .map_err(|e| AppError::file_write_failed(path.display().to_string(), e))?;

        info!(
            "💾 {} 已保存: {} ({} 字节)",
            kind.label(),
            path.display(),
            download.bytes.len()
        );
        Ok(path)
    }

    /// 回到初始状态，不影响历史记录
    pub fn reset(&mut self) {
        self.state = WorkflowState::Idle;
    }

    // ========== 历史记录 ==========

    /// 打开历史记录中的结果（没有服务器会话）
    pub fn view_history_entry(&mut self, id: i64) -> AppResult<&CorrectionResult> {
        if self.is_loading() {
            return Err(UserInputError::Busy.into());
        }
        let entry = self
            .history
            .get(id)
            .ok_or(UserInputError::HistoryEntryNotFound { id })?;
        let result = CorrectionResult::new(entry.preview_data.clone(), entry.metrics.clone());

        self.state = WorkflowState::Corrected {
            origin: ResultOrigin::History { entry_id: id },
            result,
        };
        match &self.state {
            WorkflowState::Corrected { result, .. } => Ok(result),
            _ => Err(UserInputError::HistoryEntryNotFound { id }.into()),
        }
    }

    /// 删除一条历史记录；不存在时返回 false
    pub fn delete_history_entry(&mut self, id: i64) -> AppResult<bool> {
        self.history.remove(id)
    }

    /// 清空历史记录
    pub fn clear_history(&mut self) -> AppResult<()> {
        self.history.clear()
    }
}

/// 纠正前置条件不满足时的错误
fn precondition_error(state: &WorkflowState) -> UserInputError {
    match state {
        WorkflowState::Correcting { .. } => UserInputError::Busy,
        WorkflowState::Ready { .. } => UserInputError::NotValidated,
        _ => UserInputError::NoFileSelected,
    }
}
