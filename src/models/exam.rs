//! 试卷配置与所选文件

use std::fmt;
use std::path::Path;

use crate::error::{AppResult, UserInputError};

/// 每题可选项数量的取值范围
pub const OPTION_COUNTS: [u8; 3] = [3, 4, 5];
/// 题目数量下限
pub const MIN_QUESTIONS: u8 = 5;
/// 题目数量上限
pub const MAX_QUESTIONS: u8 = 20;

/// 试卷配置
///
/// 字段只能通过 setter 修改，保证始终处于合法取值范围内
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExamConfig {
    option_count: u8,
    question_count: u8,
}

impl Default for ExamConfig {
    fn default() -> Self {
        Self {
            option_count: 5,
            question_count: 10,
        }
    }
}

impl ExamConfig {
    /// 创建配置，超出范围的值会被截断到合法范围
    pub fn new(option_count: i64, question_count: i64) -> Self {
        let mut config = Self::default();
        config.set_option_count(option_count);
        config.set_question_count(question_count);
        config
    }

    pub fn option_count(&self) -> u8 {
        self.option_count
    }

    pub fn question_count(&self) -> u8 {
        self.question_count
    }

    /// 设置选项数量（截断到 3..=5），返回实际生效的值
    pub fn set_option_count(&mut self, n: i64) -> u8 {
        let min = OPTION_COUNTS[0] as i64;
        let max = OPTION_COUNTS[OPTION_COUNTS.len() - 1] as i64;
        self.option_count = n.clamp(min, max) as u8;
        self.option_count
    }

    /// 设置题目数量（截断到 5..=20），返回实际生效的值
    pub fn set_question_count(&mut self, n: i64) -> u8 {
        self.question_count = n.clamp(MIN_QUESTIONS as i64, MAX_QUESTIONS as i64) as u8;
        self.question_count
    }

    /// multipart 表单字段
    pub fn form_fields(&self) -> [(&'static str, String); 2] {
        [
            ("n_opciones", self.option_count.to_string()),
            ("n_preguntas", self.question_count.to_string()),
        ]
    }
}

impl fmt::Display for ExamConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} 个选项 / {} 道题",
            self.option_count, self.question_count
        )
    }
}

/// 用户选择的答题卡文件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    /// 显示名称（上传时作为文件名）
    pub name: String,
    /// 文件内容
    pub bytes: Vec<u8>,
}

impl SelectedFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    /// 从磁盘读取文件，显示名称取文件名部分
    pub fn from_path(path: &Path) -> AppResult<Self> {
        let bytes = std::fs::read(path).map_err(|e| UserInputError::FileUnreadable {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self { name, bytes })
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
