//! 纠正结果数据结构
//!
//! 字段名与后端 JSON 保持一致（西班牙语键名）

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// 一次成功纠正在服务器端对应的会话
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrectionSession {
    pub session_id: String,
}

/// 单个学生的成绩行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewRow {
    /// 学生证件号
    pub dni: String,
    /// 成绩（0-10）
    pub nota: f64,
    /// 是否交卷
    pub presentado: bool,
}

/// 单道题的统计数据
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuestionStat {
    /// 题目标签，例如 "P1"
    #[serde(default)]
    pub question: String,
    /// 平均得分（0-1）
    #[serde(default)]
    pub avg_score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_answered: Option<u32>,
    /// 选项字母 → 正确率百分比（0-100），在 JSON 中平铺为 "A"、"B" 等键
    #[serde(flatten)]
    pub per_option: BTreeMap<String, f64>,
}

/// 整场考试的汇总指标
///
/// 班级为空时后端返回 `{}`，所以每个字段都有默认值
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Metrics {
    pub media: f64,
    pub max: f64,
    pub min: f64,
    pub aprobados: u32,
    pub suspensos: u32,
    pub presentados: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub no_presentados: Option<u32>,
    pub alumnos_totales: u32,
    pub porcentaje_aprobados: f64,
    #[serde(rename = "n_opciones")]
    pub option_count: u8,
    pub question_data: Vec<QuestionStat>,
}

/// 当前展示的结果（预览 + 指标）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CorrectionResult {
    pub preview: Vec<PreviewRow>,
    pub metrics: Metrics,
}

impl CorrectionResult {
    pub fn new(preview: Vec<PreviewRow>, metrics: Metrics) -> Self {
        Self { preview, metrics }
    }
}
