//! 结果展示 - 纯函数，无副作用
//!
//! 负责及格判定、成绩格式化、图表数据序列以及终端文本渲染

use std::fmt::Write as _;

use crate::models::{HistoryEntry, Metrics, PreviewRow};

/// 及格线（含）
pub const PASS_THRESHOLD: f64 = 5.0;

/// 选项字母（按固定顺序）
pub const OPTION_LETTERS: [&str; 5] = ["A", "B", "C", "D", "E"];

/// 选项序列颜色，按位置分配
pub const SERIES_COLORS: [&str; 5] = ["#FF6B6B", "#4ECDC4", "#45B7D1", "#FFA07A", "#98D8C8"];

/// 成绩分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GradeClass {
    Pass,
    Fail,
    NotPresent,
}

impl GradeClass {
    pub fn label(&self) -> &'static str {
        match self {
            GradeClass::Pass => "及格",
            GradeClass::Fail => "不及格",
            GradeClass::NotPresent => "缺考",
        }
    }

    fn marker(&self) -> &'static str {
        match self {
            GradeClass::Pass => "✅",
            GradeClass::Fail => "❌",
            GradeClass::NotPresent => "➖",
        }
    }
}

/// 单个选项的图表序列
#[derive(Debug, Clone, PartialEq)]
pub struct OptionSeries {
    pub letter: &'static str,
    pub color: &'static str,
    /// (题目标签, 正确率)；该题缺少此选项时为 None
    pub points: Vec<(String, Option<f64>)>,
}

/// 及格判定：未交卷的行不参与及格/不及格分类
pub fn classify(row: &PreviewRow) -> GradeClass {
    if !row.presentado {
        GradeClass::NotPresent
    } else if row.nota >= PASS_THRESHOLD {
        GradeClass::Pass
    } else {
        GradeClass::Fail
    }
}

/// 成绩保留两位小数
pub fn format_grade(nota: f64) -> String {
    // 避免输出 "-0.00"
    let nota = if nota == 0.0 { 0.0 } else { nota };
    format!("{:.2}", nota)
}

/// 实际展示的选项数量：缺省（0）按 5 处理，最多 5 个
pub fn visible_option_count(metrics: &Metrics) -> usize {
    match metrics.option_count {
        0 => OPTION_LETTERS.len(),
        n => (n as usize).min(OPTION_LETTERS.len()),
    }
}

/// 按选项字母生成"每题各选项正确率"序列
pub fn option_series(metrics: &Metrics) -> Vec<OptionSeries> {
    OPTION_LETTERS
        .iter()
        .zip(SERIES_COLORS.iter())
        .take(visible_option_count(metrics))
        .map(|(&letter, &color)| OptionSeries {
            letter,
            color,
            points: metrics
                .question_data
                .iter()
                .map(|q| (q.question.clone(), q.per_option.get(letter).copied()))
                .collect(),
        })
        .collect()
}

/// "每题平均得分"序列
pub fn score_series(metrics: &Metrics) -> Vec<(String, f64)> {
    metrics
        .question_data
        .iter()
        .map(|q| (q.question.clone(), q.avg_score))
        .collect()
}

/// 指标卡片文本
pub fn summary_lines(metrics: &Metrics) -> Vec<String> {
    vec![
        format!("平均分: {}", metrics.media),
        format!("{} 人及格 · {} 人不及格", metrics.aprobados, metrics.suspensos),
        format!(
            "交卷: {} / {}",
            metrics.presentados, metrics.alumnos_totales
        ),
        format!("及格率: {}%", metrics.porcentaje_aprobados),
        format!("最高分: {}    最低分: {}", metrics.max, metrics.min),
    ]
}

/// 成绩预览表
pub fn render_preview_table(rows: &[PreviewRow]) -> String {
    let width = rows
        .iter()
        .map(|r| r.dni.chars().count())
        .max()
        .unwrap_or(0)
        .max(3);

    let mut out = String::new();
    let _ = writeln!(out, "   {:<width$}  {:>6}", "DNI", "成绩", width = width);
    for row in rows {
        let class = classify(row);
        let _ = writeln!(
            out,
            "{} {:<width$}  {:>6}  {}",
            class.marker(),
            row.dni,
            format_grade(row.nota),
            class.label(),
            width = width
        );
    }
    out
}

/// 每题统计表：平均得分 + 各选项正确率
pub fn render_question_table(metrics: &Metrics) -> String {
    let series = option_series(metrics);
    let mut out = String::new();

    let _ = write!(out, "{:<6}{:>8}", "题目", "平均分");
    for s in &series {
        let _ = write!(out, "{:>8}", format!("{}%", s.letter));
    }
    out.push('\n');

    for (idx, (question, avg)) in score_series(metrics).into_iter().enumerate() {
        let _ = write!(out, "{:<6}{:>8.2}", question, avg);
        for s in &series {
            let cell = s.points[idx]
                .1
                .map(|v| format!("{:.1}", v))
                .unwrap_or_else(|| "-".to_string());
            let _ = write!(out, "{:>8}", cell);
        }
        out.push('\n');
    }
    out
}

/// 历史记录列表中的一行
pub fn history_line(entry: &HistoryEntry) -> String {
    format!(
        "[{}] {} · {} · {} 个选项",
        entry.id, entry.filename, entry.date, entry.option_count
    )
}
