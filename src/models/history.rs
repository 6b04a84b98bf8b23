//! 历史记录数据结构
//!
//! `HistoryList` 只包含纯数据操作，持久化由 `services::history_store` 负责

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::grading::{Metrics, PreviewRow};

/// 历史记录最多保留的条数
pub const MAX_HISTORY_ENTRIES: usize = 10;

/// 合法 id 的上限：9999-12-31T23:59:59.999Z 的毫秒时间戳
pub const MAX_ENTRY_ID: i64 = 253_402_300_799_999;

/// 一次纠正结果的本地快照
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// 创建时间（毫秒时间戳），同时作为唯一标识
    pub id: i64,
    pub filename: String,
    /// 展示用的本地时间
    pub date: String,
    #[serde(rename = "nOpciones")]
    pub option_count: u8,
    #[serde(rename = "previewData")]
    pub preview_data: Vec<PreviewRow>,
    pub metrics: Metrics,
}

impl HistoryEntry {
    /// 以当前时间创建历史记录
    pub fn now(
        filename: impl Into<String>,
        option_count: u8,
        preview_data: Vec<PreviewRow>,
        metrics: Metrics,
    ) -> Self {
        let now = chrono::Local::now();
        Self {
            id: now.timestamp_millis(),
            filename: filename.into(),
            date: now.format("%d/%m/%Y, %H:%M:%S").to_string(),
            option_count,
            preview_data,
            metrics,
        }
    }
}

/// 历史记录列表：最新在前，长度不超过 `MAX_HISTORY_ENTRIES`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HistoryList(Vec<HistoryEntry>);

impl HistoryList {
    pub fn new() -> Self {
        Self::default()
    }

    /// 解析持久化内容，格式错误时视为空列表
    ///
    /// id 超出 `0..=MAX_ENTRY_ID` 的记录会被丢弃
    pub fn parse_lenient(raw: &str) -> Self {
        match serde_json::from_str::<Vec<HistoryEntry>>(raw) {
            Ok(mut entries) => {
                let before = entries.len();
                entries.retain(|e| (0..=MAX_ENTRY_ID).contains(&e.id));
                if entries.len() < before {
                    warn!("⚠️ 丢弃了 {} 条 id 无效的历史记录", before - entries.len());
                }
                entries.truncate(MAX_HISTORY_ENTRIES);
                Self(entries)
            }
            Err(e) => {
                warn!("⚠️ 历史记录格式错误，已按空列表处理: {}", e);
                Self::default()
            }
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.0)
    }

    /// 插入到最前面并截断到上限，返回新列表
    ///
    /// id 不大于当前最新记录时会被重新分配为 `newest.id + 1`；
    /// 没有可用的 id（超过 `MAX_ENTRY_ID`）时返回 None
    pub fn prepended(&self, mut entry: HistoryEntry) -> Option<Self> {
        if let Some(newest) = self.0.first() {
            if entry.id <= newest.id {
                entry.id = newest
                    .id
                    .checked_add(1)
                    .filter(|id| *id <= MAX_ENTRY_ID)?;
            }
        }
        let mut entries = Vec::with_capacity(MAX_HISTORY_ENTRIES);
        entries.push(entry);
        entries.extend(self.0.iter().take(MAX_HISTORY_ENTRIES - 1).cloned());
        Some(Self(entries))
    }

    /// 去掉指定 id 的记录，返回新列表；id 不存在时返回 None
    pub fn without(&self, id: i64) -> Option<Self> {
        if !self.contains(id) {
            return None;
        }
        Some(Self(self.0.iter().filter(|e| e.id != id).cloned().collect()))
    }

    pub fn contains(&self, id: i64) -> bool {
        self.0.iter().any(|e| e.id == id)
    }

    pub fn get(&self, id: i64) -> Option<&HistoryEntry> {
        self.0.iter().find(|e| e.id == id)
    }

    pub fn first(&self) -> Option<&HistoryEntry> {
        self.0.first()
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, HistoryEntry> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'a> IntoIterator for &'a HistoryList {
    type Item = &'a HistoryEntry;
    type IntoIter = std::slice::Iter<'a, HistoryEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: i64) -> HistoryEntry {
        HistoryEntry {
            id,
            filename: format!("exam{}.xlsx", id),
            date: "01/01/2026, 10:00:00".to_string(),
            option_count: 5,
            preview_data: vec![PreviewRow {
                dni: id.to_string(),
                nota: 5.0,
                presentado: true,
            }],
            metrics: Metrics::default(),
        }
    }

    fn filled(n: i64) -> HistoryList {
        (1..=n).fold(HistoryList::new(), |list, id| list.prepended(entry(id)).unwrap())
    }

    #[test]
    fn test_prepend_never_exceeds_cap() {
        let mut list = HistoryList::new();
        for id in 1..=25 {
            list = list.prepended(entry(id)).unwrap();
            assert!(list.len() <= MAX_HISTORY_ENTRIES);
            let ids: Vec<i64> = list.iter().map(|e| e.id).collect();
            assert!(ids.windows(2).all(|w| w[0] > w[1]), "不是最新在前: {:?}", ids);
        }
        assert_eq!(list.len(), MAX_HISTORY_ENTRIES);
    }

    #[test]
    fn test_prepend_on_full_list_drops_oldest() {
        let list = filled(10);
        assert_eq!(list.len(), 10);
        assert!(list.contains(1));

        let next = list.prepended(entry(11)).unwrap();
        assert_eq!(next.len(), 10);
        assert_eq!(next.first().map(|e| e.id), Some(11));
        assert!(!next.contains(1));
    }

    #[test]
    fn test_prepend_keeps_ids_unique() {
        let list = filled(1).prepended(entry(1)).unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list.entries()[0].id, 2);
        assert_eq!(list.entries()[1].id, 1);
    }

    #[test]
    fn test_without_missing_id_is_none() {
        let list = filled(3);
        assert!(list.without(42).is_none());
    }

    #[test]
    fn test_without_keeps_order() {
        let list = filled(4).without(2).unwrap();
        let ids: Vec<i64> = list.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![4, 3, 1]);
    }

    #[test]
    fn test_parse_lenient_malformed_is_empty() {
        assert!(HistoryList::parse_lenient("not json").is_empty());
        assert!(HistoryList::parse_lenient("{\"id\": 1}").is_empty());
        assert!(HistoryList::parse_lenient("").is_empty());
    }

    #[test]
    fn test_persisted_keys_match_stored_format() {
        let raw = filled(1).to_json().unwrap();
        assert!(raw.contains("\"nOpciones\":5"));
        assert!(raw.contains("\"previewData\""));
        assert_eq!(HistoryList::parse_lenient(&raw), filled(1));
    }

    #[test]
    fn test_prepend_keeps_id_when_already_newest() {
        let list = filled(3).prepended(entry(1_760_000_000_000)).unwrap();
        assert_eq!(list.first(), Some(&entry(1_760_000_000_000)));
    }

    #[test]
    fn test_prepend_after_max_id_does_not_overflow() {
        let list = HistoryList(vec![entry(i64::MAX)]);
        assert!(list.prepended(entry(1)).is_none());

        let list = HistoryList(vec![entry(MAX_ENTRY_ID)]);
        assert!(list.prepended(entry(1)).is_none());

        let list = HistoryList(vec![entry(MAX_ENTRY_ID - 1)]);
        let next = list.prepended(entry(1)).unwrap();
        assert_eq!(next.first().map(|e| e.id), Some(MAX_ENTRY_ID));
    }

    #[test]
    fn test_parse_lenient_drops_out_of_range_ids() {
        let raw = HistoryList(vec![entry(i64::MAX), entry(7), entry(-3)])
            .to_json()
            .unwrap();
        let list = HistoryList::parse_lenient(&raw);
        let ids: Vec<i64> = list.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![7]);
        assert!(list.prepended(entry(1)).is_some());
    }
}
