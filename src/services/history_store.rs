//! 历史记录存储 - 业务能力层
//!
//! 只负责"保存最近的纠正结果"能力，不关心流程。
//! 每次修改都先计算新列表、整体写入存储，写入成功后才替换内存中的列表，
//! 因此内存与持久化内容在每个操作结束后始终一致。

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult, PersistenceError};
use crate::models::{HistoryEntry, HistoryList};

/// 历史记录存储接口
pub trait HistoryStore: Send {
    /// 从存储重新读取；不存在或格式错误时为空列表
    fn load(&mut self) -> &HistoryList;

    /// 当前列表（最新在前）
    fn entries(&self) -> &HistoryList;

    /// 插入到最前面并截断到上限，返回实际保存的记录
    fn prepend(&mut self, entry: HistoryEntry) -> AppResult<HistoryEntry>;

    /// 删除指定记录；id 不存在时不做任何修改并返回 false
    fn remove(&mut self, id: i64) -> AppResult<bool>;

    /// 清空历史记录
    fn clear(&mut self) -> AppResult<()>;

    fn get(&self, id: i64) -> Option<&HistoryEntry> {
        self.entries().get(id)
    }
}

fn serialize(list: &HistoryList) -> AppResult<String> {
    list.to_json().map_err(|e| {
        AppError::Persistence(PersistenceError::SerializeFailed {
            source: Box::new(e),
        })
    })
}

fn prepend_to(list: &HistoryList, entry: HistoryEntry) -> AppResult<HistoryList> {
    list.prepended(entry).ok_or_else(|| {
        AppError::Persistence(PersistenceError::IdExhausted {
            newest: list.first().map(|e| e.id).unwrap_or_default(),
        })
    })
}

// ========== 内存实现 ==========

/// 内存存储，模拟单个键的键值存储
///
/// 持久化内容以序列化后的字符串保存，便于验证往返一致性
#[derive(Debug, Default)]
pub struct MemoryHistoryStore {
    persisted: Option<String>,
    list: HistoryList,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 使用已有的持久化内容创建（会立即加载）
    pub fn with_persisted(raw: impl Into<String>) -> Self {
        let mut store = Self {
            persisted: Some(raw.into()),
            list: HistoryList::new(),
        };
        store.load();
        store
    }

    /// 当前持久化的原始内容
    pub fn persisted(&self) -> Option<&str> {
        self.persisted.as_deref()
    }

    fn commit(&mut self, next: HistoryList) -> AppResult<()> {
        self.persisted = Some(serialize(&next)?);
        self.list = next;
        Ok(())
    }
}

impl HistoryStore for MemoryHistoryStore {
    fn load(&mut self) -> &HistoryList {
        self.list = self
            .persisted
            .as_deref()
            .map(HistoryList::parse_lenient)
            .unwrap_or_default();
        &self.list
    }

    fn entries(&self) -> &HistoryList {
        &self.list
    }

    fn prepend(&mut self, entry: HistoryEntry) -> AppResult<HistoryEntry> {
        let next = prepend_to(&self.list, entry)?;
        let saved = next.first().cloned();
        self.commit(next)?;
        // prepended 总会放入一条记录
        saved.ok_or_else(unreachable_empty)
    }

    fn remove(&mut self, id: i64) -> AppResult<bool> {
        match self.list.without(id) {
            Some(next) => {
                self.commit(next)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn clear(&mut self) -> AppResult<()> {
        self.persisted = None;
        self.list = HistoryList::new();
        Ok(())
    }
}

// ========== 文件实现 ==========

/// JSON 文件存储（生产环境使用）
#[derive(Debug)]
pub struct FileHistoryStore {
    path: PathBuf,
    list: HistoryList,
}

impl FileHistoryStore {
    /// 打开历史文件并加载内容
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let mut store = Self {
            path: path.into(),
            list: HistoryList::new(),
        };
        store.load();
        store
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 写入时使用的临时文件
    fn tmp_path(&self) -> PathBuf {
        self.path.with_extension("json.tmp")
    }

    fn path_display(&self) -> String {
        self.path.display().to_string()
    }

    fn read_raw(&self) -> Option<String> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => Some(raw),
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => {
                warn!("⚠️ 无法读取历史文件 {}，按空列表处理: {}", self.path_display(), e);
                None
            }
        }
    }

    /// 先写临时文件再重命名，避免写到一半的文件被读取
    fn commit(&mut self, next: HistoryList) -> AppResult<()> {
        let raw = serialize(&next)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| AppError::history_write_failed(self.path_display(), e))?;
        }

        let tmp = self.tmp_path();
        fs::write(&tmp, raw).map_err(|e| AppError::history_write_failed(self.path_display(), e))?;
        fs::rename(&tmp, &self.path)
            .map_err(|e| AppError::history_write_failed(self.path_display(), e))?;

        debug!("历史记录已写入 {} ({} 条)", self.path_display(), next.len());
        self.list = next;
        Ok(())
    }
}

impl HistoryStore for FileHistoryStore {
    fn load(&mut self) -> &HistoryList {
        self.list = self
            .read_raw()
            .map(|raw| HistoryList::parse_lenient(&raw))
            .unwrap_or_default();
        debug!("已加载 {} 条历史记录", self.list.len());
        &self.list
    }

    fn entries(&self) -> &HistoryList {
        &self.list
    }

    fn prepend(&mut self, entry: HistoryEntry) -> AppResult<HistoryEntry> {
        let next = prepend_to(&self.list, entry)?;
        let saved = next.first().cloned();
        self.commit(next)?;
        saved.ok_or_else(unreachable_empty)
    }

    fn remove(&mut self, id: i64) -> AppResult<bool> {
        match self.list.without(id) {
            Some(next) => {
                self.commit(next)?;
                info!("🗑️ 已删除历史记录 {}", id);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// 删除历史文件以及写入失败时可能残留的临时文件
    fn clear(&mut self) -> AppResult<()> {
        remove_if_exists(&self.tmp_path())?;
        remove_if_exists(&self.path)?;
        self.list = HistoryList::new();
        info!("🧹 历史记录已清空");
        Ok(())
    }
}

fn remove_if_exists(path: &Path) -> AppResult<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(AppError::Persistence(PersistenceError::DeleteFailed {
            path: path.display().to_string(),
            source: Box::new(e),
        })),
    }
}

fn unreachable_empty() -> AppError {
    AppError::Persistence(PersistenceError::SerializeFailed {
        source: "历史记录插入后为空".into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::history::MAX_ENTRY_ID;
    use crate::models::{Metrics, PreviewRow, MAX_HISTORY_ENTRIES};
    use std::time::{SystemTime, UNIX_EPOCH};

    fn entry(id: i64, filename: &str) -> HistoryEntry {
        HistoryEntry {
            id,
            filename: filename.to_string(),
            date: "19/10/2026, 09:30:00".to_string(),
            option_count: 4,
            preview_data: vec![
                PreviewRow {
                    dni: "111".to_string(),
                    nota: 7.5,
                    presentado: true,
                },
                PreviewRow {
                    dni: "222".to_string(),
                    nota: 0.0,
                    presentado: false,
                },
            ],
            metrics: Metrics {
                media: 6.2,
                max: 7.5,
                min: 4.9,
                aprobados: 1,
                presentados: 1,
                alumnos_totales: 2,
                porcentaje_aprobados: 100.0,
                option_count: 4,
                ..Metrics::default()
            },
        }
    }

    fn temp_history_path(tag: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        std::env::temp_dir()
            .join(format!("grade_pilot_{}_{}_{}", tag, std::process::id(), nanos))
            .join("corrector_history.json")
    }

    #[test]
    fn test_memory_round_trip_through_persisted_form() {
        let mut store = MemoryHistoryStore::new();
        let original = entry(1_760_000_000_000, "exam1.xlsx");
        store.prepend(original.clone()).unwrap();

        let raw = store.persisted().unwrap().to_string();
        let mut reloaded = MemoryHistoryStore::with_persisted(raw);
        assert_eq!(reloaded.load().entries(), &[original]);
    }

    #[test]
    fn test_memory_matches_persisted_after_each_operation() {
        let mut store = MemoryHistoryStore::new();
        for id in 1..=12 {
            store.prepend(entry(id, "exam.xlsx")).unwrap();
            let persisted = HistoryList::parse_lenient(store.persisted().unwrap());
            assert_eq!(&persisted, store.entries());
        }
        assert_eq!(store.entries().len(), MAX_HISTORY_ENTRIES);

        store.remove(5).unwrap();
        let persisted = HistoryList::parse_lenient(store.persisted().unwrap());
        assert_eq!(&persisted, store.entries());
    }

    #[test]
    fn test_memory_remove_missing_id_is_noop() {
        let mut store = MemoryHistoryStore::new();
        store.prepend(entry(1, "a.xlsx")).unwrap();
        store.prepend(entry(2, "b.xlsx")).unwrap();
        let before = store.entries().clone();
        let raw_before = store.persisted().map(str::to_string);

        assert!(!store.remove(99).unwrap());
        assert_eq!(store.entries(), &before);
        assert_eq!(store.persisted().map(str::to_string), raw_before);
    }

    #[test]
    fn test_memory_malformed_persisted_is_empty() {
        let mut store = MemoryHistoryStore::with_persisted("{corrupt");
        assert!(store.load().is_empty());
        store.prepend(entry(1, "a.xlsx")).unwrap();
        assert_eq!(store.entries().len(), 1);
    }

    #[test]
    fn test_memory_clear_removes_key() {
        let mut store = MemoryHistoryStore::new();
        store.prepend(entry(1, "a.xlsx")).unwrap();
        store.clear().unwrap();
        assert!(store.persisted().is_none());
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_file_store_round_trip() {
        let path = temp_history_path("round_trip");
        let original = entry(42, "exam1.xlsx");

        let mut store = FileHistoryStore::open(&path);
        assert!(store.entries().is_empty());
        store.prepend(original.clone()).unwrap();

        let reopened = FileHistoryStore::open(&path);
        assert_eq!(reopened.entries().entries(), &[original]);
        assert_eq!(reopened.get(42).map(|e| e.filename.as_str()), Some("exam1.xlsx"));

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_file_store_malformed_file_is_empty() {
        let path = temp_history_path("malformed");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "[{\"id\": \"nope\"}]").unwrap();

        let store = FileHistoryStore::open(&path);
        assert!(store.entries().is_empty());

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_file_store_clear_deletes_file() {
        let path = temp_history_path("clear");
        let mut store = FileHistoryStore::open(&path);
        store.prepend(entry(1, "a.xlsx")).unwrap();
        assert!(path.exists());

        store.clear().unwrap();
        assert!(!path.exists());
        assert!(store.entries().is_empty());
        // 再次清空不报错
        store.clear().unwrap();

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_file_store_remove_persists() {
        let path = temp_history_path("remove");
        let mut store = FileHistoryStore::open(&path);
        store.prepend(entry(1, "a.xlsx")).unwrap();
        store.prepend(entry(2, "b.xlsx")).unwrap();

        assert!(store.remove(1).unwrap());
        let reopened = FileHistoryStore::open(&path);
        let ids: Vec<i64> = reopened.entries().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![2]);

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_file_store_clear_removes_leftover_tmp() {
        let path = temp_history_path("clear_tmp");
        let mut store = FileHistoryStore::open(&path);
        store.prepend(entry(1, "a.xlsx")).unwrap();

        // 模拟一次中断的写入留下的临时文件
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, "[]").unwrap();

        store.clear().unwrap();
        assert!(!path.exists());
        assert!(!tmp.exists());

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_prepend_after_max_persisted_id_is_error() {
        let raw = HistoryList::new()
            .prepended(entry(MAX_ENTRY_ID, "old.xlsx"))
            .unwrap()
            .to_json()
            .unwrap();
        let mut store = MemoryHistoryStore::with_persisted(raw.clone());
        assert_eq!(store.entries().len(), 1);

        let err = store.prepend(entry(1, "new.xlsx")).unwrap_err();
        assert!(matches!(
            err,
            AppError::Persistence(PersistenceError::IdExhausted { newest: MAX_ENTRY_ID })
        ));
        assert_eq!(store.entries().len(), 1);
        assert_eq!(store.persisted(), Some(raw.as_str()));
    }

    #[test]
    fn test_prepend_after_overflowing_persisted_id() {
        let raw = format!(
            "[{{\"id\":{},\"filename\":\"old.xlsx\",\"date\":\"\",\"nOpciones\":5,\"previewData\":[],\"metrics\":{{}}}}]",
            i64::MAX
        );
        let mut store = MemoryHistoryStore::with_persisted(raw);
        assert!(store.entries().is_empty());

        let saved = store.prepend(entry(1_760_000_000_000, "new.xlsx")).unwrap();
        assert_eq!(saved.id, 1_760_000_000_000);
        assert_eq!(store.entries().len(), 1);
    }
}
