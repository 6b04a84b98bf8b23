pub mod history_store;
pub mod presenter;

pub use history_store::{FileHistoryStore, HistoryStore, MemoryHistoryStore};
pub use presenter::{GradeClass, OptionSeries};
