pub mod exam;
pub mod grading;
pub mod history;

pub use exam::{ExamConfig, SelectedFile};
pub use grading::{CorrectionResult, CorrectionSession, Metrics, PreviewRow, QuestionStat};
pub use history::{HistoryEntry, HistoryList, MAX_HISTORY_ENTRIES};
