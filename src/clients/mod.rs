pub mod grading_client;
pub mod response;

pub use grading_client::{Download, DownloadKind, GradingApi, GradingClient};
pub use response::{ClientError, ClientErrorKind};
