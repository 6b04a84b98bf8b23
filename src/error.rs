use std::fmt;

use crate::clients::{ClientError, ClientErrorKind};

/// 应用程序错误类型
///
/// 每一类错误最终都会变成一行面向用户的提示，不会导致程序崩溃
#[derive(Debug)]
pub enum AppError {
    /// 用户输入错误（在任何网络调用之前被拦截）
    UserInput(UserInputError),
    /// 服务器认为文件内容或结构无效
    ValidationRejected { message: String },
    /// 服务器处理纠正时出错
    CorrectionFailed { message: String },
    /// 网络错误（传输失败或非 JSON 响应）
    Network(NetworkError),
    /// 本地历史记录持久化错误
    Persistence(PersistenceError),
    /// 下载文件保存失败
    File(FileError),
    /// 配置错误
    Config(ConfigError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::UserInput(e) => write!(f, "{}", e),
            AppError::ValidationRejected { message } => write!(f, "文件验证未通过: {}", message),
            AppError::CorrectionFailed { message } => write!(f, "纠正失败: {}", message),
            AppError::Network(e) => write!(f, "网络错误: {}", e),
            AppError::Persistence(e) => write!(f, "历史记录错误: {}", e),
            AppError::File(e) => write!(f, "文件错误: {}", e),
            AppError::Config(e) => write!(f, "配置错误: {}", e),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Network(e) => Some(e),
            AppError::Persistence(e) => Some(e),
            AppError::File(e) => Some(e),
            AppError::Config(e) => Some(e),
            _ => None,
        }
    }
}

/// 用户输入错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserInputError {
    /// 未选择文件
    NoFileSelected,
    /// 文件尚未通过验证
    NotValidated,
    /// 正在纠正中，操作被拒绝
    Busy,
    /// 没有待重新获取的会话
    NoPendingSession,
    /// 当前视图没有在线会话（例如历史记录视图）
    NoLiveSession,
    /// 历史记录不存在
    HistoryEntryNotFound { id: i64 },
    /// 无法读取本地文件
    FileUnreadable { path: String, reason: String },
}

impl fmt::Display for UserInputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserInputError::NoFileSelected => write!(f, "请先选择一个文件"),
            UserInputError::NotValidated => write!(f, "请先验证文件，再进行纠正"),
            UserInputError::Busy => write!(f, "正在纠正试卷，请稍候"),
            UserInputError::NoPendingSession => write!(f, "没有可重新获取结果的会话"),
            UserInputError::NoLiveSession => {
                write!(f, "历史记录视图没有在线会话，无法从服务器获取数据")
            }
            UserInputError::HistoryEntryNotFound { id } => write!(f, "历史记录 {} 不存在", id),
            UserInputError::FileUnreadable { path, reason } => {
                write!(f, "无法读取文件 {}: {}", path, reason)
            }
        }
    }
}

/// 网络错误
#[derive(Debug)]
pub enum NetworkError {
    /// 请求没有到达服务器或连接中断
    Transport { endpoint: String, message: String },
    /// 服务器返回了无法识别的内容
    UnexpectedContent { endpoint: String, message: String },
    /// 非成功状态码（预览、指标、下载等调用）
    BadStatus {
        endpoint: String,
        status: u16,
        message: String,
    },
}

impl fmt::Display for NetworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkError::Transport { endpoint, message } => {
                write!(f, "请求 {} 失败: {}", endpoint, message)
            }
            NetworkError::UnexpectedContent { endpoint, message } => {
                write!(f, "{} 返回了非预期内容: {}", endpoint, message)
            }
            NetworkError::BadStatus {
                endpoint,
                status,
                message,
            } => write!(f, "{} 返回状态码 {}: {}", endpoint, status, message),
        }
    }
}

impl std::error::Error for NetworkError {}

/// 历史记录持久化错误
#[derive(Debug)]
pub enum PersistenceError {
    /// 写入历史文件失败
    WriteFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 删除历史文件失败
    DeleteFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 序列化历史记录失败
    SerializeFailed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 最新记录的 id 已到上限，无法再分配更大的 id
    IdExhausted { newest: i64 },
}

impl fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersistenceError::WriteFailed { path, source } => {
                write!(f, "写入历史文件失败 ({}): {}", path, source)
            }
            PersistenceError::DeleteFailed { path, source } => {
                write!(f, "删除历史文件失败 ({}): {}", path, source)
            }
            PersistenceError::SerializeFailed { source } => {
                write!(f, "序列化历史记录失败: {}", source)
            }
            PersistenceError::IdExhausted { newest } => {
                write!(f, "历史记录 id 已达上限 (最新 id: {})", newest)
            }
        }
    }
}

impl std::error::Error for PersistenceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PersistenceError::WriteFailed { source, .. }
            | PersistenceError::DeleteFailed { source, .. }
            | PersistenceError::SerializeFailed { source } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
            PersistenceError::IdExhausted { .. } => None,
        }
    }
}

/// 文件操作错误
#[derive(Debug)]
pub enum FileError {
    /// 写入文件失败
    WriteFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl fmt::Display for FileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileError::WriteFailed { path, source } => {
                write!(f, "写入文件失败 ({}): {}", path, source)
            }
        }
    }
}

impl std::error::Error for FileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FileError::WriteFailed { source, .. } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
        }
    }
}

/// 配置错误
#[derive(Debug)]
pub enum ConfigError {
    /// 环境变量解析失败
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    /// API 地址无效
    InvalidApiUrl { url: String, reason: String },
    /// 配置文件读取或解析失败
    FileInvalid { path: String, reason: String },
    /// HTTP 客户端初始化失败
    HttpClient { reason: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::EnvVarParseFailed {
                var_name,
                value,
                expected_type,
            } => {
                write!(
                    f,
                    "环境变量 {} 解析失败: 值 '{}' 无法转换为 {}",
                    var_name, value, expected_type
                )
            }
            ConfigError::InvalidApiUrl { url, reason } => {
                write!(f, "API 地址无效 '{}': {}", url, reason)
            }
            ConfigError::FileInvalid { path, reason } => {
                write!(f, "配置文件 {} 无效: {}", path, reason)
            }
            ConfigError::HttpClient { reason } => write!(f, "HTTP 客户端初始化失败: {}", reason),
        }
    }
}

impl std::error::Error for ConfigError {}

// ========== 从常见错误类型转换 ==========

impl From<UserInputError> for AppError {
    fn from(err: UserInputError) -> Self {
        AppError::UserInput(err)
    }
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::Config(err)
    }
}

impl From<PersistenceError> for AppError {
    fn from(err: PersistenceError) -> Self {
        AppError::Persistence(err)
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 将客户端错误映射为网络错误（预览、指标、下载）
    pub fn from_client(err: ClientError) -> Self {
        let ClientError {
            endpoint,
            kind,
            message,
        } = err;
        match kind {
            ClientErrorKind::Transport => {
                AppError::Network(NetworkError::Transport { endpoint, message })
            }
            ClientErrorKind::UnexpectedContent { .. } => {
                AppError::Network(NetworkError::UnexpectedContent { endpoint, message })
            }
            ClientErrorKind::Rejected { status } => AppError::Network(NetworkError::BadStatus {
                endpoint,
                status,
                message,
            }),
        }
    }

    /// 验证调用的错误：服务器拒绝 → ValidationRejected，其余 → 网络错误
    pub fn from_validation(err: ClientError) -> Self {
        match err.kind {
            ClientErrorKind::Rejected { .. } => AppError::ValidationRejected {
                message: err.message,
            },
            _ => AppError::from_client(err),
        }
    }

    /// 纠正调用的错误：服务器拒绝 → CorrectionFailed，其余 → 网络错误
    pub fn from_correction(err: ClientError) -> Self {
        match err.kind {
            ClientErrorKind::Rejected { .. } => AppError::CorrectionFailed {
                message: err.message,
            },
            _ => AppError::from_client(err),
        }
    }

    /// 创建历史文件写入错误
    pub fn history_write_failed(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Persistence(PersistenceError::WriteFailed {
            path: path.into(),
            source: Box::new(source),
        })
    }

    /// 创建文件写入错误
    pub fn file_write_failed(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::File(FileError::WriteFailed {
            path: path.into(),
            source: Box::new(source),
        })
    }

    /// 是否属于用户输入错误（未发起任何网络请求）
    pub fn is_user_input(&self) -> bool {
        matches!(self, AppError::UserInput(_))
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_rejection_keeps_server_message() {
        let err = AppError::from_validation(ClientError::new(
            "/validate",
            ClientErrorKind::Rejected { status: 400 },
            "La fila 2 está vacía",
        ));
        assert!(matches!(err, AppError::ValidationRejected { .. }));
        assert!(err.to_string().contains("La fila 2 está vacía"));
    }

    #[test]
    fn test_transport_failure_is_network_error() {
        let err = AppError::from_correction(ClientError::new(
            "/corregir",
            ClientErrorKind::Transport,
            "connection refused",
        ));
        assert!(matches!(err, AppError::Network(NetworkError::Transport { .. })));
        assert!(!err.is_user_input());
    }
}
