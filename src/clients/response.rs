//! 响应分类
//!
//! 把一次 HTTP 响应归为三种失败之一（传输失败 / 服务器拒绝 / 内容类型不符）
//! 或成功，并为每种失败生成一条可读的提示

use std::sync::OnceLock;

use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::utils::logging::truncate_text;

/// 错误消息中引用响应正文的最大字符数
const MAX_BODY_IN_MESSAGE: usize = 300;

/// 客户端错误类别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientErrorKind {
    /// 请求未完成（连接失败、超时、读取正文失败）
    Transport,
    /// 非 2xx 状态码
    Rejected { status: u16 },
    /// 2xx 但内容不是预期的 JSON
    UnexpectedContent { status: u16 },
}

/// 客户端错误：类别 + 一条可读消息
#[derive(Debug, Clone, Error)]
#[error("{endpoint}: {message}")]
pub struct ClientError {
    pub endpoint: String,
    pub kind: ClientErrorKind,
    pub message: String,
}

impl ClientError {
    pub fn new(endpoint: impl Into<String>, kind: ClientErrorKind, message: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            kind,
            message: message.into(),
        }
    }

    pub fn transport(endpoint: impl Into<String>, source: &reqwest::Error) -> Self {
        let message = if source.is_timeout() {
            "请求超时".to_string()
        } else if source.is_connect() {
            format!("无法连接到服务器: {}", source)
        } else {
            source.to_string()
        };
        Self::new(endpoint, ClientErrorKind::Transport, message)
    }
}

/// 读取完毕的原始响应
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub content_disposition: Option<String>,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// 声明的内容类型是否为 JSON（包括 `application/problem+json` 等）
    pub fn is_json(&self) -> bool {
        self.content_type
            .as_deref()
            .map(|ct| {
                let mime = ct.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
                mime == "application/json" || mime.ends_with("+json")
            })
            .unwrap_or(false)
    }

    fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).trim().to_string()
    }

    /// 非 2xx 时转换为错误，消息优先取 `detail`
    pub fn ensure_success(&self, endpoint: &str, fallback: &str) -> Result<(), ClientError> {
        if self.is_success() {
            return Ok(());
        }
        Err(ClientError::new(
            endpoint,
            ClientErrorKind::Rejected {
                status: self.status,
            },
            self.error_message(fallback),
        ))
    }

    fn unexpected(&self, endpoint: &str, message: String) -> ClientError {
        ClientError::new(
            endpoint,
            ClientErrorKind::UnexpectedContent {
                status: self.status,
            },
            message,
        )
    }

    /// 要求 2xx 且内容类型为 JSON，不解析正文
    ///
    /// 2xx 的 HTML 页面（代理登录页等）同样按错误处理，消息取正文
    pub fn ensure_json_success(&self, endpoint: &str, fallback: &str) -> Result<(), ClientError> {
        self.ensure_success(endpoint, fallback)?;
        if self.is_json() {
            return Ok(());
        }
        let text = self.body_text();
        Err(self.unexpected(
            endpoint,
            if text.is_empty() {
                fallback.to_string()
            } else {
                truncate_text(&text, MAX_BODY_IN_MESSAGE)
            },
        ))
    }

    /// 解析成功响应中的 JSON；非 JSON 内容类型一律按错误处理
    pub fn json<T: DeserializeOwned>(&self, endpoint: &str, fallback: &str) -> Result<T, ClientError> {
        self.ensure_json_success(endpoint, fallback)?;
        serde_json::from_slice(&self.body).map_err(|e| {
            self.unexpected(endpoint, format!("{}: 响应格式无法解析 ({})", fallback, e))
        })
    }

    /// 从错误响应中提取一条消息
    pub fn error_message(&self, fallback: &str) -> String {
        if self.is_json() {
            if let Ok(value) = serde_json::from_slice::<Value>(&self.body) {
                if let Some(detail) = detail_message(&value) {
                    return detail;
                }
            }
        }
        let text = self.body_text();
        if text.is_empty() || self.is_json() {
            fallback.to_string()
        } else {
            truncate_text(&text, MAX_BODY_IN_MESSAGE)
        }
    }

    /// 从 `Content-Disposition` 中提取文件名
    pub fn attachment_filename(&self) -> Option<String> {
        self.content_disposition
            .as_deref()
            .and_then(parse_content_disposition_filename)
    }
}

/// `detail` 可能是字符串，也可能是 FastAPI 的校验错误列表
fn detail_message(value: &Value) -> Option<String> {
    match value.get("detail")? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Array(items) => {
            let messages: Vec<String> = items
                .iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s.clone()),
                    other => other.get("msg").and_then(Value::as_str).map(str::to_string),
                })
                .collect();
            if messages.is_empty() {
                None
            } else {
                Some(messages.join("; "))
            }
        }
        _ => None,
    }
}

fn filename_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)filename\*?\s*=\s*(?:UTF-8'[^']*')?"?([^";]+)"?"#)
            .expect("文件名正则表达式无效")
    })
}

/// 解析 `attachment; filename=examen_corregido.xlsx` 形式的头
///
/// 只保留最后一个路径分量，避免写出下载目录
pub fn parse_content_disposition_filename(header: &str) -> Option<String> {
    let name = filename_regex()
        .captures(header)?
        .get(1)?
        .as_str()
        .trim()
        .to_string();
    let name = name
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or_default()
        .to_string();
    if name.is_empty() || name == "." || name == ".." {
        None
    } else {
        Some(name)
    }
}
