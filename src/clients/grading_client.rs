//! 纠正服务 API 客户端
//!
//! 封装 validate / corregir / preview / metrics 四个端点和两个下载端点，
//! 自身不持有任何状态
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderName, CONTENT_DISPOSITION, CONTENT_TYPE};
use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, Url};
use tracing::{debug, info};

use super::response::{ClientError, RawResponse};
use crate::config::Config;
use crate::error::{AppResult, ConfigError};
use crate::models::{CorrectionSession, ExamConfig, Metrics, PreviewRow, SelectedFile};

const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
const XLS_MIME: &str = "application/vnd.ms-excel";

/// 可下载的报告类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadKind {
    /// 纠正后的 Excel
    Spreadsheet,
    /// PDF 报告
    Report,
}

impl DownloadKind {
    fn path_segment(&self) -> &'static str {
        match self {
            DownloadKind::Spreadsheet => "download",
            DownloadKind::Report => "export-pdf",
        }
    }

    /// 服务器未提供文件名时使用的默认文件名
    pub fn default_file_name(&self) -> &'static str {
        match self {
            DownloadKind::Spreadsheet => "examen_corregido.xlsx",
            DownloadKind::Report => "reporte_examen.pdf",
        }
    }

    fn failure_message(&self) -> &'static str {
        match self {
            DownloadKind::Spreadsheet => "下载 Excel 失败",
            DownloadKind::Report => "导出 PDF 失败",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DownloadKind::Spreadsheet => "Excel",
            DownloadKind::Report => "PDF",
        }
    }
}

/// 下载结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub kind: DownloadKind,
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// 纠正服务的远程能力
///
/// 工作流只依赖这个 trait，测试中可以替换为脚本化的实现
#[async_trait]
pub trait GradingApi: Send + Sync {
    /// 预先验证文件结构；要求 2xx 的 JSON 响应，但不解析正文
    async fn validate(&self, file: &SelectedFile, config: ExamConfig) -> Result<(), ClientError>;

    /// 提交纠正，返回服务器会话
    async fn correct(
        &self,
        file: &SelectedFile,
        config: ExamConfig,
    ) -> Result<CorrectionSession, ClientError>;

    /// 获取成绩预览
    async fn preview(&self, session: &CorrectionSession) -> Result<Vec<PreviewRow>, ClientError>;

    /// 获取汇总指标
    async fn metrics(&self, session: &CorrectionSession) -> Result<Metrics, ClientError>;

    /// 下载 Excel 或 PDF
    async fn download(
        &self,
        session: &CorrectionSession,
        kind: DownloadKind,
    ) -> Result<Download, ClientError>;
}

/// 基于 reqwest 的纠正服务客户端
#[derive(Debug, Clone)]
pub struct GradingClient {
    http: reqwest::Client,
    base: Url,
}

impl GradingClient {
    /// 根据配置创建客户端
    pub fn new(config: &Config) -> AppResult<Self> {
        let base = config.api_base()?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| ConfigError::HttpClient {
                reason: e.to_string(),
            })?;
        Ok(Self { http, base })
    }

    /// 在基础地址后追加路径段，路径段会被正确转义
    pub fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// 构建 multipart 表单：file + n_opciones + n_preguntas
    fn exam_form(&self, endpoint: &str, file: &SelectedFile, config: ExamConfig) -> Result<Form, ClientError> {
        let part = Part::bytes(file.bytes.clone())
            .file_name(file.name.clone())
            .mime_str(mime_for(&file.name))
            .map_err(|e| ClientError::transport(endpoint, &e))?;

        let form = config
            .form_fields()
            .into_iter()
            .fold(Form::new().part("file", part), |form, (name, value)| {
                form.text(name, value)
            });
        Ok(form)
    }

    /// 发送请求并完整读取响应
    async fn execute(&self, endpoint: &str, request: RequestBuilder) -> Result<RawResponse, ClientError> {
        let response = request
            .send()
            .await
            .map_err(|e| ClientError::transport(endpoint, &e))?;

        let status = response.status().as_u16();
        let header = |name: HeaderName| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        let content_type = header(CONTENT_TYPE);
        let content_disposition = header(CONTENT_DISPOSITION);

        let body = response
            .bytes()
            .await
            .map_err(|e| ClientError::transport(endpoint, &e))?
            .to_vec();

        debug!(
            "{} → {} ({:?}, {} 字节)",
            endpoint,
            status,
            content_type,
            body.len()
        );

        Ok(RawResponse {
            status,
            content_type,
            content_disposition,
            body,
        })
    }
}

#[async_trait]
impl GradingApi for GradingClient {
    async fn validate(&self, file: &SelectedFile, config: ExamConfig) -> Result<(), ClientError> {
        let endpoint = "/validate";
        info!("🔍 验证文件 {} ({})", file.name, config);

        let form = self.exam_form(endpoint, file, config)?;
        let request = self.http.post(self.endpoint(&["validate"])).multipart(form);
        let response = self.execute(endpoint, request).await?;

        response.ensure_json_success(endpoint, "验证失败")
    }

    async fn correct(
        &self,
        file: &SelectedFile,
        config: ExamConfig,
    ) -> Result<CorrectionSession, ClientError> {
        let endpoint = "/corregir";
        info!("📤 提交纠正 {} ({})", file.name, config);

        let form = self.exam_form(endpoint, file, config)?;
        let request = self.http.post(self.endpoint(&["corregir"])).multipart(form);
        let response = self.execute(endpoint, request).await?;

        response.json(endpoint, "纠正失败")
    }

    async fn preview(&self, session: &CorrectionSession) -> Result<Vec<PreviewRow>, ClientError> {
        let endpoint = "/preview";
        let request = self
            .http
            .get(self.endpoint(&["preview", session.session_id.as_str()]));
        let response = self.execute(endpoint, request).await?;

        response.json(endpoint, "获取预览失败")
    }

    async fn metrics(&self, session: &CorrectionSession) -> Result<Metrics, ClientError> {
        let endpoint = "/metrics";
        let request = self
            .http
            .get(self.endpoint(&["metrics", session.session_id.as_str()]));
        let response = self.execute(endpoint, request).await?;

        response.json(endpoint, "获取指标失败")
    }

    async fn download(
        &self,
        session: &CorrectionSession,
        kind: DownloadKind,
    ) -> Result<Download, ClientError> {
        let endpoint = match kind {
            DownloadKind::Spreadsheet => "/download",
            DownloadKind::Report => "/export-pdf",
        };
        let request = self
            .http
            .get(self.endpoint(&[kind.path_segment(), session.session_id.as_str()]));
        let response = self.execute(endpoint, request).await?;
        response.ensure_success(endpoint, kind.failure_message())?;

        let file_name = response
            .attachment_filename()
            .unwrap_or_else(|| kind.default_file_name().to_string());

        Ok(Download {
            kind,
            file_name,
            content_type: response.content_type,
            bytes: response.body,
        })
    }
}

fn mime_for(file_name: &str) -> &'static str {
    let lower = file_name.to_ascii_lowercase();
    if lower.ends_with(".xlsx") {
        XLSX_MIME
    } else if lower.ends_with(".xls") {
        XLS_MIME
    } else {
        "application/octet-stream"
    }
}
