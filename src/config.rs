use std::path::{Path, PathBuf};

use reqwest::Url;
use serde::Deserialize;

use crate::error::{AppResult, ConfigError};

/// 默认配置文件名（位于当前工作目录）
pub const DEFAULT_CONFIG_FILE: &str = "grade_pilot.toml";

/// 程序配置文件
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 纠正服务的基础地址
    pub api_url: String,
    /// 可选的路径前缀（服务部署在子路径下时使用）
    pub root_path: String,
    /// 历史记录文件
    pub history_file: String,
    /// 下载文件的默认目录
    pub download_dir: String,
    /// 单次请求超时（秒）
    pub request_timeout_secs: u64,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8000".to_string(),
            root_path: String::new(),
            history_file: "corrector_history.json".to_string(),
            download_dir: ".".to_string(),
            request_timeout_secs: 120,
            verbose_logging: false,
        }
    }
}

impl Config {
    /// 启动时解析一次配置：默认值 → TOML 文件 → 环境变量
    pub fn load() -> AppResult<Self> {
        let explicit = std::env::var("GRADE_PILOT_CONFIG").ok().map(PathBuf::from);
        let base = match explicit {
            Some(path) => Self::from_toml_file(&path)?,
            None => {
                let path = Path::new(DEFAULT_CONFIG_FILE);
                if path.exists() {
                    Self::from_toml_file(path)?
                } else {
                    Self::default()
                }
            }
        };

        let config = base.with_env_overrides()?;
        config.api_base()?;
        Ok(config)
    }

    /// 从 TOML 文件加载配置，缺省字段使用默认值
    pub fn from_toml_file(path: &Path) -> AppResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileInvalid {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let config = Self::from_toml_str(&content).map_err(|e| match e {
            ConfigError::FileInvalid { reason, .. } => ConfigError::FileInvalid {
                path: path.display().to_string(),
                reason,
            },
            other => other,
        })?;
        Ok(config)
    }

    fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::FileInvalid {
            path: String::new(),
            reason: e.to_string(),
        })
    }

    /// 使用环境变量覆盖已有配置
    pub fn with_env_overrides(self) -> AppResult<Self> {
        Ok(Self {
            api_url: std::env::var("GRADE_PILOT_API_URL").unwrap_or(self.api_url),
            root_path: std::env::var("GRADE_PILOT_ROOT_PATH").unwrap_or(self.root_path),
            history_file: std::env::var("GRADE_PILOT_HISTORY_FILE").unwrap_or(self.history_file),
            download_dir: std::env::var("GRADE_PILOT_DOWNLOAD_DIR").unwrap_or(self.download_dir),
            request_timeout_secs: parse_env("GRADE_PILOT_TIMEOUT_SECS", "u64")?
                .unwrap_or(self.request_timeout_secs),
            verbose_logging: parse_env("VERBOSE_LOGGING", "bool")?.unwrap_or(self.verbose_logging),
        })
    }

    /// 基础地址 + 路径前缀
    ///
    /// 返回的 URL 路径不以 `/` 结尾，端点通过追加路径段拼接
    pub fn api_base(&self) -> Result<Url, ConfigError> {
        let mut url = Url::parse(self.api_url.trim()).map_err(|e| ConfigError::InvalidApiUrl {
            url: self.api_url.clone(),
            reason: e.to_string(),
        })?;
        if url.cannot_be_a_base() {
            return Err(ConfigError::InvalidApiUrl {
                url: self.api_url.clone(),
                reason: "不能作为基础地址".to_string(),
            });
        }

        let prefix: Vec<String> = url
            .path_segments()
            .into_iter()
            .flatten()
            .chain(self.root_path.split('/'))
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        url.set_path("");
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.clear().extend(prefix.iter());
        }
        Ok(url)
    }
}

fn parse_env<T: std::str::FromStr>(var_name: &str, expected_type: &str) -> Result<Option<T>, ConfigError> {
    match std::env::var(var_name) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::EnvVarParseFailed {
                var_name: var_name.to_string(),
                value,
                expected_type: expected_type.to_string(),
            }),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toml_partial_config_uses_defaults() {
        let config = Config::from_toml_str(
            r#"
            api_url = "https://feqxtools.example.es"
            root_path = "/corrector"
            "#,
        )
        .unwrap();

        assert_eq!(config.api_url, "https://feqxtools.example.es");
        assert_eq!(config.history_file, "corrector_history.json");
        assert_eq!(config.request_timeout_secs, 120);
    }

    #[test]
    fn test_toml_invalid_is_config_error() {
        let err = Config::from_toml_str("api_url = [").unwrap_err();
        assert!(matches!(err, ConfigError::FileInvalid { .. }));
    }

    #[test]
    fn test_api_base_joins_root_path() {
        let config = Config {
            api_url: "http://localhost:8000/api/".to_string(),
            root_path: "/corrector/".to_string(),
            ..Config::default()
        };
        let base = config.api_base().unwrap();
        assert_eq!(base.as_str(), "http://localhost:8000/api/corrector");
    }

    #[test]
    fn test_api_base_without_prefix() {
        let base = Config::default().api_base().unwrap();
        assert_eq!(base.path(), "/");
        assert_eq!(base.host_str(), Some("localhost"));
    }

    #[test]
    fn test_api_base_rejects_garbage() {
        let config = Config {
            api_url: "not a url".to_string(),
            ..Config::default()
        };
        assert!(matches!(
            config.api_base(),
            Err(ConfigError::InvalidApiUrl { .. })
        ));
    }
}
