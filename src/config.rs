use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// 文件名长度上限
pub const MAX_FILE_NAME_LENGTH: usize = 128;

/// 未设置 RUST_LOG 时的日志过滤规则
pub const DEFAULT_LOG_FILTER: &str = "sharehost=debug,tower_http=debug";

/// 请求体在单文件上限之外预留的空间，用于 multipart 分隔符、字段头和 key 字段
pub const MULTIPART_OVERHEAD: u64 = 64 * 1024;

/// 应用程序配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub upload: UploadConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub ssl: SslConfig,
}

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// 对外地址，用于拼接删除链接，例如 `https://share.example.com`
    pub url: String,
}

/// 存储配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// 上传目录
    pub directory: PathBuf,
    /// 是否由本服务在 `/f/` 下直接提供文件
    pub serve_local: bool,
    /// 下载链接前缀，文件名直接拼接在后面
    pub static_file_server_url: String,
}

/// 上传配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// 随机文件名长度（不含扩展名）
    pub file_name_length: usize,
    /// 请求体大小上限（字节）
    pub file_size_limit: u64,
    #[serde(default)]
    pub extension_check: ExtensionCheckConfig,
}

/// 扩展名检查配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtensionCheckConfig {
    pub enabled: bool,
    /// 允许的扩展名，包含前导点，例如 `.png`
    #[serde(default)]
    pub extensions_allowed: Vec<String>,
}

/// 鉴权配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// 共享密钥
    pub key: String,
    /// 可选的密钥请求头名称，未设置时只接受 `key` 参数
    #[serde(default)]
    pub header: Option<String>,
}

/// TLS配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SslConfig {
    pub enabled: bool,
    #[serde(default)]
    pub certificate_path: Option<PathBuf>,
    #[serde(default)]
    pub private_key_path: Option<PathBuf>,
}

impl UploadConfig {
    /// 整个请求体的大小上限
    pub fn body_limit(&self) -> usize {
        self.file_size_limit.saturating_add(MULTIPART_OVERHEAD) as usize
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
                url: "http://localhost:8080".to_string(),
            },
            storage: StorageConfig {
                directory: PathBuf::from("uploads"),
                serve_local: true,
                static_file_server_url: "http://localhost:8080/f/".to_string(),
            },
            upload: UploadConfig {
                file_name_length: 10,
                file_size_limit: 100 * 1024 * 1024, // 100MB
                extension_check: ExtensionCheckConfig::default(),
            },
            auth: AuthConfig {
                key: String::new(),
                header: None,
            },
            ssl: SslConfig::default(),
        }
    }
}

impl Config {
    /// 从配置文件加载配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| AppError::config(format!("解析配置文件失败: {}", e)))?;

        // 验证配置
        config.validate()?;

        Ok(config)
    }

    /// 生成带随机密钥的默认配置
    pub fn generate() -> Self {
        let mut config = Self::default();
        config.auth.key = crate::file_processing::NameGenerator::new(32).random_token();
        config
    }

    /// 验证配置有效性
    pub fn validate(&self) -> AppResult<()> {
        if self.server.port == 0 {
            return Err(AppError::config("服务器端口不能为0"));
        }

        if self.server.url.is_empty() {
            return Err(AppError::config("服务器对外地址不能为空"));
        }

        if self.storage.directory.as_os_str().is_empty() {
            return Err(AppError::config("上传目录不能为空"));
        }

        if self.storage.static_file_server_url.is_empty() {
            return Err(AppError::config("下载链接前缀不能为空"));
        }

        if self.upload.file_name_length == 0 || self.upload.file_name_length > MAX_FILE_NAME_LENGTH
        {
            return Err(AppError::config(format!(
                "文件名长度应在1-{}之间",
                MAX_FILE_NAME_LENGTH
            )));
        }

        if self.upload.file_size_limit == 0 {
            return Err(AppError::config("文件最大大小不能为0"));
        }

        if self.upload.extension_check.enabled
            && self
                .upload
                .extension_check
                .extensions_allowed
                .iter()
                .any(|ext| !ext.starts_with('.'))
        {
            return Err(AppError::config("允许的扩展名必须以 . 开头"));
        }

        if self.auth.key.is_empty() {
            return Err(AppError::config("密钥不能为空"));
        }

        if self.ssl.enabled
            && (self.ssl.certificate_path.is_none() || self.ssl.private_key_path.is_none())
        {
            return Err(AppError::config("启用TLS时必须配置证书和私钥路径"));
        }

        Ok(())
    }

    /// 获取服务器监听地址
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// 保存配置到文件
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> AppResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| AppError::config(format!("序列化配置失败: {}", e)))?;

        std::fs::write(path.as_ref(), content)?;
        Ok(())
    }
}
