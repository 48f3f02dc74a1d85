use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::response::ApiResponse;
use crate::storage::StorageError;

/// 应用程序错误类型
#[derive(Error, Debug)]
pub enum AppError {
    #[error("密钥为空")]
    EmptyKey,

    #[error("密钥无效")]
    InvalidKey,

    #[error("未上传文件")]
    NoFileUploaded,

    #[error("文件扩展名不允许: {extension}")]
    InvalidFileExtension { extension: String },

    #[error("文件名为空")]
    FileNameIsEmpty,

    #[error("文件不存在: {file_name}")]
    FileDoesNotExist { file_name: String },

    #[error("文件过大: 最大允许大小 {max_size} 字节")]
    FileTooLarge { max_size: u64 },

    #[error("请求参数错误: {0}")]
    BadRequest(String),

    #[error("文件名生成失败: 尝试 {attempts} 次后仍然冲突")]
    NameExhausted { attempts: usize },

    #[error("存储错误: {0}")]
    Storage(#[from] StorageError),

    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("配置错误: {0}")]
    Config(String),

    #[error("内部错误: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// HTTP状态码
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidKey => StatusCode::UNAUTHORIZED,
            AppError::EmptyKey
            | AppError::NoFileUploaded
            | AppError::InvalidFileExtension { .. }
            | AppError::FileNameIsEmpty
            | AppError::FileDoesNotExist { .. }
            | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::FileTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::NameExhausted { .. }
            | AppError::Storage(_)
            | AppError::Io(_)
            | AppError::Config(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 返回给客户端的 (message, fix)
    pub fn wire_message(&self) -> (String, String) {
        let (message, fix) = match self {
            AppError::EmptyKey => ("Key is empty.", "Submit a key."),
            AppError::InvalidKey => ("Key is invalid.", "Submit a valid key."),
            AppError::NoFileUploaded => ("No file was uploaded.", "Upload a file."),
            AppError::InvalidFileExtension { .. } => (
                "Invalid file extension.",
                "Upload a file with a valid extension.",
            ),
            AppError::FileNameIsEmpty => ("File name is empty.", "Provide a file name."),
            AppError::FileDoesNotExist { .. } => {
                ("The file does not exists.", "Submit a existing file name.")
            }
            AppError::FileTooLarge { max_size } => {
                return (
                    format!("File is too large. Maximum size is {} bytes.", max_size),
                    "Upload a smaller file.".to_string(),
                );
            }
            AppError::BadRequest(msg) => {
                return (msg.clone(), "Check the request format.".to_string());
            }
            AppError::NameExhausted { .. }
            | AppError::Storage(_)
            | AppError::Io(_)
            | AppError::Config(_)
            | AppError::Internal(_) => (
                "Internal server error.",
                "Try again later or contact the server operator.",
            ),
        };

        (message.to_string(), fix.to_string())
    }

    /// 是否属于服务端故障（需要运维关注）
    pub fn is_server_fault(&self) -> bool {
        self.status().is_server_error()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // 只记录服务端故障，客户端输入错误属于正常结果
        if self.is_server_fault() {
            tracing::error!("应用错误: {}", self);
        } else {
            tracing::debug!("请求被拒绝: {}", self);
        }

        let (message, fix) = self.wire_message();
        ApiResponse::failed(message, fix).with_status(status)
    }
}

/// 应用程序Result类型别名
pub type AppResult<T> = Result<T, AppError>;

/// 错误构造辅助函数
impl AppError {
    pub fn bad_request<T: Into<String>>(msg: T) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn file_does_not_exist<T: Into<String>>(file_name: T) -> Self {
        Self::FileDoesNotExist {
            file_name: file_name.into(),
        }
    }

    pub fn invalid_file_extension<T: Into<String>>(extension: T) -> Self {
        Self::InvalidFileExtension {
            extension: extension.into(),
        }
    }

    pub fn file_too_large(max_size: u64) -> Self {
        Self::FileTooLarge { max_size }
    }

    pub fn config<T: Into<String>>(msg: T) -> Self {
        Self::Config(msg.into())
    }
}
