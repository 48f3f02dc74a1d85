use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// 上传成功后返回的链接
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FileLinks {
    /// 公开下载地址
    pub url: String,
    /// 删除地址（包含密钥）
    pub delete_url: String,
}

/// 错误详情
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// 错误描述
    pub message: String,
    /// 修复建议
    pub fix: String,
}

/// 统一API响应格式
///
/// 只有三种形状：上传成功、删除成功、失败。所有接口都通过这里构造响应，
/// 保证客户端（如 ShareX）看到的 JSON 结构始终一致。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum ApiResponse {
    Uploaded { success: bool, file: FileLinks },
    Deleted { success: bool, message: String },
    Failed { success: bool, error: ErrorDetail },
}

impl ApiResponse {
    /// 创建上传成功响应
    pub fn uploaded(url: impl Into<String>, delete_url: impl Into<String>) -> Self {
        Self::Uploaded {
            success: true,
            file: FileLinks {
                url: url.into(),
                delete_url: delete_url.into(),
            },
        }
    }

    /// 创建删除成功响应
    pub fn deleted(file_name: &str) -> Self {
        Self::Deleted {
            success: true,
            message: format!("Deleted file {}", file_name),
        }
    }

    /// 创建错误响应
    pub fn failed(message: impl Into<String>, fix: impl Into<String>) -> Self {
        Self::Failed {
            success: false,
            error: ErrorDetail {
                message: message.into(),
                fix: fix.into(),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        match self {
            Self::Uploaded { success, .. }
            | Self::Deleted { success, .. }
            | Self::Failed { success, .. } => *success,
        }
    }

    /// 带状态码输出，错误路径使用
    pub fn with_status(self, status: StatusCode) -> Response {
        (status, Json(self)).into_response()
    }
}

impl IntoResponse for ApiResponse {
    fn into_response(self) -> Response {
        let status = if self.is_success() {
            StatusCode::OK
        } else {
            StatusCode::BAD_REQUEST
        };

        self.with_status(status)
    }
}
