use crate::{
    error::AppError,
    handlers::AppState,
    response::ApiResponse,
    services::{DeleteRequest, UploadRequest},
};
use axum::{
    extract::{
        Multipart, Query, State,
        multipart::{Field, MultipartError, MultipartRejection},
        rejection::QueryRejection,
    },
    http::{HeaderMap, StatusCode},
};
use bytes::{Bytes, BytesMut};
use serde::Deserialize;

/// 上传查询参数
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UploadQuery {
    /// 共享密钥，也可以通过表单字段 `key` 或配置的请求头提交
    pub key: Option<String>,
}

/// 删除查询参数
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DeleteQuery {
    /// 上传时返回的文件名
    pub filename: Option<String>,
    /// 共享密钥
    pub key: Option<String>,
}

/// multipart 中解析出的字段
#[derive(Debug, Default)]
struct UploadForm {
    file_name: Option<String>,
    data: Option<Bytes>,
    key: Option<String>,
}

impl AppState {
    fn multipart_error(&self, e: MultipartError) -> AppError {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::file_too_large(self.config.upload.file_size_limit)
        } else {
            AppError::bad_request(format!("Malformed multipart body: {}", e.body_text()))
        }
    }
}

/// 按块读取文件字段，超过单文件大小上限时立即终止
async fn read_file_field(state: &AppState, mut field: Field<'_>) -> Result<Bytes, AppError> {
    let limit = state.config.upload.file_size_limit;
    let mut data = BytesMut::new();

    while let Some(chunk) = field.chunk().await.map_err(|e| state.multipart_error(e))? {
        if (data.len() + chunk.len()) as u64 > limit {
            return Err(AppError::file_too_large(limit));
        }
        data.extend_from_slice(&chunk);
    }

    Ok(data.freeze())
}

async fn read_upload_form(state: &AppState, mut multipart: Multipart) -> Result<UploadForm, AppError> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| state.multipart_error(e))?
    {
        match field.name().unwrap_or("") {
            "file" => {
                let file_name = field.file_name().map(|s| s.to_string());
                let data = read_file_field(state, field).await?;

                // 浏览器未选择文件时会提交一个空文件名的空字段
                if file_name.as_deref().unwrap_or("").is_empty() && data.is_empty() {
                    continue;
                }
                form.file_name = file_name;
                form.data = Some(data);
            }
            "key" => {
                form.key = Some(field.text().await.map_err(|e| state.multipart_error(e))?);
            }
            _ => {
                // 忽略未知字段
            }
        }
    }

    Ok(form)
}

/// 上传文件
///
/// 接收 multipart 字段 `file`，保存为随机文件名，返回下载链接和删除链接。
#[utoipa::path(
    post,
    path = "/upload",
    tag = "files",
    params(UploadQuery),
    responses(
        (status = 200, description = "上传成功", body = ApiResponse),
        (status = 400, description = "密钥为空、未上传文件或扩展名不允许", body = ApiResponse),
        (status = 401, description = "密钥无效", body = ApiResponse),
        (status = 413, description = "文件过大", body = ApiResponse),
        (status = 500, description = "存储错误", body = ApiResponse)
    )
)]
pub async fn upload_file(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: Result<Query<UploadQuery>, QueryRejection>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<ApiResponse, AppError> {
    let Query(query) = query.map_err(|e| AppError::bad_request(e.body_text()))?;

    let form = match multipart {
        Ok(multipart) => read_upload_form(&state, multipart).await?,
        Err(e) => {
            tracing::debug!("请求不是 multipart 格式: {}", e);
            UploadForm::default()
        }
    };

    let key = state.presented_key(&headers, query.key, form.key);
    let stored = state
        .files
        .upload(UploadRequest {
            file_name: form.file_name,
            data: form.data,
            key,
        })
        .await?;

    Ok(ApiResponse::uploaded(stored.url, stored.delete_url))
}

/// 删除文件
///
/// 文件名必须与上传时返回的完全一致。
#[utoipa::path(
    get,
    path = "/delete",
    tag = "files",
    params(DeleteQuery),
    responses(
        (status = 200, description = "删除成功", body = ApiResponse),
        (status = 400, description = "密钥为空、文件名为空或文件不存在", body = ApiResponse),
        (status = 401, description = "密钥无效", body = ApiResponse),
        (status = 500, description = "存储错误", body = ApiResponse)
    )
)]
pub async fn delete_file(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: Result<Query<DeleteQuery>, QueryRejection>,
) -> Result<ApiResponse, AppError> {
    let Query(query) = query.map_err(|e| AppError::bad_request(e.body_text()))?;

    let key = state.presented_key(&headers, query.key, None);
    let deleted = state
        .files
        .delete(DeleteRequest {
            file_name: query.filename,
            key,
        })
        .await?;

    Ok(ApiResponse::deleted(&deleted))
}
