pub mod files;
pub mod system;

pub use files::{delete_file, upload_file};
pub use system::{health_check, index};

use crate::{config::Config, services::FileService, storage::Storage};
use axum::http::HeaderMap;
use std::sync::Arc;

/// 应用状态
#[derive(Debug, Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub files: Arc<FileService>,
}

impl AppState {
    pub fn new(config: Config, storage: Arc<dyn Storage>) -> Self {
        let files = FileService::from_config(&config, storage);
        Self {
            config: Arc::new(config),
            files: Arc::new(files),
        }
    }

    /// 按优先级取出请求携带的密钥：配置的请求头 > 查询参数 > 表单字段
    pub fn presented_key(
        &self,
        headers: &HeaderMap,
        query_key: Option<String>,
        form_key: Option<String>,
    ) -> Option<String> {
        let header_key = self
            .config
            .auth
            .header
            .as_deref()
            .and_then(|name| headers.get(name))
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        [header_key, query_key, form_key]
            .into_iter()
            .flatten()
            .find(|key| !key.is_empty())
    }
}
