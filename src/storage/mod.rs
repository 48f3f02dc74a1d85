pub mod local;

pub use local::LocalStorage;

use bytes::Bytes;
use std::path::{Component, Path};
use thiserror::Error;

/// 存储层错误
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("非法文件名: {0}")]
    InvalidName(String),

    #[error("文件已存在: {0}")]
    AlreadyExists(String),

    #[error("文件不存在: {0}")]
    NotFound(String),

    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("后台任务失败: {0:#}")]
    Task(anyhow::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// 存储抽象接口
///
/// 所有名称都相对于单一根目录解析，实现必须在访问文件系统之前调用
/// [`validate_name`] 拒绝越界名称。
#[async_trait::async_trait]
pub trait Storage: Send + Sync + std::fmt::Debug {
    /// 检查文件是否存在
    async fn exists(&self, name: &str) -> StorageResult<bool>;

    /// 原子写入文件，目标已存在时返回 [`StorageError::AlreadyExists`]
    async fn write(&self, name: &str, data: Bytes) -> StorageResult<()>;

    /// 删除文件
    async fn delete(&self, name: &str) -> StorageResult<()>;

    /// 读取文件
    async fn read(&self, name: &str) -> StorageResult<Bytes>;
}

/// 校验存储名称：必须是单个普通路径段
pub fn validate_name(name: &str) -> StorageResult<()> {
    if name.is_empty()
        || name.starts_with('.')
        || name.contains(['/', '\\', '\0'])
    {
        return Err(StorageError::InvalidName(name.to_string()));
    }

    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(StorageError::InvalidName(name.to_string())),
    }
}
