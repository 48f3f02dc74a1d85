use super::{Storage, StorageError, StorageResult, validate_name};
use bytes::Bytes;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tokio::fs;

/// 临时文件前缀，以点开头，永远不会被当作合法存储名称
const TEMP_PREFIX: &str = ".upload-";

/// 本地目录存储实现
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    /// 创建新的本地存储实例，根目录不存在时自动创建
    pub async fn new(root: impl AsRef<Path>) -> StorageResult<Self> {
        let root = root.as_ref().to_path_buf();
        if !fs::try_exists(&root).await? {
            fs::create_dir_all(&root).await?;
            tracing::info!("已创建上传目录: {}", root.display());
        }
        Ok(Self { root })
    }

    /// 存储根目录
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 解析名称对应的路径，非法名称不会触及文件系统
    fn path_for(&self, name: &str) -> StorageResult<PathBuf> {
        validate_name(name)?;
        Ok(self.root.join(name))
    }

    /// 健康检查：根目录可访问且为目录
    pub async fn health_check(&self) -> bool {
        match fs::metadata(&self.root).await {
            Ok(meta) => meta.is_dir(),
            Err(e) => {
                tracing::error!("存储目录不可访问: {}", e);
                false
            }
        }
    }

    /// 先写临时文件并落盘，再以不覆盖方式改名到目标
    fn write_exclusive(root: &Path, path: &Path, name: &str, data: &[u8]) -> StorageResult<()> {
        let mut temp = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .tempfile_in(root)?;
        temp.write_all(data)?;
        temp.as_file().sync_all()?;

        // 失败时 PersistError 持有临时文件，drop 后自动删除
        temp.persist_noclobber(path).map_err(|e| {
            if e.error.kind() == ErrorKind::AlreadyExists {
                StorageError::AlreadyExists(name.to_string())
            } else {
                StorageError::Io(e.error)
            }
        })?;

        Ok(())
    }
}

fn task_failed(e: tokio::task::JoinError) -> StorageError {
    StorageError::Task(anyhow::Error::new(e).context("写入任务失败"))
}

fn not_found_or_io(name: &str) -> impl FnOnce(std::io::Error) -> StorageError + '_ {
    move |e| {
        if e.kind() == ErrorKind::NotFound {
            StorageError::NotFound(name.to_string())
        } else {
            StorageError::Io(e)
        }
    }
}

#[async_trait::async_trait]
impl Storage for LocalStorage {
    async fn exists(&self, name: &str) -> StorageResult<bool> {
        let path = self.path_for(name)?;
        Ok(fs::try_exists(&path).await?)
    }

    async fn write(&self, name: &str, data: Bytes) -> StorageResult<()> {
        let path = self.path_for(name)?;
        let root = self.root.clone();
        let owned_name = name.to_string();

        tokio::task::spawn_blocking(move || {
            Self::write_exclusive(&root, &path, &owned_name, &data)
        })
        .await
        .map_err(task_failed)??;

        tracing::debug!(file_name = name, "文件已写入存储");
        Ok(())
    }

    async fn delete(&self, name: &str) -> StorageResult<()> {
        let path = self.path_for(name)?;
        fs::remove_file(&path).await.map_err(not_found_or_io(name))?;

        tracing::debug!(file_name = name, "文件已从存储删除");
        Ok(())
    }

    async fn read(&self, name: &str) -> StorageResult<Bytes> {
        let path = self.path_for(name)?;
        let data = fs::read(&path).await.map_err(not_found_or_io(name))?;
        Ok(Bytes::from(data))
    }
}
