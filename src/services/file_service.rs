use crate::{
    auth::{AuthGate, key_fingerprint},
    config::Config,
    error::{AppError, AppResult},
    file_processing::{ExtensionPolicy, NameGenerator, extract_extension},
    storage::{Storage, StorageError},
};
use bytes::Bytes;
use std::sync::Arc;

/// 上传请求
#[derive(Debug, Clone, Default)]
pub struct UploadRequest {
    /// 客户端提供的原始文件名（不可信）
    pub file_name: Option<String>,
    pub data: Option<Bytes>,
    pub key: Option<String>,
}

/// 删除请求
#[derive(Debug, Clone, Default)]
pub struct DeleteRequest {
    /// 待删除文件名（不可信）
    pub file_name: Option<String>,
    pub key: Option<String>,
}

/// 上传成功后的文件信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub name: String,
    pub size: usize,
    pub url: String,
    pub delete_url: String,
}

/// 下载链接与删除链接构造
#[derive(Debug, Clone)]
pub struct LinkBuilder {
    static_file_server_url: String,
    server_url: String,
}

impl LinkBuilder {
    pub fn new(static_file_server_url: impl Into<String>, server_url: impl Into<String>) -> Self {
        Self {
            static_file_server_url: static_file_server_url.into(),
            server_url: server_url.into(),
        }
    }

    pub fn file_url(&self, name: &str) -> String {
        format!("{}{}", self.static_file_server_url, name)
    }

    pub fn delete_url(&self, name: &str, key: &str) -> String {
        format!(
            "{}/delete?filename={}&key={}",
            self.server_url.trim_end_matches('/'),
            urlencoding::encode(name),
            urlencoding::encode(key)
        )
    }
}

/// 文件上传与删除服务
#[derive(Debug, Clone)]
pub struct FileService {
    storage: Arc<dyn Storage>,
    gate: AuthGate,
    names: NameGenerator,
    policy: ExtensionPolicy,
    links: LinkBuilder,
}

impl FileService {
    pub fn new(
        storage: Arc<dyn Storage>,
        gate: AuthGate,
        names: NameGenerator,
        policy: ExtensionPolicy,
        links: LinkBuilder,
    ) -> Self {
        Self {
            storage,
            gate,
            names,
            policy,
            links,
        }
    }

    /// 根据配置创建服务
    pub fn from_config(config: &Config, storage: Arc<dyn Storage>) -> Self {
        Self::new(
            storage,
            AuthGate::new(&config.auth.key),
            NameGenerator::new(config.upload.file_name_length),
            ExtensionPolicy::new(&config.upload.extension_check),
            LinkBuilder::new(&config.storage.static_file_server_url, &config.server.url),
        )
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    /// 上传文件
    pub async fn upload(&self, request: UploadRequest) -> AppResult<StoredFile> {
        // 1. 鉴权
        self.gate.authorize(request.key.as_deref()).into_result()?;
        let key = request.key.unwrap_or_default();
        let fingerprint = key_fingerprint(&key);

        // 2. 检查文件
        let data = match request.data {
            Some(data) => data,
            None => {
                tracing::info!(key = %fingerprint, "未收到文件，终止上传");
                return Err(AppError::NoFileUploaded);
            }
        };
        let original_name = request.file_name.unwrap_or_default();

        // 3. 扩展名检查，不通过时不写入任何文件
        let extension = extract_extension(&original_name)?;
        if let Err(e) = self.policy.check(&extension) {
            tracing::info!(
                file_name = %original_name,
                key = %fingerprint,
                "文件扩展名不允许，终止上传"
            );
            return Err(e);
        }

        // 4. 生成唯一文件名并写入；存在性冲突与写入冲突共用同一尝试上限
        let size = data.len();
        let max_attempts = self.names.max_attempts();
        let mut stored = None;
        for _ in 0..max_attempts {
            let Some(candidate) = self
                .names
                .try_candidate(self.storage.as_ref(), &extension)
                .await?
            else {
                continue;
            };
            tracing::info!(
                file_name = %original_name,
                stored_as = %candidate,
                key = %fingerprint,
                "正在上传文件"
            );

            match self.storage.write(&candidate, data.clone()).await {
                Ok(()) => {
                    stored = Some(candidate);
                    break;
                }
                Err(StorageError::AlreadyExists(_)) => {
                    tracing::debug!(stored_as = %candidate, "写入时文件名已被占用，重新生成");
                }
                Err(e) => {
                    tracing::error!(stored_as = %candidate, key = %fingerprint, "写入文件失败: {}", e);
                    return Err(e.into());
                }
            }
        }
        let Some(name) = stored else {
            tracing::error!(attempts = max_attempts, "文件名生成次数耗尽");
            return Err(AppError::NameExhausted {
                attempts: max_attempts,
            });
        };

        tracing::info!(
            file_name = %original_name,
            stored_as = %name,
            size,
            key = %fingerprint,
            "文件上传成功"
        );

        Ok(StoredFile {
            url: self.links.file_url(&name),
            delete_url: self.links.delete_url(&name, &key),
            name,
            size,
        })
    }

    /// 删除文件，返回被删除的文件名
    pub async fn delete(&self, request: DeleteRequest) -> AppResult<String> {
        // 1. 鉴权
        self.gate.authorize(request.key.as_deref()).into_result()?;
        let fingerprint = key_fingerprint(request.key.as_deref().unwrap_or_default());

        // 2. 文件名
        let file_name = match request.file_name {
            Some(name) if !name.is_empty() => name,
            _ => return Err(AppError::FileNameIsEmpty),
        };
        tracing::info!(file_name = %file_name, key = %fingerprint, "尝试删除文件");

        // 3. 存在性检查；非法名称按不存在处理
        let exists = match self.storage.exists(&file_name).await {
            Ok(exists) => exists,
            Err(StorageError::InvalidName(_)) => {
                tracing::warn!(file_name = %file_name, key = %fingerprint, "拒绝非法文件名");
                false
            }
            Err(e) => {
                tracing::error!(file_name = %file_name, "检查文件是否存在失败: {}", e);
                return Err(e.into());
            }
        };
        if !exists {
            tracing::info!(file_name = %file_name, key = %fingerprint, "文件不存在，终止删除");
            return Err(AppError::file_does_not_exist(file_name));
        }

        // 4. 删除
        match self.storage.delete(&file_name).await {
            Ok(()) => {}
            // 检查之后被并发删除
            Err(StorageError::NotFound(_)) => {
                return Err(AppError::file_does_not_exist(file_name));
            }
            Err(e) => {
                tracing::error!(file_name = %file_name, key = %fingerprint, "删除文件失败: {}", e);
                return Err(e.into());
            }
        }

        tracing::info!(file_name = %file_name, key = %fingerprint, "文件已删除");
        Ok(file_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExtensionCheckConfig;
    use crate::file_processing::naming::DEFAULT_MAX_ATTEMPTS;
    use crate::storage::{LocalStorage, StorageResult};
    use std::collections::HashSet;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    const KEY: &str = "secret123";

    async fn create_test_service(policy: ExtensionPolicy) -> (TempDir, FileService) {
        let dir = TempDir::new().unwrap();
        let storage = Arc::new(LocalStorage::new(dir.path()).await.unwrap());
        let service = FileService::new(
            storage,
            AuthGate::new(KEY),
            NameGenerator::new(8),
            policy,
            LinkBuilder::new("https://i.example.com/", "https://share.example.com"),
        );
        (dir, service)
    }

    fn upload_request(file_name: &str, data: &'static [u8], key: Option<&str>) -> UploadRequest {
        UploadRequest {
            file_name: Some(file_name.to_string()),
            data: Some(Bytes::from_static(data)),
            key: key.map(str::to_string),
        }
    }

    fn delete_request(file_name: &str, key: Option<&str>) -> DeleteRequest {
        DeleteRequest {
            file_name: Some(file_name.to_string()),
            key: key.map(str::to_string),
        }
    }

    fn file_count(path: &Path) -> usize {
        std::fs::read_dir(path).unwrap().count()
    }

    #[test]
    fn test_link_builder() {
        let links = LinkBuilder::new("https://i.example.com/", "https://share.example.com/");
        assert_eq!(links.file_url("abc.png"), "https://i.example.com/abc.png");
        assert_eq!(
            links.delete_url("abc.png", "k&y=1"),
            "https://share.example.com/delete?filename=abc.png&key=k%26y%3D1"
        );
    }

    #[tokio::test]
    async fn test_upload_stores_exact_bytes() {
        let (dir, service) = create_test_service(ExtensionPolicy::disabled()).await;

        let stored = service
            .upload(upload_request("photo.png", b"\x89PNG data", Some(KEY)))
            .await
            .unwrap();

        assert_eq!(stored.name.len(), 12);
        assert!(stored.name.ends_with(".png"));
        assert_eq!(stored.size, 9);
        assert_eq!(stored.url, format!("https://i.example.com/{}", stored.name));
        assert_eq!(
            stored.delete_url,
            format!(
                "https://share.example.com/delete?filename={}&key={}",
                stored.name, KEY
            )
        );
        assert_eq!(
            std::fs::read(dir.path().join(&stored.name)).unwrap(),
            b"\x89PNG data"
        );
    }

    #[tokio::test]
    async fn test_upload_rejects_bad_keys_without_writing() {
        let (dir, service) = create_test_service(ExtensionPolicy::disabled()).await;

        let err = service
            .upload(upload_request("a.png", b"x", Some("")))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::EmptyKey));

        let err = service
            .upload(upload_request("a.png", b"x", None))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::EmptyKey));

        let err = service
            .upload(upload_request("a.png", b"x", Some("wrong")))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidKey));

        assert_eq!(file_count(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_upload_without_file() {
        let (dir, service) = create_test_service(ExtensionPolicy::disabled()).await;

        let err = service
            .upload(UploadRequest {
                key: Some(KEY.to_string()),
                ..Default::default()
            })
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::NoFileUploaded));
        assert_eq!(file_count(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_upload_disallowed_extension_writes_nothing() {
        let policy = ExtensionPolicy::new(&ExtensionCheckConfig {
            enabled: true,
            extensions_allowed: vec![".png".to_string(), ".jpg".to_string()],
        });
        let (dir, service) = create_test_service(policy).await;

        let err = service
            .upload(upload_request("payload.exe", b"MZ", Some(KEY)))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidFileExtension { .. }));
        assert_eq!(file_count(dir.path()), 0);

        let stored = service
            .upload(upload_request("ok.jpg", b"jpg", Some(KEY)))
            .await
            .unwrap();
        assert!(stored.name.ends_with(".jpg"));
        assert_eq!(file_count(dir.path()), 1);
    }

    #[tokio::test]
    async fn test_upload_without_extension() {
        let (_dir, service) = create_test_service(ExtensionPolicy::disabled()).await;

        let stored = service
            .upload(upload_request("README", b"text", Some(KEY)))
            .await
            .unwrap();

        assert_eq!(stored.name.len(), 8);
        assert!(stored.name.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[tokio::test]
    async fn test_delete_lifecycle() {
        let (dir, service) = create_test_service(ExtensionPolicy::disabled()).await;

        let keep = service
            .upload(upload_request("keep.png", b"keep", Some(KEY)))
            .await
            .unwrap();
        let gone = service
            .upload(upload_request("gone.png", b"gone", Some(KEY)))
            .await
            .unwrap();

        let deleted = service
            .delete(delete_request(&gone.name, Some(KEY)))
            .await
            .unwrap();
        assert_eq!(deleted, gone.name);
        assert!(!dir.path().join(&gone.name).exists());
        assert!(dir.path().join(&keep.name).exists());

        let err = service
            .delete(delete_request(&gone.name, Some(KEY)))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::FileDoesNotExist { .. }));
    }

    #[tokio::test]
    async fn test_delete_rejections() {
        let (dir, service) = create_test_service(ExtensionPolicy::disabled()).await;
        let stored = service
            .upload(upload_request("a.png", b"a", Some(KEY)))
            .await
            .unwrap();

        let err = service
            .delete(delete_request(&stored.name, Some("wrong")))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidKey));

        let err = service
            .delete(delete_request(&stored.name, None))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::EmptyKey));

        let err = service
            .delete(DeleteRequest {
                file_name: None,
                key: Some(KEY.to_string()),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::FileNameIsEmpty));

        let err = service
            .delete(delete_request("", Some(KEY)))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::FileNameIsEmpty));

        assert!(dir.path().join(&stored.name).exists());
    }

    #[tokio::test]
    async fn test_delete_traversal_is_file_does_not_exist() {
        let outer = TempDir::new().unwrap();
        let root = outer.path().join("uploads");
        let storage = Arc::new(LocalStorage::new(&root).await.unwrap());
        let service = FileService::new(
            storage,
            AuthGate::new(KEY),
            NameGenerator::new(8),
            ExtensionPolicy::disabled(),
            LinkBuilder::new("https://i.example.com/", "https://share.example.com"),
        );

        let victim = outer.path().join("config.toml");
        std::fs::write(&victim, b"key = 1").unwrap();

        for name in ["../config.toml", "/etc/passwd", "..", ".upload-x"] {
            let err = service
                .delete(delete_request(name, Some(KEY)))
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::FileDoesNotExist { .. }));
        }

        assert!(victim.exists());
    }

    #[tokio::test]
    async fn test_concurrent_uploads_get_distinct_names() {
        let dir = TempDir::new().unwrap();
        let storage = Arc::new(LocalStorage::new(dir.path()).await.unwrap());
        // 短文件名放大冲突概率，验证独占写入能兜底
        let service = Arc::new(FileService::new(
            storage,
            AuthGate::new(KEY),
            NameGenerator::new(2).with_max_attempts(1000),
            ExtensionPolicy::disabled(),
            LinkBuilder::new("https://i.example.com/", "https://share.example.com"),
        ));

        let mut handles = Vec::new();
        for i in 0..64 {
            let service = service.clone();
            handles.push(tokio::spawn(async move {
                let data = Bytes::from(format!("payload-{}", i));
                service
                    .upload(UploadRequest {
                        file_name: Some("shot.png".to_string()),
                        data: Some(data.clone()),
                        key: Some(KEY.to_string()),
                    })
                    .await
                    .map(|stored| (stored.name, data))
            }));
        }

        let mut names = HashSet::new();
        for handle in handles {
            let (name, data) = handle.await.unwrap().unwrap();
            assert_eq!(std::fs::read(dir.path().join(&name)).unwrap(), data);
            assert!(names.insert(name));
        }
        assert_eq!(names.len(), 64);
        assert_eq!(file_count(dir.path()), 64);
    }

    /// 统计调用次数的存储；`taken` 为真时 exists 总是冲突，否则写入总是冲突
    #[derive(Debug, Default)]
    struct AlwaysTakenStorage {
        taken: bool,
        exists_calls: AtomicUsize,
        write_calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl Storage for AlwaysTakenStorage {
        async fn exists(&self, _name: &str) -> StorageResult<bool> {
            self.exists_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.taken)
        }

        async fn write(&self, name: &str, _data: Bytes) -> StorageResult<()> {
            self.write_calls.fetch_add(1, Ordering::SeqCst);
            Err(StorageError::AlreadyExists(name.to_string()))
        }

        async fn delete(&self, name: &str) -> StorageResult<()> {
            Err(StorageError::NotFound(name.to_string()))
        }

        async fn read(&self, name: &str) -> StorageResult<Bytes> {
            Err(StorageError::NotFound(name.to_string()))
        }
    }

    fn exhausting_service(storage: Arc<AlwaysTakenStorage>, attempts: usize) -> FileService {
        FileService::new(
            storage,
            AuthGate::new(KEY),
            NameGenerator::new(8).with_max_attempts(attempts),
            ExtensionPolicy::disabled(),
            LinkBuilder::new("https://i.example.com/", "https://share.example.com"),
        )
    }

    #[tokio::test]
    async fn test_write_conflicts_exhaust_budget() {
        let storage = Arc::new(AlwaysTakenStorage::default());
        let service = exhausting_service(storage.clone(), 3);

        let err = service
            .upload(upload_request("a.png", b"a", Some(KEY)))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NameExhausted { attempts: 3 }));
        assert_eq!(storage.exists_calls.load(Ordering::SeqCst), 3);
        assert_eq!(storage.write_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_name_collisions_share_budget() {
        let storage = Arc::new(AlwaysTakenStorage {
            taken: true,
            ..Default::default()
        });
        let service = exhausting_service(storage.clone(), DEFAULT_MAX_ATTEMPTS);

        let err = service
            .upload(upload_request("a.png", b"a", Some(KEY)))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NameExhausted { .. }));
        assert_eq!(storage.exists_calls.load(Ordering::SeqCst), DEFAULT_MAX_ATTEMPTS);
        assert_eq!(storage.write_calls.load(Ordering::SeqCst), 0);
    }
}
