use crate::error::{AppError, AppResult};
use crate::storage::Storage;
use rand::{Rng, distr::Alphanumeric};

/// 默认最大尝试次数
pub const DEFAULT_MAX_ATTEMPTS: usize = 100;

/// 随机文件名生成器
///
/// 令牌取自线程本地的 CSPRNG，保证文件名不可猜测。唯一性以存储为准，
/// 每个候选名都会查询一次 `exists`。
#[derive(Debug, Clone)]
pub struct NameGenerator {
    length: usize,
    max_attempts: usize,
}

impl NameGenerator {
    pub fn new(length: usize) -> Self {
        Self {
            length,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    /// 生成随机字母数字令牌
    pub fn random_token(&self) -> String {
        let mut rng = rand::rng();
        (0..self.length)
            .map(|_| char::from(rng.sample(Alphanumeric)))
            .collect()
    }

    /// 生成一个候选名并查询一次存储，已被占用时返回 `None`
    pub async fn try_candidate(
        &self,
        storage: &dyn Storage,
        extension: &str,
    ) -> AppResult<Option<String>> {
        let candidate = format!("{}{}", self.random_token(), extension);
        if storage.exists(&candidate).await? {
            tracing::debug!(file_name = %candidate, "文件名冲突，重新生成");
            return Ok(None);
        }
        Ok(Some(candidate))
    }

    /// 生成在存储中尚不存在的文件名
    pub async fn generate(&self, storage: &dyn Storage, extension: &str) -> AppResult<String> {
        for _ in 0..self.max_attempts {
            if let Some(candidate) = self.try_candidate(storage, extension).await? {
                return Ok(candidate);
            }
        }

        tracing::error!(attempts = self.max_attempts, "文件名生成次数耗尽");
        Err(AppError::NameExhausted {
            attempts: self.max_attempts,
        })
    }
}
