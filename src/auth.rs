use crate::error::{AppError, AppResult};
use sha2::{Digest, Sha256};

/// 鉴权结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthResult {
    Authorized,
    EmptyKey,
    InvalidKey,
}

impl AuthResult {
    pub fn into_result(self) -> AppResult<()> {
        match self {
            AuthResult::Authorized => Ok(()),
            AuthResult::EmptyKey => Err(AppError::EmptyKey),
            AuthResult::InvalidKey => Err(AppError::InvalidKey),
        }
    }
}

/// 共享密钥鉴权
///
/// 只保存密钥的 SHA-256 摘要；比较时对摘要做常量时间比较，
/// 不泄露密钥内容和长度。
#[derive(Clone)]
pub struct AuthGate {
    digest: [u8; 32],
}

impl std::fmt::Debug for AuthGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthGate").finish_non_exhaustive()
    }
}

impl AuthGate {
    pub fn new(secret: &str) -> Self {
        Self {
            digest: Self::digest(secret),
        }
    }

    pub fn authorize(&self, presented: Option<&str>) -> AuthResult {
        let presented = match presented {
            Some(key) if !key.is_empty() => key,
            _ => return AuthResult::EmptyKey,
        };

        if constant_time_eq(&Self::digest(presented), &self.digest) {
            AuthResult::Authorized
        } else {
            tracing::warn!(key = %key_fingerprint(presented), "密钥校验失败");
            AuthResult::InvalidKey
        }
    }

    fn digest(key: &str) -> [u8; 32] {
        Sha256::digest(key.as_bytes()).into()
    }
}

/// 常量时间字节比较
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}

/// 日志中使用的密钥指纹（SHA-256 前 4 字节），不暴露密钥本身
pub fn key_fingerprint(key: &str) -> String {
    let digest = Sha256::digest(key.as_bytes());
    hex::encode(&digest[..4])
}
