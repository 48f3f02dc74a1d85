use crate::config::ExtensionCheckConfig;
use crate::error::{AppError, AppResult};
use std::collections::HashSet;

/// 扩展名白名单策略
#[derive(Debug, Clone)]
pub struct ExtensionPolicy {
    enabled: bool,
    allowed: HashSet<String>,
}

impl ExtensionPolicy {
    /// 创建新的扩展名策略
    pub fn new(config: &ExtensionCheckConfig) -> Self {
        Self {
            enabled: config.enabled,
            allowed: config.extensions_allowed.iter().cloned().collect(),
        }
    }

    /// 不做任何限制的策略
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            allowed: HashSet::new(),
        }
    }

    /// 扩展名是否允许（区分大小写，包含前导点）
    pub fn is_allowed(&self, extension: &str) -> bool {
        !self.enabled || self.allowed.contains(extension)
    }

    /// 校验扩展名
    pub fn check(&self, extension: &str) -> AppResult<()> {
        if self.is_allowed(extension) {
            Ok(())
        } else {
            Err(AppError::invalid_file_extension(extension))
        }
    }
}
