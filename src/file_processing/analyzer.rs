use crate::error::{AppError, AppResult};
use std::path::Path;

/// 扩展名最大长度（含点）
pub const MAX_EXTENSION_LEN: usize = 32;

/// 从客户端提供的文件名中提取扩展名
///
/// 只看最后一段（兼容 `/` 和 `\` 分隔的路径），规则与常见的 `extname`
/// 一致：`a.tar.gz` → `.gz`，`.bashrc` → 空，`noext` → 空。
/// 点号之后只保留 ASCII 字母数字、`-` 和 `_`，其余字符剔除。
pub fn extract_extension(filename: &str) -> AppResult<String> {
    let basename = filename.rsplit(['/', '\\']).next().unwrap_or(filename);

    let raw = match Path::new(basename).extension().and_then(|ext| ext.to_str()) {
        Some(ext) => ext,
        None => return Ok(String::new()),
    };

    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();

    if cleaned.is_empty() {
        return Ok(String::new());
    }

    let extension = format!(".{}", cleaned);
    if extension.len() > MAX_EXTENSION_LEN {
        return Err(AppError::bad_request(format!(
            "File extension is longer than {} characters.",
            MAX_EXTENSION_LEN
        )));
    }

    Ok(extension)
}
