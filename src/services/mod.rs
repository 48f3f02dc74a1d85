// 服务层模块
pub mod file_service;

pub use file_service::{DeleteRequest, FileService, LinkBuilder, StoredFile, UploadRequest};
