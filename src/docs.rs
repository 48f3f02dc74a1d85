use crate::response::{ApiResponse, ErrorDetail, FileLinks};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        // 文件API
        crate::handlers::files::upload_file,
        crate::handlers::files::delete_file,
        // 系统API
        crate::handlers::system::index,
        crate::handlers::system::health_check,
    ),
    components(
        schemas(
            ApiResponse,
            FileLinks,
            ErrorDetail,
        )
    ),
    tags(
        (name = "files", description = "文件上传与删除，需要共享密钥"),
        (name = "system", description = "服务说明与健康检查")
    ),
    info(
        title = "ShareHost API",
        version = "0.1.0",
        description = "基于共享密钥的文件托管服务，兼容 ShareX 自定义上传器"
    ),
    servers(
        (url = "http://localhost:8080", description = "开发环境")
    )
)]
pub struct ApiDoc;
