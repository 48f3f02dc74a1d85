use crate::docs::ApiDoc;
use crate::handlers::{AppState, delete_file, health_check, index, upload_file};
use axum::{
    Router,
    body::Body,
    extract::DefaultBodyLimit,
    http::{Method, Request},
    response::Json,
    routing::{get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use utoipa::OpenApi;

/// 创建API路由
pub fn create_api_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(index)) // 服务说明
        .route("/health", get(health_check))
        .route("/upload", post(upload_file)) // 上传文件
        .route("/delete", get(delete_file)) // 删除文件
        .route(
            "/api-docs/openapi.json",
            get(|| async { Json(ApiDoc::openapi()) }),
        )
}

/// 请求span只记录方法和路径，查询参数里可能带有密钥
fn request_span(request: &Request<Body>) -> tracing::Span {
    tracing::debug_span!(
        "request",
        method = %request.method(),
        path = %request.uri().path(),
    )
}

/// 创建完整应用：业务路由、静态文件与中间件
pub fn create_app(state: AppState) -> Router {
    let config = state.config.clone();

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(vec![Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    let mut app = create_api_routes();

    // 由本服务直接提供已上传文件
    if config.storage.serve_local {
        app = app.nest_service("/f", ServeDir::new(&config.storage.directory));
    }

    app.with_state(state)
        .layer(DefaultBodyLimit::max(config.upload.body_limit())) // 设置请求体大小限制
        .layer(cors)
        .layer(TraceLayer::new_for_http().make_span_with(request_span))
}
