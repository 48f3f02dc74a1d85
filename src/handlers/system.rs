use axum::{extract::Query, response::Json};
use serde::Deserialize;

#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct HealthQuery {
    #[serde(default)]
    detail: bool,
}

/// 首页说明
#[utoipa::path(
    get,
    path = "/",
    tag = "system",
    responses((status = 200, description = "服务说明", body = String, content_type = "text/plain"))
)]
pub async fn index() -> String {
    format!(
        "This server runs sharehost v{}. Upload with POST /upload, delete with GET /delete.",
        env!("CARGO_PKG_VERSION")
    )
}

/// 健康检查
#[utoipa::path(
    get,
    path = "/health",
    tag = "system",
    params(HealthQuery),
    responses((status = 200, description = "服务正常"))
)]
pub async fn health_check(Query(params): Query<HealthQuery>) -> Json<serde_json::Value> {
    if params.detail {
        Json(serde_json::json!({
            "status": "ok",
            "version": env!("CARGO_PKG_VERSION"),
            "timestamp": chrono::Utc::now().to_rfc3339(),
        }))
    } else {
        Json(serde_json::json!({"status": "ok"}))
    }
}
