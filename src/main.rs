use sharehost::{
    config::{Config, DEFAULT_LOG_FILTER},
    error::{AppError, AppResult},
    handlers::AppState,
    routes::create_app,
    storage::LocalStorage,
};
use std::{net::SocketAddr, path::PathBuf, sync::Arc};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// 配置文件路径，可通过 SHAREHOST_CONFIG 覆盖
fn config_path() -> PathBuf {
    std::env::var_os("SHAREHOST_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"))
}

/// 加载配置；文件不存在时生成带随机密钥的默认配置
fn load_config() -> AppResult<Config> {
    let path = config_path();

    if path.exists() {
        let config = Config::from_file(&path)?;
        tracing::info!("已加载配置文件: {}", path.display());
        return Ok(config);
    }

    tracing::warn!("未找到配置文件，生成默认配置: {}", path.display());
    let config = Config::generate();
    if let Err(e) = config.save_to_file(&path) {
        tracing::warn!("保存默认配置失败: {}", e);
    } else {
        tracing::warn!("已生成随机密钥，请在 {} 中查看并修改 URL 配置", path.display());
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> AppResult<()> {
    // 初始化日志
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 加载配置
    let config = load_config()?;
    tracing::info!("服务器配置: {}", config.server_addr());

    // 初始化存储，上传目录不存在时自动创建
    let storage = LocalStorage::new(&config.storage.directory).await?;
    if !storage.health_check().await {
        return Err(AppError::config(format!(
            "上传目录不可用: {}",
            config.storage.directory.display()
        )));
    }
    tracing::info!(
        "存储目录: {}，本地静态服务: {}",
        storage.root().display(),
        config.storage.serve_local
    );

    if config.upload.extension_check.enabled {
        tracing::info!(
            "扩展名检查已启用，允许: {:?}",
            config.upload.extension_check.extensions_allowed
        );
    }

    let ssl = config.ssl.clone();
    let addr = config.server_addr();

    // 创建应用状态
    let app_state = AppState::new(config, Arc::new(storage));
    let app = create_app(app_state);

    // 启动服务器
    if ssl.enabled {
        let (Some(cert), Some(key)) = (ssl.certificate_path, ssl.private_key_path) else {
            return Err(AppError::config("启用TLS时必须配置证书和私钥路径"));
        };
        let tls_config = axum_server::tls_rustls::RustlsConfig::from_pem_file(&cert, &key)
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!(e).context("加载TLS证书失败")))?;
        let socket_addr: SocketAddr = addr
            .parse()
            .map_err(|e| AppError::config(format!("监听地址无效 {}: {}", addr, e)))?;

        tracing::info!("🚀 HTTPS 服务器启动成功，监听地址: {}", socket_addr);
        axum_server::bind_rustls(socket_addr, tls_config)
            .serve(app.into_make_service())
            .await?;
    } else {
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        tracing::info!("🚀 服务器启动成功，监听地址: {}", addr);
        axum::serve(listener, app).await?;
    }

    Ok(())
}
