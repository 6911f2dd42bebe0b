//! Web 服务器
//!
//! 基于 Axum 启动 HTTP 服务

use axum::Router;
use loadkit_core::{
    constants::{SERVER_HOST, SERVER_PORT},
    ApplicationError, ApplicationResult, Environment,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;

/// Web 服务器配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerProperties {
    /// 服务器监听地址
    pub host: String,

    /// 服务器监听端口
    pub port: u16,
}

impl Default for ServerProperties {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl ServerProperties {
    /// 从 Environment 加载配置
    pub fn from_environment(env: &Environment) -> Self {
        let defaults = Self::default();
        Self {
            host: env.get_string_or(SERVER_HOST, &defaults.host),
            port: env
                .get_i64(SERVER_PORT)
                .and_then(|port| u16::try_from(port).ok())
                .unwrap_or(defaults.port),
        }
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// 启动服务器，直到进程结束
pub async fn serve(router: Router, props: &ServerProperties) -> ApplicationResult<()> {
    let addr = props.address();
    tracing::info!("Starting web server on {}", addr);

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| ApplicationError::Other(format!("Failed to bind to {}: {}", addr, e)))?;

    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, router.into_make_service())
        .await
        .map_err(|e| ApplicationError::Other(format!("Server error: {}", e)))?;

    Ok(())
}
